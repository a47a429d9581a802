//! Mock Tool Gateway
//!
//! In-process gateway returning canned, Mapbox-shaped responses for the three
//! tools the travel pipeline uses. Used by `--offline` runs and by tests.
//!
//! ## Tools
//!
//! | Tool | Arguments | Response |
//! |------|-----------|----------|
//! | `search_and_geocode_tool` | `{q}` | GeoJSON `FeatureCollection` |
//! | `matrix_tool` | `{coordinates: [{longitude, latitude}]}` | `{code, durations}` |
//! | `directions_tool` | `{coordinates: [{longitude, latitude}]}` | `{routes: [{duration, distance, legs}]}` |
//!
//! Travel figures are derived from great-circle distance so results are
//! stable across runs.
//!
//! ## Failure injection
//!
//! ```rust,ignore
//! let gateway = MockGateway::new()
//!     .fail_next("directions_tool", 2)   // transport errors, retried
//!     .tool_error("matrix_tool");        // ran, but reported is_error
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{Result, WayfarerError};
use crate::gateway::types::{ToolCallRequest, ToolCallResult, ToolDefinition};
use crate::gateway::ToolGateway;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Road distance is longer than the great circle
const ROAD_FACTOR: f64 = 1.3;

/// Average urban driving speed (m/s, roughly 25 mph)
const DRIVING_SPEED_MPS: f64 = 11.2;

/// A geocodable place known to the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownPlace {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

fn default_places() -> Vec<KnownPlace> {
    [
        ("Golden Gate Bridge", 37.819929, -122.478255),
        ("Fisherman's Wharf", 37.808000, -122.417743),
        ("Alcatraz Island Ferry Terminal", 37.806944, -122.404167),
        ("Golden Gate Park", 37.769421, -122.486214),
    ]
    .into_iter()
    .map(|(name, latitude, longitude)| KnownPlace {
        name: name.to_string(),
        latitude,
        longitude,
    })
    .collect()
}

/// In-process gateway with deterministic responses.
#[derive(Debug)]
pub struct MockGateway {
    name: String,
    places: Vec<KnownPlace>,
    connected: AtomicBool,
    connect_count: AtomicU32,
    shutdown_count: AtomicU32,
    fail_connect: bool,
    /// Remaining transport failures per tool
    failures: Mutex<FxHashMap<String, u32>>,
    /// Tools that always answer with `is_error = true`
    tool_errors: FxHashSet<String>,
    calls: Mutex<Vec<ToolCallRequest>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    /// Create a disconnected mock with the default San Francisco places.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            places: default_places(),
            connected: AtomicBool::new(false),
            connect_count: AtomicU32::new(0),
            shutdown_count: AtomicU32::new(0),
            fail_connect: false,
            failures: Mutex::new(FxHashMap::default()),
            tool_errors: FxHashSet::default(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register an extra place (matched case-insensitively by substring).
    pub fn with_place(mut self, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        self.places.push(KnownPlace {
            name: name.into(),
            latitude,
            longitude,
        });
        self
    }

    /// Mark the mock as already connected.
    pub fn pre_connected(self) -> Self {
        self.connected.store(true, Ordering::SeqCst);
        self
    }

    /// Make `connect` fail with `GatewayStart`.
    pub fn fail_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Make the next `times` calls to `tool` fail at the transport level.
    pub fn fail_next(self, tool: impl Into<String>, times: u32) -> Self {
        self.failures.lock().insert(tool.into(), times);
        self
    }

    /// Make every call to `tool` return a tool-level error result.
    pub fn tool_error(mut self, tool: impl Into<String>) -> Self {
        self.tool_errors.insert(tool.into());
        self
    }

    // ═══════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════

    /// All calls received, in order (failed attempts included).
    pub fn calls(&self) -> Vec<ToolCallRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, tool: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.name == tool).count()
    }

    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::SeqCst)
    }

    pub fn shutdown_count(&self) -> u32 {
        self.shutdown_count.load(Ordering::SeqCst)
    }

    // ═══════════════════════════════════════════
    // Canned responses
    // ═══════════════════════════════════════════

    fn respond(&self, request: &ToolCallRequest) -> ToolCallResult {
        if self.tool_errors.contains(&request.name) {
            return ToolCallResult::error(format!("{} is unavailable", request.name));
        }

        match request.name.as_str() {
            "search_and_geocode_tool" => self.geocode(&request.arguments),
            "matrix_tool" => matrix(&request.arguments),
            "directions_tool" => directions(&request.arguments),
            other => ToolCallResult::error(format!("Unknown tool: {}", other)),
        }
    }

    fn geocode(&self, args: &Value) -> ToolCallResult {
        let Some(query) = args.get("q").and_then(Value::as_str) else {
            return ToolCallResult::error("search_and_geocode_tool requires 'q'");
        };
        let query = query.to_lowercase();

        let features: Vec<Value> = self
            .places
            .iter()
            .filter(|place| {
                let name = place.name.to_lowercase();
                query.contains(&name) || name.contains(&query)
            })
            .map(|place| {
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": [place.longitude, place.latitude]
                    },
                    "properties": {
                        "name": place.name,
                        "full_address": format!("{}, San Francisco, California, United States", place.name)
                    }
                })
            })
            .collect();

        ToolCallResult::json(&json!({
            "type": "FeatureCollection",
            "features": features
        }))
    }
}

/// Parse `[{longitude, latitude}, ...]` into `(lat, lon)` pairs.
fn coordinates(args: &Value) -> Option<Vec<(f64, f64)>> {
    args.get("coordinates")?
        .as_array()?
        .iter()
        .map(|c| {
            let lon = c.get("longitude")?.as_f64()?;
            let lat = c.get("latitude")?.as_f64()?;
            Some((lat, lon))
        })
        .collect()
}

fn haversine_m((lat1, lon1): (f64, f64), (lat2, lon2): (f64, f64)) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// (duration seconds, distance metres) for a drive between two points
fn drive(from: (f64, f64), to: (f64, f64)) -> (f64, f64) {
    let distance = (haversine_m(from, to) * ROAD_FACTOR).round();
    let duration = (distance / DRIVING_SPEED_MPS).round();
    (duration, distance)
}

fn matrix(args: &Value) -> ToolCallResult {
    let Some(points) = coordinates(args).filter(|p| p.len() >= 2) else {
        return ToolCallResult::error("matrix_tool requires at least 2 coordinates");
    };

    let durations: Vec<Vec<f64>> = points
        .iter()
        .map(|&from| points.iter().map(|&to| drive(from, to).0).collect())
        .collect();

    ToolCallResult::json(&json!({ "code": "Ok", "durations": durations }))
}

fn directions(args: &Value) -> ToolCallResult {
    let Some(points) = coordinates(args).filter(|p| p.len() >= 2) else {
        return ToolCallResult::error("directions_tool requires at least 2 coordinates");
    };

    let mut legs = Vec::with_capacity(points.len() - 1);
    let (mut total_duration, mut total_distance) = (0.0, 0.0);

    for pair in points.windows(2) {
        let (duration, distance) = drive(pair[0], pair[1]);
        total_duration += duration;
        total_distance += distance;
        legs.push(json!({
            "duration": duration,
            "distance": distance,
            "steps": [
                { "maneuver": { "instruction": "Head out from the start point" } },
                { "maneuver": { "instruction": "You have arrived at your destination" } }
            ]
        }));
    }

    ToolCallResult::json(&json!({
        "code": "Ok",
        "routes": [{
            "duration": total_duration,
            "distance": total_distance,
            "legs": legs
        }]
    }))
}

#[async_trait]
impl ToolGateway for MockGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(WayfarerError::GatewayStart {
                name: self.name.clone(),
                reason: "mock configured to refuse connections".to_string(),
            });
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdown_count.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        Ok(vec![
            ToolDefinition::new("search_and_geocode_tool")
                .with_description("Search for places and geocode addresses")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": { "q": { "type": "string" } },
                    "required": ["q"]
                })),
            ToolDefinition::new("matrix_tool")
                .with_description("Travel time matrix between coordinates")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": { "coordinates": { "type": "array" }, "profile": { "type": "string" } },
                    "required": ["coordinates"]
                })),
            ToolDefinition::new("directions_tool")
                .with_description("Turn-by-turn directions through coordinates")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": { "coordinates": { "type": "array" }, "routing_profile": { "type": "string" } },
                    "required": ["coordinates"]
                })),
        ])
    }

    async fn call_tool(&self, request: &ToolCallRequest) -> Result<ToolCallResult> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(WayfarerError::GatewayNotConnected {
                name: self.name.clone(),
            });
        }

        self.calls.lock().push(request.clone());

        {
            let mut failures = self.failures.lock();
            if let Some(remaining) = failures.get_mut(&request.name) {
                if *remaining > 0 {
                    *remaining -= 1;
                    debug!(tool = %request.name, remaining = *remaining, "Injected transport failure");
                    return Err(WayfarerError::ToolCall {
                        tool: request.name.clone(),
                        reason: "injected transport failure".to_string(),
                    });
                }
            }
        }

        Ok(self.respond(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stops() -> Value {
        json!({
            "coordinates": [
                { "longitude": -122.478255, "latitude": 37.819929 },
                { "longitude": -122.417743, "latitude": 37.808000 },
                { "longitude": -122.486214, "latitude": 37.769421 }
            ]
        })
    }

    #[tokio::test]
    async fn test_call_requires_connection() {
        let gateway = MockGateway::new();
        let err = gateway
            .call_tool(&ToolCallRequest::new("matrix_tool"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "WF-081");
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_geocode_known_place() {
        let gateway = MockGateway::new().pre_connected();
        let request = ToolCallRequest::new("search_and_geocode_tool")
            .with_arguments(json!({ "q": "Golden Gate Bridge, San Francisco" }));

        let result = gateway.call_tool(&request).await.unwrap();
        assert!(!result.is_error);

        let body = result.first_json().unwrap();
        let coords = &body["features"][0]["geometry"]["coordinates"];
        assert_eq!(coords[0].as_f64(), Some(-122.478255));
        assert_eq!(coords[1].as_f64(), Some(37.819929));
    }

    #[tokio::test]
    async fn test_geocode_unknown_place_has_no_features() {
        let gateway = MockGateway::new().pre_connected();
        let request = ToolCallRequest::new("search_and_geocode_tool")
            .with_arguments(json!({ "q": "Atlantis" }));

        let body = gateway.call_tool(&request).await.unwrap().first_json().unwrap();
        assert_eq!(body["features"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_custom_place_is_geocodable() {
        let gateway = MockGateway::new()
            .with_place("Coit Tower", 37.802395, -122.405822)
            .pre_connected();
        let request = ToolCallRequest::new("search_and_geocode_tool")
            .with_arguments(json!({ "q": "coit tower" }));

        let body = gateway.call_tool(&request).await.unwrap().first_json().unwrap();
        assert_eq!(body["features"][0]["properties"]["name"], "Coit Tower");
    }

    #[tokio::test]
    async fn test_matrix_is_square_with_zero_diagonal() {
        let gateway = MockGateway::new().pre_connected();
        let request = ToolCallRequest::new("matrix_tool").with_arguments(stops());

        let body = gateway.call_tool(&request).await.unwrap().first_json().unwrap();
        let durations = body["durations"].as_array().unwrap();
        assert_eq!(durations.len(), 3);
        for (i, row) in durations.iter().enumerate() {
            assert_eq!(row.as_array().unwrap().len(), 3);
            assert_eq!(row[i].as_f64(), Some(0.0));
        }
        assert!(durations[0][1].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_directions_has_one_leg_per_pair() {
        let gateway = MockGateway::new().pre_connected();
        let request = ToolCallRequest::new("directions_tool").with_arguments(stops());

        let body = gateway.call_tool(&request).await.unwrap().first_json().unwrap();
        let route = &body["routes"][0];
        assert_eq!(route["legs"].as_array().map(Vec::len), Some(2));

        let leg_sum: f64 = route["legs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|leg| leg["duration"].as_f64().unwrap())
            .sum();
        assert_eq!(route["duration"].as_f64(), Some(leg_sum));
    }

    #[tokio::test]
    async fn test_directions_rejects_single_point() {
        let gateway = MockGateway::new().pre_connected();
        let request = ToolCallRequest::new("directions_tool").with_arguments(json!({
            "coordinates": [{ "longitude": -122.4, "latitude": 37.8 }]
        }));

        assert!(gateway.call_tool(&request).await.unwrap().is_error);
    }

    #[tokio::test]
    async fn test_fail_next_then_recovers() {
        let gateway = MockGateway::new().fail_next("matrix_tool", 1).pre_connected();
        let request = ToolCallRequest::new("matrix_tool").with_arguments(stops());

        let first = gateway.call_tool(&request).await.unwrap_err();
        assert!(first.is_recoverable());
        assert!(gateway.call_tool(&request).await.is_ok());
        assert_eq!(gateway.call_count("matrix_tool"), 2);
    }

    #[tokio::test]
    async fn test_tool_error_and_unknown_tool() {
        let gateway = MockGateway::new().tool_error("matrix_tool").pre_connected();

        let result = gateway
            .call_tool(&ToolCallRequest::new("matrix_tool").with_arguments(stops()))
            .await
            .unwrap();
        assert!(result.is_error);

        let unknown = gateway
            .call_tool(&ToolCallRequest::new("weather_tool"))
            .await
            .unwrap();
        assert!(unknown.is_error);
        assert_eq!(unknown.text(), "Unknown tool: weather_tool");
    }

    #[tokio::test]
    async fn test_connect_and_shutdown_are_counted() {
        let gateway = MockGateway::new();
        gateway.connect().await.unwrap();
        assert!(gateway.is_connected().await);
        gateway.shutdown().await.unwrap();
        assert!(!gateway.is_connected().await);
        assert_eq!((gateway.connect_count(), gateway.shutdown_count()), (1, 1));
    }

    #[tokio::test]
    async fn test_list_tools_advertises_three_tools() {
        let names: Vec<String> = MockGateway::new()
            .list_tools()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(
            names,
            vec!["search_and_geocode_tool", "matrix_tool", "directions_tool"]
        );
    }

    #[test]
    fn test_haversine_known_distance() {
        // Golden Gate Bridge to Fisherman's Wharf is roughly 5.5 km
        let d = haversine_m((37.819929, -122.478255), (37.808000, -122.417743));
        assert!((5_000.0..6_000.0).contains(&d), "got {}", d);
    }
}
