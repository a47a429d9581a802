//! Scripted travel behaviours
//!
//! Deterministic stand-ins for a reasoning model: they read the task text,
//! call the gateway tools they are bound to, and render plain-text answers
//! that downstream tasks can parse.
//!
//! - [`GeocodeScript`]: numbered places in the description → coordinates
//! - [`RouteScript`]: coordinates in the context → ordered driving plan

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::agent::{AgentBehavior, AgentRequest, ToolBox};
use crate::error::{Result, WayfarerError};

pub const GEOCODE_TOOL: &str = "search_and_geocode_tool";
pub const MATRIX_TOOL: &str = "matrix_tool";
pub const DIRECTIONS_TOOL: &str = "directions_tool";

const DRIVING_PROFILE: &str = "mapbox/driving";
const METERS_PER_MILE: f64 = 1609.344;

/// Turn-by-turn lines shown per segment
const KEY_STEPS: usize = 3;

const GEOCODE_HEADER: &str = "Geocoded locations (decimal degrees, latitude, longitude):";

/// A named stop with coordinates in decimal degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Stop {
    fn as_coordinate(&self) -> Value {
        json!({ "longitude": self.longitude, "latitude": self.latitude })
    }
}

// ═══════════════════════════════════════════
// Text parsing
// ═══════════════════════════════════════════

/// Items of a numbered list (`1. Golden Gate Bridge`), in order.
pub fn numbered_items(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let (number, rest) = line.trim().split_once('.')?;
            if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let item = rest.trim();
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}

/// Stops rendered as `N. <name>: <lat>, <lon>`, in order.
pub fn parse_stops(text: &str) -> Vec<Stop> {
    numbered_items(text)
        .into_iter()
        .filter_map(|item| {
            let (name, coords) = item.rsplit_once(':')?;
            let (lat, lon) = coords.split_once(',')?;
            Some(Stop {
                name: name.trim().to_string(),
                latitude: lat.trim().parse().ok()?,
                longitude: lon.trim().parse().ok()?,
            })
        })
        .collect()
}

/// `(lat, lon)` of the first feature in a geocoding response.
///
/// Reads GeoJSON `geometry.coordinates` (`[lon, lat]`), falling back to
/// `properties.coordinates` as returned by the search API.
fn first_feature_position(value: &Value) -> Option<(f64, f64)> {
    let feature = value.get("features")?.get(0)?;

    if let Some(coords) = feature
        .pointer("/geometry/coordinates")
        .and_then(Value::as_array)
    {
        if let (Some(lon), Some(lat)) = (
            coords.first().and_then(Value::as_f64),
            coords.get(1).and_then(Value::as_f64),
        ) {
            return Some((lat, lon));
        }
    }

    let props = feature.pointer("/properties/coordinates")?;
    Some((
        props.get("latitude")?.as_f64()?,
        props.get("longitude")?.as_f64()?,
    ))
}

// ═══════════════════════════════════════════
// GeocodeScript
// ═══════════════════════════════════════════

/// Geocodes every numbered place in the task description.
#[derive(Debug, Clone, Default)]
pub struct GeocodeScript;

#[async_trait]
impl AgentBehavior for GeocodeScript {
    fn name(&self) -> &str {
        "geocode_script"
    }

    async fn perform(&self, request: &AgentRequest, tools: &ToolBox<'_>) -> Result<String> {
        let places = numbered_items(&request.description);
        if places.is_empty() {
            return Err(WayfarerError::Behavior {
                role: tools.role().to_string(),
                reason: "no numbered places found in the task description".to_string(),
            });
        }

        let mut lines = vec![GEOCODE_HEADER.to_string()];
        for (index, place) in places.iter().enumerate() {
            let response = tools.call_json(GEOCODE_TOOL, json!({ "q": place })).await?;
            let (lat, lon) =
                first_feature_position(&response).ok_or_else(|| WayfarerError::Behavior {
                    role: tools.role().to_string(),
                    reason: format!("no coordinates found for '{}'", place),
                })?;

            debug!(place = %place, lat, lon, "Geocoded");
            lines.push(format!("{}. {}: {:.6}, {:.6}", index + 1, place, lat, lon));
        }

        Ok(lines.join("\n"))
    }
}

// ═══════════════════════════════════════════
// RouteScript
// ═══════════════════════════════════════════

/// Plans a driving route through the stops found in the context.
///
/// The start stop is the one named after "starting from" in the
/// description (first stop otherwise). Remaining stops are visited in
/// nearest-neighbour order by `matrix_tool` durations, and each leg is
/// priced with `directions_tool`.
#[derive(Debug, Clone, Default)]
pub struct RouteScript;

#[derive(Debug)]
struct Segment {
    from: usize,
    to: usize,
    seconds: f64,
    meters: f64,
    steps: Vec<String>,
}

impl RouteScript {
    fn start_index(description: &str, stops: &[Stop]) -> usize {
        let lower = description.to_lowercase();
        let Some((_, after)) = lower.split_once("starting from") else {
            return 0;
        };
        let after = after.trim_start().trim_start_matches("the ");

        stops
            .iter()
            .position(|stop| {
                let name = stop.name.to_lowercase();
                let key = name.split(" (").next().unwrap_or(&name);
                after.starts_with(key)
            })
            .unwrap_or(0)
    }

    /// Greedy nearest-neighbour tour starting at `start`.
    fn visit_order(durations: &[Vec<f64>], start: usize) -> Vec<usize> {
        let n = durations.len();
        let mut order = vec![start];
        let mut visited = vec![false; n];
        visited[start] = true;

        while order.len() < n {
            let current = order[order.len() - 1];
            let next = (0..n)
                .filter(|&j| !visited[j])
                .min_by(|&a, &b| durations[current][a].total_cmp(&durations[current][b]));
            let Some(next) = next else { break };
            visited[next] = true;
            order.push(next);
        }

        order
    }

    fn parse_durations(value: &Value, n: usize) -> Option<Vec<Vec<f64>>> {
        let rows = value.get("durations")?.as_array()?;
        if rows.len() != n {
            return None;
        }
        rows.iter()
            .map(|row| {
                let row = row.as_array()?;
                if row.len() != n {
                    return None;
                }
                // Unroutable pairs come back as null
                Some(row.iter().map(|d| d.as_f64().unwrap_or(f64::INFINITY)).collect())
            })
            .collect()
    }

    fn parse_leg(value: &Value) -> Option<(f64, f64, Vec<String>)> {
        let route = value.get("routes")?.get(0)?;
        let seconds = route.get("duration")?.as_f64()?;
        let meters = route.get("distance")?.as_f64()?;

        let steps = route
            .get("legs")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|leg| leg.get("steps").and_then(Value::as_array))
            .flatten()
            .filter_map(|step| step.pointer("/maneuver/instruction").and_then(Value::as_str))
            .take(KEY_STEPS)
            .map(str::to_string)
            .collect();

        Some((seconds, meters, steps))
    }

    fn render(stops: &[Stop], order: &[usize], segments: &[Segment]) -> String {
        let mut out = format!(
            "Route plan (driving, starting from {}):\n\nOptimal order:",
            stops[order[0]].name
        );
        for (i, &stop) in order.iter().enumerate() {
            out.push_str(&format!("\n{}. {}", i + 1, stops[stop].name));
        }

        out.push_str("\n\nSegments:");
        for (i, seg) in segments.iter().enumerate() {
            out.push_str(&format!(
                "\n{}. {} -> {}: {:.0} min, {:.1} mi",
                i + 1,
                stops[seg.from].name,
                stops[seg.to].name,
                seg.seconds / 60.0,
                seg.meters / METERS_PER_MILE
            ));
            for step in &seg.steps {
                out.push_str(&format!("\n   - {}", step));
            }
        }

        let total_seconds: f64 = segments.iter().map(|s| s.seconds).sum();
        let total_meters: f64 = segments.iter().map(|s| s.meters).sum();
        out.push_str(&format!(
            "\n\nTotal travel time: {:.0} minutes\nTotal distance: {:.1} miles",
            total_seconds / 60.0,
            total_meters / METERS_PER_MILE
        ));

        out
    }
}

#[async_trait]
impl AgentBehavior for RouteScript {
    fn name(&self) -> &str {
        "route_script"
    }

    async fn perform(&self, request: &AgentRequest, tools: &ToolBox<'_>) -> Result<String> {
        let behavior_error = |reason: String| WayfarerError::Behavior {
            role: tools.role().to_string(),
            reason,
        };

        let stops: Vec<Stop> = request.context.iter().flat_map(|c| parse_stops(c)).collect();
        if stops.len() < 2 {
            return Err(behavior_error(format!(
                "need at least 2 stops with coordinates in the context, found {}",
                stops.len()
            )));
        }

        let coordinates: Vec<Value> = stops.iter().map(Stop::as_coordinate).collect();
        let matrix = tools
            .call_json(
                MATRIX_TOOL,
                json!({ "coordinates": coordinates, "profile": DRIVING_PROFILE }),
            )
            .await?;
        let durations = Self::parse_durations(&matrix, stops.len())
            .ok_or_else(|| behavior_error("matrix_tool returned no usable durations".to_string()))?;

        let start = Self::start_index(&request.description, &stops);
        let order = Self::visit_order(&durations, start);
        debug!(?order, start = %stops[start].name, "Visit order chosen");

        let mut segments = Vec::with_capacity(order.len() - 1);
        for pair in order.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let response = tools
                .call_json(
                    DIRECTIONS_TOOL,
                    json!({
                        "coordinates": [stops[from].as_coordinate(), stops[to].as_coordinate()],
                        "routing_profile": DRIVING_PROFILE
                    }),
                )
                .await?;
            let (seconds, meters, steps) = Self::parse_leg(&response).ok_or_else(|| {
                behavior_error(format!(
                    "directions_tool returned no route from '{}' to '{}'",
                    stops[from].name, stops[to].name
                ))
            })?;

            segments.push(Segment {
                from,
                to,
                seconds,
                meters,
                steps,
            });
        }

        Ok(Self::render(&stops, &order, &segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, AgentRuntime};
    use crate::gateway::MockGateway;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const GEOCODED: &str = "Geocoded locations (decimal degrees, latitude, longitude):\n\
        1. Golden Gate Bridge: 37.819929, -122.478255\n\
        2. Fisherman's Wharf: 37.808000, -122.417743\n\
        3. Golden Gate Park (main entrance): 37.769421, -122.486214";

    #[test]
    fn test_numbered_items() {
        let text = "Find these:\n    1. Golden Gate Bridge\n    2. Fisherman's Wharf\n\n    Thanks.";
        assert_eq!(
            numbered_items(text),
            vec!["Golden Gate Bridge", "Fisherman's Wharf"]
        );
        assert!(numbered_items("v1.2 release\n. nothing").is_empty());
    }

    #[test]
    fn test_parse_stops() {
        let stops = parse_stops(GEOCODED);
        assert_eq!(stops.len(), 3);
        assert_eq!(stops[2].name, "Golden Gate Park (main entrance)");
        assert_eq!(stops[2].latitude, 37.769421);
        assert_eq!(stops[2].longitude, -122.486214);
    }

    #[test]
    fn test_first_feature_position_fallback() {
        let value = json!({
            "features": [{ "properties": { "coordinates": { "latitude": 1.5, "longitude": 2.5 } } }]
        });
        assert_eq!(first_feature_position(&value), Some((1.5, 2.5)));
        assert_eq!(first_feature_position(&json!({ "features": [] })), None);
    }

    #[test]
    fn test_start_index_from_description() {
        let stops = parse_stops(GEOCODED);
        let desc = "plan a route starting from the Fisherman's Wharf area";
        assert_eq!(RouteScript::start_index(desc, &stops), 1);
        assert_eq!(RouteScript::start_index("no hint", &stops), 0);
    }

    #[test]
    fn test_visit_order_is_nearest_neighbour() {
        let durations = vec![
            vec![0.0, 10.0, 1.0],
            vec![10.0, 0.0, 2.0],
            vec![1.0, 2.0, 0.0],
        ];
        assert_eq!(RouteScript::visit_order(&durations, 0), vec![0, 2, 1]);
        assert_eq!(RouteScript::visit_order(&durations, 1), vec![1, 2, 0]);
    }

    #[tokio::test]
    async fn test_geocode_script_with_mock() {
        let agent = Agent::builder("Location Specialist")
            .goal("Geocode")
            .tool(GEOCODE_TOOL)
            .behavior(GeocodeScript)
            .build()
            .unwrap();
        let runtime = AgentRuntime::new(Arc::new(MockGateway::new().pre_connected()));
        let request = AgentRequest::new("Find:\n1. Golden Gate Bridge\n2. Fisherman's Wharf");

        let response = agent.invoke("geocode", &request, &runtime).await.unwrap();
        assert_eq!(
            response.output,
            "Geocoded locations (decimal degrees, latitude, longitude):\n\
             1. Golden Gate Bridge: 37.819929, -122.478255\n\
             2. Fisherman's Wharf: 37.808000, -122.417743"
        );
        assert_eq!(response.tool_calls.len(), 2);
    }

    #[tokio::test]
    async fn test_geocode_script_unknown_place_fails() {
        let agent = Agent::builder("Location Specialist")
            .goal("Geocode")
            .tool(GEOCODE_TOOL)
            .behavior(GeocodeScript)
            .build()
            .unwrap();
        let runtime = AgentRuntime::new(Arc::new(MockGateway::new().pre_connected()));

        let err = agent
            .invoke("geocode", &AgentRequest::new("1. Atlantis"), &runtime)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "WF-042");
    }

    #[tokio::test]
    async fn test_route_script_with_mock() {
        let agent = Agent::builder("Route Planner")
            .goal("Route")
            .tools([MATRIX_TOOL, DIRECTIONS_TOOL])
            .behavior(RouteScript)
            .build()
            .unwrap();
        let runtime = AgentRuntime::new(Arc::new(MockGateway::new().pre_connected()));
        let request = AgentRequest::new("Plan a route starting from the Golden Gate Bridge.")
            .with_context(vec![GEOCODED.to_string()]);

        let response = agent.invoke("plan_route", &request, &runtime).await.unwrap();
        let output = &response.output;

        assert!(output.starts_with("Route plan (driving, starting from Golden Gate Bridge):"));
        assert!(output.contains("Optimal order:\n1. Golden Gate Bridge\n"));
        assert!(output.contains("Total travel time: "));
        assert!(output.contains("Total distance: "));
        // 1 matrix call + one directions call per leg
        assert_eq!(response.tool_calls.len(), 3);
    }

    #[tokio::test]
    async fn test_route_script_needs_two_stops() {
        let agent = Agent::builder("Route Planner")
            .goal("Route")
            .tools([MATRIX_TOOL, DIRECTIONS_TOOL])
            .behavior(RouteScript)
            .build()
            .unwrap();
        let runtime = AgentRuntime::new(Arc::new(MockGateway::new().pre_connected()));

        let err = agent
            .invoke("plan_route", &AgentRequest::new("Plan a route"), &runtime)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "WF-042");
    }
}
