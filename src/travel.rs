//! San Francisco day-trip plan
//!
//! Two agents, two tasks:
//!
//! ```text
//! geocode (Location Specialist: search_and_geocode_tool)
//!    │ output = "N. place: lat, lon" list
//!    ▼
//! plan_route (Route Planner: matrix_tool, directions_tool)
//! ```

use std::sync::Arc;

use tracing::info;

use crate::agent::scripts::{DIRECTIONS_TOOL, GEOCODE_TOOL, MATRIX_TOOL};
use crate::agent::{Agent, GeocodeScript, RouteScript};
use crate::config::WayfarerConfig;
use crate::error::Result;
use crate::gateway::{GatewaySession, MockGateway, StdioGateway, ToolGateway};
use crate::pipeline::{Pipeline, PipelineResult};
use crate::task::Task;

pub const GEOCODE_TASK: &str = "geocode";
pub const ROUTE_TASK: &str = "plan_route";

/// Places visited, in the order they are listed to the Location Specialist
pub const ATTRACTIONS: [&str; 4] = [
    "Golden Gate Bridge",
    "Fisherman's Wharf",
    "Alcatraz Island Ferry Terminal",
    "Golden Gate Park (main entrance)",
];

/// Which gateway a trip runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatewayMode {
    /// Spawn the configured MCP server
    #[default]
    Stdio,
    /// In-process canned responses; no process, no credential
    Offline,
}

pub fn location_specialist(verbose: bool) -> Result<Arc<Agent>> {
    Agent::builder("Location Specialist")
        .goal("Accurately geocode addresses and identify geographic coordinates for any location")
        .backstory(
            "You are an expert in geography and location services.
            You can find the precise coordinates for any address, landmark, or place name.
            You always verify locations and provide accurate latitude/longitude data in decimal degrees format.
            Use the search_and_geocode_tool to convert addresses to coordinates.",
        )
        .tool(GEOCODE_TOOL)
        .verbose(verbose)
        .behavior(GeocodeScript)
        .build()
}

pub fn route_planner(verbose: bool) -> Result<Arc<Agent>> {
    Agent::builder("Route Planner")
        .goal("Calculate efficient routes and provide accurate travel time estimates")
        .backstory(
            "You are a route optimization specialist.
            You calculate the best routes between locations, considering travel time,
            distance, and transportation mode. You provide clear directions and realistic time estimates.
            You convert times from seconds to minutes and distances from meters to miles or kilometers.
            Use directions_tool and matrix_tool to calculate routes.",
        )
        .tools([DIRECTIONS_TOOL, MATRIX_TOOL])
        .verbose(verbose)
        .behavior(RouteScript)
        .build()
}

fn geocode_description() -> String {
    let list: Vec<String> = ATTRACTIONS
        .iter()
        .enumerate()
        .map(|(i, place)| format!("{}. {}", i + 1, place))
        .collect();

    format!(
        "Find the geographic coordinates for these San Francisco attractions:\n{}\n\n\
         Provide the latitude and longitude for each location in decimal degrees format.",
        list.join("\n")
    )
}

const ROUTE_DESCRIPTION: &str = "Using the coordinates from the previous task, plan an efficient \
driving route that visits all four locations starting from the Golden Gate Bridge.

Provide:
1. The optimal order to visit locations
2. Total travel time (in minutes)
3. Total distance (in miles)
4. Key turn-by-turn directions for each segment

Consider that this is a day trip, so minimize total driving time.";

/// The two-task travel pipeline.
pub fn travel_pipeline(verbose: bool) -> Result<Pipeline> {
    let location_agent = location_specialist(verbose)?;
    let route_agent = route_planner(verbose)?;

    let geocode = Task::builder(GEOCODE_TASK)
        .description(geocode_description())
        .expected_output(
            "A list of locations with their precise coordinates (latitude and longitude)",
        )
        .agent(&location_agent)
        .build()?;

    let plan_route = Task::builder(ROUTE_TASK)
        .description(ROUTE_DESCRIPTION)
        .expected_output(
            "A complete route plan with ordered stops, travel times, distances, and directions",
        )
        .agent(&route_agent)
        .context(GEOCODE_TASK)
        .build()?;

    Pipeline::builder()
        .agent(&location_agent)
        .agent(&route_agent)
        .task(geocode)
        .task(plan_route)
        .verbose(verbose)
        .build()
}

/// Construct the gateway for `mode`. Credentials are checked here, before
/// any process is spawned.
pub fn build_gateway(config: &WayfarerConfig, mode: GatewayMode) -> Result<Arc<dyn ToolGateway>> {
    match mode {
        GatewayMode::Stdio => Ok(Arc::new(StdioGateway::new(config.gateway.clone())?)),
        GatewayMode::Offline => Ok(Arc::new(MockGateway::new().with_name("offline"))),
    }
}

/// Build the pipeline, acquire a gateway, and run the plan.
///
/// The gateway is shut down before this returns, whatever the outcome.
pub async fn plan_trip(
    config: &WayfarerConfig,
    mode: GatewayMode,
    verbose: bool,
) -> Result<PipelineResult> {
    let pipeline = travel_pipeline(verbose)?;
    let gateway = build_gateway(config, mode)?;
    let policy = config.retry.call_policy();

    info!(gateway = gateway.name(), ?mode, "Planning trip");

    GatewaySession::scoped(gateway, |gateway| async move {
        pipeline.kickoff_with(gateway, policy).await
    })
    .await
}
