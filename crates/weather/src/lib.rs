//! # Workshop Weather
//!
//! MCP server exposing US National Weather Service lookups.

mod nws;
mod reference;
mod tools;

pub use nws::{NwsClient, NWS_API_BASE, NWS_USER_AGENT};
pub use reference::{api_coverage, unit_conversions, ReportType, WeatherByLocation, CONVERSIONS_URI, COVERAGE_URI};
pub use tools::{format_observation, format_periods, Coordinates, CurrentWeatherTool, ForecastTool};

use server::McpServerCore;
use shared::Result;
use std::sync::Arc;

pub const SERVER_NAME: &str = "Simple MCP Server-US Weather Service";
pub const DEFAULT_PORT: u16 = 8000;

/// Settings for the weather server
#[derive(Debug, Clone)]
pub struct WeatherSettings {
    /// NWS API base URL
    pub base_url: String,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            base_url: NWS_API_BASE.to_string(),
        }
    }
}

/// Build the weather MCP server
pub fn weather_server(settings: &WeatherSettings) -> Result<McpServerCore> {
    let nws = Arc::new(NwsClient::new(&settings.base_url)?);

    let mut core = McpServerCore::new(SERVER_NAME, env!("CARGO_PKG_VERSION")).with_instructions(
        "Weather lookups for US coordinates via the National Weather Service. \
         Convert place names to latitude/longitude before calling the tools.",
    );
    core.register_tool(ForecastTool::new(nws.clone()));
    core.register_tool(CurrentWeatherTool::new(nws));
    core.register_resource(unit_conversions());
    core.register_resource(api_coverage());
    core.register_prompt(WeatherByLocation);

    Ok(core)
}
