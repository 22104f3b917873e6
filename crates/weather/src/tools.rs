//! Forecast and current-conditions tools

use crate::nws::NwsClient;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use server::{parse_arguments, ToolHandler};
use shared::{CallToolResult, Result, Tool};
use std::sync::Arc;

const FORECAST_PERIODS: usize = 10;
const MISSING: &str = "N/A";

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

fn coordinates_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "latitude": {
                "type": "number",
                "description": "Latitude of the US location (e.g. 40.7128 for NYC)"
            },
            "longitude": {
                "type": "number",
                "description": "Longitude of the US location (e.g. -74.0060 for NYC)"
            }
        },
        "required": ["latitude", "longitude"]
    })
}

pub struct ForecastTool {
    nws: Arc<NwsClient>,
}

impl ForecastTool {
    pub fn new(nws: Arc<NwsClient>) -> Self {
        Self { nws }
    }

    pub async fn forecast(&self, at: Coordinates) -> String {
        let Some(points) = self.nws.get_json(&self.nws.points_url(at.latitude, at.longitude)).await else {
            return "Unable to fetch forecast data for this location.".to_string();
        };

        let forecast = match points["properties"]["forecast"].as_str() {
            Some(url) => self.nws.get_json(url).await,
            None => None,
        };
        let Some(forecast) = forecast else {
            return "Unable to fetch detailed forecast.".to_string();
        };

        format_periods(&forecast)
    }
}

#[async_trait]
impl ToolHandler for ForecastTool {
    fn definition(&self) -> Tool {
        Tool::new("get_forecast")
            .with_description(
                "Get weather forecast for a US location. Only supports US coordinates. \
                 This tool only works for coordinates within the United States as it uses \
                 the National Weather Service API.",
            )
            .with_schema(coordinates_schema())
    }

    async fn call(&self, arguments: Value) -> Result<CallToolResult> {
        let at: Coordinates = parse_arguments(arguments)?;
        Ok(CallToolResult::text(self.forecast(at).await))
    }
}

pub struct CurrentWeatherTool {
    nws: Arc<NwsClient>,
}

impl CurrentWeatherTool {
    pub fn new(nws: Arc<NwsClient>) -> Self {
        Self { nws }
    }

    pub async fn current(&self, at: Coordinates) -> String {
        let Some(points) = self.nws.get_json(&self.nws.points_url(at.latitude, at.longitude)).await else {
            return "Unable to fetch weather data for this location.".to_string();
        };

        let stations = match points["properties"]["observationStations"].as_str() {
            Some(url) => self.nws.get_json(url).await,
            None => None,
        };
        let station_id = stations.as_ref().and_then(|s| {
            s["features"]
                .as_array()
                .and_then(|features| features.first())
                .and_then(|f| f["properties"]["stationIdentifier"].as_str())
        });
        let Some(station_id) = station_id else {
            return "Unable to find nearby weather stations.".to_string();
        };

        let Some(observation) = self.nws.get_json(&self.nws.latest_observation_url(station_id)).await else {
            return "Unable to fetch current observations.".to_string();
        };

        format_observation(&observation["properties"])
    }
}

#[async_trait]
impl ToolHandler for CurrentWeatherTool {
    fn definition(&self) -> Tool {
        Tool::new("get_current_weather")
            .with_description(
                "Get current weather conditions for a US location. Only supports US coordinates. \
                 This tool only works for coordinates within the United States as it uses \
                 the National Weather Service API.",
            )
            .with_schema(coordinates_schema())
    }

    async fn call(&self, arguments: Value) -> Result<CallToolResult> {
        let at: Coordinates = parse_arguments(arguments)?;
        Ok(CallToolResult::text(self.current(at).await))
    }
}

/// Render the first forecast periods, separated by `---`
pub fn format_periods(forecast: &Value) -> String {
    let periods = forecast["properties"]["periods"].as_array().map(Vec::as_slice).unwrap_or(&[]);

    periods
        .iter()
        .take(FORECAST_PERIODS)
        .map(|p| {
            format!(
                "\n{}:\nTemperature: {}°{}\nWind: {} {}\nForecast: {}\n",
                plain(&p["name"]),
                plain(&p["temperature"]),
                plain(&p["temperatureUnit"]),
                plain(&p["windSpeed"]),
                plain(&p["windDirection"]),
                plain(&p["detailedForecast"]),
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Render a latest-observation `properties` object
pub fn format_observation(props: &Value) -> String {
    let description = props
        .get("textDescription")
        .filter(|v| !v.is_null())
        .map(plain)
        .unwrap_or_else(|| "No description available".to_string());

    let temperature = match props["temperature"]["value"].as_f64() {
        Some(c) => format!("{:.1}°C ({:.1}°F)", c, c * 9.0 / 5.0 + 32.0),
        None => MISSING.to_string(),
    };

    format!(
        "Current Weather Conditions:\nDescription: {}\nTemperature: {}\nHumidity: {}%\nWind Speed: {} m/s\nWind Direction: {}°",
        description,
        temperature,
        plain(&props["relativeHumidity"]["value"]),
        plain(&props["windSpeed"]["value"]),
        plain(&props["windDirection"]["value"]),
    )
}

/// Strings without quotes, null as N/A
fn plain(value: &Value) -> String {
    match value {
        Value::Null => MISSING.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
