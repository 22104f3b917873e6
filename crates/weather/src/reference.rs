//! Reference resources and the location prompt

use serde_json::json;
use server::{required_argument, PromptHandler, StaticResource};
use shared::{GetPromptResult, Prompt, PromptArgument, PromptMessage, Resource, Result};
use std::collections::HashMap;

pub const CONVERSIONS_URI: &str = "weather://reference/conversions";
pub const COVERAGE_URI: &str = "weather://reference/coverage";

pub fn unit_conversions() -> StaticResource {
    StaticResource::new(
        Resource::new(CONVERSIONS_URI, "unit_conversions")
            .with_description("Unit conversion formulas for weather data")
            .with_mime_type("application/json"),
        json!({
            "temperature": {
                "nws_unit": "celsius",
                "display_units": ["celsius", "fahrenheit"],
                "formulas": {
                    "c_to_f": "(°C × 9/5) + 32",
                    "f_to_c": "(°F - 32) × 5/9"
                }
            },
            "wind": {
                "nws_unit": "meters_per_second",
                "display_units": ["ms", "mph", "kmh"],
                "formulas": {
                    "ms_to_mph": "m/s × 2.237",
                    "ms_to_kmh": "m/s × 3.6"
                }
            }
        }),
    )
}

pub fn api_coverage() -> StaticResource {
    StaticResource::new(
        Resource::new(COVERAGE_URI, "api_coverage")
            .with_description("NWS API coverage information")
            .with_mime_type("application/json"),
        json!({
            "geographic_coverage": "United States only",
            "territories_included": ["Puerto Rico", "US Virgin Islands", "Guam"],
            "coordinate_system": "WGS84 (latitude/longitude)",
            "data_sources": "National Weather Service observation stations"
        }),
    )
}

/// Which tools the prompt asks the model to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Current,
    Forecast,
    Both,
}

impl ReportType {
    /// Unknown values select neither tool
    fn parse(value: &str) -> Option<Self> {
        match value {
            "current" => Some(ReportType::Current),
            "forecast" => Some(ReportType::Forecast),
            "both" => Some(ReportType::Both),
            _ => None,
        }
    }
}

/// `weather-by-location`: place name to coordinates to weather
pub struct WeatherByLocation;

impl WeatherByLocation {
    pub fn text(location: &str, report_type: Option<ReportType>) -> String {
        let current = matches!(report_type, Some(ReportType::Current | ReportType::Both));
        let forecast = matches!(report_type, Some(ReportType::Forecast | ReportType::Both));

        let current_line = if current {
            "- Use get_current_weather(latitude, longitude) for current conditions"
        } else {
            ""
        };
        let forecast_line = if forecast {
            "- Use get_forecast(latitude, longitude) for the forecast"
        } else {
            ""
        };

        format!(
            "I need weather information for {location}.

Since the weather tools require latitude and longitude coordinates, please:

1. First determine the coordinates for {location}
   - Look up the latitude and longitude for this location
   - For cities, use the city center coordinates
   - For addresses, convert to precise coordinates

2. Then get the weather data:
   {current_line}
   {forecast_line}

3. Present the results clearly:
   - Show the location name and coordinates used
   - Display weather information in user-friendly format
   - Convert units to local preferences (Fahrenheit for US locations)

Example coordinates for reference:
- New York City: 40.7128, -74.0060
- Los Angeles: 34.0522, -118.2437
- Chicago: 41.8781, -87.6298"
        )
    }
}

impl PromptHandler for WeatherByLocation {
    fn definition(&self) -> Prompt {
        Prompt::new("weather-by-location")
            .with_description("Get weather for a location by converting it to coordinates first")
            .with_argument(PromptArgument::required("location", "City, address or place name"))
            .with_argument(PromptArgument::optional(
                "report_type",
                "current, forecast or both (default: current)",
            ))
    }

    fn render(&self, arguments: &HashMap<String, String>) -> Result<GetPromptResult> {
        let location = required_argument(arguments, "location")?;
        let report_type = arguments.get("report_type").map(String::as_str).unwrap_or("current");

        Ok(GetPromptResult {
            description: Some(format!("Weather for {}", location)),
            messages: vec![PromptMessage::user(Self::text(location, ReportType::parse(report_type)))],
        })
    }
}
