//! National Weather Service API client

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use shared::{McpError, Result};
use std::time::Duration;
use tracing::{debug, warn};

pub const NWS_API_BASE: &str = "https://api.weather.gov";
pub const NWS_USER_AGENT: &str = "weather-app/1.0";
const NWS_ACCEPT: &str = "application/geo+json";
const NWS_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin GeoJSON client; every failure collapses to `None`
#[derive(Debug, Clone)]
pub struct NwsClient {
    http: reqwest::Client,
    base_url: String,
}

impl NwsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(NWS_TIMEOUT)
            .build()
            .map_err(|e| McpError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn points_url(&self, latitude: f64, longitude: f64) -> String {
        format!("{}/points/{},{}", self.base_url, latitude, longitude)
    }

    pub fn latest_observation_url(&self, station_id: &str) -> String {
        format!("{}/stations/{}/observations/latest", self.base_url, station_id)
    }

    /// GET a GeoJSON document. Non-200 answers and transport errors are `None`.
    pub async fn get_json(&self, url: &str) -> Option<Value> {
        debug!(url = %url, "NWS request");

        let response = match self
            .http
            .get(url)
            .header(USER_AGENT, NWS_USER_AGENT)
            .header(ACCEPT, NWS_ACCEPT)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(url = %url, error = %e, "NWS request failed");
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            warn!(url = %url, status = %response.status(), "NWS returned non-200");
            return None;
        }

        match response.json::<Value>().await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(url = %url, error = %e, "NWS body was not JSON");
                None
            }
        }
    }
}
