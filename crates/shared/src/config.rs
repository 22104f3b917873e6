//! Client configuration for MCP servers

use crate::{McpError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Default endpoint of the example weather server
pub const DEFAULT_WEATHER_URL: &str = "http://localhost:8000/mcp";

/// Remote MCP server reachable over streamable HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerEndpoint {
    /// Endpoint URL, e.g. `http://localhost:8000/mcp`
    pub url: String,

    /// Extra request headers (auth tokens and the like)
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl McpServerEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
        }
    }
}

/// Desktop configuration format (`mcp.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// MCP server configurations, ordered by name
    pub mcp_servers: BTreeMap<String, McpServerEndpoint>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut mcp_servers = BTreeMap::new();
        mcp_servers.insert("weather".to_string(), McpServerEndpoint::new(DEFAULT_WEATHER_URL));
        Self { mcp_servers }
    }
}

impl ClientConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Every server URL must be http(s) and names must not contain the tool prefix separator
    pub fn validate(&self) -> Result<()> {
        for (name, endpoint) in &self.mcp_servers {
            if name.trim().is_empty() {
                return Err(McpError::Config("server name cannot be empty".to_string()));
            }
            if name.contains(crate::tool::PREFIX_SEPARATOR) {
                return Err(McpError::Config(format!(
                    "server name '{}' must not contain '{}'",
                    name,
                    crate::tool::PREFIX_SEPARATOR
                )));
            }
            if !endpoint.url.starts_with("http://") && !endpoint.url.starts_with("https://") {
                return Err(McpError::Config(format!(
                    "server '{}' url must start with http:// or https://",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Get server names
    pub fn server_names(&self) -> Vec<&str> {
        self.mcp_servers.keys().map(|s| s.as_str()).collect()
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_parse() {
        let json = r#"{
            "mcpServers": {
                "weather": { "url": "http://localhost:8000/mcp" },
                "compute": {
                    "url": "http://localhost:8001/mcp",
                    "headers": { "Authorization": "Bearer abc" }
                }
            }
        }"#;

        let config = ClientConfig::from_json(json).unwrap();
        assert_eq!(config.server_names(), vec!["compute", "weather"]);
        assert_eq!(
            config.mcp_servers["compute"].headers.get("Authorization"),
            Some(&"Bearer abc".to_string())
        );
    }

    #[test]
    fn test_default_points_at_weather_server() {
        let config = ClientConfig::default();
        assert_eq!(config.mcp_servers["weather"].url, DEFAULT_WEATHER_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let json = r#"{"mcpServers": {"local": {"url": "stdio://server.py"}}}"#;
        let err = ClientConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_rejects_separator_in_name() {
        let json = r#"{"mcpServers": {"my__server": {"url": "http://x/mcp"}}}"#;
        assert!(matches!(ClientConfig::from_json(json), Err(McpError::Config(_))));
    }

    #[test]
    fn test_from_file_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let config = ClientConfig::default();
        write!(file, "{}", config.to_pretty_json().unwrap()).unwrap();

        let loaded = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_missing_file_is_io_error() {
        let err = ClientConfig::from_file(std::path::Path::new("/nonexistent/mcp.json")).unwrap_err();
        assert!(matches!(err, McpError::Io(_)));
    }
}
