//! HttpRouter - routes tool calls across several MCP servers

use crate::client::McpHttpClient;
use serde_json::Value;
use shared::{CallToolResult, ClientConfig, McpError, McpServerEndpoint, Result, Tool, ToolInfo};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Connection to an upstream MCP server
#[derive(Debug)]
pub struct ServerConnection {
    pub name: String,
    pub config: McpServerEndpoint,
    client: Option<McpHttpClient>,
    pub tools: Vec<Tool>,
    pub connected: bool,
}

impl ServerConnection {
    /// Create a new server connection (not yet connected)
    pub fn new(name: impl Into<String>, config: McpServerEndpoint) -> Self {
        Self {
            name: name.into(),
            config,
            client: None,
            tools: Vec::new(),
            connected: false,
        }
    }

    /// Live client, if connected
    pub fn client(&self) -> Option<&McpHttpClient> {
        self.client.as_ref()
    }
}

/// HttpRouter manages connections to multiple upstream MCP servers
#[derive(Debug, Default)]
pub struct HttpRouter {
    servers: BTreeMap<String, ServerConnection>,
}

impl HttpRouter {
    /// Create a new HttpRouter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a router with every server of a client config
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut router = Self::new();
        for (name, endpoint) in &config.mcp_servers {
            router.add_server(name.clone(), endpoint.clone());
        }
        router
    }

    /// Add a server configuration, replacing any server with the same name
    pub fn add_server(&mut self, name: impl Into<String>, config: McpServerEndpoint) {
        let name = name.into();
        self.servers.insert(name.clone(), ServerConnection::new(name, config));
    }

    /// Connect to a server and discover its tools
    pub async fn connect_server(&mut self, name: &str) -> Result<()> {
        let server = self
            .servers
            .get_mut(name)
            .ok_or_else(|| McpError::Config(format!("Server '{}' not configured", name)))?;

        if server.connected {
            return Ok(());
        }

        let client = McpHttpClient::new(server.config.clone())?;
        client.connect().await?;
        let tools = client.list_tools().await?;

        info!(server = %name, tools = tools.len(), "MCP server ready");
        server.tools = tools;
        server.client = Some(client);
        server.connected = true;
        Ok(())
    }

    /// Connect every configured server; failures are logged and returned
    pub async fn connect_all(&mut self) -> Vec<(String, McpError)> {
        let mut failures = Vec::new();
        let names: Vec<String> = self.servers.keys().cloned().collect();

        for name in names {
            if let Err(e) = self.connect_server(&name).await {
                warn!(server = %name, error = %e, "could not connect to MCP server");
                failures.push((name, e));
            }
        }

        failures
    }

    /// Disconnect a server
    pub async fn disconnect_server(&mut self, name: &str) -> Result<()> {
        if let Some(server) = self.servers.get_mut(name) {
            if let Some(client) = server.client.take() {
                if let Err(e) = client.close().await {
                    warn!(server = %name, error = %e, "failed to close session");
                }
            }
            server.tools.clear();
            server.connected = false;
        }
        Ok(())
    }

    /// Disconnect all servers
    pub async fn disconnect_all(&mut self) {
        let names: Vec<String> = self.servers.keys().cloned().collect();
        for name in names {
            let _ = self.disconnect_server(&name).await;
        }
    }

    /// End every open session without dropping the connections' state
    pub async fn close_sessions(&self) {
        for (name, server) in &self.servers {
            if let Some(client) = &server.client {
                if let Err(e) = client.close().await {
                    warn!(server = %name, error = %e, "failed to close session");
                }
            }
        }
    }

    /// Get all tool infos from all connected servers
    pub fn get_all_tools(&self) -> Vec<ToolInfo> {
        let mut tools = Vec::new();

        for (server_name, server) in &self.servers {
            if server.connected {
                for tool in &server.tools {
                    tools.push(ToolInfo::new(tool.clone(), server_name.clone()));
                }
            }
        }

        tools
    }

    /// Tools of one server
    pub fn tools_for(&self, name: &str) -> Option<&[Tool]> {
        self.servers.get(name).map(|s| s.tools.as_slice())
    }

    /// Call a tool by its prefixed name (server__tool)
    pub async fn call_tool(&self, prefixed_name: &str, arguments: Value) -> Result<CallToolResult> {
        let (server_name, tool_name) = ToolInfo::parse_prefixed_name(prefixed_name)
            .ok_or_else(|| McpError::ToolNotFound(prefixed_name.to_string()))?;

        let server = self
            .servers
            .get(server_name)
            .ok_or_else(|| McpError::Config(format!("Server '{}' not configured", server_name)))?;

        let client = server
            .client
            .as_ref()
            .filter(|_| server.connected)
            .ok_or_else(|| McpError::Transport(format!("Server '{}' is not connected", server_name)))?;

        client.call_tool(tool_name, arguments).await
    }

    /// Check if a server is connected
    pub fn is_connected(&self, name: &str) -> bool {
        self.servers.get(name).map(|s| s.connected).unwrap_or(false)
    }

    /// Get server names
    pub fn server_names(&self) -> Vec<&str> {
        self.servers.keys().map(|s| s.as_str()).collect()
    }

    /// Get a server connection
    pub fn server(&self, name: &str) -> Option<&ServerConnection> {
        self.servers.get(name)
    }
}
