//! McpServerCore - JSON-RPC dispatch for an MCP server

use crate::registry::{PromptHandler, StaticResource, ToolHandler};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    negotiate_version, CallToolParams, CallToolResult, GetPromptParams, Implementation, InitializeParams,
    InitializeResult, JsonRpcRequest, JsonRpcResponse, ListChanged, ListPromptsResult, ListResourcesResult,
    ListToolsResult, McpError, ReadResourceParams, ReadResourceResult, ResourcesCapability, Result,
    ServerCapabilities,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// McpServerCore - holds the registries and answers protocol requests
pub struct McpServerCore {
    /// Server name and version reported on initialize
    info: Implementation,
    /// Optional usage instructions for clients
    instructions: Option<String>,
    /// Registered tools, in registration order
    tools: Vec<Arc<dyn ToolHandler>>,
    /// Registered resources, in registration order
    resources: Vec<StaticResource>,
    /// Registered prompts, in registration order
    prompts: Vec<Arc<dyn PromptHandler>>,
}

impl McpServerCore {
    /// Create a new McpServerCore
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: Implementation::new(name, version),
            instructions: None,
            tools: Vec::new(),
            resources: Vec::new(),
            prompts: Vec::new(),
        }
    }

    /// Builder: set instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register_tool(&mut self, tool: impl ToolHandler + 'static) {
        let name = tool.definition().name;
        self.tools.retain(|t| t.definition().name != name);
        self.tools.push(Arc::new(tool));
    }

    /// Register a resource, replacing any resource with the same URI
    pub fn register_resource(&mut self, resource: StaticResource) {
        self.resources.retain(|r| r.resource.uri != resource.resource.uri);
        self.resources.push(resource);
    }

    /// Register a prompt, replacing any prompt with the same name
    pub fn register_prompt(&mut self, prompt: impl PromptHandler + 'static) {
        let name = prompt.definition().name;
        self.prompts.retain(|p| p.definition().name != name);
        self.prompts.push(Arc::new(prompt));
    }

    /// Server name and version
    pub fn info(&self) -> &Implementation {
        &self.info
    }

    /// Capabilities derived from what is registered
    pub fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: (!self.tools.is_empty()).then(ListChanged::default),
            resources: (!self.resources.is_empty()).then(ResourcesCapability::default),
            prompts: (!self.prompts.is_empty()).then(ListChanged::default),
        }
    }

    /// Names of registered tools
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.definition().name).collect()
    }

    /// Handle one request. Notifications produce no response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            debug!(method = %request.method, "notification received");
            return None;
        };

        let params = request.params.unwrap_or(Value::Null);
        match self.dispatch(&request.method, params).await {
            Ok(result) => Some(JsonRpcResponse::success(id, result)),
            Err(err) => {
                warn!(method = %request.method, error = %err, "request failed");
                Some(JsonRpcResponse::failure(Some(id), err.to_rpc_error()))
            }
        }
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            "initialize" => self.initialize(params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => to_value(ListToolsResult {
                tools: self.tools.iter().map(|t| t.definition()).collect(),
                next_cursor: None,
            }),
            "tools/call" => self.call_tool(params).await,
            "resources/list" => to_value(ListResourcesResult {
                resources: self.resources.iter().map(|r| r.resource.clone()).collect(),
                next_cursor: None,
            }),
            "resources/read" => self.read_resource(params),
            "prompts/list" => to_value(ListPromptsResult {
                prompts: self.prompts.iter().map(|p| p.definition()).collect(),
                next_cursor: None,
            }),
            "prompts/get" => self.get_prompt(params),
            other => Err(McpError::Protocol {
                code: shared::error_codes::METHOD_NOT_FOUND,
                message: format!("Method not found: {}", other),
            }),
        }
    }

    fn initialize(&self, params: Value) -> Result<Value> {
        let params: InitializeParams = parse_params(params)?;
        info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            requested = %params.protocol_version,
            "client initializing"
        );

        to_value(InitializeResult {
            protocol_version: negotiate_version(&params.protocol_version).to_string(),
            capabilities: self.capabilities(),
            server_info: self.info.clone(),
            instructions: self.instructions.clone(),
        })
    }

    async fn call_tool(&self, params: Value) -> Result<Value> {
        let params: CallToolParams = parse_params(params)?;
        let tool = self
            .tools
            .iter()
            .find(|t| t.definition().name == params.name)
            .ok_or_else(|| McpError::ToolNotFound(params.name.clone()))?;

        info!(tool = %params.name, "calling tool");
        let result = match tool.call(params.arguments.unwrap_or(Value::Null)).await {
            Ok(result) => result,
            Err(err @ McpError::InvalidParams(_)) => return Err(err),
            Err(err) => {
                warn!(tool = %params.name, error = %err, "tool failed");
                CallToolResult::error(err.to_string())
            }
        };
        to_value(result)
    }

    fn read_resource(&self, params: Value) -> Result<Value> {
        let params: ReadResourceParams = parse_params(params)?;
        let resource = self
            .resources
            .iter()
            .find(|r| r.resource.uri == params.uri)
            .ok_or_else(|| McpError::ResourceNotFound(params.uri.clone()))?;

        to_value(ReadResourceResult {
            contents: vec![resource.contents()],
        })
    }

    fn get_prompt(&self, params: Value) -> Result<Value> {
        let params: GetPromptParams = parse_params(params)?;
        let prompt = self
            .prompts
            .iter()
            .find(|p| p.definition().name == params.name)
            .ok_or_else(|| McpError::PromptNotFound(params.name.clone()))?;

        to_value(prompt.render(&params.arguments)?)
    }
}

impl std::fmt::Debug for McpServerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServerCore")
            .field("info", &self.info)
            .field("tools", &self.tool_names())
            .field("resources", &self.resources.len())
            .field("prompts", &self.prompts.len())
            .finish()
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
