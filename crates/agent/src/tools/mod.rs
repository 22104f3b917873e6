//! Agent tools: the trait, the registry, built-ins and the MCP adapter

mod builtin;
mod calculator;
mod mcp;

pub use builtin::{CurrentTimeTool, HttpRequestTool, MAX_BODY_CHARS};
pub use calculator::{evaluate, CalcError, CalculatorTool};
pub use mcp::McpToolAdapter;

use crate::message::{Block, ToolStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// What the model is told about a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Result of running a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub status: ToolStatus,
    pub content: Vec<String>,
}

impl ToolOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            content: vec![text.into()],
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            content: vec![text.into()],
        }
    }

    pub fn into_block(self, tool_use_id: impl Into<String>) -> Block {
        Block::ToolResult {
            tool_use_id: tool_use_id.into(),
            status: self.status,
            content: self.content,
        }
    }
}

#[async_trait]
pub trait AgentTool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    /// Failures are reported through the outcome, never as `Err`
    async fn invoke(&self, input: Value) -> ToolOutcome;
}

/// Tools by name; registering a name twice keeps the last one
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn AgentTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `current_time`, `calculator` and `http_request`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(CurrentTimeTool);
        registry.register(CalculatorTool);
        registry.register(HttpRequestTool::default());
        registry
    }

    pub fn register(&mut self, tool: impl AgentTool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn AgentTool>) {
        let name = tool.spec().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!(tool = %name, "tool replaced");
        }
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|k| k.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn invoke(&self, name: &str, input: Value) -> ToolOutcome {
        match self.tools.get(name) {
            Some(tool) => tool.invoke(input).await,
            None => {
                warn!(tool = %name, "model requested an unknown tool");
                ToolOutcome::error(format!("Unknown tool: {}", name))
            }
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}
