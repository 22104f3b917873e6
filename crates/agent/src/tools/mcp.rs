//! MCP server tools exposed to the agent

use super::{AgentTool, ToolOutcome, ToolSpec};
use crate::message::ToolStatus;
use async_trait::async_trait;
use gateway::HttpRouter;
use serde_json::Value;
use shared::{ContentBlock, ToolInfo};
use std::sync::Arc;

/// One upstream MCP tool, called through the shared router under its prefixed name
pub struct McpToolAdapter {
    router: Arc<HttpRouter>,
    info: ToolInfo,
}

impl McpToolAdapter {
    pub fn new(router: Arc<HttpRouter>, info: ToolInfo) -> Self {
        Self { router, info }
    }

    /// An adapter for every tool the router currently knows
    pub fn all(router: &Arc<HttpRouter>) -> Vec<Self> {
        router
            .get_all_tools()
            .into_iter()
            .map(|info| Self::new(Arc::clone(router), info))
            .collect()
    }

    pub fn info(&self) -> &ToolInfo {
        &self.info
    }
}

#[async_trait]
impl AgentTool for McpToolAdapter {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            self.info.prefixed_name.clone(),
            self.info.tool.description.clone().unwrap_or_default(),
            self.info.tool.input_schema.clone(),
        )
    }

    async fn invoke(&self, input: Value) -> ToolOutcome {
        match self.router.call_tool(&self.info.prefixed_name, input).await {
            Ok(result) => ToolOutcome {
                status: if result.is_error {
                    ToolStatus::Error
                } else {
                    ToolStatus::Success
                },
                content: result.content.iter().map(ContentBlock::render).collect(),
            },
            Err(e) => ToolOutcome::error(e.to_string()),
        }
    }
}
