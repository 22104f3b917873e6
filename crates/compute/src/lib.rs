//! # Workshop Compute
//!
//! MCP server wrapping a Rhino.Compute instance: server introspection and
//! Grasshopper definition runs.

mod client;
mod grasshopper;
mod tools;

pub use client::{ComputeClient, API_KEY_HEADER, DEFAULT_COMPUTE_URL};
pub use grasshopper::{decode_output, output_file_path, resolve_path, DataItem, DataTree, SolveRequest, FIRST_BRANCH};
pub use tools::{ComputeQueryTool, ReadDefinitionTool, RunDefinitionTool};

use server::McpServerCore;
use shared::Result;
use std::path::PathBuf;
use std::sync::Arc;

pub const SERVER_NAME: &str = "Simple MCP with Rhino.Compute";
pub const DEFAULT_PORT: u16 = 8001;

#[derive(Debug, Clone)]
pub struct ComputeSettings {
    pub url: String,
    pub api_key: Option<String>,
    /// Where solve results are written
    pub output_dir: PathBuf,
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_COMPUTE_URL.to_string(),
            api_key: None,
            output_dir: PathBuf::from("outputs"),
        }
    }
}

/// Build the Rhino.Compute MCP server
pub fn compute_server(settings: &ComputeSettings) -> Result<McpServerCore> {
    let client = Arc::new(ComputeClient::new(&settings.url, settings.api_key.clone())?);

    let mut core = McpServerCore::new(SERVER_NAME, env!("CARGO_PKG_VERSION"));
    core.register_tool(ComputeQueryTool::version(client.clone()));
    core.register_tool(ComputeQueryTool::rhino_plugins(client.clone()));
    core.register_tool(ComputeQueryTool::grasshopper_plugins(client.clone()));
    core.register_tool(ReadDefinitionTool::new(client.clone()));
    core.register_tool(RunDefinitionTool::new(client, settings.output_dir.clone()));

    Ok(core)
}
