//! workshop chat command

use super::load_config;
use crate::interactive::InteractiveCli;
use agent::{provider_from_env, Agent, McpToolAdapter, ProviderKind, ToolRegistry, DEFAULT_MAX_ITERATIONS};
use clap::Parser;
use console::style;
use gateway::HttpRouter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Parser)]
pub struct ChatCommand {
    /// Model provider: openai, gemini or ollama
    #[arg(long, short, env = "WORKSHOP_PROVIDER", default_value = "openai")]
    pub provider: ProviderKind,

    /// Model id (provider default when omitted)
    #[arg(long, short)]
    pub model: Option<String>,

    /// MCP client configuration (defaults to ./mcp.json, then the local weather server)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Replace the default system prompt
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Upper bound on model/tool round trips per question
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,
}

impl ChatCommand {
    pub async fn run(&self) -> anyhow::Result<()> {
        let config = load_config(self.config.as_deref())?;

        let mut router = HttpRouter::from_config(&config);
        for (name, err) in router.connect_all().await {
            warn!(server = %name, error = %err, "MCP server unavailable");
            println!("{} {}: {}", style("MCP server unavailable").yellow(), name, err);
        }
        print_servers(&router);
        let router = Arc::new(router);

        let mut tools = ToolRegistry::with_builtins();
        for adapter in McpToolAdapter::all(&router) {
            tools.register(adapter);
        }

        let model = provider_from_env(self.provider, self.model.clone())?;
        let mut agent = Agent::new(model, tools).with_max_iterations(self.max_iterations);
        if let Some(prompt) = &self.system_prompt {
            agent = agent.with_system_prompt(prompt.clone());
        }

        let result = InteractiveCli::new(agent, router.clone()).run().await;
        router.close_sessions().await;
        result
    }
}

fn print_servers(router: &HttpRouter) {
    for (i, name) in router.server_names().into_iter().enumerate() {
        let Some(server) = router.server(name) else { continue };
        if !server.connected {
            continue;
        }
        println!("{} ({})", style(format!("MCP Server {}", i + 1)).bold(), server.config.url);
        for tool in &server.tools {
            println!("  Tool: {}", tool.name);
        }
    }
}
