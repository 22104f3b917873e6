//! workshop tools command

use super::load_config;
use clap::Args;
use console::style;
use gateway::HttpRouter;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ToolsCommand {
    /// MCP client configuration (defaults to ./mcp.json)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Print the full tool list as JSON
    #[arg(long)]
    pub json: bool,
}

impl ToolsCommand {
    pub async fn run(&self) -> anyhow::Result<()> {
        let config = load_config(self.config.as_deref())?;
        let mut router = HttpRouter::from_config(&config);
        let failures = router.connect_all().await;

        let tools = router.get_all_tools();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&tools)?);
        } else {
            for (name, err) in &failures {
                println!("{} {}: {}", style("✗").red(), name, err);
            }
            for info in &tools {
                println!(
                    "{}  {}",
                    style(&info.prefixed_name).cyan(),
                    info.tool.description.as_deref().unwrap_or("")
                );
            }
            println!("{} tool(s) from {} server(s)", tools.len(), config.mcp_servers.len().saturating_sub(failures.len()));
        }

        router.close_sessions().await;
        Ok(())
    }
}
