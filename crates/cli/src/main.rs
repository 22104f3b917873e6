//! Workshop CLI - MCP servers and an agent chat in the terminal
//!
//! Usage:
//!   workshop                        - Start the chat (same as `workshop chat`)
//!   workshop serve weather          - Run the weather MCP server on :8000/mcp
//!   workshop serve compute          - Run the Rhino.Compute MCP server on :8001/mcp
//!   workshop chat --provider gemini - Chat with an agent using the configured MCP servers
//!   workshop tools                  - List tools of every configured MCP server
//!   workshop init [dir]             - Write mcp.json and .env.example

use clap::{Parser, Subcommand};
use cli::commands::{ChatCommand, InitCommand, ServeCommand, ToolsCommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "workshop")]
#[command(about = "MCP workshop - tool servers and an LLM agent that uses them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an MCP server over streamable HTTP
    Serve(ServeCommand),
    /// Chat with an agent that can call MCP tools
    Chat(ChatCommand),
    /// List the tools of the configured MCP servers
    Tools(ToolsCommand),
    /// Write a starter mcp.json and .env.example
    Init(InitCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keys such as OPENAI_API_KEY and GOOGLE_API_KEY live in .env
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve(cmd)) => cmd.run().await,
        Some(Commands::Chat(cmd)) => cmd.run().await,
        Some(Commands::Tools(cmd)) => cmd.run().await,
        Some(Commands::Init(cmd)) => cmd.run(),
        None => ChatCommand::parse_from(["chat"]).run().await,
    }
}
