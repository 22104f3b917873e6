//! Interactive chat REPL

use agent::{Agent, Block, Message};
use console::style;
use dialoguer::Input;
use gateway::HttpRouter;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

pub const TITLE: &str = "Agents and MCP servers";
pub const PROMPT: &str = "Ask your agent...";

/// Chat loop over an agent and the MCP servers it draws tools from
pub struct InteractiveCli {
    agent: Agent,
    router: Arc<HttpRouter>,
}

impl InteractiveCli {
    pub fn new(agent: Agent, router: Arc<HttpRouter>) -> Self {
        Self { agent, router }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// `Provider - model`, as shown under the title
    pub fn current_model(&self) -> String {
        let config = self.agent.model().config();
        format!("{} - {}", config.provider, config.model_id)
    }

    /// Run the interactive REPL
    pub async fn run(&mut self) -> anyhow::Result<()> {
        println!("{}", style(TITLE).bold().underlined());
        println!("Current model: {}", self.current_model());
        println!("Type /help for commands, /quit to exit");
        println!();

        loop {
            let input = match read_line().await? {
                Some(line) => line,
                None => break,
            };
            let input = input.trim();

            if input.is_empty() {
                continue;
            }

            if input.starts_with('/') {
                match self.handle_command(input) {
                    Ok(true) => break,
                    Ok(false) => continue,
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                }
            }

            self.ask(input).await;
        }

        Ok(())
    }

    async fn ask(&mut self, prompt: &str) {
        let start = self.agent.messages().len();

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
        spinner.set_message("Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = self.agent.ask(prompt).await;
        spinner.finish_and_clear();

        match result {
            Ok(answer) => {
                println!("{}", answer);
                let details = render_turn(self.agent.messages_since(start));
                if !details.is_empty() {
                    println!();
                    println!("{}", style("Details").dim());
                    for line in details {
                        println!("{}", line);
                    }
                }
                println!();
            }
            Err(e) => println!("{} {}", style("Error:").red(), e),
        }
    }

    /// Returns true when the REPL should exit
    pub fn handle_command(&mut self, input: &str) -> anyhow::Result<bool> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");

        match cmd {
            "/quit" | "/exit" | "/q" => {
                println!("Goodbye!");
                return Ok(true);
            }
            "/help" | "/h" => {
                println!("Commands:");
                println!("  /tools        - List tools available to the agent");
                println!("  /model [id]   - Show or change the model");
                println!("  /status       - Show MCP server connections");
                println!("  /clear        - Forget the conversation");
                println!("  /quit         - Exit");
            }
            "/tools" => {
                for spec in self.agent.tools().specs() {
                    println!("  {}  {}", style(&spec.name).cyan(), spec.description);
                }
            }
            "/model" => {
                if let Some(model_id) = parts.get(1) {
                    self.agent.model_mut().set_model_id(model_id.to_string());
                    println!("Model set to: {}", self.current_model());
                } else {
                    println!("Current model: {}", self.current_model());
                }
            }
            "/status" => {
                println!("Model: {}", self.current_model());
                println!("Messages: {}", self.agent.messages().len());
                for name in self.router.server_names() {
                    let Some(server) = self.router.server(name) else { continue };
                    let state = if server.connected { "connected" } else { "disconnected" };
                    println!("  {} ({}) {} - {} tool(s)", name, server.config.url, state, server.tools.len());
                }
            }
            "/clear" => {
                self.agent.clear();
                println!("Conversation cleared");
            }
            _ => {
                println!("Unknown command: {}", cmd);
            }
        }

        Ok(false)
    }
}

/// Read one line off the terminal; `None` on EOF or a closed terminal
async fn read_line() -> anyhow::Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| {
        Input::<String>::new()
            .with_prompt(PROMPT)
            .allow_empty(true)
            .interact_text()
    })
    .await?;

    match line {
        Ok(line) => Ok(Some(line)),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Tool activity of one turn: each call with its input, then each result
pub fn render_turn(messages: &[Message]) -> Vec<String> {
    let mut lines = Vec::new();

    for message in messages {
        for block in &message.content {
            match block {
                Block::ToolUse { name, input, .. } => {
                    lines.push(format!("Using tool: {}", name));
                    lines.push(serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string()));
                }
                Block::ToolResult { status, content, .. } => {
                    lines.push(format!("Tool Result: {}", status));
                    lines.extend(content.iter().cloned());
                }
                Block::Text(_) => {}
            }
        }
    }

    lines
}
