//! Agent - model/tool loop with conversation history

use crate::error::{AgentError, Result};
use crate::message::{Message, Role};
use crate::provider::ModelProvider;
use crate::tools::ToolRegistry;
use tracing::{debug, info};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful personal assistant that specializes in \
architectural design using Rhino and Grasshopper tools.";

pub const DEFAULT_MAX_ITERATIONS: usize = 16;

/// Stands in for a model reply with neither text nor tool calls
pub const EMPTY_REPLY: &str = "(no response)";

pub struct Agent {
    model: Box<dyn ModelProvider>,
    system_prompt: String,
    tools: ToolRegistry,
    messages: Vec<Message>,
    max_iterations: usize,
}

impl Agent {
    pub fn new(model: Box<dyn ModelProvider>, tools: ToolRegistry) -> Self {
        Self {
            model,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            tools,
            messages: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn model(&self) -> &dyn ModelProvider {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> &mut dyn ModelProvider {
        self.model.as_mut()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages appended since `index`, for rendering one turn's activity
    pub fn messages_since(&self, index: usize) -> &[Message] {
        self.messages.get(index..).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Send a prompt and run tools until the model answers in plain text.
    ///
    /// On error the history is rolled back to where it was before the call.
    pub async fn ask(&mut self, prompt: &str) -> Result<String> {
        let start = self.messages.len();
        let result = self.run_turn(start, prompt).await;
        if result.is_err() {
            self.messages.truncate(start);
        }
        result
    }

    async fn run_turn(&mut self, start: usize, prompt: &str) -> Result<String> {
        self.messages.push(Message::user(prompt));
        let specs = self.tools.specs();

        for iteration in 0..self.max_iterations {
            let reply = self.model.converse(&self.system_prompt, &self.messages, &specs).await?;
            debug!(iteration, blocks = reply.content.len(), "model replied");

            if !reply.has_tool_use() {
                let text = reply.text();
                if !text.is_empty() {
                    self.messages.push(reply);
                    return Ok(text);
                }
                // History never holds an empty assistant message
                let text = self.turn_text(start).unwrap_or_else(|| EMPTY_REPLY.to_string());
                self.messages.push(Message::assistant(text.clone()));
                return Ok(text);
            }

            let calls: Vec<(String, String, serde_json::Value)> = reply
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();
            self.messages.push(reply);

            let mut results = Vec::with_capacity(calls.len());
            for (id, name, input) in calls {
                info!(tool = %name, "invoking tool");
                let outcome = self.tools.invoke(&name, input).await;
                debug!(tool = %name, status = %outcome.status, "tool finished");
                results.push(outcome.into_block(id));
            }
            self.messages.push(Message::new(Role::User, results));
        }

        Err(AgentError::MaxIterations(self.max_iterations))
    }

    /// Latest assistant text written since `start`
    fn turn_text(&self, start: usize) -> Option<String> {
        self.messages_since(start)
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .map(Message::text)
            .find(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("model", self.model.config())
            .field("tools", &self.tools)
            .field("messages", &self.messages.len())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}
