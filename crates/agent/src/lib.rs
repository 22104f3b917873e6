//! # Workshop Agent
//!
//! Conversation loop between a language model and a set of tools: built-ins
//! plus every tool discovered on the connected MCP servers.

mod agent;
mod error;
mod message;
pub mod provider;
pub mod tools;

pub use agent::{Agent, DEFAULT_MAX_ITERATIONS, DEFAULT_SYSTEM_PROMPT, EMPTY_REPLY};
pub use error::{AgentError, Result};
pub use message::{tool_names_by_id, Block, Message, Role, ToolStatus};
pub use provider::{provider_from_env, ModelConfig, ModelProvider, ProviderKind};
pub use tools::{AgentTool, McpToolAdapter, ToolOutcome, ToolRegistry, ToolSpec};
