//! # Workshop Server
//!
//! MCP server core: tool/resource/prompt registries, JSON-RPC dispatch and
//! the streamable HTTP transport.

mod http;
mod mcp_server_core;
mod registry;
mod session;

pub use http::{router, serve, serve_on, ServeOptions, SESSION_HEADER};
pub use mcp_server_core::McpServerCore;
pub use registry::{parse_arguments, required_argument, PromptHandler, StaticResource, ToolHandler};
pub use session::{Session, SessionStore, DEFAULT_IDLE_TIMEOUT};
