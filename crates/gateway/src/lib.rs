//! # Workshop Gateway
//!
//! Client side of MCP over streamable HTTP: a per-server client and a
//! router aggregating the tools of several servers.

mod client;
mod http_router;

pub use client::{parse_response, McpHttpClient};
pub use http_router::{HttpRouter, ServerConnection};
