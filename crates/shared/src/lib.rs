//! # Workshop Shared
//!
//! Model Context Protocol types, errors and configuration used by the
//! server, client and agent crates.

pub mod config;
pub mod error;
pub mod jsonrpc;
pub mod lifecycle;
pub mod prompt;
pub mod resource;
pub mod tool;

// Re-exports
pub use config::*;
pub use error::*;
pub use jsonrpc::*;
pub use lifecycle::*;
pub use prompt::*;
pub use resource::*;
pub use tool::*;
