//! Workshop CLI library: subcommands and the chat REPL

pub mod commands;
pub mod interactive;
