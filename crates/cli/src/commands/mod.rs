//! CLI Commands

pub mod chat;
pub mod init;
pub mod serve;
pub mod tools;

pub use chat::ChatCommand;
pub use init::InitCommand;
pub use serve::ServeCommand;
pub use tools::ToolsCommand;

use anyhow::Context;
use shared::ClientConfig;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "mcp.json";

/// Explicit file, else `./mcp.json`, else the built-in weather server
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ClientConfig> {
    let path: Option<PathBuf> = match path {
        Some(p) => Some(p.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    match path {
        Some(p) => ClientConfig::from_file(&p).with_context(|| format!("failed to load {}", p.display())),
        None => Ok(ClientConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_explicit_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"mcpServers": {{"compute": {{"url": "http://localhost:8001/mcp"}}}}}}"#).unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.server_names(), vec!["compute"]);
    }

    #[test]
    fn test_load_missing_explicit_config_fails() {
        let err = load_config(Some(Path::new("/no/such/mcp.json"))).unwrap_err();
        assert!(err.to_string().contains("/no/such/mcp.json"));
    }
}
