//! workshop init command

use clap::Args;
use shared::ClientConfig;
use std::path::{Path, PathBuf};

const ENV_EXAMPLE: &str = "\
# Copy to .env and fill in the keys for the providers you use
OPENAI_API_KEY=
GOOGLE_API_KEY=
# OLLAMA_HOST=http://localhost:11434
# RHINO_COMPUTE_URL=http://localhost:6500/
# RHINO_COMPUTE_KEY=
";

#[derive(Debug, Args)]
pub struct InitCommand {
    /// Directory to initialize
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Only write mcp.json
    #[arg(long)]
    pub minimal: bool,
}

impl InitCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        println!("Initializing workshop in {:?}", self.directory);
        std::fs::create_dir_all(&self.directory)?;

        let config = ClientConfig::default().to_pretty_json()?;
        write_if_absent(&self.directory.join(super::DEFAULT_CONFIG_FILE), &config)?;

        if !self.minimal {
            write_if_absent(&self.directory.join(".env.example"), ENV_EXAMPLE)?;
        }

        println!("✓ Workshop initialized");
        Ok(())
    }
}

/// Returns false when the file already exists
fn write_if_absent(path: &Path, content: &str) -> anyhow::Result<bool> {
    if path.exists() {
        println!("  skipped {} (exists)", path.display());
        return Ok(false);
    }
    std::fs::write(path, content)?;
    println!("  wrote {}", path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = InitCommand {
            directory: dir.path().to_path_buf(),
            minimal: false,
        };

        cmd.run().unwrap();

        let config = ClientConfig::from_file(&dir.path().join("mcp.json")).unwrap();
        assert_eq!(config, ClientConfig::default());
        let env = std::fs::read_to_string(dir.path().join(".env.example")).unwrap();
        assert!(env.contains("OPENAI_API_KEY="));
        assert!(env.contains("GOOGLE_API_KEY="));
    }

    #[test]
    fn test_minimal_skips_env_example() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = InitCommand {
            directory: dir.path().join("nested"),
            minimal: true,
        };

        cmd.run().unwrap();

        assert!(dir.path().join("nested/mcp.json").exists());
        assert!(!dir.path().join("nested/.env.example").exists());
    }

    #[test]
    fn test_existing_config_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcp.json");
        std::fs::write(&path, "{\"mcpServers\": {}}").unwrap();

        assert!(!write_if_absent(&path, "replaced").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"mcpServers\": {}}");
    }
}
