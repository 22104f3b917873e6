//! workshop serve command

use clap::{Args, Subcommand};
use server::{serve, ServeOptions};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Args)]
pub struct ServeCommand {
    #[command(subcommand)]
    pub server: ServeTarget,
}

#[derive(Debug, Args)]
pub struct Listen {
    /// Address to bind (0.0.0.0 accepts external connections, 127.0.0.1 only local)
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Endpoint path
    #[arg(long, default_value = "/mcp")]
    pub path: String,
}

#[derive(Debug, Subcommand)]
pub enum ServeTarget {
    /// US weather lookups via the National Weather Service
    Weather {
        #[command(flatten)]
        listen: Listen,

        #[arg(long, default_value_t = weather::DEFAULT_PORT)]
        port: u16,

        /// NWS API base URL
        #[arg(long, env = "NWS_API_BASE", default_value = weather::NWS_API_BASE)]
        nws_base_url: String,
    },
    /// Rhino.Compute and Grasshopper tools
    Compute {
        #[command(flatten)]
        listen: Listen,

        #[arg(long, default_value_t = compute::DEFAULT_PORT)]
        port: u16,

        /// Rhino.Compute base URL
        #[arg(long, env = "RHINO_COMPUTE_URL", default_value = compute::DEFAULT_COMPUTE_URL)]
        compute_url: String,

        /// Value for the RhinoComputeKey header
        #[arg(long, env = "RHINO_COMPUTE_KEY", hide_env_values = true)]
        compute_key: Option<String>,

        /// Directory for Grasshopper solve results
        #[arg(long, default_value = "outputs")]
        output_dir: PathBuf,
    },
}

impl ServeCommand {
    pub async fn run(&self) -> anyhow::Result<()> {
        let (core, options) = match &self.server {
            ServeTarget::Weather {
                listen,
                port,
                nws_base_url,
            } => {
                let settings = weather::WeatherSettings {
                    base_url: nws_base_url.clone(),
                };
                (weather::weather_server(&settings)?, listen.options(*port))
            }
            ServeTarget::Compute {
                listen,
                port,
                compute_url,
                compute_key,
                output_dir,
            } => {
                info!(url = %compute_url, "using Rhino.Compute");
                let settings = compute::ComputeSettings {
                    url: compute_url.clone(),
                    api_key: compute_key.clone(),
                    output_dir: output_dir.clone(),
                };
                (compute::compute_server(&settings)?, listen.options(*port))
            }
        };

        serve(core, options).await?;
        Ok(())
    }
}

impl Listen {
    fn options(&self, port: u16) -> ServeOptions {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        ServeOptions {
            host: self.host.clone(),
            port,
            path,
        }
    }
}
