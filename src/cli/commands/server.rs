use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::{load_session, save_session};
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Health check the configured server")]
    Ping {
        #[arg(help = "Server URL to use and remember (defaults to the saved one)")]
        url: Option<String>,
    },

    #[command(about = "Show API information from the root endpoint")]
    Info,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Ping { url } => {
            let mut session = load_session()?;
            if let Some(url) = url {
                url::Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid server URL '{}': {}", url, e))?;
                session.server = url.trim_end_matches('/').to_string();
                save_session(&session)?;
            }

            let client = ApiClient::new(&session)?;
            match client.get("/health").await {
                Ok(health) => output_success(
                    &output_format,
                    &format!("{} is up", session.server),
                    Some(json!({ "server": session.server, "health": health })),
                ),
                Err(e) => anyhow::bail!("{} is unreachable or unhealthy: {}", session.server, e),
            }
        }
        ServerCommands::Info => {
            let session = load_session()?;
            let info = ApiClient::new(&session)?.get("/").await?;
            output_value(&output_format, &info)
        }
    }
}
