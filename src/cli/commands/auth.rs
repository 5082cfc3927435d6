use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::config::{load_session, save_session, Session};
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Register a new organization with you as its owner")]
    Register {
        #[arg(help = "Organization name")]
        organization: String,
        #[arg(help = "Your name")]
        name: String,
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Login to the server")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Revoke the current token and forget it")]
    Logout,

    #[command(about = "Show current user and organization")]
    Whoami,
}

/// Saves the token from a register/login response
fn remember(session: &mut Session, response: &Value, email: String) -> anyhow::Result<Option<String>> {
    let token = response
        .get("token")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("Server response did not include a token"))?;
    let organization = response
        .pointer("/organization/name")
        .and_then(Value::as_str)
        .map(str::to_string);

    session.login(token.to_string(), email, organization.clone());
    save_session(session)?;
    Ok(organization)
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut session = load_session()?;

    match cmd {
        AuthCommands::Register { organization, name, email, password } => {
            let password = resolve_password(password)?;
            let body = json!({
                "organization_name": organization,
                "name": name,
                "email": email,
                "password": password,
            });
            let response = ApiClient::new(&session)?.post("/auth/register", &body).await?;
            remember(&mut session, &response, email.clone())?;

            output_success(
                &output_format,
                &format!("Registered organization '{}' as {}", organization, email),
                Some(json!({ "user": response.get("user"), "organization": response.get("organization") })),
            )
        }
        AuthCommands::Login { email, password } => {
            let password = resolve_password(password)?;
            let body = json!({ "email": email, "password": password });
            let response = ApiClient::new(&session)?.post("/auth/login", &body).await?;
            let organization = remember(&mut session, &response, email.clone())?;

            output_success(
                &output_format,
                &format!("Logged in as {} ({})", email, organization.as_deref().unwrap_or("unknown organization")),
                Some(json!({ "expires_in": response.get("expires_in") })),
            )
        }
        AuthCommands::Logout => {
            if !session.is_logged_in() {
                return output_success(&output_format, "Already logged out", None);
            }
            // A token the server already rejects is still forgotten locally
            if let Err(e) = ApiClient::authenticated(&session)?.post("/api/auth/logout", &json!({})).await {
                tracing::warn!("Server-side logout failed: {}", e);
            }
            session.logout();
            save_session(&session)?;
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Whoami => {
            let me = ApiClient::authenticated(&session)?.get("/api/auth/me").await?;
            match output_format {
                OutputFormat::Json => output_value(&output_format, &me),
                OutputFormat::Text => {
                    let field = |pointer: &str| me.pointer(pointer).and_then(Value::as_str).unwrap_or("-").to_string();
                    println!("User: {} <{}>", field("/user/name"), field("/user/email"));
                    println!("Role: {}", field("/user/role"));
                    println!("Organization: {} ({} plan)", field("/organization/name"), field("/organization/plan"));
                    println!("Server: {}", session.server);
                    Ok(())
                }
            }
        }
    }
}
