use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER: &str = "http://localhost:3000";

/// Server URL and the token issued by the last login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub server: String,
    pub token: Option<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
    pub saved_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            token: None,
            email: None,
            organization: None,
            saved_at: None,
        }
    }
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn login(&mut self, token: String, email: String, organization: Option<String>) {
        self.token = Some(token);
        self.email = Some(email);
        self.organization = organization;
        self.saved_at = Some(Utc::now());
    }

    pub fn logout(&mut self) {
        self.token = None;
        self.email = None;
        self.organization = None;
        self.saved_at = Some(Utc::now());
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("PROPDESK_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("propdesk").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_session() -> anyhow::Result<Session> {
    let session_file = get_config_dir()?.join("session.json");

    if !session_file.exists() {
        return Ok(Session::default());
    }

    let content = fs::read_to_string(session_file)?;
    let session: Session = serde_json::from_str(&content)?;
    Ok(session)
}

pub fn save_session(session: &Session) -> anyhow::Result<()> {
    let session_file = get_config_dir()?.join("session.json");

    let content = serde_json::to_string_pretty(session)?;
    fs::write(session_file, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logout_clears_credentials_but_keeps_server() {
        let mut session = Session {
            server: "http://example.test:8080".to_string(),
            ..Session::default()
        };
        session.login("token".to_string(), "a@b.test".to_string(), Some("Acme".to_string()));
        assert!(session.is_logged_in());

        session.logout();
        assert!(!session.is_logged_in());
        assert_eq!(session.server, "http://example.test:8080");
        assert!(session.email.is_none());
    }

    #[test]
    fn sessions_without_optional_fields_deserialize() {
        let session: Session = serde_json::from_str(r#"{"server":"http://h:1","token":null,"email":null,"organization":null,"saved_at":null}"#).unwrap();
        assert_eq!(session.server, "http://h:1");
        assert!(!session.is_logged_in());
    }
}
