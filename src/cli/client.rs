use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::cli::config::Session;

/// Thin wrapper over reqwest that unwraps the API's `{success, data}` envelope
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(session: &Session) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: session.server.trim_end_matches('/').to_string(),
            token: session.token.clone(),
        })
    }

    /// Same as `new` but fails early when there is no saved login
    pub fn authenticated(session: &Session) -> anyhow::Result<Self> {
        if !session.is_logged_in() {
            anyhow::bail!("Not logged in. Run `propdesk auth login <email>` first");
        }
        Self::new(session)
    }

    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> anyhow::Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %url, "Sending request");

        let mut request = self.http.request(method, &url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let payload: Value = response.json().await?;
        if !status.is_success() {
            let message = payload.get("message").and_then(Value::as_str).unwrap_or("request failed");
            let code = payload.get("code").and_then(Value::as_str).unwrap_or("UNKNOWN");
            anyhow::bail!("{} ({}, HTTP {})", message, code, status.as_u16());
        }

        Ok(payload.get("data").cloned().unwrap_or(payload))
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Value> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> anyhow::Result<Value> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> anyhow::Result<Value> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> anyhow::Result<Value> {
        self.request(Method::DELETE, path, None).await
    }
}
