#![allow(dead_code)]

use std::sync::Once;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use propdesk_api::config::AppConfig;
use propdesk_api::{app, AppState};

static TRACING: Once = Once::new();

pub const PASSWORD: &str = "correct-horse-battery";

/// Router served in-process on a free port with in-memory backends
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Token and ids from a register or login response
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub organization_id: String,
}

impl Session {
    fn from_response(body: &Value) -> Result<Self> {
        let data = &body["data"];
        Ok(Self {
            token: data["token"].as_str().context("missing token")?.to_string(),
            user_id: data["user"]["id"].as_str().context("missing user id")?.to_string(),
            organization_id: data["organization"]["id"].as_str().context("missing organization id")?.to_string(),
        })
    }
}

/// Server logs go to the test harness; set RUST_LOG to see them
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub async fn spawn_server() -> Result<TestServer> {
    init_tracing();
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    let state = AppState::in_memory(AppConfig::development());
    let router = app(state.clone());

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            eprintln!("test server stopped: {}", e);
        }
    });

    let server = TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        state,
        handle,
    };
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

impl TestServer {
    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut request = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = if text.is_empty() { Value::Null } else { serde_json::from_str(&text)? };
        Ok((status, body))
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::DELETE, path, Some(token), None).await
    }

    pub async fn register(&self, organization: &str, email: &str) -> Result<Session> {
        let body = json!({
            "organization_name": organization,
            "name": "Owner",
            "email": email,
            "password": PASSWORD,
        });
        let (status, body) = self.call(Method::POST, "/auth/register", None, Some(body)).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);
        Session::from_response(&body)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let body = json!({ "email": email, "password": password });
        let (status, body) = self.call(Method::POST, "/auth/login", None, Some(body)).await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
        Session::from_response(&body)
    }

    /// Creates a user in the caller's organization and logs in as them
    pub async fn add_member(&self, owner: &Session, email: &str, role: &str, tenant_id: Option<&str>) -> Result<Session> {
        let body = json!({
            "name": email,
            "email": email,
            "password": PASSWORD,
            "role": role,
            "tenant_id": tenant_id,
        });
        let (status, body) = self.post("/api/users", &owner.token, body).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "user create failed: {} {}", status, body);
        self.login(email, PASSWORD).await
    }

    /// POSTs a record and returns its id
    pub async fn create(&self, session: &Session, collection: &str, body: Value) -> Result<String> {
        let (status, body) = self.post(&format!("/api/data/{}", collection), &session.token, body).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create {} failed: {} {}", collection, status, body);
        Ok(body["data"]["id"].as_str().context("missing id")?.to_string())
    }

    /// building -> floor -> suite, returning the suite id
    pub async fn seed_suite(&self, session: &Session, building: &str, suite_number: &str) -> Result<String> {
        let building_id = self.create(session, "buildings", json!({ "name": building })).await?;
        let floor_id = self
            .create(session, "floors", json!({ "building_id": building_id, "floor_number": 1 }))
            .await?;
        self.create(session, "suites", json!({ "floor_id": floor_id, "suite_number": suite_number }))
            .await
    }
}
