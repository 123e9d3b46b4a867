#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use console_bff::config::{AppConfig, ServiceUrls};
use console_bff::proxy::mock::{MockCatalog, MockSwitch};
use console_bff::state::AppState;

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // No backend URLs at all: every proxied route either falls back to
        // its mock or reports the missing variable
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_console-bff"));
        cmd.env_clear()
            .env("BFF_PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("MOCK_MODE", "false")
            .env("RUST_LOG", "console_bff=warn")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Development defaults with exactly the given base URLs
pub fn config_with(services: &[(&str, &str)]) -> AppConfig {
    let mut config = AppConfig::development();
    config.services = ServiceUrls::from_pairs(services.iter().copied());
    config
}

pub fn state_with(config: AppConfig, mock_mode: bool) -> AppState {
    AppState::with_switch(config, MockCatalog::builtin(), MockSwitch::fixed(mock_mode))
        .expect("state builds")
}

/// In-process router; mock mode pinned so the environment cannot leak in
pub fn app_with(services: &[(&str, &str)], mock_mode: bool) -> Router {
    console_bff::app(state_with(config_with(services), mock_mode))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all("set-cookie")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body reads");
    TestResponse { status, headers, body }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A signed session token; the gateway only decodes it, so any key works
pub fn make_token(sub: &str, company_id: Option<&str>, expires_in: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let mut claims = json!({
        "sub": sub,
        "iat": now,
        "exp": now + expires_in,
    });
    if let Some(company) = company_id {
        claims["company_id"] = json!(company);
    }
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).expect("token encodes")
}
