use axum::http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::cli::config::SessionFile;
use crate::proxy::cookies;
use crate::session::{OutboundBody, OutboundRequest, SessionClient, SessionOptions, SessionResponse};

/// Paths that must not trigger a refresh on 401
const NO_REFRESH: &[&str] = &["/api/auth/login", "/api/auth/refresh"];

/// Gateway response as the CLI sees it
#[derive(Debug)]
pub struct CliResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// HTTP client for the gateway carrying the persisted cookie jar.
///
/// Calls go through the same refresh-once client the gateway uses towards its
/// backends, refreshing against the gateway's own `/api/auth/refresh`.
pub struct BffClient {
    base: Url,
    sessions: SessionClient,
    session: SessionFile,
}

impl BffClient {
    pub fn new(base_url: &str, mut session: SessionFile) -> anyhow::Result<Self> {
        let base = Url::parse(base_url).map_err(|e| anyhow::anyhow!("invalid server URL '{}': {}", base_url, e))?;
        let http = reqwest::Client::builder().build()?;

        let sessions = SessionClient::new(
            http,
            SessionOptions {
                refresh_url: Some(base.join("/api/auth/refresh")?),
                timeout: Duration::from_secs(30),
                refresh_timeout: Duration::from_secs(10),
                single_flight: false,
            },
        );

        session.server = Some(base_url.to_string());
        Ok(Self { base, sessions, session })
    }

    pub fn session(&self) -> &SessionFile {
        &self.session
    }

    pub fn into_session(self) -> SessionFile {
        self.session
    }

    pub async fn request(&mut self, method: Method, path: &str, body: Option<Value>) -> anyhow::Result<CliResponse> {
        let url = self.base.join(path)?;
        let mut outbound = OutboundRequest::new(method, url);
        self.session.cookies.write_to(&mut outbound.headers);

        if let Some(body) = body {
            outbound
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            outbound.body = OutboundBody::Buffered(serde_json::to_vec(&body)?.into());
        }

        let SessionResponse {
            response,
            rotated_cookies,
        } = if NO_REFRESH.contains(&path) {
            let response = self.sessions.send(outbound).await?;
            SessionResponse {
                response,
                rotated_cookies: Vec::new(),
            }
        } else {
            self.sessions.fetch_with_session(outbound).await?
        };

        // Refresh rotation first, then whatever the final response set
        self.session.cookies.apply_set_cookies(&rotated_cookies);
        self.session
            .cookies
            .apply_set_cookies(&cookies::set_cookie_values(response.headers()));
        self.session.touch();

        let status = response.status();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok(CliResponse { status, body })
    }
}
