// session/mod.rs - Refresh-once HTTP client
//
// fetch_with_session: send; on 401 refresh once; on a successful refresh
// replay once with the rotated cookies. Never more than one refresh and one
// replay per call. Concurrent 401s refresh independently unless the optional
// single-flight gate is enabled.

pub mod single_flight;

use axum::body::Bytes;
use axum::http::{header::COOKIE, HeaderMap, HeaderValue, Method, StatusCode};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::proxy::cookies::{self, CookieSet};
use single_flight::RefreshGate;

/// Network-level failure talking to an upstream
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Request(String),
}

impl TransportError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(timeout)
        } else if err.is_connect() {
            TransportError::Connect(describe(&err))
        } else {
            TransportError::Request(describe(&err))
        }
    }
}

/// reqwest's top-level message hides the useful part ("Connection refused")
/// in the source chain
pub fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = inner.source();
    }
    parts.join(": ")
}

/// Body of an outbound request
pub enum OutboundBody {
    Empty,
    /// Buffered, so the request can be replayed after a refresh
    Buffered(Bytes),
    /// Sent once without buffering; never replayed
    Streaming(reqwest::Body),
}

impl std::fmt::Debug for OutboundBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutboundBody::Empty => f.write_str("Empty"),
            OutboundBody::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            OutboundBody::Streaming(_) => f.write_str("Streaming"),
        }
    }
}

/// A request as the session client sends it
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: OutboundBody,
}

impl OutboundRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: OutboundBody::Empty,
        }
    }

    /// Copy for a replay; streaming bodies cannot be copied
    pub fn try_clone(&self) -> Option<Self> {
        let body = match &self.body {
            OutboundBody::Empty => OutboundBody::Empty,
            OutboundBody::Buffered(bytes) => OutboundBody::Buffered(bytes.clone()),
            OutboundBody::Streaming(_) => return None,
        };
        Some(Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body,
        })
    }

    /// Swap rotated cookies into the `Cookie` header before a replay
    pub fn apply_rotated_cookies(&mut self, rotated: &[HeaderValue]) {
        if rotated.is_empty() {
            return;
        }
        let mut set = CookieSet::from_headers(&self.headers);
        set.apply_set_cookies(rotated);
        set.write_to(&mut self.headers);
    }
}

/// Upstream response plus any cookies a refresh rotated on the way
#[derive(Debug)]
pub struct SessionResponse {
    pub response: reqwest::Response,
    pub rotated_cookies: Vec<HeaderValue>,
}

impl From<reqwest::Response> for SessionResponse {
    fn from(response: reqwest::Response) -> Self {
        Self {
            response,
            rotated_cookies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Where to POST for a refresh; `None` means a 401 is returned as is
    pub refresh_url: Option<Url>,
    pub timeout: Duration,
    pub refresh_timeout: Duration,
    pub single_flight: bool,
}

#[derive(Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    refresh_url: Option<Url>,
    timeout: Duration,
    refresh_timeout: Duration,
    gate: Option<Arc<RefreshGate>>,
}

impl SessionClient {
    pub fn new(http: reqwest::Client, options: SessionOptions) -> Self {
        Self {
            http,
            refresh_url: options.refresh_url,
            timeout: options.timeout,
            refresh_timeout: options.refresh_timeout,
            gate: options.single_flight.then(|| Arc::new(RefreshGate::default())),
        }
    }

    /// Send once, no refresh handling. The timeout covers the whole exchange,
    /// body included.
    pub async fn send(&self, request: OutboundRequest) -> Result<reqwest::Response, TransportError> {
        let timeout = self.timeout;
        self.builder(request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, timeout))
    }

    /// Send once for a streamed transfer.
    ///
    /// No total deadline: the body may take as long as it needs, bounded by
    /// the client's idle read timeout. Downloads still have to produce their
    /// response headers within the proxied timeout. Uploads write the whole
    /// body before headers can arrive, so only the idle limit applies.
    pub async fn send_streaming(&self, request: OutboundRequest) -> Result<reqwest::Response, TransportError> {
        let timeout = self.timeout;
        let uploading = matches!(request.body, OutboundBody::Streaming(_));
        let pending = self.builder(request).send();

        let sent = if uploading {
            pending.await
        } else {
            tokio::time::timeout(timeout, pending)
                .await
                .map_err(|_| TransportError::Timeout(timeout))?
        };
        sent.map_err(|e| TransportError::from_reqwest(e, timeout))
    }

    fn builder(&self, request: OutboundRequest) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers);

        match request.body {
            OutboundBody::Empty => builder,
            OutboundBody::Buffered(bytes) => builder.body(bytes),
            OutboundBody::Streaming(body) => builder.body(body),
        }
    }

    /// Send; on 401 refresh once and replay once.
    ///
    /// A failed refresh returns the original 401 untouched. The replay result
    /// is returned as is, even when it is another 401.
    pub async fn fetch_with_session(
        &self,
        request: OutboundRequest,
    ) -> Result<SessionResponse, TransportError> {
        let replay = request.try_clone();
        let first = self.send(request).await?;
        if first.status() != StatusCode::UNAUTHORIZED {
            return Ok(SessionResponse::from(first));
        }

        let Some(mut replay) = replay else {
            tracing::debug!("401 on a streaming request, not replayable");
            return Ok(SessionResponse::from(first));
        };

        let cookie = replay.headers.get(COOKIE).cloned();
        let Some(rotated) = self.refresh(cookie).await else {
            return Ok(SessionResponse::from(first));
        };

        tracing::debug!("Session refreshed, replaying {} {}", replay.method, replay.url);
        replay.apply_rotated_cookies(&rotated);
        let retried = self.send(replay).await?;

        Ok(SessionResponse {
            response: retried,
            rotated_cookies: rotated,
        })
    }

    /// POST the refresh endpoint with the caller's cookies and no body.
    /// `Some(set-cookies)` on 2xx, `None` on anything else.
    async fn refresh(&self, cookie: Option<HeaderValue>) -> Option<Vec<HeaderValue>> {
        let url = self.refresh_url.clone()?;
        let http = self.http.clone();
        let timeout = self.refresh_timeout;

        match &self.gate {
            Some(gate) => {
                let key = RefreshGate::key_for(cookie.as_ref());
                gate.run(key, move || refresh_call(http, url, cookie, timeout).boxed())
                    .await
            }
            None => refresh_call(http, url, cookie, timeout).await,
        }
    }
}

async fn refresh_call(
    http: reqwest::Client,
    url: Url,
    cookie: Option<HeaderValue>,
    timeout: Duration,
) -> Option<Vec<HeaderValue>> {
    let mut builder = http.post(url.clone()).timeout(timeout);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }

    match builder.send().await {
        Ok(response) if response.status().is_success() => {
            tracing::info!("Session refresh succeeded ({})", response.status());
            Some(cookies::set_cookie_values(response.headers()))
        }
        Ok(response) => {
            tracing::info!("Session refresh rejected by {} ({})", url, response.status());
            None
        }
        Err(e) => {
            tracing::warn!(
                "Session refresh failed: {}",
                TransportError::from_reqwest(e, timeout)
            );
            None
        }
    }
}
