// proxy/mod.rs - Forward-or-mock dispatcher shared by every proxied route
//
// Decision order for each request:
//   1. mock mode on, or base URL unset with a mock available -> mock verbatim
//   2. base URL unset, no mock                               -> 500 naming the variable
//   3. otherwise forward to base + path and reshape the reply
// Network failures become 503 {error, details}.

pub mod cookies;
pub mod headers;
pub mod mock;
pub mod response;

use axum::{
    extract::Request,
    http::Method,
    response::{IntoResponse, Response},
};
use std::borrow::Cow;
use std::collections::HashMap;
use url::Url;

use crate::error::ApiError;
use crate::middleware::Identity;
use crate::session::{OutboundBody, OutboundRequest, SessionResponse};
use crate::state::AppState;
use crate::types::{basic_io_variant_key, Service};
use mock::MockEntry;
use response::UpstreamReply;

/// Template placeholder filled with the caller's user id
pub const SESSION_USER: &str = "session_user";
/// Template placeholder filled with the caller's company id
pub const SESSION_COMPANY: &str = "session_company";

/// Which configured base URL a route forwards to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceRef {
    Fixed(Service),
    /// `BASIC_IO_<NAME>_SERVICE_URL`, NAME taken from the given path parameter
    BasicIoBackend { param: &'static str },
}

impl ServiceRef {
    /// Resolve to the configuration key for this request
    pub fn env_key(&self, params: &HashMap<String, String>) -> Result<String, ApiError> {
        match self {
            ServiceRef::Fixed(service) => Ok(service.env_key().to_string()),
            ServiceRef::BasicIoBackend { param } => {
                let name = params
                    .get(*param)
                    .ok_or_else(|| ApiError::bad_request(format!("missing path parameter '{}'", param)))?;
                basic_io_variant_key(name)
                    .ok_or_else(|| ApiError::bad_request(format!("invalid basic-io backend '{}'", name)))
            }
        }
    }
}

/// How the body travels and whether a 401 triggers the session refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMode {
    /// Buffered body, refresh-and-replay on 401
    Session,
    /// Buffered body, 401 relayed as is (login, refresh itself)
    Direct,
    /// Unbuffered in both directions, no replay (uploads, downloads)
    Streaming,
}

/// Static description of one proxied route
#[derive(Debug, Clone)]
pub struct ProxyRoute {
    pub service: ServiceRef,
    /// Backend path, `{name}` placeholders filled from path params or the session
    pub path: Cow<'static, str>,
    pub method: Method,
    /// Key into the mock catalog
    pub mock: Option<&'static str>,
    pub mode: ForwardMode,
}

impl ProxyRoute {
    pub fn new(service: Service, method: Method, path: impl Into<Cow<'static, str>>) -> Self {
        Self {
            service: ServiceRef::Fixed(service),
            path: path.into(),
            method,
            mock: None,
            mode: ForwardMode::Session,
        }
    }

    pub fn basic_io_backend(
        param: &'static str,
        method: Method,
        path: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            service: ServiceRef::BasicIoBackend { param },
            ..Self::new(Service::BasicIo, method, path)
        }
    }

    pub fn mock(mut self, key: &'static str) -> Self {
        self.mock = Some(key);
        self
    }

    pub fn direct(mut self) -> Self {
        self.mode = ForwardMode::Direct;
        self
    }

    pub fn streaming(mut self) -> Self {
        self.mode = ForwardMode::Streaming;
        self
    }

    /// Fill the path template. Session placeholders need an identity.
    pub fn render_path(
        &self,
        params: &HashMap<String, String>,
        identity: Option<&Identity>,
    ) -> Result<Vec<String>, ApiError> {
        let mut segments = Vec::new();
        for raw in self.path.split('/').filter(|s| !s.is_empty()) {
            let Some(name) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
                segments.push(raw.to_string());
                continue;
            };

            let value = match name {
                SESSION_USER => identity
                    .map(|id| id.user_id.clone())
                    .ok_or_else(ApiError::not_authenticated)?,
                SESSION_COMPANY => identity
                    .ok_or_else(ApiError::not_authenticated)?
                    .company_id
                    .clone()
                    .ok_or_else(|| ApiError::unauthorized("session has no company"))?,
                _ => params
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ApiError::bad_request(format!("missing path parameter '{}'", name)))?,
            };
            // The URL builder drops dot segments, which would retarget the call
            if value.is_empty() || value == "." || value == ".." {
                return Err(ApiError::bad_request(format!("invalid path parameter '{}'", name)));
            }
            segments.push(value);
        }
        Ok(segments)
    }
}

/// Outcome of the mock-or-forward decision
#[derive(Debug, PartialEq)]
pub enum Decision<'a> {
    Mock(&'a MockEntry),
    /// Mock mode is on but this route has no mock
    MockMissing,
    MissingConfig,
    Forward(&'a str),
}

pub fn decide<'a>(
    mock_mode: bool,
    fallback_on_missing_url: bool,
    base_url: Option<&'a str>,
    mock: Option<&'a MockEntry>,
) -> Decision<'a> {
    match (mock_mode, base_url, mock) {
        (true, _, Some(entry)) => Decision::Mock(entry),
        (true, _, None) => Decision::MockMissing,
        (false, None, Some(entry)) if fallback_on_missing_url => Decision::Mock(entry),
        (false, None, _) => Decision::MissingConfig,
        (false, Some(base), _) => Decision::Forward(base),
    }
}

/// `base` + rendered segments + the caller's query string
pub fn build_target_url(
    key: &str,
    base: &str,
    segments: &[String],
    query: Option<&str>,
) -> Result<Url, ApiError> {
    let invalid = || ApiError::internal_server_error(format!("{} is not a valid URL", key));

    let mut url = Url::parse(base).map_err(|_| invalid())?;
    {
        let mut path = url.path_segments_mut().map_err(|_| invalid())?;
        path.pop_if_empty();
        path.extend(segments);
    }
    url.set_query(query.filter(|q| !q.is_empty()));
    Ok(url)
}

fn is_bodyless(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// Dispatch one request for `route`; always yields a response
pub async fn dispatch(
    state: &AppState,
    route: &ProxyRoute,
    params: &HashMap<String, String>,
    identity: Option<&Identity>,
    request: Request,
) -> Response {
    match try_dispatch(state, route, params, identity, request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!("{} {} -> {} ({})", route.method, route.path, err.status_code(), err.error_code());
            err.into_response()
        }
    }
}

async fn try_dispatch(
    state: &AppState,
    route: &ProxyRoute,
    params: &HashMap<String, String>,
    identity: Option<&Identity>,
    request: Request,
) -> Result<Response, ApiError> {
    let key = route.service.env_key(params)?;
    let base_url = state.config.services.get(&key);
    let mock = route.mock.and_then(|k| state.mocks.get(k));

    let base = match decide(
        state.mock_switch.is_enabled(),
        state.config.mock.fallback_on_missing_url,
        base_url,
        mock,
    ) {
        Decision::Mock(entry) => {
            tracing::debug!("Serving mock '{}' for {} {}", route.mock.unwrap_or_default(), route.method, route.path);
            return Ok(entry.to_response());
        }
        Decision::MockMissing => {
            return Err(ApiError::not_implemented(format!(
                "mock mode is enabled and {} {} has no mock",
                route.method, route.path
            )));
        }
        Decision::MissingConfig => {
            tracing::error!("{} is not defined, cannot forward {} {}", key, route.method, route.path);
            return Err(ApiError::missing_config(&key));
        }
        Decision::Forward(base) => base,
    };

    let segments = route.render_path(params, identity)?;
    let url = build_target_url(&key, base, &segments, request.uri().query())?;

    let (parts, body) = request.into_parts();
    let mut headers = headers::forwardable_headers(&parts.headers);
    cookies::forward_cookies_in(&parts.headers, &mut headers);
    let request_id = headers::ensure_request_id(&mut headers);

    let body = if is_bodyless(&route.method) {
        OutboundBody::Empty
    } else if route.mode == ForwardMode::Streaming {
        OutboundBody::Streaming(reqwest::Body::wrap_stream(body.into_data_stream()))
    } else {
        let limit = state.config.proxy.max_body_bytes;
        let bytes = axum::body::to_bytes(body, limit)
            .await
            .map_err(|_| ApiError::payload_too_large(format!("request body exceeds {} bytes", limit)))?;
        OutboundBody::Buffered(bytes)
    };

    tracing::info!(request_id = %request_id, "{} {} -> {}", route.method, parts.uri.path(), url);

    let outbound = OutboundRequest {
        method: route.method.clone(),
        url,
        headers,
        body,
    };

    let sent = match route.mode {
        ForwardMode::Session => state.sessions.fetch_with_session(outbound).await,
        ForwardMode::Direct => state.sessions.send(outbound).await.map(SessionResponse::from),
        ForwardMode::Streaming => state
            .sessions
            .send_streaming(outbound)
            .await
            .map(SessionResponse::from),
    };

    let SessionResponse {
        response,
        rotated_cookies,
    } = sent.map_err(|e| {
        tracing::warn!(request_id = %request_id, "{} unreachable: {}", key, e);
        ApiError::upstream_unavailable(&key, e.to_string())
    })?;

    tracing::info!(request_id = %request_id, "{} answered {}", key, response.status());

    if route.mode == ForwardMode::Streaming {
        return Ok(response::stream(response, rotated_cookies));
    }

    let reply = UpstreamReply::read(response).await.map_err(|e| {
        tracing::warn!(request_id = %request_id, "{} body read failed: {}", key, e);
        ApiError::upstream_unavailable(&key, crate::session::describe(&e))
    })?;

    Ok(reply.with_rotated_cookies(rotated_cookies).into_response())
}
