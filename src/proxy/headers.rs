use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

pub const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

// Connection-level headers belong to a single hop; the client library
// recomputes framing for the outbound body. Cookies go through
// `cookies::forward_cookies_in`.
const NOT_FORWARDED: [HeaderName; 10] = [
    header::HOST,
    header::COOKIE,
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHORIZATION,
    HeaderName::from_static("keep-alive"),
];

/// Inbound headers that travel to the backend (everything but `Host` and
/// hop-by-hop headers). `HeaderName` is already lowercase, so the match is
/// case-insensitive.
pub fn forwardable_headers(incoming: &HeaderMap) -> HeaderMap {
    let mut outgoing = HeaderMap::with_capacity(incoming.len());
    for (name, value) in incoming {
        if NOT_FORWARDED.contains(name) || name.as_str() == "proxy-connection" {
            continue;
        }
        outgoing.append(name.clone(), value.clone());
    }
    outgoing
}

/// Keep the caller's request id or mint one, and return it for logging
pub fn ensure_request_id(headers: &mut HeaderMap) -> String {
    if let Some(existing) = headers
        .get(&REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return existing.to_string();
    }

    let id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&id) {
        headers.insert(REQUEST_ID, value);
    }
    id
}
