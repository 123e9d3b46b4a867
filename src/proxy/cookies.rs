// proxy/cookies.rs - Cookie forwarding in both directions
//
// Every forwarding path (dispatcher, session refresh, logout, CLI) goes
// through these helpers instead of joining cookie strings by hand.

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::SessionConfig;

/// Copy the caller's cookies onto an outbound header map as a single
/// `Cookie` header. Multiple inbound `Cookie` headers are joined with `"; "`.
pub fn forward_cookies_in(incoming: &HeaderMap, outgoing: &mut HeaderMap) {
    let joined = incoming
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join("; ");

    outgoing.remove(COOKIE);
    if joined.is_empty() {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&joined) {
        outgoing.insert(COOKIE, value);
    }
}

/// Every `Set-Cookie` value of an upstream response, verbatim
pub fn set_cookie_values(upstream: &HeaderMap) -> Vec<HeaderValue> {
    upstream.get_all(SET_COOKIE).iter().cloned().collect()
}

/// Relay upstream `Set-Cookie` headers onto the outgoing response
pub fn forward_set_cookies_out(upstream: &HeaderMap, outgoing: &mut HeaderMap) {
    append_set_cookies(outgoing, &set_cookie_values(upstream));
}

pub fn append_set_cookies(outgoing: &mut HeaderMap, values: &[HeaderValue]) {
    for value in values {
        outgoing.append(SET_COOKIE, value.clone());
    }
}

/// Read a single cookie value from request headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` values that remove both session cookies from the browser
pub fn clear_session_cookies(session: &SessionConfig) -> Vec<HeaderValue> {
    [&session.access_cookie, &session.refresh_cookie]
        .into_iter()
        .filter_map(|name| {
            let mut cookie = Cookie::build((name.clone(), ""))
                .path("/")
                .http_only(true)
                .secure(session.cookie_secure)
                .build();
            cookie.make_removal();
            HeaderValue::from_str(&cookie.to_string()).ok()
        })
        .collect()
}

/// Name/value pairs of a cookie header, updated by `Set-Cookie` rotations.
///
/// Used to replay a request after a refresh with the rotated tokens, and by
/// the CLI as its persisted cookie jar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieSet(BTreeMap<String, String>);

impl CookieSet {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut set = Self::default();
        for value in headers.get_all(COOKIE).iter().filter_map(|v| v.to_str().ok()) {
            for cookie in Cookie::split_parse(value).flatten() {
                set.0
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }
        set
    }

    /// Apply `Set-Cookie` values: insert or replace, and drop cookies that are
    /// being removed (empty value or `Max-Age=0`).
    pub fn apply_set_cookies(&mut self, values: &[HeaderValue]) {
        for raw in values.iter().filter_map(|v| v.to_str().ok()) {
            let Ok(cookie) = Cookie::parse(raw) else {
                continue;
            };
            let removed = cookie.value().is_empty()
                || cookie
                    .max_age()
                    .map(|age| age.is_zero() || age.is_negative())
                    .unwrap_or(false);

            if removed {
                self.0.remove(cookie.name());
            } else {
                self.0
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn to_header_value(&self) -> Option<HeaderValue> {
        if self.0.is_empty() {
            return None;
        }
        let joined = self
            .0
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }

    /// Replace the `Cookie` header of `headers` with this set
    pub fn write_to(&self, headers: &mut HeaderMap) {
        headers.remove(COOKIE);
        if let Some(value) = self.to_header_value() {
            headers.insert(COOKIE, value);
        }
    }
}
