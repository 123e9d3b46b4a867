// proxy/response.rs - Reshape backend responses for the caller
//
// One classifier turns whatever a backend returned into `UpstreamBody`, one
// renderer turns it back into an axum response. Status codes always survive.

use axum::{
    body::{Body, Bytes},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;

use super::cookies;

/// Normalized body of a backend response
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Json(Value),
    Text {
        text: String,
        content_type: Option<HeaderValue>,
    },
    Binary {
        bytes: Bytes,
        content_type: Option<HeaderValue>,
    },
    Empty,
}

/// Classify a buffered backend body.
///
/// - 204 is always empty, whatever content-type the backend claimed
/// - `application/json` is parsed; an unparseable body falls back to text
/// - anything else is text, or bytes when it is not UTF-8
pub fn classify(status: StatusCode, headers: &HeaderMap, bytes: Bytes) -> UpstreamBody {
    if status == StatusCode::NO_CONTENT {
        return UpstreamBody::Empty;
    }

    let content_type = headers.get(CONTENT_TYPE).cloned();
    let declared_json = content_type
        .as_ref()
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);

    if declared_json {
        if bytes.is_empty() {
            return UpstreamBody::Empty;
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => return UpstreamBody::Json(value),
            Err(e) => {
                tracing::warn!("Backend declared JSON but sent an invalid body ({}), relaying as text", e);
                return match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => UpstreamBody::Text {
                        text,
                        content_type: None,
                    },
                    Err(_) => UpstreamBody::Empty,
                };
            }
        }
    }

    match std::str::from_utf8(&bytes) {
        Ok(text) => UpstreamBody::Text {
            text: text.to_string(),
            content_type,
        },
        Err(_) => UpstreamBody::Binary {
            bytes,
            content_type,
        },
    }
}

/// A fully read backend response, ready to be relayed
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: UpstreamBody,
    pub set_cookies: Vec<HeaderValue>,
    pub location: Option<HeaderValue>,
}

impl UpstreamReply {
    /// Buffer and classify a backend response
    pub async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        Ok(Self {
            status,
            body: classify(status, &headers, bytes),
            set_cookies: cookies::set_cookie_values(&headers),
            location: headers.get(LOCATION).cloned(),
        })
    }

    /// Prepend `Set-Cookie` values produced before this response (a session refresh)
    pub fn with_rotated_cookies(mut self, rotated: Vec<HeaderValue>) -> Self {
        if !rotated.is_empty() {
            let mut all = rotated;
            all.append(&mut self.set_cookies);
            self.set_cookies = all;
        }
        self
    }
}

impl IntoResponse for UpstreamReply {
    fn into_response(self) -> Response {
        let mut response = render(self.status, self.body);
        let headers = response.headers_mut();
        cookies::append_set_cookies(headers, &self.set_cookies);
        if let Some(location) = self.location {
            headers.insert(LOCATION, location);
        }
        response
    }
}

/// Render a classified body with the original status
pub fn render(status: StatusCode, body: UpstreamBody) -> Response {
    match body {
        UpstreamBody::Empty => status.into_response(),
        UpstreamBody::Json(value) => (status, Json(value)).into_response(),
        UpstreamBody::Text { text, content_type } => {
            let content_type = content_type
                .unwrap_or_else(|| HeaderValue::from_static("text/plain; charset=utf-8"));
            (status, [(CONTENT_TYPE, content_type)], text).into_response()
        }
        UpstreamBody::Binary {
            bytes,
            content_type,
        } => {
            let content_type = content_type
                .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
            (status, [(CONTENT_TYPE, content_type)], bytes).into_response()
        }
    }
}

/// Relay a backend response without buffering it (downloads).
/// Keeps the headers a download needs; 204 still carries no body.
pub fn stream(response: reqwest::Response, rotated: Vec<HeaderValue>) -> Response {
    let status = response.status();
    let upstream = response.headers().clone();

    let mut relayed = if status == StatusCode::NO_CONTENT {
        status.into_response()
    } else {
        let mut relayed = Response::new(Body::from_stream(response.bytes_stream()));
        *relayed.status_mut() = status;
        for name in [CONTENT_TYPE, CONTENT_DISPOSITION, CONTENT_LENGTH, LOCATION] {
            if let Some(value) = upstream.get(&name) {
                relayed.headers_mut().insert(name, value.clone());
            }
        }
        relayed
    };

    let headers = relayed.headers_mut();
    cookies::append_set_cookies(headers, &rotated);
    cookies::forward_set_cookies_out(&upstream, headers);
    relayed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        headers
    }

    #[test]
    fn no_content_ignores_content_type() {
        let body = classify(StatusCode::NO_CONTENT, &json_headers(), Bytes::from_static(b"{\"a\":1}"));
        assert_eq!(body, UpstreamBody::Empty);
    }

    #[test]
    fn json_is_parsed() {
        let body = classify(StatusCode::CREATED, &json_headers(), Bytes::from_static(b"{\"id\":7,\"tags\":[\"a\"]}"));
        assert_eq!(body, UpstreamBody::Json(json!({ "id": 7, "tags": ["a"] })));
    }

    #[test]
    fn invalid_json_falls_back_to_text() {
        let body = classify(StatusCode::BAD_GATEWAY, &json_headers(), Bytes::from_static(b"<html>oops</html>"));
        assert_eq!(
            body,
            UpstreamBody::Text {
                text: "<html>oops</html>".into(),
                content_type: None
            }
        );
    }

    #[test]
    fn empty_json_body_is_empty() {
        let body = classify(StatusCode::OK, &json_headers(), Bytes::new());
        assert_eq!(body, UpstreamBody::Empty);
    }

    #[test]
    fn text_keeps_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/csv"));
        let body = classify(StatusCode::OK, &headers, Bytes::from_static(b"a,b\n1,2\n"));
        assert_eq!(
            body,
            UpstreamBody::Text {
                text: "a,b\n1,2\n".into(),
                content_type: Some(HeaderValue::from_static("text/csv"))
            }
        );
    }

    #[test]
    fn non_utf8_is_binary() {
        let body = classify(StatusCode::OK, &HeaderMap::new(), Bytes::from_static(&[0xff, 0xfe, 0x00]));
        assert!(matches!(body, UpstreamBody::Binary { .. }));
    }

    #[test]
    fn rendered_204_has_no_content_type() {
        let response = render(StatusCode::NO_CONTENT, UpstreamBody::Empty);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn reply_carries_rotated_then_upstream_cookies() {
        let reply = UpstreamReply {
            status: StatusCode::OK,
            body: UpstreamBody::Json(json!({})),
            set_cookies: vec![HeaderValue::from_static("b=2")],
            location: None,
        }
        .with_rotated_cookies(vec![HeaderValue::from_static("a=1")]);

        let response = reply.into_response();
        let cookies: Vec<_> = response.headers().get_all("set-cookie").iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }
}
