use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{self, Claims};
use crate::error::ApiError;
use crate::proxy::cookies;
use crate::state::AppState;

/// Caller identity read from the session token (unverified, display and routing only)
#[derive(Clone, Debug)]
pub struct Identity {
    pub user_id: String,
    pub company_id: Option<String>,
    pub claims: Claims,
}

impl Identity {
    /// A token only identifies someone when it carries a subject
    pub fn from_claims(claims: Claims) -> Option<Self> {
        let user_id = claims.sub.clone().filter(|s| !s.is_empty())?;
        Some(Self {
            user_id,
            company_id: claims.company_id.clone().filter(|s| !s.is_empty()),
            claims,
        })
    }
}

/// Optional identity for routes that work with or without a session
#[derive(Clone, Debug, Default)]
pub struct MaybeIdentity(pub Option<Identity>);

/// Decode the session token, if any, and attach the identity to the request.
///
/// Never rejects: a missing or malformed token simply means "no session".
/// Routes that need one use the `Identity` extractor, which answers 401.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_session_token(request.headers(), &state.config.session.access_cookie);

    if let Some(identity) = token
        .as_deref()
        .and_then(auth::decode)
        .and_then(Identity::from_claims)
    {
        request.extensions_mut().insert(identity);
    } else if token.is_some() {
        tracing::debug!("Ignoring undecodable session token");
    }

    next.run(request).await
}

/// Session token from the access cookie, falling back to `Authorization: Bearer`
pub fn extract_session_token(headers: &HeaderMap, access_cookie: &str) -> Option<String> {
    if let Some(token) = cookies::read_cookie(headers, access_cookie) {
        return Some(token);
    }

    let auth_str = headers.get(AUTHORIZATION)?.to_str().ok()?;
    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(ApiError::not_authenticated)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeIdentity {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(parts.extensions.get::<Identity>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("access_token=from-cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_session_token(&headers, "access_token").as_deref(), Some("from-cookie"));
    }

    #[test]
    fn bearer_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_session_token(&headers, "access_token").as_deref(), Some("from-header"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(extract_session_token(&headers, "access_token"), None);
    }

    #[test]
    fn identity_requires_subject() {
        assert!(Identity::from_claims(Claims::default()).is_none());

        let identity = Identity::from_claims(Claims {
            sub: Some("u-1".into()),
            company_id: Some(String::new()),
            ..Claims::default()
        })
        .unwrap();
        assert_eq!(identity.user_id, "u-1");
        assert_eq!(identity.company_id, None);
    }
}
