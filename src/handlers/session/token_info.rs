// handlers/session/token_info.rs - GET /api/auth/token-info handler

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;

use crate::auth::{self, TokenInfo};
use crate::error::ApiError;
use crate::middleware::extract_session_token;
use crate::state::AppState;

/**
 * GET /api/auth/token-info - Expiry details of the current access token
 *
 * Reads the token from the access cookie (or a Bearer header) and decodes
 * its claims without verifying the signature. An expired token still
 * decodes; `expired` and a negative `expiresIn` say so. A missing or
 * malformed token answers 401 "not authenticated".
 *
 * Expected Output:
 * ```json
 * {
 *   "userId": "user-1",
 *   "companyId": "acme",
 *   "issuedAt": 1700000000,
 *   "expiresAt": 1700003600,
 *   "expiresIn": 1800,
 *   "expiresAtIso": "2023-11-14T23:13:20+00:00",
 *   "expired": false
 * }
 * ```
 */
pub async fn token_info_get(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenInfo>, ApiError> {
    let token = extract_session_token(&headers, &state.config.session.access_cookie)
        .ok_or_else(ApiError::not_authenticated)?;

    // A malformed token is no session at all
    let claims = auth::decode(&token).ok_or_else(ApiError::not_authenticated)?;

    Ok(Json(claims.token_info(Utc::now().timestamp())))
}
