// handlers/session/logout.rs - POST /api/auth/logout handler

use axum::{
    extract::{Request, State},
    http::Method,
    response::Response,
};
use std::collections::HashMap;

use crate::middleware::MaybeIdentity;
use crate::proxy::{self, cookies, ProxyRoute};
use crate::state::AppState;
use crate::types::Service;

/**
 * POST /api/auth/logout - End the session
 *
 * Forwards to the auth service so it can revoke the refresh token, then
 * appends removal cookies for both session cookies. The backend's own status
 * and body are relayed; the cookies are cleared even when it fails.
 */
pub async fn logout_post(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    request: Request,
) -> Response {
    let route = ProxyRoute::new(Service::Auth, Method::POST, "/auth/logout")
        .mock("auth.logout")
        .direct();

    let mut response = proxy::dispatch(&state, &route, &HashMap::new(), identity.as_ref(), request).await;

    // Appended last so the removal wins over anything the backend set
    let removals = cookies::clear_session_cookies(&state.config.session);
    cookies::append_set_cookies(response.headers_mut(), &removals);

    tracing::info!("Session cookies cleared (upstream answered {})", response.status());
    response
}
