// handlers/session/status.rs - GET /api/auth/session handler

use axum::Json;
use serde_json::{json, Value};

use crate::middleware::MaybeIdentity;

/// GET /api/auth/session - Whether the caller carries a usable session token.
///
/// The token is decoded, not verified: `authenticated: true` means "worth
/// trying", the backends still have the final say.
pub async fn session_get(MaybeIdentity(identity): MaybeIdentity) -> Json<Value> {
    Json(match identity {
        Some(identity) => json!({
            "authenticated": true,
            "userId": identity.user_id,
            "companyId": identity.company_id,
        }),
        None => json!({
            "authenticated": false,
            "userId": null,
            "companyId": null,
        }),
    })
}
