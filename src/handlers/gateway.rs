// handlers/gateway.rs - GET / and GET /health, answered by the gateway itself

use axum::{extract::State, http::Uri, Json};
use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Service;

/**
 * GET / - Gateway overview
 *
 * Lists each backend and whether its base URL is configured, plus the
 * current mock flags. URLs themselves are not echoed back.
 */
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let mut services = Map::new();
    for service in Service::ALL {
        services.insert(
            service.slug().to_string(),
            json!({
                "env": service.env_key(),
                "configured": state.config.services.base_url(service).is_some(),
            }),
        );
    }

    let basic_io_backends: Vec<&str> = state
        .config
        .services
        .keys()
        .filter(|k| k.starts_with("BASIC_IO_") && *k != Service::BasicIo.env_key())
        .collect();

    Json(json!({
        "name": "console-bff",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "services": services,
        "basicIoBackends": basic_io_backends,
        "mock": {
            "enabled": state.mock_switch.is_enabled(),
            "fallbackOnMissingUrl": state.config.mock.fallback_on_missing_url,
        },
    }))
}

/// GET /health - Liveness only; backend health lives under /api/<service>/health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    }))
}

/// Unknown paths get the same JSON error shape as everything else
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("no route for {}", uri.path()))
}
