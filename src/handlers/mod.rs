// handlers/mod.rs - Gateway routes
//
// Two kinds of handlers:
// Gateway-owned (/, /health, session endpoints) → Proxied (route table, one generic handler)
//
pub mod gateway;  // GET /, GET /health
pub mod proxied;  // Everything forwarded to a backend
pub mod session;  // Logout, token-info, session

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// All routes, state not yet attached
pub fn router(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/", get(gateway::root))
        .route("/health", get(gateway::health))
        .route("/api/auth/logout", post(session::logout_post))
        .route("/api/auth/token-info", get(session::token_info_get))
        .route("/api/auth/session", get(session::session_get))
        .fallback(gateway::not_found);

    proxied::register(router, proxied::table(&state.config))
}

/*
ROUTE LAYOUT:

src/
├── handlers/
│   ├── mod.rs              ← This file (router assembly)
│   ├── gateway.rs          ← Overview and liveness
│   ├── session/
│   │   ├── logout.rs       ← POST /api/auth/logout (forward + clear cookies)
│   │   ├── token_info.rs   ← GET /api/auth/token-info
│   │   └── status.rs       ← GET /api/auth/session
│   └── proxied/
│       ├── mod.rs          ← Generic forwarding handler, per-path grouping
│       └── routes.rs       ← Browser path → backend descriptor table
│
└── proxy/                  ← Mock-or-forward decision, reshaping, cookies

Every proxied request goes through proxy::dispatch:

  /api/identity/users/:id  ──►  IDENTITY_SERVICE_URL + /v1/users/{id}
  /api/identity/me         ──►  IDENTITY_SERVICE_URL + /v1/users/{session_user}

Adding a backend endpoint means adding one line to routes.rs (and a mock
to the catalog if the UI should work without the backend).
*/
