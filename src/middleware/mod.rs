pub mod auth;

pub use auth::{extract_session_token, session_middleware, Identity, MaybeIdentity};
