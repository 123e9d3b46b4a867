pub mod auth;
pub mod call;
