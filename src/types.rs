/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Backend services the gateway forwards to.
/// Each one resolves to a base URL through its `*_SERVICE_URL` variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Service {
    Auth,
    Identity,
    Guardian,
    Project,
    Storage,
    BasicIo,
}

impl Service {
    pub const ALL: [Service; 6] = [
        Service::Auth,
        Service::Identity,
        Service::Guardian,
        Service::Project,
        Service::Storage,
        Service::BasicIo,
    ];

    /// Configuration key holding the service base URL
    pub fn env_key(&self) -> &'static str {
        match self {
            Service::Auth => "AUTH_SERVICE_URL",
            Service::Identity => "IDENTITY_SERVICE_URL",
            Service::Guardian => "GUARDIAN_SERVICE_URL",
            Service::Project => "PROJECT_SERVICE_URL",
            Service::Storage => "STORAGE_SERVICE_URL",
            Service::BasicIo => "BASIC_IO_SERVICE_URL",
        }
    }

    /// Path segment used under `/api/`
    pub fn slug(&self) -> &'static str {
        match self {
            Service::Auth => "auth",
            Service::Identity => "identity",
            Service::Guardian => "guardian",
            Service::Project => "project",
            Service::Storage => "storage",
            Service::BasicIo => "basic-io",
        }
    }
}

/// Configuration key for a named basic-io backend (export/import feature).
///
/// `"sales-db"` becomes `BASIC_IO_SALES_DB_SERVICE_URL`. Names are limited to
/// ASCII alphanumerics, `-` and `_` so a path parameter can never address an
/// unrelated variable.
pub fn basic_io_variant_key(name: &str) -> Option<String> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return None;
    }

    let normalized = name.to_ascii_uppercase().replace('-', "_");
    Some(format!("BASIC_IO_{}_SERVICE_URL", normalized))
}
