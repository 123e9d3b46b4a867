// proxy/mock.rs - Canned responses and the global mock switch

use axum::{
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::config::parse_flag;

/// One canned response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockEntry {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub body: Value,
    /// Raw `Set-Cookie` values
    #[serde(default)]
    pub cookies: Vec<String>,
}

fn default_status() -> u16 {
    200
}

impl MockEntry {
    pub fn ok(body: Value) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            cookies: Vec::new(),
        }
    }

    pub fn with_cookies(mut self, cookies: &[&str]) -> Self {
        self.cookies = cookies.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Render the entry verbatim: its status, its body, its cookies
    pub fn to_response(&self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let mut response = if status == StatusCode::NO_CONTENT {
            status.into_response()
        } else {
            (status, Json(self.body.clone())).into_response()
        };

        for cookie in &self.cookies {
            match HeaderValue::from_str(cookie) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(_) => tracing::warn!("Skipping invalid mock cookie: {}", cookie),
            }
        }
        response
    }
}

#[derive(Debug, Error)]
pub enum MockCatalogError {
    #[error("failed to read mock catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid mock catalog {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid mock catalog {path}: '{key}' has status {status}, expected 100-599")]
    InvalidStatus { path: String, key: String, status: u16 },
}

/// Immutable table of canned responses, keyed by operation (`identity.version`)
#[derive(Debug, Clone, Default)]
pub struct MockCatalog {
    entries: HashMap<String, MockEntry>,
}

impl MockCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in catalog, optionally overlaid with a YAML file of the same shape:
    ///
    /// ```yaml
    /// identity.version:
    ///   status: 200
    ///   body: { version: "2.0.0" }
    /// ```
    pub fn load(overrides: Option<&Path>) -> Result<Self, MockCatalogError> {
        let mut catalog = Self::builtin();
        if let Some(path) = overrides {
            let display = path.display().to_string();
            let raw = std::fs::read_to_string(path).map_err(|source| MockCatalogError::Io {
                path: display.clone(),
                source,
            })?;
            let extra = Self::from_yaml(&raw).map_err(|source| MockCatalogError::Parse {
                path: display.clone(),
                source,
            })?;
            if let Some((key, status)) = extra.invalid_status() {
                return Err(MockCatalogError::InvalidStatus {
                    path: display,
                    key,
                    status,
                });
            }
            tracing::info!("Loaded {} mock overrides from {}", extra.len(), path.display());
            catalog.merge(extra);
        }
        Ok(catalog)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        let entries: HashMap<String, MockEntry> = serde_yaml::from_str(raw)?;
        Ok(Self { entries })
    }

    /// First entry whose status is not a valid HTTP status code
    fn invalid_status(&self) -> Option<(String, u16)> {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| (key, self.entries[key].status))
            .find(|(_, status)| !(100..600).contains(status))
            .map(|(key, status)| (key.clone(), status))
    }

    pub fn merge(&mut self, other: MockCatalog) {
        self.entries.extend(other.entries);
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: MockEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&MockEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn builtin() -> Self {
        let mut c = Self::empty();
        let now = "2024-01-01T00:00:00Z";

        // auth
        c.insert(
            "auth.login",
            MockEntry::ok(json!({ "success": true, "user": { "id": "mock-user", "company_id": "mock-company" } }))
                .with_cookies(&[
                    "access_token=mock-access-token; Path=/; HttpOnly; SameSite=Lax",
                    "refresh_token=mock-refresh-token; Path=/; HttpOnly; SameSite=Lax",
                ]),
        );
        c.insert(
            "auth.refresh",
            MockEntry::ok(json!({ "success": true })).with_cookies(&[
                "access_token=mock-access-token; Path=/; HttpOnly; SameSite=Lax",
                "refresh_token=mock-refresh-token; Path=/; HttpOnly; SameSite=Lax",
            ]),
        );
        c.insert("auth.logout", MockEntry::ok(json!({ "success": true })));
        c.insert("auth.version", MockEntry::ok(json!({ "version": "1.0.0" })));

        // identity
        let user = json!({ "id": "mock-user", "email": "jane@example.com", "name": "Jane Doe", "company_id": "mock-company", "created_at": now });
        let company = json!({ "id": "mock-company", "name": "Mock Company", "created_at": now });
        c.insert("identity.version", MockEntry::ok(json!({ "version": "1.0.0" })));
        c.insert("identity.users.list", MockEntry::ok(json!({ "items": [user.clone()], "total": 1 })));
        c.insert("identity.users.get", MockEntry::ok(user.clone()));
        c.insert("identity.users.create", MockEntry::with_status(201, user.clone()));
        c.insert("identity.users.update", MockEntry::ok(user.clone()));
        c.insert("identity.users.delete", MockEntry::with_status(204, Value::Null));
        c.insert("identity.companies.list", MockEntry::ok(json!({ "items": [company.clone()], "total": 1 })));
        c.insert("identity.companies.get", MockEntry::ok(company.clone()));
        c.insert("identity.companies.create", MockEntry::with_status(201, company.clone()));
        c.insert("identity.companies.update", MockEntry::ok(company.clone()));
        c.insert("identity.companies.delete", MockEntry::with_status(204, Value::Null));
        c.insert("identity.companies.users", MockEntry::ok(json!({ "items": [user.clone()], "total": 1 })));
        c.insert("identity.me", MockEntry::ok(user.clone()));
        c.insert("identity.my_company", MockEntry::ok(company));
        c.insert("identity.my_company.users", MockEntry::ok(json!({ "items": [user], "total": 1 })));

        // guardian
        let role = json!({ "id": "mock-role", "name": "admin", "permissions": ["project:read", "project:write"] });
        c.insert("guardian.version", MockEntry::ok(json!({ "version": "1.0.0" })));
        c.insert("guardian.roles.list", MockEntry::ok(json!({ "items": [role.clone()], "total": 1 })));
        c.insert("guardian.roles.get", MockEntry::ok(role.clone()));
        c.insert("guardian.roles.create", MockEntry::with_status(201, role.clone()));
        c.insert("guardian.roles.update", MockEntry::ok(role.clone()));
        c.insert("guardian.roles.delete", MockEntry::with_status(204, Value::Null));
        c.insert("guardian.permissions.list", MockEntry::ok(json!({ "items": ["project:read", "project:write", "storage:read"] })));
        c.insert("guardian.user_roles.get", MockEntry::ok(json!({ "items": [role.clone()] })));
        c.insert("guardian.user_roles.update", MockEntry::ok(json!({ "items": [role] })));
        c.insert("guardian.my_permissions", MockEntry::ok(json!({ "items": ["project:read", "project:write"] })));

        // project
        let project = json!({ "id": "mock-project", "name": "Mock Project", "company_id": "mock-company", "created_at": now });
        let member = json!({ "id": "mock-member", "user_id": "mock-user", "role": "owner" });
        c.insert("project.version", MockEntry::ok(json!({ "version": "1.0.0" })));
        c.insert("project.projects.list", MockEntry::ok(json!({ "items": [project.clone()], "total": 1 })));
        c.insert("project.projects.get", MockEntry::ok(project.clone()));
        c.insert("project.projects.create", MockEntry::with_status(201, project.clone()));
        c.insert("project.projects.update", MockEntry::ok(project.clone()));
        c.insert("project.projects.delete", MockEntry::with_status(204, Value::Null));
        c.insert("project.members.list", MockEntry::ok(json!({ "items": [member.clone()], "total": 1 })));
        c.insert("project.members.create", MockEntry::with_status(201, member));
        c.insert("project.members.delete", MockEntry::with_status(204, Value::Null));
        c.insert("project.my_company.projects", MockEntry::ok(json!({ "items": [project], "total": 1 })));

        // storage
        let bucket = json!({ "id": "mock-bucket", "name": "documents" });
        let file = json!({ "id": "mock-file", "name": "report.pdf", "size": 1024, "bucket_id": "mock-bucket" });
        c.insert("storage.version", MockEntry::ok(json!({ "version": "1.0.0" })));
        c.insert("storage.buckets.list", MockEntry::ok(json!({ "items": [bucket.clone()], "total": 1 })));
        c.insert("storage.buckets.create", MockEntry::with_status(201, bucket));
        c.insert("storage.buckets.delete", MockEntry::with_status(204, Value::Null));
        c.insert("storage.files.list", MockEntry::ok(json!({ "items": [file.clone()], "total": 1 })));
        c.insert("storage.files.upload", MockEntry::with_status(201, file.clone()));
        c.insert("storage.files.get", MockEntry::ok(file));
        c.insert("storage.files.delete", MockEntry::with_status(204, Value::Null));

        // basic-io
        let job = json!({ "id": "mock-job", "kind": "export", "status": "completed", "created_at": now });
        c.insert("basic_io.version", MockEntry::ok(json!({ "version": "1.0.0" })));
        c.insert("basic_io.jobs.list", MockEntry::ok(json!({ "items": [job.clone()], "total": 1 })));
        c.insert("basic_io.jobs.get", MockEntry::ok(job.clone()));
        c.insert("basic_io.export", MockEntry::with_status(202, job.clone()));
        c.insert("basic_io.import", MockEntry::with_status(202, json!({ "id": "mock-job", "kind": "import", "status": "queued", "created_at": now })));
        c.insert("basic_io.backend_jobs.get", MockEntry::ok(job));

        c
    }
}

const UNSET: u8 = 0;
const FORCED_OFF: u8 = 1;
const FORCED_ON: u8 = 2;

/// Global mock switch, consulted on every dispatch.
///
/// Reads its environment variable each time it is asked, so flipping the
/// variable takes effect without a restart. `set` pins the value in-process
/// (tests); `clear` goes back to the environment.
#[derive(Debug, Clone)]
pub struct MockSwitch {
    inner: Arc<SwitchState>,
}

#[derive(Debug)]
struct SwitchState {
    var: String,
    default: bool,
    forced: AtomicU8,
}

impl MockSwitch {
    pub fn from_env(var: impl Into<String>, default: bool) -> Self {
        Self {
            inner: Arc::new(SwitchState {
                var: var.into(),
                default,
                forced: AtomicU8::new(UNSET),
            }),
        }
    }

    /// A switch pinned to `enabled`, independent of the environment
    pub fn fixed(enabled: bool) -> Self {
        let switch = Self::from_env("MOCK_MODE", enabled);
        switch.set(enabled);
        switch
    }

    pub fn is_enabled(&self) -> bool {
        match self.inner.forced.load(Ordering::Acquire) {
            FORCED_ON => true,
            FORCED_OFF => false,
            _ => std::env::var(&self.inner.var)
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(self.inner.default),
        }
    }

    pub fn set(&self, enabled: bool) {
        let value = if enabled { FORCED_ON } else { FORCED_OFF };
        self.inner.forced.store(value, Ordering::Release);
    }

    pub fn clear(&self) {
        self.inner.forced.store(UNSET, Ordering::Release);
    }
}
