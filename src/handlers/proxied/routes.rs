// handlers/proxied/routes.rs - Route table for every forwarded endpoint
//
// Each entry pairs the browser-facing path with the backend descriptor.
// Backend paths use `{name}` for path params plus the session placeholders
// `{session_user}` and `{session_company}`.

use axum::http::Method;

use crate::config::AppConfig;
use crate::proxy::ProxyRoute;
use crate::types::Service;

/// Browser-facing axum path and the descriptor it dispatches to
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub path: &'static str,
    pub route: ProxyRoute,
}

fn at(path: &'static str, route: ProxyRoute) -> RouteEntry {
    RouteEntry { path, route }
}

/// Full table, in registration order
pub fn table(config: &AppConfig) -> Vec<RouteEntry> {
    let mut entries = Vec::new();
    entries.extend(auth_routes(config));
    entries.extend(identity_routes());
    entries.extend(guardian_routes());
    entries.extend(project_routes());
    entries.extend(storage_routes());
    entries.extend(basic_io_routes());
    entries
}

/// `/api/<slug>/health` and `/api/<slug>/version` for one service
fn service_checks(service: Service, health: &'static str, version: &'static str, mock: &'static str) -> Vec<RouteEntry> {
    vec![
        at(health, ProxyRoute::new(service, Method::GET, "/health")),
        at(version, ProxyRoute::new(service, Method::GET, "/version").mock(mock)),
    ]
}

// Login and refresh go straight through: a 401 there is the answer, not a
// reason to refresh. Logout is registered by the auth handlers so it can
// clear cookies on the way out.
fn auth_routes(config: &AppConfig) -> Vec<RouteEntry> {
    let s = Service::Auth;
    let mut entries = vec![
        at(
            "/api/auth/login",
            ProxyRoute::new(s, Method::POST, "/auth/login").mock("auth.login").direct(),
        ),
        at(
            "/api/auth/refresh",
            ProxyRoute::new(s, Method::POST, config.session.refresh_path.clone())
                .mock("auth.refresh")
                .direct(),
        ),
    ];
    entries.extend(service_checks(s, "/api/auth/health", "/api/auth/version", "auth.version"));
    entries
}

fn identity_routes() -> Vec<RouteEntry> {
    let s = Service::Identity;
    let mut entries = service_checks(s, "/api/identity/health", "/api/identity/version", "identity.version");
    entries.extend([
        at("/api/identity/users", ProxyRoute::new(s, Method::GET, "/v1/users").mock("identity.users.list")),
        at("/api/identity/users", ProxyRoute::new(s, Method::POST, "/v1/users").mock("identity.users.create")),
        at("/api/identity/users/:id", ProxyRoute::new(s, Method::GET, "/v1/users/{id}").mock("identity.users.get")),
        at("/api/identity/users/:id", ProxyRoute::new(s, Method::PUT, "/v1/users/{id}").mock("identity.users.update")),
        at("/api/identity/users/:id", ProxyRoute::new(s, Method::DELETE, "/v1/users/{id}").mock("identity.users.delete")),
        at("/api/identity/companies", ProxyRoute::new(s, Method::GET, "/v1/companies").mock("identity.companies.list")),
        at("/api/identity/companies", ProxyRoute::new(s, Method::POST, "/v1/companies").mock("identity.companies.create")),
        at("/api/identity/companies/:id", ProxyRoute::new(s, Method::GET, "/v1/companies/{id}").mock("identity.companies.get")),
        at("/api/identity/companies/:id", ProxyRoute::new(s, Method::PUT, "/v1/companies/{id}").mock("identity.companies.update")),
        at("/api/identity/companies/:id", ProxyRoute::new(s, Method::DELETE, "/v1/companies/{id}").mock("identity.companies.delete")),
        at(
            "/api/identity/companies/:id/users",
            ProxyRoute::new(s, Method::GET, "/v1/companies/{id}/users").mock("identity.companies.users"),
        ),
        // Caller-scoped views
        at("/api/identity/me", ProxyRoute::new(s, Method::GET, "/v1/users/{session_user}").mock("identity.me")),
        at(
            "/api/identity/my-company",
            ProxyRoute::new(s, Method::GET, "/v1/companies/{session_company}").mock("identity.my_company"),
        ),
        at(
            "/api/identity/my-company/users",
            ProxyRoute::new(s, Method::GET, "/v1/companies/{session_company}/users").mock("identity.my_company.users"),
        ),
    ]);
    entries
}

fn guardian_routes() -> Vec<RouteEntry> {
    let s = Service::Guardian;
    let mut entries = service_checks(s, "/api/guardian/health", "/api/guardian/version", "guardian.version");
    entries.extend([
        at("/api/guardian/roles", ProxyRoute::new(s, Method::GET, "/v1/roles").mock("guardian.roles.list")),
        at("/api/guardian/roles", ProxyRoute::new(s, Method::POST, "/v1/roles").mock("guardian.roles.create")),
        at("/api/guardian/roles/:id", ProxyRoute::new(s, Method::GET, "/v1/roles/{id}").mock("guardian.roles.get")),
        at("/api/guardian/roles/:id", ProxyRoute::new(s, Method::PUT, "/v1/roles/{id}").mock("guardian.roles.update")),
        at("/api/guardian/roles/:id", ProxyRoute::new(s, Method::DELETE, "/v1/roles/{id}").mock("guardian.roles.delete")),
        at("/api/guardian/permissions", ProxyRoute::new(s, Method::GET, "/v1/permissions").mock("guardian.permissions.list")),
        at("/api/guardian/users/:id/roles", ProxyRoute::new(s, Method::GET, "/v1/users/{id}/roles").mock("guardian.user_roles.get")),
        at("/api/guardian/users/:id/roles", ProxyRoute::new(s, Method::PUT, "/v1/users/{id}/roles").mock("guardian.user_roles.update")),
        at(
            "/api/guardian/my-permissions",
            ProxyRoute::new(s, Method::GET, "/v1/users/{session_user}/permissions").mock("guardian.my_permissions"),
        ),
    ]);
    entries
}

fn project_routes() -> Vec<RouteEntry> {
    let s = Service::Project;
    let mut entries = service_checks(s, "/api/project/health", "/api/project/version", "project.version");
    entries.extend([
        at("/api/project/projects", ProxyRoute::new(s, Method::GET, "/v1/projects").mock("project.projects.list")),
        at("/api/project/projects", ProxyRoute::new(s, Method::POST, "/v1/projects").mock("project.projects.create")),
        at("/api/project/projects/:id", ProxyRoute::new(s, Method::GET, "/v1/projects/{id}").mock("project.projects.get")),
        at("/api/project/projects/:id", ProxyRoute::new(s, Method::PUT, "/v1/projects/{id}").mock("project.projects.update")),
        at("/api/project/projects/:id", ProxyRoute::new(s, Method::DELETE, "/v1/projects/{id}").mock("project.projects.delete")),
        at(
            "/api/project/projects/:id/members",
            ProxyRoute::new(s, Method::GET, "/v1/projects/{id}/members").mock("project.members.list"),
        ),
        at(
            "/api/project/projects/:id/members",
            ProxyRoute::new(s, Method::POST, "/v1/projects/{id}/members").mock("project.members.create"),
        ),
        at(
            "/api/project/projects/:id/members/:member_id",
            ProxyRoute::new(s, Method::DELETE, "/v1/projects/{id}/members/{member_id}").mock("project.members.delete"),
        ),
        at(
            "/api/project/my-company/projects",
            ProxyRoute::new(s, Method::GET, "/v1/companies/{session_company}/projects").mock("project.my_company.projects"),
        ),
    ]);
    entries
}

fn storage_routes() -> Vec<RouteEntry> {
    let s = Service::Storage;
    let mut entries = service_checks(s, "/api/storage/health", "/api/storage/version", "storage.version");
    entries.extend([
        at("/api/storage/buckets", ProxyRoute::new(s, Method::GET, "/v1/buckets").mock("storage.buckets.list")),
        at("/api/storage/buckets", ProxyRoute::new(s, Method::POST, "/v1/buckets").mock("storage.buckets.create")),
        at("/api/storage/buckets/:id", ProxyRoute::new(s, Method::DELETE, "/v1/buckets/{id}").mock("storage.buckets.delete")),
        at("/api/storage/files", ProxyRoute::new(s, Method::GET, "/v1/files").mock("storage.files.list")),
        at(
            "/api/storage/files",
            ProxyRoute::new(s, Method::POST, "/v1/files").mock("storage.files.upload").streaming(),
        ),
        at("/api/storage/files/:id", ProxyRoute::new(s, Method::GET, "/v1/files/{id}").mock("storage.files.get")),
        at("/api/storage/files/:id", ProxyRoute::new(s, Method::DELETE, "/v1/files/{id}").mock("storage.files.delete")),
        // Raw bytes, relayed without buffering
        at("/api/storage/files/:id/content", ProxyRoute::new(s, Method::GET, "/v1/files/{id}/content").streaming()),
    ]);
    entries
}

fn basic_io_routes() -> Vec<RouteEntry> {
    let s = Service::BasicIo;
    let mut entries = service_checks(s, "/api/basic-io/health", "/api/basic-io/version", "basic_io.version");
    entries.extend([
        at("/api/basic-io/jobs", ProxyRoute::new(s, Method::GET, "/v1/jobs").mock("basic_io.jobs.list")),
        at("/api/basic-io/jobs/:id", ProxyRoute::new(s, Method::GET, "/v1/jobs/{id}").mock("basic_io.jobs.get")),
        // Named backends resolve BASIC_IO_<NAME>_SERVICE_URL per request
        at(
            "/api/basic-io/backends/:backend/export",
            ProxyRoute::basic_io_backend("backend", Method::POST, "/v1/exports").mock("basic_io.export"),
        ),
        at(
            "/api/basic-io/backends/:backend/import",
            ProxyRoute::basic_io_backend("backend", Method::POST, "/v1/imports")
                .mock("basic_io.import")
                .streaming(),
        ),
        at(
            "/api/basic-io/backends/:backend/jobs/:id",
            ProxyRoute::basic_io_backend("backend", Method::GET, "/v1/jobs/{id}").mock("basic_io.backend_jobs.get"),
        ),
    ]);
    entries
}
