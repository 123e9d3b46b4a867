use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use crate::types::Service;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub services: ServiceUrls,
    pub mock: MockConfig,
    pub session: SessionConfig,
    pub proxy: ProxyConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockConfig {
    /// Startup value of the global mock switch (re-read per request, see `MockSwitch`)
    pub enabled: bool,
    /// Serve a route's mock when its base URL is unset instead of failing with 500
    pub fallback_on_missing_url: bool,
    /// YAML file merged over the built-in mock catalog
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Path on the auth service that rotates the session cookies
    pub refresh_path: String,
    pub access_cookie: String,
    pub refresh_cookie: String,
    /// Coalesce concurrent refreshes of the same session into one call
    pub single_flight: bool,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub timeout_ms: u64,
    pub refresh_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Streamed transfers have no total deadline, only this idle limit per read
    pub stream_idle_timeout_ms: u64,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

/// Base URLs keyed by configuration variable (`IDENTITY_SERVICE_URL`, ...).
///
/// Holds the six fixed services plus any `BASIC_IO_<NAME>_SERVICE_URL`
/// variants. Blank values count as unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceUrls {
    urls: BTreeMap<String, String>,
}

impl ServiceUrls {
    pub fn from_env() -> Self {
        Self::from_pairs(env::vars().filter(|(key, _)| key.ends_with("_SERVICE_URL")))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut urls = Self::default();
        for (key, value) in pairs {
            urls.set(key, value);
        }
        urls
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into().trim().to_string();
        let key = key.into();
        if value.is_empty() {
            self.urls.remove(&key);
        } else {
            self.urls.insert(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.urls.remove(key);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.urls.get(key).map(String::as_str)
    }

    pub fn base_url(&self, service: Service) -> Option<&str> {
        self.get(service.env_key())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.urls.keys().map(String::as_str)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(port) = env::var("BFF_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }

        self.services = ServiceUrls::from_env();

        // Mock overrides
        if let Some(v) = env_flag("MOCK_MODE") {
            self.mock.enabled = v;
        }
        if let Some(v) = env_flag("MOCK_FALLBACK_ON_MISSING_URL") {
            self.mock.fallback_on_missing_url = v;
        }
        if let Ok(v) = env::var("MOCK_CATALOG_PATH") {
            self.mock.catalog_path = Some(PathBuf::from(v)).filter(|p| !p.as_os_str().is_empty());
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_REFRESH_PATH") {
            self.session.refresh_path = v;
        }
        if let Ok(v) = env::var("SESSION_ACCESS_COOKIE") {
            self.session.access_cookie = v;
        }
        if let Ok(v) = env::var("SESSION_REFRESH_COOKIE") {
            self.session.refresh_cookie = v;
        }
        if let Some(v) = env_flag("SESSION_REFRESH_SINGLE_FLIGHT") {
            self.session.single_flight = v;
        }
        if let Some(v) = env_flag("SECURITY_COOKIE_SECURE") {
            self.session.cookie_secure = v;
        }

        // Proxy overrides
        if let Ok(v) = env::var("PROXY_TIMEOUT_MS") {
            self.proxy.timeout_ms = v.parse().unwrap_or(self.proxy.timeout_ms);
        }
        if let Ok(v) = env::var("REFRESH_TIMEOUT_MS") {
            self.proxy.refresh_timeout_ms = v.parse().unwrap_or(self.proxy.refresh_timeout_ms);
        }
        if let Ok(v) = env::var("PROXY_CONNECT_TIMEOUT_MS") {
            self.proxy.connect_timeout_ms = v.parse().unwrap_or(self.proxy.connect_timeout_ms);
        }
        if let Ok(v) = env::var("PROXY_STREAM_IDLE_TIMEOUT_MS") {
            self.proxy.stream_idle_timeout_ms = v.parse().unwrap_or(self.proxy.stream_idle_timeout_ms);
        }
        if let Ok(v) = env::var("PROXY_MAX_BODY_BYTES") {
            self.proxy.max_body_bytes = v.parse().unwrap_or(self.proxy.max_body_bytes);
        }

        // Security overrides
        if let Some(v) = env_flag("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v;
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            services: ServiceUrls::default(),
            mock: MockConfig {
                enabled: false,
                fallback_on_missing_url: true,
                catalog_path: None,
            },
            session: SessionConfig::default(),
            proxy: ProxyConfig {
                timeout_ms: 10_000,
                refresh_timeout_ms: 5_000,
                connect_timeout_ms: 2_000,
                stream_idle_timeout_ms: 60_000,
                max_body_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            session: SessionConfig {
                cookie_secure: true,
                ..SessionConfig::default()
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            mock: MockConfig {
                enabled: false,
                fallback_on_missing_url: false,
                catalog_path: None,
            },
            session: SessionConfig {
                cookie_secure: true,
                ..SessionConfig::default()
            },
            proxy: ProxyConfig {
                timeout_ms: 8_000,
                refresh_timeout_ms: 4_000,
                connect_timeout_ms: 1_000,
                stream_idle_timeout_ms: 30_000,
                max_body_bytes: 25 * 1024 * 1024, // 25MB
            },
            security: SecurityConfig {
                enable_cors: false,
                cors_origins: vec![],
            },
            ..Self::development()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_path: "/auth/refresh".to_string(),
            access_cookie: "access_token".to_string(),
            refresh_cookie: "refresh_token".to_string(),
            single_flight: false,
            cookie_secure: false,
        }
    }
}

/// Parse a boolean switch. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|v| parse_flag(&v))
}

// Global singleton config - initialized once at startup.
// Handlers never read it; they get the copy injected into `AppState`.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.mock.enabled);
        assert!(config.mock.fallback_on_missing_url);
        assert_eq!(config.session.access_cookie, "access_token");
        assert_eq!(config.session.refresh_cookie, "refresh_token");
        assert_eq!(config.session.refresh_path, "/auth/refresh");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.mock.fallback_on_missing_url);
        assert!(config.session.cookie_secure);
        assert!(config.proxy.timeout_ms > 0);
        assert!(config.proxy.refresh_timeout_ms > 0);
    }

    #[test]
    fn blank_service_urls_count_as_unset() {
        let urls = ServiceUrls::from_pairs([
            ("IDENTITY_SERVICE_URL", "http://identity:8080"),
            ("GUARDIAN_SERVICE_URL", "   "),
        ]);
        assert_eq!(urls.base_url(Service::Identity), Some("http://identity:8080"));
        assert_eq!(urls.base_url(Service::Guardian), None);
        assert_eq!(urls.base_url(Service::Project), None);
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
