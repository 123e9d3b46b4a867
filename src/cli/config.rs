use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::proxy::cookies::CookieSet;

pub const DEFAULT_SERVER: &str = "http://localhost:3000";

/// Persisted CLI session: which gateway, and the cookies it handed out
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFile {
    pub server: Option<String>,
    #[serde(default)]
    pub cookies: CookieSet,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionFile {
    /// Explicit flag, then the saved server, then localhost
    pub fn server_url(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.server.clone())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("BFF_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("console-bff").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_session() -> anyhow::Result<SessionFile> {
    let session_file = get_config_dir()?.join("session.json");

    if !session_file.exists() {
        return Ok(SessionFile::default());
    }

    let content = fs::read_to_string(session_file)?;
    let session: SessionFile = serde_json::from_str(&content)?;
    Ok(session)
}

pub fn save_session(session: &SessionFile) -> anyhow::Result<()> {
    let session_file = get_config_dir()?.join("session.json");

    let content = serde_json::to_string_pretty(session)?;
    fs::write(session_file, content)?;
    Ok(())
}
