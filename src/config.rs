use anyhow::{anyhow, Context};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::identity::IdentityStore;

pub const CONFIG_ENV: &str = "SALIDAS_CONFIG";
pub const FIXED_NOW_ENV: &str = "SALIDAS_FIXED_NOW";
const CONFIG_DIR_NAME: &str = "salidasd";
const CONFIG_FILE_NAME: &str = "config.toml";
const FIXED_NOW_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Google,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub spreadsheet: String,
    pub spreadsheet_id: Option<String>,
    pub roster: String,
    pub timetable: String,
    pub log: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet: "salidasbano".to_string(),
            spreadsheet_id: None,
            roster: "Alumnos".to_string(),
            timetable: "Horarios".to_string(),
            log: "Registro".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Env var holding the service-account JSON (deployment secret).
    pub env_var: String,
    /// Local key file used when the env var is unset.
    pub file: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_var: "SALIDAS_CREDENTIALS".to_string(),
            file: PathBuf::from("credentials.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    pub path: PathBuf,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        let path = dirs::data_dir()
            .map(|d| d.join(CONFIG_DIR_NAME).join("salidas.sqlite3"))
            .unwrap_or_else(|| PathBuf::from("salidas.sqlite3"));
        Self { path }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: Backend,
    pub sheets: SheetsConfig,
    pub credentials: CredentialsConfig,
    pub sqlite: SqliteConfig,
    pub identity_dir: Option<PathBuf>,
    pub cache_ttl_secs: u64,
    pub http_timeout_secs: u64,
    pub show_debug: bool,
    pub log_level: String,
    pub fixed_now: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Google,
            sheets: SheetsConfig::default(),
            credentials: CredentialsConfig::default(),
            sqlite: SqliteConfig::default(),
            identity_dir: None,
            cache_ttl_secs: 120,
            http_timeout_secs: 30,
            show_debug: false,
            log_level: "info".to_string(),
            fixed_now: None,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        toml::from_str(raw).context("invalid config toml")
    }

    pub fn identity_dir(&self) -> PathBuf {
        self.identity_dir
            .clone()
            .unwrap_or_else(IdentityStore::default_dir)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    /// The pinned local instant, when one is configured.
    pub fn fixed_now(&self) -> anyhow::Result<Option<NaiveDateTime>> {
        let Some(raw) = self.fixed_now.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveDateTime::parse_from_str(raw, FIXED_NOW_FORMAT)
            .map(Some)
            .map_err(|e| anyhow!("fixed_now must be YYYY-MM-DDTHH:MM:SS, got {raw:?}: {e}"))
    }
}

/// `$SALIDAS_CONFIG`, else `<config dir>/salidasd/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        if !p.trim().is_empty() {
            return Some(PathBuf::from(p));
        }
    }
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Loads the config file if there is one; a missing file yields defaults.
/// Returns the path that was read, if any.
pub fn load() -> anyhow::Result<(AppConfig, Option<PathBuf>)> {
    let path = config_path();
    let (mut cfg, source) = match path.as_deref() {
        Some(p) if p.is_file() => (load_file(p)?, Some(p.to_path_buf())),
        _ => (AppConfig::default(), None),
    };
    if let Ok(v) = std::env::var(FIXED_NOW_ENV) {
        if !v.trim().is_empty() {
            cfg.fixed_now = Some(v);
        }
    }
    Ok((cfg, source))
}

fn load_file(path: &Path) -> anyhow::Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.to_string_lossy()))?;
    AppConfig::from_toml_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.to_string_lossy()))
}
