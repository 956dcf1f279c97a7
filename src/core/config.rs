//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::browser::encoding::Encoding;
use crate::browser::model::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::core::errors::{Result, TermscopeError};

/// Full termscope configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub browse: BrowseConfig,
    pub logging: LoggingConfig,
    /// Where this config was loaded from (not serialized).
    #[serde(skip)]
    pub config_file: PathBuf,
}

/// Backend location and transport timeouts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

/// Paging and initial selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BrowseConfig {
    /// Rows displayed per page; each request asks for one more.
    pub page_size: usize,
    /// Encoding the CLI switches to right after mount.
    pub default_encoding: Encoding,
}

/// JSONL activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub jsonl_path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            connect_timeout_ms: 2_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            default_encoding: Encoding::Utf8,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            jsonl_path: state_dir().join("activity.jsonl"),
            fallback_path: Some(env::temp_dir().join("termscope-activity.jsonl")),
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl ServerConfig {
    /// Parsed base URL.
    pub fn url(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| TermscopeError::InvalidConfig {
            details: format!("server.base_url {:?} is not a valid URL: {e}", self.base_url),
        })
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/termscope/config.toml`, falling back to `~/.config`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Load config from `path` (or the default path), then apply env overrides.
    ///
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf)
                .map_err(|source| TermscopeError::io(&path_buf, source))?;
            toml::from_str::<Self>(&raw)?
        } else if is_explicit_path {
            return Err(TermscopeError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.config_file = path_buf;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Effective config rendered back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        set_env_string("TERMSCOPE_SERVER_BASE_URL", &mut self.server.base_url);
        set_env_u64(
            "TERMSCOPE_SERVER_CONNECT_TIMEOUT_MS",
            &mut self.server.connect_timeout_ms,
        )?;
        set_env_u64(
            "TERMSCOPE_SERVER_REQUEST_TIMEOUT_MS",
            &mut self.server.request_timeout_ms,
        )?;
        set_env_usize("TERMSCOPE_BROWSE_PAGE_SIZE", &mut self.browse.page_size)?;
        if let Some(raw) = env_var("TERMSCOPE_BROWSE_DEFAULT_ENCODING") {
            self.browse.default_encoding =
                raw.parse::<Encoding>()
                    .map_err(|error| TermscopeError::ConfigParse {
                        context: "env",
                        details: format!("TERMSCOPE_BROWSE_DEFAULT_ENCODING={raw:?}: {error}"),
                    })?;
        }
        set_env_bool("TERMSCOPE_LOGGING_ENABLED", &mut self.logging.enabled)?;
        if let Some(raw) = env_var("TERMSCOPE_LOGGING_JSONL_PATH") {
            self.logging.jsonl_path = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Reject configurations the browser cannot run with.
    pub fn validate(&self) -> Result<()> {
        let url = self.server.url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TermscopeError::InvalidConfig {
                details: format!(
                    "server.base_url must be http(s), got scheme {:?}",
                    url.scheme()
                ),
            });
        }
        if self.server.connect_timeout_ms == 0 || self.server.request_timeout_ms == 0 {
            return Err(TermscopeError::InvalidConfig {
                details: "server timeouts must be > 0".to_string(),
            });
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.browse.page_size) {
            return Err(TermscopeError::InvalidConfig {
                details: format!(
                    "browse.page_size must be in [1,{MAX_PAGE_SIZE}], got {}",
                    self.browse.page_size
                ),
            });
        }
        if self.logging.enabled && self.logging.max_size_bytes == 0 {
            return Err(TermscopeError::InvalidConfig {
                details: "logging.max_size_bytes must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

fn config_dir() -> PathBuf {
    env_var("XDG_CONFIG_HOME").map_or_else(
        || home_dir().join(".config").join("termscope"),
        |dir| PathBuf::from(dir).join("termscope"),
    )
}

fn state_dir() -> PathBuf {
    env_var("XDG_STATE_HOME").map_or_else(
        || home_dir().join(".local").join("state").join("termscope"),
        |dir| PathBuf::from(dir).join("termscope"),
    )
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(env::temp_dir, PathBuf::from)
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_env_string(name: &str, slot: &mut String) {
    if let Some(raw) = env_var(name) {
        *slot = raw;
    }
}

fn set_env_u64(name: &str, slot: &mut u64) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw.parse::<u64>().map_err(|error| TermscopeError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_env_usize(name: &str, slot: &mut usize) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw
            .parse::<usize>()
            .map_err(|error| TermscopeError::ConfigParse {
                context: "env",
                details: format!("{name}={raw:?}: {error}"),
            })?;
    }
    Ok(())
}

fn set_env_bool(name: &str, slot: &mut bool) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw.parse::<bool>().map_err(|error| TermscopeError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}
