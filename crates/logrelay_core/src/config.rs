// config.rs: relay configuration and its JSON/env loader
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RelayError, Result};

/// Environment variable holding the pseudonymization secret.
pub const SECRET_ENV: &str = "SALT";
/// Environment variable pointing at an optional JSON config file.
pub const CONFIG_ENV: &str = "LOGRELAY_CONFIG";

pub const DEFAULT_INPUT_PATH: &str = "/tmp/access.pipe";
pub const DEFAULT_TRACKED_PATH: &str = "/data/logs/goaccess.log";
pub const DEFAULT_UNTRACKED_PATH: &str = "/data/logs/untracked.log";
pub const DEFAULT_ROTATION_POLL_MS: u64 = 100;

#[derive(Deserialize, Clone, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    pub version: Option<u32>,
    /// Input stream; `-` reads stdin.
    pub input_path: PathBuf,
    pub tracked_path: PathBuf,
    pub untracked_path: PathBuf,
    /// Low-assurance mode: substitute a well-known salt when no secret is set.
    pub fallback_salt_allowed: bool,
    /// fsync each written line before reading the next one.
    pub sync_writes: bool,
    pub rotation_poll_ms: u64,
    #[serde(skip)]
    pub secret: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: None,
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            tracked_path: PathBuf::from(DEFAULT_TRACKED_PATH),
            untracked_path: PathBuf::from(DEFAULT_UNTRACKED_PATH),
            fallback_salt_allowed: false,
            sync_writes: true,
            rotation_poll_ms: DEFAULT_ROTATION_POLL_MS,
            secret: None,
        }
    }
}

impl RelayConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: RelayConfig = serde_json::from_str(json)
            .map_err(|e| RelayError::Config(format!("failed to parse config JSON: {}", e)))?;
        if let Some(v) = cfg.version {
            if v != 1 {
                return Err(RelayError::Config(format!("unsupported config version: {}", v)));
            }
        }
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| RelayError::io("failed to read config", path, e))?;
        Self::from_json(&data)
    }

    /// Defaults, then the file named by `path` (or `LOGRELAY_CONFIG`), then `SALT`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut cfg = match path.or(env_path.as_deref()) {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_secret(std::env::var(SECRET_ENV).ok());
        Ok(cfg)
    }

    /// Empty values count as unset.
    pub fn apply_secret(&mut self, secret: Option<String>) {
        self.secret = secret.filter(|s| !s.is_empty());
    }

    pub fn reads_stdin(&self) -> bool {
        self.input_path.as_os_str() == "-"
    }
}
