//! Watchdog configuration: TOML file, command-line overrides, validation.
//!
//! Keys keep the names operators already use in `/etc/watchdog.conf`-style
//! setups (`port`, `timeout`, `dir`, `logs`, `attempts`, `key`, `remote`).
//! The file is read once at startup; the server and client receive the
//! validated, immutable [`ServerSettings`] / [`ClientSettings`] views.

#![allow(missing_docs)]

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, WatchdogError};
use crate::net::client::ClientSettings;
use crate::net::server::ServerSettings;

pub const DEFAULT_PORT: u16 = 4848;
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_SCRIPT_DIR: &str = "/etc/watchdog.d/";
pub const DEFAULT_LOG_FILE: &str = "/var/log/watchdog.log";
pub const DEFAULT_CONFIG_FILE: &str = "/etc/watchdog.toml";
pub const DEFAULT_SCRIPT_PREFIX: &str = "00";

/// Full watchdog configuration as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// TCP port the server listens on and the client dials.
    pub port: u16,
    /// Address the server binds to.
    pub bind: IpAddr,
    /// Heartbeat timeout in seconds. Also the checker period and client interval.
    #[serde(rename = "timeout")]
    pub timeout_secs: u64,
    /// Consecutive misses before recovery scripts run.
    pub attempts: u32,
    /// Pre-shared key both sides must agree on.
    pub key: String,
    /// Server host, client mode only.
    pub remote: Option<String>,
    /// Directory holding recovery scripts.
    #[serde(rename = "dir")]
    pub script_dir: PathBuf,
    /// Only scripts whose file name starts with this prefix run.
    pub script_prefix: String,
    /// Append-only activity log (JSON Lines).
    #[serde(rename = "logs")]
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: IpAddr::from([0, 0, 0, 0]),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            attempts: DEFAULT_ATTEMPTS,
            key: String::new(),
            remote: None,
            script_dir: PathBuf::from(DEFAULT_SCRIPT_DIR),
            script_prefix: DEFAULT_SCRIPT_PREFIX.to_string(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

/// Values supplied on the command line. `Some` wins over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub bind: Option<IpAddr>,
    pub timeout_secs: Option<u64>,
    pub attempts: Option<u32>,
    pub key: Option<String>,
    pub remote: Option<String>,
    pub script_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load the configuration file at `path`.
    ///
    /// A missing file falls back to defaults unless `required` is set, in
    /// which case it is reported as [`WatchdogError::MissingConfig`].
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if required {
                    Err(WatchdogError::MissingConfig {
                        path: path.to_path_buf(),
                    })
                } else {
                    Ok(Self::default())
                }
            }
            Err(err) => Err(WatchdogError::io(path, err)),
        }
    }

    /// Layer command-line values on top of the loaded file.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(bind) = overrides.bind {
            self.bind = bind;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(attempts) = overrides.attempts {
            self.attempts = attempts;
        }
        if let Some(key) = &overrides.key {
            self.key.clone_from(key);
        }
        if let Some(remote) = &overrides.remote {
            self.remote = Some(remote.clone());
        }
        if let Some(dir) = &overrides.script_dir {
            self.script_dir.clone_from(dir);
        }
        if let Some(log_file) = &overrides.log_file {
            self.log_file.clone_from(log_file);
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validated server view.
    pub fn server_settings(&self) -> Result<ServerSettings> {
        self.validate_common()?;
        if self.attempts == 0 {
            return Err(WatchdogError::invalid_config("attempts must be at least 1"));
        }
        Ok(ServerSettings {
            bind: self.bind,
            port: self.port,
            timeout: self.timeout(),
            attempts: self.attempts,
            key: self.key.clone(),
        })
    }

    /// Validated client view.
    pub fn client_settings(&self) -> Result<ClientSettings> {
        self.validate_common()?;
        let remote = self
            .remote
            .as_deref()
            .map(str::trim)
            .map(|remote| {
                remote
                    .strip_prefix('[')
                    .and_then(|inner| inner.strip_suffix(']'))
                    .unwrap_or(remote)
            })
            .filter(|remote| !remote.is_empty())
            .ok_or_else(|| {
                WatchdogError::invalid_config("remote host must be specified in client mode")
            })?;
        Ok(ClientSettings {
            remote: remote.to_string(),
            port: self.port,
            key: self.key.clone(),
            interval: self.timeout(),
        })
    }

    /// Copy suitable for display: the key is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        if !shown.key.is_empty() {
            shown.key = "***".to_string();
        }
        shown
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate_common(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(WatchdogError::invalid_config("key must be specified"));
        }
        if self.key.contains(['\n', '\r']) {
            return Err(WatchdogError::invalid_config(
                "key must not contain line breaks",
            ));
        }
        if self.key.trim() != self.key {
            return Err(WatchdogError::invalid_config(
                "key must not start or end with whitespace",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(WatchdogError::invalid_config(
                "timeout must be at least one second",
            ));
        }
        Ok(())
    }
}
