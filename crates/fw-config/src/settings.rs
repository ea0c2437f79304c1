use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::LoadedConfig;

/// Typed view over the merged configuration. Every key has a default, so an
/// empty document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FleetSettings {
    pub fleet: FleetSection,
    pub storage: StorageSettings,
    pub daemon: DaemonSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetSection {
    /// IANA zone in which shift dates and default windows are interpreted.
    pub timezone: String,
}

impl Default for FleetSection {
    fn default() -> Self {
        Self {
            timezone: "Asia/Manila".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub database_url_env: String,
    pub redis_url_env: String,
    /// Upper bound on every store and counter call.
    pub io_timeout_ms: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url_env: "FW_DATABASE_URL".to_string(),
            redis_url_env: "FW_REDIS_URL".to_string(),
            io_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub bind_addr: String,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8890".to_string(),
        }
    }
}

impl FleetSettings {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let settings: FleetSettings = serde_json::from_value(loaded.config_json.clone())
            .context("config does not match fleet settings schema")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        self.bind_addr()?;
        if self.storage.io_timeout_ms == 0 {
            bail!("CONFIG_INVALID storage.io_timeout_ms must be > 0");
        }
        for (key, name) in [
            ("storage.database_url_env", &self.storage.database_url_env),
            ("storage.redis_url_env", &self.storage.redis_url_env),
        ] {
            if name.trim().is_empty() {
                bail!("CONFIG_INVALID {key} must name an environment variable");
            }
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.fleet
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("CONFIG_INVALID fleet.timezone: {e}"))
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.io_timeout_ms)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.daemon
            .bind_addr
            .parse()
            .with_context(|| format!("CONFIG_INVALID daemon.bind_addr: {}", self.daemon.bind_addr))
    }
}
