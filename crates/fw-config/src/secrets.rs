//! Connection URLs are resolved from the environment exactly once, using the
//! env var NAMES held in configuration. Errors name the variable, never the
//! value, and `Debug` redacts.

use anyhow::{bail, Result};

use crate::FleetSettings;

#[derive(Clone)]
pub struct StorageUrls {
    pub database_url: String,
    /// Absent when the counter store is not configured for this process.
    pub redis_url: Option<String>,
}

impl std::fmt::Debug for StorageUrls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageUrls")
            .field("database_url", &"<REDACTED>")
            .field("redis_url", &self.redis_url.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// The database URL is required; the Redis URL is optional here and enforced
/// by whoever needs the counter store.
pub fn resolve_storage_urls(settings: &FleetSettings) -> Result<StorageUrls> {
    let db_var = &settings.storage.database_url_env;
    let Some(database_url) = resolve_env(db_var) else {
        bail!("SECRET_MISSING env var {db_var} is not set");
    };
    Ok(StorageUrls {
        database_url,
        redis_url: resolve_env(&settings.storage.redis_url_env),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_urls() {
        let urls = StorageUrls {
            database_url: "postgres://fleet:hunter2@db/fleet".to_string(),
            redis_url: Some("redis://:hunter2@cache".to_string()),
        };
        let out = format!("{urls:?}");
        assert!(!out.contains("hunter2"));
        assert!(out.contains("<REDACTED>"));
    }

    #[test]
    fn missing_database_var_names_the_variable() {
        let mut settings = FleetSettings::default();
        settings.storage.database_url_env = "FW_TEST_DB_URL_SURELY_UNSET_7f3a".to_string();
        let err = resolve_storage_urls(&settings).unwrap_err().to_string();
        assert!(err.contains("FW_TEST_DB_URL_SURELY_UNSET_7f3a"));
    }
}
