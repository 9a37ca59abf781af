//! Persistence configuration.

use serde::{Deserialize, Serialize};

/// Persistence configuration. Reserved for a future durable repository
/// backend; the engine currently runs entirely against the in-memory
/// repositories in `infrastructure::persistence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database connection string. If unset, resolved from `DATABASE_URL`
    /// at startup.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Maximum connection pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl PersistenceConfig {
    /// Resolve the database URL, preferring the config value over the
    /// `DATABASE_URL` environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if no database URL can be resolved from either
    /// source.
    pub fn resolve_database_url(&self) -> Result<String, PersistenceConfigError> {
        if let Some(url) = &self.database_url
            && !url.is_empty()
        {
            return Ok(url.clone());
        }

        if let Ok(url) = std::env::var("DATABASE_URL")
            && !url.is_empty()
        {
            return Ok(url);
        }

        Err(PersistenceConfigError::MissingDatabaseUrl(
            "Set DATABASE_URL or persistence.database_url".to_string(),
        ))
    }
}

const fn default_max_connections() -> u32 {
    5
}

/// Errors from persistence configuration.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceConfigError {
    /// Missing database URL.
    #[error("Missing database URL: {0}")]
    MissingDatabaseUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_value_wins_over_env() {
        let config = PersistenceConfig {
            database_url: Some("turso://from-config".to_string()),
            ..PersistenceConfig::default()
        };
        assert_eq!(
            config.resolve_database_url().unwrap(),
            "turso://from-config"
        );
    }

    #[test]
    fn missing_url_is_an_error() {
        let config = PersistenceConfig {
            database_url: None,
            ..PersistenceConfig::default()
        };
        // SAFETY: test runs single-threaded w.r.t. this var in practice; if
        // DATABASE_URL happens to be set in the test environment this is
        // harmlessly skipped.
        if std::env::var("DATABASE_URL").is_err() {
            assert!(config.resolve_database_url().is_err());
        }
    }
}
