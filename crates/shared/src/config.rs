//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Posting engine configuration.
    #[serde(default)]
    pub posting: PostingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection before giving up.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    5
}

/// Posting engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PostingConfig {
    /// Row lock wait limit in milliseconds. Exceeding it surfaces as a retryable busy error.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,
    /// Prefix for regular entry numbers (`JE-202401-000001`).
    #[serde(default = "default_entry_prefix")]
    pub entry_prefix: String,
    /// Prefix for reversal entry numbers (`REV-JE-202401-000001`).
    #[serde(default = "default_reversal_prefix")]
    pub reversal_prefix: String,
}

fn default_lock_timeout() -> u64 {
    5_000
}

fn default_entry_prefix() -> String {
    "JE".to_string()
}

fn default_reversal_prefix() -> String {
    "REV".to_string()
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout(),
            entry_prefix: default_entry_prefix(),
            reversal_prefix: default_reversal_prefix(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// A `.env` file is read first when present. `DATABASE_URL` is honoured as a
    /// fallback for `database.url`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false));

        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_default("database.url", url)?;
        }

        let config = builder
            .add_source(config::Environment::with_prefix("BUKUBESAR").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posting_defaults() {
        let posting = PostingConfig::default();
        assert_eq!(posting.lock_timeout_ms, 5_000);
        assert_eq!(posting.entry_prefix, "JE");
        assert_eq!(posting.reversal_prefix, "REV");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config = config::Config::builder()
            .set_override("database.url", "postgres://localhost/ledger")
            .unwrap()
            .build()
            .unwrap();

        let app: AppConfig = config.try_deserialize().unwrap();
        assert_eq!(app.database.url, "postgres://localhost/ledger");
        assert_eq!(app.database.max_connections, 10);
        assert_eq!(app.database.acquire_timeout_secs, 5);
        assert_eq!(app.posting.entry_prefix, "JE");
    }

    #[test]
    fn test_deserialize_posting_override() {
        let config = config::Config::builder()
            .set_override("database.url", "sqlite::memory:")
            .unwrap()
            .set_override("posting.lock_timeout_ms", 250)
            .unwrap()
            .build()
            .unwrap();

        let app: AppConfig = config.try_deserialize().unwrap();
        assert_eq!(app.posting.lock_timeout_ms, 250);
        assert_eq!(app.posting.reversal_prefix, "REV");
    }
}
