//! Service configuration
//!
//! Sources, later overriding earlier:
//! 1. `honeybee.yaml` in the working directory, if present
//! 2. `HONEYBEE__*` environment variables, e.g. `HONEYBEE__BIND_ADDRESS`
//!
//! Database and Redis connections are configured separately through
//! `DATABASE_URL` and `REDIS_URL`.

use ::config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

const CONFIG_FILE: &str = "honeybee";
const ENV_PREFIX: &str = "HONEYBEE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_address: String,
    /// Lifetime of a stored session; unset keeps sessions until sign-out
    pub session_ttl_seconds: Option<u64>,
    /// How long a computed analytics snapshot is served before refetching
    pub analytics_cache_ttl_seconds: u64,
    /// Cron expression for background analytics refresh; unset disables it
    pub refresh_schedule: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
            session_ttl_seconds: Some(60 * 60 * 24 * 7),
            analytics_cache_ttl_seconds: 60,
            refresh_schedule: Some("0 */5 * * * *".to_string()),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = Config::builder()
            .add_source(File::new(CONFIG_FILE, FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env() {
        unsafe {
            env::remove_var("HONEYBEE__BIND_ADDRESS");
            env::remove_var("HONEYBEE__ANALYTICS_CACHE_TTL_SECONDS");
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_sources() {
        clear_env();
        assert_eq!(AppConfig::load().unwrap(), AppConfig::default());
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        unsafe {
            env::set_var("HONEYBEE__BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("HONEYBEE__ANALYTICS_CACHE_TTL_SECONDS", "5");
        }

        let config = AppConfig::load().unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert_eq!(config.analytics_cache_ttl_seconds, 5);
        assert_eq!(config.refresh_schedule, AppConfig::default().refresh_schedule);

        clear_env();
    }
}
