use std::str::FromStr;

/// A configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("{key} must be a valid {expected}, got '{value}'")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Points service configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. `DATABASE_URL`
/// is read separately by the binary since tests inject their own pool.
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Maximum pool connections (default: `20`).
    pub db_max_connections: u32,
    /// How many times a concurrent-write conflict is retried before the
    /// update is rejected (default: `5`).
    pub update_max_retries: u32,
    /// Leaderboard size when the caller does not ask for one (default: `10`).
    pub leaderboard_default_limit: i64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            db_max_connections: 20,
            update_max_retries: 5,
            leaderboard_default_limit: 10,
        }
    }
}

impl ProgressConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `DB_MAX_CONNECTIONS`          | `20`    |
    /// | `PROGRESS_UPDATE_MAX_RETRIES` | `5`     |
    /// | `LEADERBOARD_DEFAULT_LIMIT`   | `10`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            db_max_connections: env_or("DB_MAX_CONNECTIONS", defaults.db_max_connections, "u32")?,
            update_max_retries: env_or(
                "PROGRESS_UPDATE_MAX_RETRIES",
                defaults.update_max_retries,
                "u32",
            )?,
            leaderboard_default_limit: env_or(
                "LEADERBOARD_DEFAULT_LIMIT",
                defaults.leaderboard_default_limit,
                "i64",
            )?,
        })
    }
}

fn env_or<T: FromStr>(
    key: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => parse_value(key, &value, expected),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(
    key: &'static str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError {
        key,
        value: value.to_string(),
        expected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ProgressConfig::default();
        assert_eq!(config.db_max_connections, 20);
        assert_eq!(config.update_max_retries, 5);
        assert_eq!(config.leaderboard_default_limit, 10);
    }

    #[test]
    fn parse_value_accepts_numbers() {
        let value: u32 = parse_value("PORT", " 42 ", "u32").unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_value_reports_key() {
        let err = parse_value::<u32>("DB_MAX_CONNECTIONS", "lots", "u32").unwrap_err();
        assert_eq!(err.key, "DB_MAX_CONNECTIONS");
        assert!(err.to_string().contains("lots"));
    }
}
