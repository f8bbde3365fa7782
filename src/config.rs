use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

/// Argon2 work factor.
#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        // OWASP baseline for argon2id
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_query_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
    pub token_cleanup_interval_hours: u64,
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => postgres_url_from_parts()?,
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            ttl_minutes: env_or("TOKEN_TTL_MINUTES", 60 * 24),
        };
        let defaults = HashConfig::default();
        let hash = HashConfig {
            memory_kib: env_or("ARGON2_MEMORY_KIB", defaults.memory_kib),
            iterations: env_or("ARGON2_ITERATIONS", defaults.iterations),
            parallelism: env_or("ARGON2_PARALLELISM", defaults.parallelism),
        };
        let config = Self {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", crate::store::DEFAULT_MAX_CONNECTIONS),
            db_query_timeout_secs: env_or("DB_QUERY_TIMEOUT_SECS", 5),
            jwt,
            hash,
            token_cleanup_interval_hours: env_or("TOKEN_CLEANUP_INTERVAL_HOURS", 24),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080),
            metrics_port: env_or("METRICS_PORT", 9000),
            request_timeout_secs: env_or("HTTP_REQUEST_TIMEOUT_SECS", 10),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects zero durations and clashing ports.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.jwt.ttl_minutes > 0, "TOKEN_TTL_MINUTES must be at least 1");
        anyhow::ensure!(
            self.token_cleanup_interval_hours > 0,
            "TOKEN_CLEANUP_INTERVAL_HOURS must be at least 1"
        );
        anyhow::ensure!(self.db_query_timeout_secs > 0, "DB_QUERY_TIMEOUT_SECS must be at least 1");
        anyhow::ensure!(
            self.request_timeout_secs > 0,
            "HTTP_REQUEST_TIMEOUT_SECS must be at least 1"
        );
        anyhow::ensure!(
            self.port != self.metrics_port,
            "APP_PORT and METRICS_PORT must differ"
        );
        Ok(())
    }

    pub fn db_query_timeout(&self) -> Duration {
        Duration::from_secs(self.db_query_timeout_secs)
    }

    pub fn token_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.token_cleanup_interval_hours.saturating_mul(60 * 60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn postgres_url_from_parts() -> anyhow::Result<String> {
    let var = |key: &str| std::env::var(key).with_context(|| format!("DATABASE_URL or {key} must be set"));
    Ok(format!(
        "postgres://{}:{}@{}:{}/{}?sslmode={}",
        var("POSTGRES_USER")?,
        var("POSTGRES_PASSWORD")?,
        var("POSTGRES_HOST")?,
        var("POSTGRES_PORT")?,
        var("POSTGRES_DB")?,
        std::env::var("POSTGRES_SSL_MODE").unwrap_or_else(|_| "disable".into()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/marketplace".into(),
            db_max_connections: 10,
            db_query_timeout_secs: 5,
            jwt: JwtConfig {
                secret: "secret".into(),
                ttl_minutes: 60,
            },
            hash: HashConfig::default(),
            token_cleanup_interval_hours: 24,
            host: "0.0.0.0".into(),
            port: 8080,
            metrics_port: 9000,
            request_timeout_secs: 10,
        }
    }

    #[test]
    fn defaults_validate() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn zero_cleanup_interval_is_rejected() {
        let cfg = AppConfig {
            token_cleanup_interval_hours: 0,
            ..sample()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("TOKEN_CLEANUP_INTERVAL_HOURS"));
    }

    #[test]
    fn non_positive_ttl_and_timeouts_are_rejected() {
        let mut cfg = sample();
        cfg.jwt.ttl_minutes = 0;
        assert!(cfg.validate().is_err());
        assert!(AppConfig { db_query_timeout_secs: 0, ..sample() }.validate().is_err());
        assert!(AppConfig { request_timeout_secs: 0, ..sample() }.validate().is_err());
        assert!(AppConfig { metrics_port: 8080, ..sample() }.validate().is_err());
    }

    #[test]
    fn huge_cleanup_interval_saturates() {
        let cfg = AppConfig {
            token_cleanup_interval_hours: u64::MAX,
            ..sample()
        };
        assert_eq!(cfg.token_cleanup_interval(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn env_or_falls_back_on_missing_or_garbage() {
        assert_eq!(env_or("MARKETPLACE_TEST_SURELY_UNSET", 42u32), 42);
        std::env::set_var("MARKETPLACE_TEST_GARBAGE_PORT", "not-a-number");
        assert_eq!(env_or("MARKETPLACE_TEST_GARBAGE_PORT", 8080u16), 8080);
    }

    #[test]
    fn env_or_parses_present_values() {
        std::env::set_var("MARKETPLACE_TEST_ITERATIONS", "7");
        assert_eq!(env_or("MARKETPLACE_TEST_ITERATIONS", 2u32), 7);
    }
}
