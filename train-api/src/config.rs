/// Configuration management for the API server
///
/// Settings come from environment variables (and a `.env` file in
/// development), layered over defaults with the `config` crate.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `API_PRODUCTION`: Enables HSTS (default: false)
/// - `JWT_SECRET`: Secret key for JWT signing, at least 32 characters (required)
/// - `JWT_ACCESS_TTL_HOURS`: Access token lifetime (default: 24)
/// - `MIN_WITHDRAWAL_CENTS`: Smallest withdrawal (default: 1000)
/// - `SETTINGS_CACHE_TTL_SECS`: Monetization settings cache TTL (default: 300)
/// - `RUN_MIGRATIONS`: Apply migrations on startup (default: true)
/// - `RUST_LOG`: Log filter (default: train_api=debug,train_shared=info,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use train_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use config::{Environment, Map};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use train_shared::ledger::MIN_WITHDRAWAL_CENTS;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub ledger: LedgerConfig,
    pub monetization: MonetizationConfig,

    /// Apply pending migrations before serving
    pub run_migrations: bool,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS on)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Access token lifetime in hours
    pub access_ttl_hours: i64,
}

/// Ledger limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub min_withdrawal_cents: i64,
}

/// Monetization settings cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonetizationConfig {
    pub cache_ttl_secs: u64,
}

/// Flat view of the environment, one field per variable
#[derive(Debug, Deserialize)]
struct EnvSettings {
    database_url: String,
    database_max_connections: u32,
    api_host: String,
    api_port: u16,
    api_cors_origins: String,
    api_production: bool,
    jwt_secret: String,
    jwt_access_ttl_hours: i64,
    min_withdrawal_cents: i64,
    settings_cache_ttl_secs: u64,
    run_migrations: bool,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - A variable has an invalid value
    /// - `JWT_SECRET` is shorter than 32 characters
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::load(Environment::default().try_parsing(true))
    }

    /// Loads configuration from an explicit variable map instead of the process environment
    pub fn from_map(vars: Map<String, String>) -> anyhow::Result<Self> {
        Self::load(Environment::default().try_parsing(true).source(Some(vars)))
    }

    fn load(env: Environment) -> anyhow::Result<Self> {
        let settings: EnvSettings = config::Config::builder()
            .set_default("database_max_connections", 10)?
            .set_default("api_host", "0.0.0.0")?
            .set_default("api_port", 8080)?
            .set_default("api_cors_origins", "*")?
            .set_default("api_production", false)?
            .set_default("jwt_access_ttl_hours", 24)?
            .set_default("min_withdrawal_cents", MIN_WITHDRAWAL_CENTS)?
            .set_default("settings_cache_ttl_secs", 300)?
            .set_default("run_migrations", true)?
            .add_source(env)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration (DATABASE_URL and JWT_SECRET are required)")?;

        if settings.jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        if settings.jwt_access_ttl_hours <= 0 {
            anyhow::bail!("JWT_ACCESS_TTL_HOURS must be positive");
        }

        if settings.min_withdrawal_cents <= 0 {
            anyhow::bail!("MIN_WITHDRAWAL_CENTS must be positive");
        }

        let cors_origins = settings
            .api_cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            api: ApiConfig {
                host: settings.api_host,
                port: settings.api_port,
                cors_origins,
                production: settings.api_production,
            },
            database: DatabaseConfig {
                url: settings.database_url,
                max_connections: settings.database_max_connections,
            },
            jwt: JwtConfig {
                secret: settings.jwt_secret,
                access_ttl_hours: settings.jwt_access_ttl_hours,
            },
            ledger: LedgerConfig {
                min_withdrawal_cents: settings.min_withdrawal_cents,
            },
            monetization: MonetizationConfig {
                cache_ttl_secs: settings.settings_cache_ttl_secs,
            },
            run_migrations: settings.run_migrations,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Access token lifetime
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.jwt.access_ttl_hours)
    }

    /// Monetization settings cache TTL
    pub fn settings_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.monetization.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_map(vars(&[
            ("DATABASE_URL", "postgresql://localhost/train"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.production);
        assert_eq!(config.jwt.access_ttl_hours, 24);
        assert_eq!(config.ledger.min_withdrawal_cents, 1_000);
        assert_eq!(config.settings_cache_ttl(), Duration::from_secs(300));
        assert!(config.run_migrations);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_map(vars(&[
            ("DATABASE_URL", "postgresql://localhost/train"),
            ("JWT_SECRET", SECRET),
            ("API_PORT", "9000"),
            ("API_CORS_ORIGINS", "https://app.example.com, https://admin.example.com"),
            ("API_PRODUCTION", "true"),
            ("MIN_WITHDRAWAL_CENTS", "2500"),
            ("RUN_MIGRATIONS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.api.port, 9000);
        assert_eq!(
            config.api.cors_origins,
            vec!["https://app.example.com", "https://admin.example.com"]
        );
        assert!(config.api.production);
        assert_eq!(config.ledger.min_withdrawal_cents, 2_500);
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_missing_database_url() {
        assert!(Config::from_map(vars(&[("JWT_SECRET", SECRET)])).is_err());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let err = Config::from_map(vars(&[
            ("DATABASE_URL", "postgresql://localhost/train"),
            ("JWT_SECRET", "too-short"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("at least 32 characters"));
    }
}
