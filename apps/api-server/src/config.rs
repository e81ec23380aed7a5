//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use solace_infra::database::DatabaseConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs on in-memory repositories.
    pub database: Option<DatabaseConfig>,
    /// Apply pending schema migrations after connecting.
    pub auto_migrate: bool,
    /// Service-account key file for the identity provider.
    pub firebase_credentials: PathBuf,
    /// Upper bound on the downstream work of a single request.
    pub request_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let request_timeout = Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 10));

        let database = env::var("DATABASE_URL").ok().map(|url| {
            let mut config = DatabaseConfig::new(url);
            config.max_connections = parse_or("DB_MAX_CONNECTIONS", config.max_connections);
            config.min_connections = parse_or("DB_MIN_CONNECTIONS", config.min_connections);
            config.acquire_timeout = request_timeout;
            config
        });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_or("PORT", 8080),
            database,
            auto_migrate: parse_or("DB_AUTO_MIGRATE", false),
            firebase_credentials: env::var("FIREBASE_CREDENTIALS")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("firebase_config.json")),
            request_timeout,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
