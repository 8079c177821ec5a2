//! Application configuration module
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Global configuration instance
static CONFIG: OnceCell<Arc<RwLock<AppConfig>>> = OnceCell::new();

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// PostgreSQL configuration
    pub postgres: PostgresConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
}

/// PostgreSQL configuration
///
/// Everything the lifecycle manager needs is enumerated here instead of
/// being derived from the working directory at call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Cluster data directory path
    pub data_dir: String,
    /// Unix socket directory used for local client connections
    pub socket_dir: String,
    /// Administrative port the engine listens on
    pub port: u16,
    /// Role used for administrative and search connections.
    /// None means the driver default (PGUSER or "postgres").
    pub user: Option<String>,
    /// Maintenance database used for catalog queries and CREATE DATABASE
    pub admin_database: String,
    /// Target database holding documents and access grants
    pub database: String,
    /// Readiness poll attempt count
    pub poll_attempts: u32,
    /// Delay between readiness poll attempts in milliseconds.
    /// 100 attempts x 100ms = 10 second total startup budget.
    pub poll_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            postgres: PostgresConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            data_dir: "postgresql".to_string(),
            socket_dir: "pg_socket".to_string(),
            port: 5432,
            user: None,
            admin_database: "postgres".to_string(),
            database: "documents".to_string(),
            poll_attempts: 100,
            poll_delay_ms: 100,
        }
    }
}

impl AppConfig {
    /// Get the server bind address
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl PostgresConfig {
    /// Get the cluster data directory path
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// Get the socket directory as an absolute path.
    /// PostgreSQL requires unix_socket_directories to be absolute.
    pub fn get_socket_dir(&self) -> PathBuf {
        let dir = PathBuf::from(&self.socket_dir);
        if dir.is_absolute() {
            dir
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(dir)
        }
    }

    /// Connection options for the maintenance database
    pub fn admin_connect_options(&self) -> PgConnectOptions {
        self.connect_options(&self.admin_database)
    }

    /// Connection options for the documents database
    pub fn search_connect_options(&self) -> PgConnectOptions {
        self.connect_options(&self.database)
    }

    fn connect_options(&self, database: &str) -> PgConnectOptions {
        let mut options = PgConnectOptions::new()
            .socket(self.get_socket_dir())
            .port(self.port)
            .database(database);
        if let Some(user) = &self.user {
            options = options.username(user);
        }
        options
    }

    /// Delay between readiness poll attempts
    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    /// Total readiness wait budget: poll_attempts x poll_delay
    pub fn startup_budget(&self) -> Duration {
        self.poll_delay() * self.poll_attempts
    }
}

/// Get the config file path
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists
pub fn load_config() -> Result<AppConfig, String> {
    let config_path = get_config_path();

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config(&config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file
pub fn save_config(config: &AppConfig) -> Result<(), String> {
    let config_path = get_config_path();

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(&config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

/// Get global configuration instance
pub fn get_config() -> Arc<RwLock<AppConfig>> {
    CONFIG
        .get_or_init(|| {
            let config = load_config().unwrap_or_default();
            Arc::new(RwLock::new(config))
        })
        .clone()
}

/// Get a read-only snapshot of current config
pub fn config() -> AppConfig {
    get_config().read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_startup_budget() {
        let config = PostgresConfig::default();
        assert_eq!(config.poll_attempts, 100);
        assert_eq!(config.poll_delay(), Duration::from_millis(100));
        assert_eq!(config.startup_budget(), Duration::from_secs(10));
    }

    #[test]
    fn test_connect_options_target_the_right_databases() {
        let config = PostgresConfig::default();
        assert_eq!(config.admin_connect_options().get_database(), Some("postgres"));
        assert_eq!(config.search_connect_options().get_database(), Some("documents"));
        assert_eq!(config.admin_connect_options().get_port(), 5432);
    }

    #[test]
    fn test_socket_dir_is_absolute() {
        let config = PostgresConfig::default();
        assert!(config.get_socket_dir().is_absolute());

        let absolute = PostgresConfig {
            socket_dir: "/tmp/pg_socket".to_string(),
            ..PostgresConfig::default()
        };
        assert_eq!(absolute.get_socket_dir(), PathBuf::from("/tmp/pg_socket"));
    }

    #[test]
    fn test_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.get_bind_address(), "0.0.0.0:3000");
    }
}
