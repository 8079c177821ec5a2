//! PostgreSQL process supervisor
//!
//! Tries a direct connection first; only when the engine is unreachable
//! and no initialized cluster exists does it format a fresh data
//! directory. The engine is launched detached and confirmed via a
//! bounded readiness poll.

use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::PostgresConfig;
use crate::error::StartupError;
use crate::postgres::lifecycle::StartupStage;

/// Probe the engine with a single connection.
/// The probe connection is closed immediately on success.
pub(crate) async fn probe(options: &PgConnectOptions) -> Result<(), sqlx::Error> {
    let conn = PgConnection::connect_with(options).await?;
    conn.close().await
}

/// Whether `data_dir` looks like an initialized cluster.
/// initdb writes PG_VERSION as the last step, so its presence is the
/// marker that data exists and must not be wiped.
fn cluster_initialized(data_dir: &Path) -> bool {
    data_dir.is_dir() && data_dir.join("PG_VERSION").is_file()
}

/// Ensures a reachable PostgreSQL engine, formatting and launching a
/// local cluster when none is running.
pub struct EngineSupervisor {
    config: PostgresConfig,
}

impl EngineSupervisor {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }

    /// Probe, format a fresh cluster if none exists, launch the engine
    /// detached, then poll until it accepts connections.
    pub async fn ensure_engine_running(&self) -> Result<(), StartupError> {
        let options = self.config.admin_connect_options();

        if probe(&options).await.is_ok() {
            tracing::info!("PostgreSQL already running");
            return Ok(());
        }

        tracing::info!("PostgreSQL not reachable, attempting to start...");
        self.format_cluster_if_needed().await?;
        self.launch_engine()?;
        self.wait_until_ready(&options).await
    }

    /// One-time format: recreate the socket directory and initdb the data
    /// directory. A valid-looking cluster is never wiped, so a transient
    /// connection failure cannot destroy existing data.
    async fn format_cluster_if_needed(&self) -> Result<(), StartupError> {
        let socket_dir = self.config.get_socket_dir();
        let data_dir = self.config.get_data_dir();

        if cluster_initialized(&data_dir) {
            tracing::debug!("Existing cluster found at {:?}, skipping initdb", data_dir);
            std::fs::create_dir_all(&socket_dir)
                .map_err(|e| StartupError::Launch(format!("socket directory: {}", e)))?;
            return Ok(());
        }

        tracing::info!("No initialized cluster at {:?}, formatting...", data_dir);

        if socket_dir.exists() {
            std::fs::remove_dir_all(&socket_dir)
                .map_err(|e| StartupError::Launch(format!("socket directory: {}", e)))?;
        }
        std::fs::create_dir_all(&socket_dir)
            .map_err(|e| StartupError::Launch(format!("socket directory: {}", e)))?;

        if data_dir.exists() {
            std::fs::remove_dir_all(&data_dir)
                .map_err(|e| StartupError::Launch(format!("data directory: {}", e)))?;
        }

        let mut initdb = Command::new("initdb");
        initdb.arg("-D").arg(&data_dir);
        if let Some(user) = &self.config.user {
            initdb.arg("-U").arg(user);
        }
        let output = initdb
            .output()
            .await
            .map_err(|e| StartupError::Launch(format!("initdb: {}", e)))?;
        if !output.status.success() {
            return Err(StartupError::Launch(format!(
                "initdb exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tracing::info!("Initialized new cluster at {:?}", data_dir);
        Ok(())
    }

    /// Launch the engine detached. pg_ctl itself daemonizes the
    /// postmaster, which is expected to outlive this process; only the
    /// short-lived pg_ctl child is reaped.
    fn launch_engine(&self) -> Result<(), StartupError> {
        let data_dir = self.config.get_data_dir();
        let socket_opt = format!(
            "-c unix_socket_directories='{}'",
            self.config.get_socket_dir().display()
        );

        let mut child = Command::new("pg_ctl")
            .arg("-D")
            .arg(&data_dir)
            .arg("-o")
            .arg(&socket_opt)
            .arg("start")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| StartupError::Launch(format!("pg_ctl: {}", e)))?;

        tokio::spawn(async move {
            let _ = child.wait().await;
        });

        tracing::info!("Launched PostgreSQL from {:?}", data_dir);
        Ok(())
    }

    /// Poll until the engine accepts a connection, up to the configured
    /// attempt budget. Exhausting the budget is fatal.
    async fn wait_until_ready(&self, options: &PgConnectOptions) -> Result<(), StartupError> {
        let attempts = self.config.poll_attempts;
        let delay = self.config.poll_delay();

        for attempt in 1..=attempts {
            match probe(options).await {
                Ok(()) => {
                    tracing::info!("PostgreSQL ready after {} attempt(s)", attempt);
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!("Not ready yet (attempt {}/{}): {}", attempt, attempts, e);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(StartupError::StartupTimeout {
            attempts,
            waited: self.config.startup_budget(),
        })
    }
}

#[async_trait]
impl StartupStage for EngineSupervisor {
    fn name(&self) -> &'static str {
        "postgres-engine"
    }

    async fn can_handle(&self) -> Result<(), StartupError> {
        if self.config.poll_attempts == 0 {
            return Err(StartupError::Launch(
                "poll_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    async fn handle(&self) -> Result<(), StartupError> {
        self.ensure_engine_running().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_data_dir_is_not_a_cluster() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!cluster_initialized(&dir.path().join("missing")));
    }

    #[test]
    fn test_empty_data_dir_is_not_a_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("postgresql");
        std::fs::create_dir(&data).unwrap();
        assert!(!cluster_initialized(&data));
    }

    #[test]
    fn test_file_at_data_dir_path_is_not_a_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("postgresql");
        std::fs::write(&data, "not a directory").unwrap();
        assert!(!cluster_initialized(&data));
    }

    #[test]
    fn test_initialized_data_dir_is_a_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("postgresql");
        std::fs::create_dir(&data).unwrap();
        std::fs::write(data.join("PG_VERSION"), "16\n").unwrap();
        assert!(cluster_initialized(&data));
    }
}
