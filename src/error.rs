//! Error types for startup and search
//!
//! Startup errors are fatal: the process must not serve traffic if the
//! engine or schema could not be brought up. Search errors are scoped to
//! a single request.

use std::time::Duration;
use thiserror::Error;

/// Fatal errors raised while bringing the database online
#[derive(Debug, Error)]
pub enum StartupError {
    /// The engine was unreachable when a connection was required
    #[error("PostgreSQL connection failed: {0}")]
    Connection(#[from] sqlx::Error),

    /// Formatting the cluster or launching the engine process failed
    #[error("Failed to start PostgreSQL: {0}")]
    Launch(String),

    /// The engine never accepted a connection within the poll budget
    #[error(
        "PostgreSQL did not become ready after {} connection attempts ({} ms waited)",
        .attempts,
        .waited.as_millis()
    )]
    StartupTimeout { attempts: u32, waited: Duration },

    /// Applying the database schema failed; manual recovery may be needed
    #[error("Schema provisioning failed: {0}")]
    SchemaProvision(String),
}

/// Per-request errors raised while executing a scoped search
#[derive(Debug, Error)]
pub enum SearchError {
    /// The caller presented an invalid identity; surfaced as 401
    #[error("Authentication rejected: {0}")]
    AuthenticationRejected(String),

    /// Any database failure during the search; surfaced as 500
    #[error("Search query failed: {0}")]
    QueryExecution(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_timeout_reports_the_full_budget() {
        let err = StartupError::StartupTimeout {
            attempts: 100,
            waited: Duration::from_secs(10),
        };
        let msg = err.to_string();
        assert!(msg.contains("100 connection attempts"));
        assert!(msg.contains("10000 ms"));
    }

    #[test]
    fn test_launch_error_display() {
        let err = StartupError::Launch("initdb exited with status 1".to_string());
        assert!(err.to_string().contains("initdb exited with status 1"));
    }
}
