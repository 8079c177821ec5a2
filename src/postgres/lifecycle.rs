//! Startup orchestration
//!
//! Runs the ordered startup stages exactly once at process start, before
//! the HTTP listener binds. Each stage follows a two-phase contract:
//! `can_handle` validates the stage's precondition without side effects,
//! `handle` performs the (idempotent) work. Any failure aborts startup.

use async_trait::async_trait;

use crate::config::PostgresConfig;
use crate::error::StartupError;
use crate::postgres::provisioner::SchemaProvisioner;
use crate::postgres::supervisor::EngineSupervisor;

/// A single unit of startup work
#[async_trait]
pub trait StartupStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Validate the stage's precondition; Err is the reject reason.
    async fn can_handle(&self) -> Result<(), StartupError>;

    /// Perform the stage's work. Must be safe to run on every start.
    async fn handle(&self) -> Result<(), StartupError>;
}

/// Bring the engine and schema up. Safe to invoke on every process
/// start; when everything is already provisioned this is a no-op apart
/// from the connection probes.
pub async fn ensure_ready(config: &PostgresConfig) -> Result<(), StartupError> {
    let stages: Vec<Box<dyn StartupStage>> = vec![
        Box::new(EngineSupervisor::new(config.clone())),
        Box::new(SchemaProvisioner::new(config.clone())),
    ];

    for stage in &stages {
        tracing::debug!("Startup stage '{}': checking", stage.name());
        stage.can_handle().await?;
        stage.handle().await?;
        tracing::info!("Startup stage '{}' complete", stage.name());
    }

    Ok(())
}
