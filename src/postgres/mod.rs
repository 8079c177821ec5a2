//! PostgreSQL lifecycle management
//!
//! - supervisor: detects/launches the engine process and polls readiness
//! - provisioner: creates the documents database and its schema once
//! - lifecycle: runs both as ordered startup stages before serving

pub mod lifecycle;
pub mod provisioner;
pub mod supervisor;

pub use lifecycle::{ensure_ready, StartupStage};
pub use provisioner::{ProvisionOutcome, SchemaProvisioner};
pub use supervisor::EngineSupervisor;
