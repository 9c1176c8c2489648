//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories and contain domain logic.

pub mod binding;
pub mod delivery;
pub mod ledger;
pub mod log;
pub mod pipeline;
pub mod query;
pub mod signature;
pub mod webhook;

// Re-export for convenience
pub use binding as binding_service;
pub use ledger::RunLedger;
pub use log as log_service;
pub use pipeline as pipeline_service;
pub use query as query_service;
pub use webhook as webhook_service;
