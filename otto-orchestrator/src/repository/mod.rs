//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Each repository exposes a storage port (an async trait) for one domain
//! entity, with an in-memory implementation for tests and single-node use and
//! a Postgres implementation for production.

pub mod binding;
pub mod log;
pub mod pipeline;
pub mod run;

use otto_core::domain::run::TransitionError;
use uuid::Uuid;

// Re-export for convenience
pub use binding::{BindingStore, InMemoryBindingStore, PgBindingStore};
pub use log::{InMemoryLogStore, LogStore, PgLogStore};
pub use pipeline::{InMemoryPipelineStore, PgPipelineStore, PipelineStore};
pub use run::{InMemoryRunStore, PgRunStore, RunStore};

/// Errors raised by storage implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Another writer kept taking the next run number
    #[error("could not assign a run number for pipeline {0}")]
    RunNumberConflict(Uuid),

    #[error("an active binding already exists for repository {repo_id} branch '{branch}'")]
    BindingConflict { repo_id: i64, branch: String },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("failed to encode record: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Database(_) | StoreError::RunNumberConflict(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
