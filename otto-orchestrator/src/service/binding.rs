//! Binding Service
//!
//! Registry of which pipeline a push to a repository branch triggers.

use chrono::{DateTime, Utc};
use otto_core::domain::binding::{ConflictPolicy, WebhookBinding};
use otto_core::dto::binding::ConnectBinding;
use uuid::Uuid;

use crate::repository::{BindingStore, StoreError};

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("{0}")]
    ValidationError(String),

    #[error("an active binding already exists for repository {repo_id} branch '{branch}'")]
    Conflict { repo_id: i64, branch: String },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for BindingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BindingConflict { repo_id, branch } => {
                BindingError::Conflict { repo_id, branch }
            }
            other => BindingError::Store(other),
        }
    }
}

impl BindingError {
    pub fn is_retryable(&self) -> bool {
        match self {
            BindingError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BindingError>;

/// Connect a pipeline to a repository branch
pub async fn connect(
    store: &dyn BindingStore,
    req: ConnectBinding,
    policy: ConflictPolicy,
) -> Result<WebhookBinding> {
    validate_connect_request(&req)?;

    let binding = WebhookBinding {
        id: Uuid::new_v4(),
        pipeline_id: req.pipeline_id,
        project_id: req.project_id,
        github_repo_id: req.github_repo_id,
        github_repo_name: req.github_repo_name,
        trigger_branch: req.trigger_branch,
        is_active: true,
        created_at: Utc::now(),
        last_triggered_at: None,
    };

    let binding = store.insert(binding, policy).await?;

    tracing::info!(
        "Pipeline {} bound to {} ({}) branch '{}'",
        binding.pipeline_id,
        binding.github_repo_name,
        binding.github_repo_id,
        binding.trigger_branch
    );

    Ok(binding)
}

/// The binding a push to `branch` of repository `repo_id` triggers, if any
pub async fn find_active(
    store: &dyn BindingStore,
    repo_id: i64,
    branch: &str,
) -> Result<Option<WebhookBinding>> {
    Ok(store.find_active(repo_id, branch).await?)
}

/// Deactivate every binding of a pipeline.
///
/// Returns whether the pipeline had any binding.
pub async fn disable(store: &dyn BindingStore, pipeline_id: Uuid) -> Result<bool> {
    let found = store.disable_pipeline(pipeline_id).await?;

    if found {
        tracing::info!("Webhook bindings disabled for pipeline {}", pipeline_id);
    } else {
        tracing::debug!("No webhook bindings to disable for pipeline {}", pipeline_id);
    }

    Ok(found)
}

/// List a project's bindings
pub async fn list_by_project(
    store: &dyn BindingStore,
    project_id: &str,
) -> Result<Vec<WebhookBinding>> {
    Ok(store.list_by_project(project_id).await?)
}

/// Record that a binding just triggered a run
pub async fn touch(store: &dyn BindingStore, binding_id: Uuid, at: DateTime<Utc>) -> Result<()> {
    Ok(store.touch(binding_id, at).await?)
}

// =============================================================================
// Validation
// =============================================================================

fn validate_connect_request(req: &ConnectBinding) -> Result<()> {
    if req.project_id.trim().is_empty() {
        return Err(BindingError::ValidationError(
            "Project id cannot be empty".to_string(),
        ));
    }

    if req.github_repo_name.trim().is_empty() {
        return Err(BindingError::ValidationError(
            "Repository name cannot be empty".to_string(),
        ));
    }

    if req.trigger_branch.trim().is_empty() {
        return Err(BindingError::ValidationError(
            "Trigger branch cannot be empty".to_string(),
        ));
    }

    Ok(())
}
