//! Pipeline Service
//!
//! Business logic for pipeline definition management.

use otto_core::domain::pipeline::PipelineDefinition;
use otto_core::dto::pipeline::{CreatePipeline, UpdatePipeline};
use uuid::Uuid;

use crate::repository::{PipelineStore, StoreError};

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("pipeline {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Create a new pipeline
pub async fn create_pipeline(
    store: &dyn PipelineStore,
    req: CreatePipeline,
) -> Result<PipelineDefinition> {
    validate_name(&req.name)?;
    validate_content(&req.content)?;

    if req.project_id.trim().is_empty() {
        return Err(PipelineError::ValidationError(
            "Project id cannot be empty".to_string(),
        ));
    }

    let pipeline = store.create(req).await?;

    tracing::info!("Pipeline created: {} ({})", pipeline.name, pipeline.id);

    Ok(pipeline)
}

/// Get a pipeline by ID
pub async fn get_pipeline(store: &dyn PipelineStore, id: Uuid) -> Result<PipelineDefinition> {
    let pipeline = store
        .find_by_id(id)
        .await?
        .ok_or(PipelineError::NotFound(id))?;

    Ok(pipeline)
}

/// List all pipelines
pub async fn list_pipelines(store: &dyn PipelineStore) -> Result<Vec<PipelineDefinition>> {
    let pipelines = store.list_all().await?;
    Ok(pipelines)
}

/// Update a pipeline.
///
/// Runs already created keep the snapshot they were created with.
pub async fn update_pipeline(
    store: &dyn PipelineStore,
    id: Uuid,
    req: UpdatePipeline,
) -> Result<PipelineDefinition> {
    if let Some(name) = &req.name {
        validate_name(name)?;
    }
    if let Some(content) = &req.content {
        validate_content(content)?;
    }

    let updated = store
        .update(id, req)
        .await?
        .ok_or(PipelineError::NotFound(id))?;

    tracing::info!("Pipeline updated: {} ({})", updated.name, updated.id);

    Ok(updated)
}

/// Delete a pipeline
pub async fn delete_pipeline(store: &dyn PipelineStore, id: Uuid) -> Result<()> {
    let deleted = store.delete(id).await?;

    if !deleted {
        return Err(PipelineError::NotFound(id));
    }

    tracing::info!("Pipeline deleted: {}", id);

    Ok(())
}

// =============================================================================
// Validation
// =============================================================================

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(PipelineError::ValidationError(
            "Pipeline name cannot be empty".to_string(),
        ));
    }

    if name.chars().count() > 255 {
        return Err(PipelineError::ValidationError(
            "Pipeline name is too long (max 255 characters)".to_string(),
        ));
    }

    Ok(())
}

/// Content is the editor's graph document; only its outer shape is checked
fn validate_content(content: &str) -> Result<()> {
    let document: serde_json::Value = serde_json::from_str(content).map_err(|e| {
        PipelineError::ValidationError(format!("Pipeline content is not valid JSON: {}", e))
    })?;

    if !document.get("blocks").is_some_and(|b| b.is_array()) {
        return Err(PipelineError::ValidationError(
            "Pipeline content must contain a 'blocks' array".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryPipelineStore;

    fn create_req(name: &str, content: &str) -> CreatePipeline {
        CreatePipeline {
            project_id: "proj-1".to_string(),
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_validate_empty_name() {
        let result = validate_name("   ");
        assert!(matches!(result, Err(PipelineError::ValidationError(_))));
    }

    #[test]
    fn test_validate_long_name() {
        assert!(validate_name(&"x".repeat(255)).is_ok());
        assert!(validate_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_validate_content_shape() {
        assert!(validate_content(r#"{"blocks":[]}"#).is_ok());
        assert!(validate_content(r#"{"blocks":[{"id":"a","type":"shell"}],"edges":[]}"#).is_ok());
        assert!(validate_content("not json").is_err());
        assert!(validate_content(r#"{"blocks":{}}"#).is_err());
        assert!(validate_content(r#"{"nodes":[]}"#).is_err());
    }

    #[tokio::test]
    async fn test_create_and_update() {
        let store = InMemoryPipelineStore::new();
        let pipeline = create_pipeline(&store, create_req("build", r#"{"blocks":[]}"#))
            .await
            .unwrap();

        let err = update_pipeline(
            &store,
            pipeline.id,
            UpdatePipeline {
                name: None,
                content: Some("{}".to_string()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::ValidationError(_)));

        let updated = update_pipeline(
            &store,
            pipeline.id,
            UpdatePipeline {
                name: Some("build and test".to_string()),
                content: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "build and test");
        assert_eq!(updated.content, r#"{"blocks":[]}"#);
    }

    #[tokio::test]
    async fn test_missing_pipeline() {
        let store = InMemoryPipelineStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            get_pipeline(&store, id).await,
            Err(PipelineError::NotFound(_))
        ));
        assert!(matches!(
            delete_pipeline(&store, id).await,
            Err(PipelineError::NotFound(_))
        ));
    }
}
