//! Webhook Service
//!
//! Turns a GitHub push delivery into a pipeline run: verify, filter by event,
//! parse, match a binding, snapshot the pipeline and append the run.

use chrono::Utc;
use otto_core::domain::run::{NewRun, RunTrigger};
use otto_core::dto::webhook::{WebhookResponse, WebhookRunData};
use otto_core::github::{PUSH_EVENT, PushEvent};
use uuid::Uuid;

use crate::repository::StoreError;
use crate::service::binding::{self, BindingError};
use crate::service::delivery::DeliveryGuard;
use crate::service::ledger::RunError;
use crate::service::signature;
use crate::state::AppState;

/// Recorded as `trigger_by` on webhook runs
pub const WEBHOOK_TRIGGER_BY: &str = "github-webhook";

/// Raw delivery as received over HTTP
#[derive(Debug, Clone, Copy)]
pub struct Delivery<'a> {
    /// `X-GitHub-Event`
    pub event: Option<&'a str>,
    /// `X-GitHub-Delivery`
    pub delivery_id: Option<&'a str>,
    /// `X-Hub-Signature-256`
    pub signature: Option<&'a str>,
    pub body: &'a [u8],
}

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("no active webhook binding for repository {repo_id} branch '{branch}'")]
    NoBinding { repo_id: i64, branch: String },

    #[error("pipeline {pipeline_id} cannot be executed: {reason}")]
    PipelineUnavailable { pipeline_id: Uuid, reason: String },

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WebhookError {
    pub fn is_retryable(&self) -> bool {
        match self {
            WebhookError::Run(e) => e.is_retryable(),
            WebhookError::Binding(e) => e.is_retryable(),
            WebhookError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, WebhookError>;

/// Handle one delivery
pub async fn receive(state: &AppState, delivery: Delivery<'_>) -> Result<WebhookResponse> {
    if let Some(secret) = &state.webhook_secret {
        let valid = delivery
            .signature
            .is_some_and(|header| signature::verify(secret, delivery.body, header));
        if !valid {
            tracing::warn!("Rejected webhook delivery with a missing or invalid signature");
            return Err(WebhookError::InvalidSignature);
        }
    }

    // Checked before parsing: other event payloads do not look like pushes
    let event = delivery
        .event
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| WebhookError::InvalidPayload("missing X-GitHub-Event header".to_string()))?;

    if event != PUSH_EVENT {
        tracing::info!("Ignoring '{}' webhook event", event);
        return Ok(WebhookResponse::ignored(event));
    }

    let push =
        PushEvent::parse(delivery.body).map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
    let repo_id = push.repository.id;
    let branch = push.branch();

    tracing::info!(
        "Push to {} ({}) branch '{}' at {}",
        push.repository.full_name,
        repo_id,
        branch,
        push.commit_sha()
    );

    let dedupe = state.deliveries.as_ref().map(|guard| {
        let key = DeliveryGuard::key(delivery.delivery_id, repo_id, branch, push.commit_sha());
        (guard, key)
    });

    if let Some((guard, key)) = &dedupe {
        if let Some(data) = guard.lookup(key).await {
            tracing::info!(
                "Duplicate delivery for run #{} ({}), not creating another run",
                data.run_number,
                data.run_id
            );
            return Ok(WebhookResponse::duplicate(data));
        }
    }

    let binding = binding::find_active(state.bindings.as_ref(), repo_id, branch)
        .await?
        .ok_or_else(|| WebhookError::NoBinding {
            repo_id,
            branch: branch.to_string(),
        })?;

    let pipeline = state
        .pipelines
        .find_by_id(binding.pipeline_id)
        .await?
        .ok_or_else(|| WebhookError::PipelineUnavailable {
            pipeline_id: binding.pipeline_id,
            reason: format!(
                "pipeline {} bound to {} no longer exists",
                binding.pipeline_id, binding.github_repo_name
            ),
        })?;

    let now = Utc::now();
    let trigger_data = push.trigger_data(now);

    let run = state
        .ledger
        .create_run(NewRun {
            pipeline_id: pipeline.id,
            trigger: RunTrigger::Webhook,
            trigger_by: WEBHOOK_TRIGGER_BY.to_string(),
            pipeline_snapshot: pipeline.content,
            webhook_data: Some(trigger_data.clone()),
        })
        .await?;

    // The run exists at this point; bookkeeping failures must not fail the
    // delivery or GitHub would redeliver it
    if let Err(e) = binding::touch(state.bindings.as_ref(), binding.id, now).await {
        tracing::warn!("Failed to record trigger time on binding {}: {}", binding.id, e);
    }

    let data = WebhookRunData::from_run(&run, &binding, &trigger_data);

    if let Some((guard, key)) = dedupe {
        guard.record(key, data.clone()).await;
    }

    Ok(WebhookResponse::triggered(data))
}
