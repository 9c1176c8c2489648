//! Pipeline run domain types
//!
//! A run is one execution of a pipeline. Runs are created `Queued`, move to
//! `Running` once the executor reports that it picked them up, and end in one
//! of three absorbing terminal states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Execution record for a single pipeline invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub run_number: u32,
    pub trigger: RunTrigger,
    pub trigger_by: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Whole seconds between `started_at` and `completed_at`
    pub duration: Option<u64>,
    pub webhook_data: Option<WebhookTriggerData>,
    /// Pipeline definition exactly as it was when the run was triggered
    pub pipeline_snapshot: String,
    pub logs_url: Option<String>,
    pub result_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What caused a run to be created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunTrigger {
    Manual,
    Webhook,
    Schedule,
}

/// Run execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Success,
    Failed,
    Cancelled,
}

/// Push metadata recorded on webhook-triggered runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookTriggerData {
    pub repository: String,
    pub branch: String,
    pub commit: String,
    pub commit_message: String,
    pub author: String,
    pub webhook_received_at: DateTime<Utc>,
}

/// Everything needed to append a run to the ledger
///
/// The run number is not part of this: it is assigned by the store at insert
/// time.
#[derive(Debug, Clone)]
pub struct NewRun {
    pub pipeline_id: Uuid,
    pub trigger: RunTrigger,
    pub trigger_by: String,
    pub pipeline_snapshot: String,
    pub webhook_data: Option<WebhookTriggerData>,
}

/// Optional fields reported together with a status change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_message: Option<String>,
}

/// Rejected status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move run from {from} to {to}")]
pub struct TransitionError {
    pub from: RunStatus,
    pub to: RunStatus,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Success | RunStatus::Failed | RunStatus::Cancelled
        )
    }

    /// Whether a run in this status may be moved to `next`.
    ///
    /// Repeating the current status is always allowed so that executors can
    /// safely resend a completion.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        if *self == next {
            return true;
        }

        match self {
            RunStatus::Queued => true,
            RunStatus::Running => next != RunStatus::Queued,
            RunStatus::Success | RunStatus::Failed | RunStatus::Cancelled => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunTrigger::Manual => "manual",
            RunTrigger::Webhook => "webhook",
            RunTrigger::Schedule => "schedule",
        }
    }
}

impl std::fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PipelineRun {
    /// Builds a freshly queued run
    pub fn queued(id: Uuid, run_number: u32, new: NewRun, now: DateTime<Utc>) -> Self {
        Self {
            id,
            pipeline_id: new.pipeline_id,
            run_number,
            trigger: new.trigger,
            trigger_by: new.trigger_by,
            status: RunStatus::Queued,
            started_at: now,
            completed_at: None,
            duration: None,
            webhook_data: new.webhook_data,
            pipeline_snapshot: new.pipeline_snapshot,
            logs_url: None,
            result_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a status change reported at `now`.
    ///
    /// `completed_at` and `duration` are stamped on the first transition into
    /// a terminal state and never touched again.
    pub fn apply_status(
        &mut self,
        status: RunStatus,
        update: RunUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(status) {
            return Err(TransitionError {
                from: self.status,
                to: status,
            });
        }

        if status.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(now);
            self.duration = Some(elapsed_seconds(self.started_at, now));
        }

        self.status = status;

        if let Some(logs_url) = update.logs_url {
            self.logs_url = Some(logs_url);
        }
        if let Some(message) = update.result_message {
            self.result_message = Some(message);
        }

        self.updated_at = now;
        Ok(())
    }
}

/// Whole seconds from `start` to `end`, never negative
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    end.signed_duration_since(start).num_seconds().max(0) as u64
}
