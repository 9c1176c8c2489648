//! Run Query Service
//!
//! Read side of the run ledger.

use otto_core::domain::run::PipelineRun;
use otto_core::dto::run::{PageRequest, RunPage};
use uuid::Uuid;

use crate::repository::RunStore;
use crate::service::ledger::Result;

/// A page of a pipeline's runs, most recently started first
pub async fn list_runs(
    runs: &dyn RunStore,
    pipeline_id: Uuid,
    page: PageRequest,
) -> Result<RunPage> {
    let (page_runs, total) = runs.list_by_pipeline(pipeline_id, page).await?;

    tracing::debug!(
        "Listed {} of {} runs for pipeline {} (page {})",
        page_runs.len(),
        total,
        pipeline_id,
        page.page
    );

    Ok(RunPage {
        runs: page_runs,
        total,
        page: page.page,
        limit: page.limit,
    })
}

pub async fn get_run(runs: &dyn RunStore, run_id: Uuid) -> Result<Option<PipelineRun>> {
    Ok(runs.find_by_id(run_id).await?)
}

/// The pipeline's most recently started run
pub async fn get_latest_run(
    runs: &dyn RunStore,
    pipeline_id: Uuid,
) -> Result<Option<PipelineRun>> {
    Ok(runs.latest(pipeline_id).await?)
}
