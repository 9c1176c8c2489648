//! Shared application state
//!
//! Handed to every axum handler. Stores sit behind their traits so the same
//! handlers run against Postgres in production and memory in tests.

use std::sync::Arc;

use otto_core::domain::binding::ConflictPolicy;
use sqlx::PgPool;

use crate::config::Config;
use crate::repository::{
    BindingStore, InMemoryBindingStore, InMemoryLogStore, InMemoryPipelineStore,
    InMemoryRunStore, LogStore, PgBindingStore, PgLogStore, PgPipelineStore, PgRunStore,
    PipelineStore, RunStore,
};
use crate::service::RunLedger;
use crate::service::delivery::DeliveryGuard;

#[derive(Clone)]
pub struct AppState {
    pub bindings: Arc<dyn BindingStore>,
    pub runs: Arc<dyn RunStore>,
    pub pipelines: Arc<dyn PipelineStore>,
    pub logs: Arc<dyn LogStore>,
    pub ledger: RunLedger,
    /// Present when webhook de-duplication is enabled
    pub deliveries: Option<Arc<DeliveryGuard>>,
    pub webhook_secret: Option<String>,
    pub conflict_policy: ConflictPolicy,
}

impl AppState {
    /// State backed by in-memory stores
    pub fn in_memory(config: &Config) -> Self {
        Self::new(
            Arc::new(InMemoryBindingStore::new()),
            Arc::new(InMemoryRunStore::new()),
            Arc::new(InMemoryPipelineStore::new()),
            Arc::new(InMemoryLogStore::new()),
            config,
        )
    }

    /// State backed by Postgres
    pub fn postgres(pool: PgPool, config: &Config) -> Self {
        Self::new(
            Arc::new(PgBindingStore::new(pool.clone())),
            Arc::new(PgRunStore::new(pool.clone())),
            Arc::new(PgPipelineStore::new(pool.clone())),
            Arc::new(PgLogStore::new(pool)),
            config,
        )
    }

    pub fn new(
        bindings: Arc<dyn BindingStore>,
        runs: Arc<dyn RunStore>,
        pipelines: Arc<dyn PipelineStore>,
        logs: Arc<dyn LogStore>,
        config: &Config,
    ) -> Self {
        let ledger = RunLedger::new(runs.clone()).with_auto_start(config.auto_start_delay);

        Self {
            bindings,
            runs,
            pipelines,
            logs,
            ledger,
            deliveries: config
                .dedupe_window
                .map(|window| Arc::new(DeliveryGuard::new(window))),
            webhook_secret: config.webhook_secret.clone(),
            conflict_policy: config.binding_conflict,
        }
    }
}
