//! Webhook delivery de-duplication
//!
//! GitHub redelivers a webhook when it does not get a timely response. When
//! enabled, replays seen within the window are answered with the run the
//! first delivery created.

use std::collections::HashMap;
use std::time::Duration;

use otto_core::dto::webhook::WebhookRunData;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Recently handled deliveries, keyed by delivery id or push identity
#[derive(Debug)]
pub struct DeliveryGuard {
    window: Duration,
    seen: Mutex<HashMap<String, (Instant, WebhookRunData)>>,
}

impl DeliveryGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Key for a delivery: GitHub's delivery id when present, otherwise the
    /// pushed repository, branch and commit
    pub fn key(delivery_id: Option<&str>, repo_id: i64, branch: &str, commit: &str) -> String {
        match delivery_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => format!("delivery:{}", id.trim()),
            None => format!("push:{}:{}:{}", repo_id, branch, commit),
        }
    }

    /// The run recorded for `key`, if it is still within the window
    pub async fn lookup(&self, key: &str) -> Option<WebhookRunData> {
        let mut seen = self.seen.lock().await;
        self.prune(&mut seen);
        seen.get(key).map(|(_, data)| data.clone())
    }

    pub async fn record(&self, key: String, data: WebhookRunData) {
        let mut seen = self.seen.lock().await;
        self.prune(&mut seen);
        seen.insert(key, (Instant::now(), data));
    }

    fn prune(&self, seen: &mut HashMap<String, (Instant, WebhookRunData)>) {
        let window = self.window;
        seen.retain(|_, (at, _)| at.elapsed() < window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use otto_core::domain::run::RunTrigger;
    use otto_core::dto::webhook::{ExecutionEcho, WebhookConfigEcho};
    use uuid::Uuid;

    fn run_data() -> WebhookRunData {
        WebhookRunData {
            pipeline_id: Uuid::new_v4(),
            run_id: Uuid::new_v4(),
            run_number: 1,
            project_id: "proj-1".to_string(),
            repository: "acme/api".to_string(),
            branch: "main".to_string(),
            commit: "abc1234".to_string(),
            commit_message: "fix".to_string(),
            author: "dev".to_string(),
            webhook_config: WebhookConfigEcho {
                trigger_branch: "main".to_string(),
                github_repo_name: "acme/api".to_string(),
            },
            execution: ExecutionEcho {
                trigger: RunTrigger::Webhook,
                started_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_key_prefers_delivery_id() {
        assert_eq!(
            DeliveryGuard::key(Some("d-1"), 1, "main", "abc"),
            "delivery:d-1"
        );
        assert_eq!(DeliveryGuard::key(None, 1, "main", "abc"), "push:1:main:abc");
        assert_eq!(DeliveryGuard::key(Some(" "), 1, "main", "abc"), "push:1:main:abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_window() {
        let guard = DeliveryGuard::new(Duration::from_secs(60));
        let data = run_data();
        guard.record("delivery:d-1".to_string(), data.clone()).await;

        assert_eq!(guard.lookup("delivery:d-1").await, Some(data));
        assert!(guard.lookup("delivery:d-2").await.is_none());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(guard.lookup("delivery:d-1").await.is_none());
    }
}
