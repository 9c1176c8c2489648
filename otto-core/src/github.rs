//! GitHub webhook payloads
//!
//! Only the parts of the `push` event that Otto consumes are modelled. Every
//! other field GitHub sends is ignored during deserialization.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::run::WebhookTriggerData;

/// Header carrying the event name
pub const EVENT_HEADER: &str = "x-github-event";

/// Header carrying the unique delivery id
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// Header carrying `sha256=<hex>` HMAC of the raw body
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// The only event that triggers runs
pub const PUSH_EVENT: &str = "push";

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Body of a `push` event
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    pub repository: PushRepository,

    #[serde(rename = "ref")]
    pub git_ref: String,

    /// Only checked for presence; individual commits are not inspected
    pub commits: Vec<serde_json::Value>,

    /// `null` when a branch is deleted
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,

    #[serde(default)]
    pub pusher: Option<Pusher>,

    /// SHA the ref points to after the push
    #[serde(default)]
    pub after: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushRepository {
    pub id: i64,
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadCommit {
    pub id: String,
    pub message: String,
    pub author: CommitAuthor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pusher {
    pub name: String,
}

impl PushEvent {
    /// Parses a raw request body
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Branch the push went to
    pub fn branch(&self) -> &str {
        extract_branch_name(&self.git_ref)
    }

    /// Full SHA of the pushed head, falling back to `after` when GitHub sends
    /// no head commit
    pub fn commit_sha(&self) -> &str {
        self.head_commit
            .as_ref()
            .map(|c| c.id.as_str())
            .or(self.after.as_deref())
            .unwrap_or_default()
    }

    pub fn commit_message(&self) -> &str {
        self.head_commit
            .as_ref()
            .map(|c| c.message.as_str())
            .unwrap_or_default()
    }

    /// Head commit author, or the pusher when there is no head commit
    pub fn author(&self) -> &str {
        self.head_commit
            .as_ref()
            .map(|c| c.author.name.as_str())
            .or(self.pusher.as_ref().map(|p| p.name.as_str()))
            .unwrap_or_default()
    }

    /// Metadata stored on the run this push creates
    pub fn trigger_data(&self, received_at: DateTime<Utc>) -> WebhookTriggerData {
        WebhookTriggerData {
            repository: self.repository.full_name.clone(),
            branch: self.branch().to_string(),
            commit: self.commit_sha().to_string(),
            commit_message: self.commit_message().to_string(),
            author: self.author().to_string(),
            webhook_received_at: received_at,
        }
    }
}

/// Strips the `refs/heads/` prefix from a git ref.
///
/// Nested slashes in branch names are preserved. Any other ref form (tags,
/// notes) is returned unchanged and will simply not match a binding.
pub fn extract_branch_name(git_ref: &str) -> &str {
    git_ref.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(git_ref)
}

/// First seven characters of a commit SHA
pub fn short_sha(sha: &str) -> &str {
    match sha.char_indices().nth(7) {
        Some((idx, _)) => &sha[..idx],
        None => sha,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUSH: &str = r#"{
        "ref": "refs/heads/feature/login",
        "after": "0123456789abcdef0123456789abcdef01234567",
        "repository": { "id": 1296269, "full_name": "octocat/Hello-World", "private": false },
        "commits": [{ "id": "0123456789abcdef0123456789abcdef01234567" }],
        "head_commit": {
            "id": "0123456789abcdef0123456789abcdef01234567",
            "message": "Fix login redirect",
            "author": { "name": "Mona Lisa", "email": "mona@example.com" }
        },
        "pusher": { "name": "octocat" }
    }"#;

    #[test]
    fn test_extract_branch_name() {
        assert_eq!(extract_branch_name("refs/heads/main"), "main");
        assert_eq!(extract_branch_name("refs/heads/feature/login"), "feature/login");
    }

    #[test]
    fn test_extract_branch_name_leaves_other_refs_alone() {
        assert_eq!(extract_branch_name("refs/tags/v1.0.0"), "refs/tags/v1.0.0");
    }

    #[test]
    fn test_short_sha() {
        assert_eq!(short_sha("0123456789abcdef"), "0123456");
        assert_eq!(short_sha("abc"), "abc");
        assert_eq!(short_sha(""), "");
    }

    #[test]
    fn test_parse_push_event() {
        let event = PushEvent::parse(PUSH.as_bytes()).unwrap();
        assert_eq!(event.repository.id, 1296269);
        assert_eq!(event.branch(), "feature/login");
        assert_eq!(event.author(), "Mona Lisa");
        assert_eq!(event.commit_message(), "Fix login redirect");

        let data = event.trigger_data(Utc::now());
        assert_eq!(data.repository, "octocat/Hello-World");
        assert_eq!(data.commit, "0123456789abcdef0123456789abcdef01234567");
    }

    #[test]
    fn test_missing_required_fields_fail() {
        assert!(PushEvent::parse(br#"{"ref":"refs/heads/main","commits":[]}"#).is_err());
        assert!(
            PushEvent::parse(br#"{"repository":{"id":1,"full_name":"a/b"},"commits":[]}"#)
                .is_err()
        );
        assert!(
            PushEvent::parse(br#"{"repository":{"id":1,"full_name":"a/b"},"ref":"refs/heads/main"}"#)
                .is_err()
        );
        assert!(PushEvent::parse(b"not json").is_err());
    }

    #[test]
    fn test_branch_deletion_falls_back_to_pusher() {
        let body = br#"{
            "ref": "refs/heads/old",
            "after": "0000000000000000000000000000000000000000",
            "repository": { "id": 7, "full_name": "a/b" },
            "commits": [],
            "head_commit": null,
            "pusher": { "name": "octocat" }
        }"#;
        let event = PushEvent::parse(body).unwrap();
        assert_eq!(event.author(), "octocat");
        assert_eq!(event.commit_sha(), "0000000000000000000000000000000000000000");
        assert_eq!(event.commit_message(), "");
    }
}
