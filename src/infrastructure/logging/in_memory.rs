use crate::core::errors::TrackerError;
use crate::core::models::audit::ActivityEntry;
use crate::infrastructure::logging::ActivityLog;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_RETENTION: usize = 1_000;

/// Bounded activity log; the oldest entries are dropped past `retention`.
#[derive(Clone)]
pub struct InMemoryActivityLog {
    entries: Arc<RwLock<VecDeque<ActivityEntry>>>,
    retention: usize,
    fault: Arc<Mutex<Option<TrackerError>>>,
}

impl Default for InMemoryActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryActivityLog {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        InMemoryActivityLog {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            retention: retention.max(1),
            fault: Arc::new(Mutex::new(None)),
        }
    }

    /// Makes the next `record` call fail with `error`.
    pub async fn fail_next_record(&self, error: TrackerError) {
        *self.fault.lock().await = Some(error);
    }
}

#[async_trait]
impl ActivityLog for InMemoryActivityLog {
    async fn record(
        &self,
        action: &str,
        details: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), TrackerError> {
        if let Some(err) = self.fault.lock().await.take() {
            return Err(err);
        }
        if !details.is_object() {
            return Err(TrackerError::LoggingError(format!(
                "Details for {} must be a JSON object",
                action
            )));
        }

        let mut entries = self.entries.write().await;
        if entries.len() == self.retention {
            entries.pop_front();
        }
        entries.push_back(ActivityEntry {
            id: Uuid::new_v4().to_string(),
            action: action.to_string(),
            user_id: user_id.map(String::from),
            details,
            timestamp: Utc::now(),
        });
        debug!(action, user_id, "Activity recorded");
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<ActivityEntry>, TrackerError> {
        Ok(self.entries.read().await.iter().cloned().collect())
    }

    async fn entries_for(&self, user_id: &str) -> Result<Vec<ActivityEntry>, TrackerError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn retention_drops_the_oldest_entries() {
        let log = InMemoryActivityLog::with_retention(2);
        for n in 0..3 {
            log.record("EXPENSE_ADDED", json!({ "n": n }), Some("u1")).await.unwrap();
        }

        let entries = log.entries().await.unwrap();
        let ns: Vec<_> = entries.iter().map(|e| e.details["n"].clone()).collect();
        assert_eq!(ns, vec![json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn details_must_be_an_object() {
        let log = InMemoryActivityLog::new();
        let result = log.record("EXPENSE_ADDED", json!("oops"), None).await;
        assert!(matches!(result, Err(TrackerError::LoggingError(_))));
        assert!(log.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn entries_can_be_filtered_by_user() {
        let log = InMemoryActivityLog::new();
        log.record("EXPENSE_ADDED", json!({}), Some("u1")).await.unwrap();
        log.record("EXPENSE_ADDED", json!({}), Some("u2")).await.unwrap();
        log.record("USER_SIGNED_OUT", json!({}), Some("u1")).await.unwrap();

        let mine = log.entries_for("u1").await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[1].action, "USER_SIGNED_OUT");
    }
}
