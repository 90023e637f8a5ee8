pub mod in_memory;

use crate::core::errors::TrackerError;
use crate::core::models::audit::ActivityEntry;
use async_trait::async_trait;

/// Append-only record of what users did, kept apart from diagnostic logs.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// `details` must be a JSON object.
    async fn record(
        &self,
        action: &str,
        details: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), TrackerError>;
    /// Oldest first.
    async fn entries(&self) -> Result<Vec<ActivityEntry>, TrackerError>;
    async fn entries_for(&self, user_id: &str) -> Result<Vec<ActivityEntry>, TrackerError>;
}
