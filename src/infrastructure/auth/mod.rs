pub mod in_memory;
pub mod jwt;

use crate::core::errors::TrackerError;
use crate::core::models::user::Identity;
use async_trait::async_trait;
use tokio::sync::watch;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current identity plus every later change.
    fn watch_identity(&self) -> watch::Receiver<Option<Identity>>;
    fn current_identity(&self) -> Option<Identity>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, TrackerError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, TrackerError>;
    /// Idempotent; signing out while signed out succeeds.
    async fn sign_out(&self) -> Result<(), TrackerError>;
}
