use crate::config::Config;
use crate::constants::USER_SIGNED_OUT;
use crate::core::errors::TrackerError;
use crate::core::feed::{ExpenseFeed, FeedState};
use crate::core::gateway::{Confirmation, DeleteOutcome, ExpenseGateway, ExpenseInput};
use crate::core::models::user::Identity;
use crate::core::session::{ActivityReporter, SessionMonitor};
use crate::core::summary::{SpendingSummary, summarize, total_amount};
use crate::infrastructure::auth::AuthProvider;
use crate::infrastructure::logging::ActivityLog;
use crate::infrastructure::store::DocumentStore;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Expenses,
    Analytics,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeaderStats {
    pub expense_count: usize,
    pub total_amount: f64,
}

/// Everything a renderer needs for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ShellView {
    pub identity: Option<Identity>,
    pub tab: Tab,
    pub header: HeaderStats,
    pub feed: FeedState,
    pub summary: SpendingSummary,
}

/// Headless application shell: wires identity changes to the expense feed,
/// routes mutations through the gateway and runs the inactivity monitor.
pub struct ExpenseTracker<A, S, L>
where
    A: AuthProvider + 'static,
    S: DocumentStore + 'static,
    L: ActivityLog + 'static,
{
    auth: Arc<A>,
    activity: Arc<L>,
    gateway: ExpenseGateway<S, L>,
    feed: Arc<ExpenseFeed<S>>,
    monitor: SessionMonitor,
    generation: watch::Sender<u64>,
    active_tab: Tab,
    follower: JoinHandle<()>,
}

impl<A, S, L> ExpenseTracker<A, S, L>
where
    A: AuthProvider + 'static,
    S: DocumentStore + 'static,
    L: ActivityLog + 'static,
{
    /// Must be called from within a Tokio runtime.
    pub fn start(auth: Arc<A>, store: Arc<S>, activity: Arc<L>, config: &Config) -> Self {
        let feed = Arc::new(ExpenseFeed::new(Arc::clone(&store), &config.expenses_collection));
        let gateway = ExpenseGateway::new(store, Arc::clone(&activity), &config.expenses_collection);
        let (generation, generation_rx) = watch::channel(0);
        let monitor = SessionMonitor::start(Arc::clone(&auth), config.session_idle_timeout);
        let follower = tokio::spawn(follow_identity(auth.watch_identity(), generation_rx, Arc::clone(&feed)));

        ExpenseTracker {
            auth,
            activity,
            gateway,
            feed,
            monitor,
            generation,
            active_tab: Tab::default(),
            follower,
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, TrackerError> {
        self.auth.sign_up(email, password).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, TrackerError> {
        self.auth.sign_in(email, password).await
    }

    /// Failures are logged, never returned.
    pub async fn sign_out(&self) {
        let user_id = self.auth.current_identity().map(|i| i.uid);
        match self.auth.sign_out().await {
            Ok(()) => {
                if let Err(e) = self
                    .activity
                    .record(USER_SIGNED_OUT, json!({ "reason": "manual" }), user_id.as_deref())
                    .await
                {
                    warn!(error = %e, "Failed to record sign-out");
                }
            }
            Err(e) => error!(error = %e, "Error signing out"),
        }
    }

    /// Adds an expense for the signed-in user, then asks for a fresh
    /// subscription so the new record shows up even if the cached snapshot
    /// missed it. The identity follower does the reopen, for whoever is
    /// signed in by then.
    pub async fn add_expense(&self, input: &ExpenseInput) -> Result<String, TrackerError> {
        let identity = self.require_identity()?;
        let id = self.gateway.add_expense(&identity, input).await?;
        self.generation.send_modify(|g| *g += 1);
        Ok(id)
    }

    pub async fn delete_expense(
        &self,
        expense_id: &str,
        confirmation: &dyn Confirmation,
    ) -> Result<DeleteOutcome, TrackerError> {
        let identity = self.require_identity()?;
        self.gateway.delete_expense(&identity, expense_id, confirmation).await
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn activity_reporter(&self) -> ActivityReporter {
        self.monitor.reporter()
    }

    pub fn feed_updates(&self) -> watch::Receiver<FeedState> {
        self.feed.subscribe()
    }

    pub fn view(&self) -> ShellView {
        let feed = self.feed.snapshot();
        ShellView {
            identity: self.auth.current_identity(),
            tab: self.active_tab,
            header: HeaderStats {
                expense_count: feed.expenses.len(),
                total_amount: total_amount(&feed.expenses),
            },
            summary: summarize(&feed.expenses),
            feed,
        }
    }

    pub async fn shutdown(self) {
        self.follower.abort();
        self.feed.close().await;
        self.monitor.dispose();
    }

    fn require_identity(&self) -> Result<Identity, TrackerError> {
        self.auth
            .current_identity()
            .ok_or_else(|| TrackerError::Unauthenticated("Please sign in again.".to_string()))
    }
}

// Sole owner of feed open/close, so every open targets the identity that is
// current when it runs.
async fn follow_identity<S: DocumentStore + 'static>(
    mut identity_rx: watch::Receiver<Option<Identity>>,
    mut generation_rx: watch::Receiver<u64>,
    feed: Arc<ExpenseFeed<S>>,
) {
    loop {
        let current = identity_rx.borrow_and_update().clone();
        let generation = *generation_rx.borrow_and_update();
        match current {
            Some(identity) => {
                if let Err(e) = feed.open(&identity.uid, generation).await {
                    warn!(user_id = %identity.uid, generation, error = %e, "Opening the expense feed failed");
                }
            }
            None => feed.close().await,
        }

        let changed = tokio::select! {
            r = identity_rx.changed() => r,
            r = generation_rx.changed() => r,
        };
        if changed.is_err() {
            break;
        }
    }
}
