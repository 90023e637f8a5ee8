//! Live, user-scoped expense list.
//!
//! `ExpenseFeed` keeps at most one live query open against the document
//! store and republishes every snapshot through a `watch` channel. Each
//! snapshot replaces the list wholesale; nothing is diffed.
//!
//! Every subscription gets a token. Closing or replacing a subscription
//! bumps the token inside the channel lock, and a notification is only
//! applied while its token is still current, so late events from a torn
//! down query can never overwrite the list.

use crate::core::errors::TrackerError;
use crate::core::models::expense::Expense;
use crate::infrastructure::store::{Direction, Document, DocumentStore, ListenerId, Query, SnapshotEvent};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedStatus {
    /// No subscription is open.
    Idle,
    /// Subscribed, waiting for the first snapshot.
    Loading,
    Fresh,
    /// The subscription failed; `expenses` holds the last known list.
    Stale(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedState {
    pub user_id: Option<String>,
    pub expenses: Vec<Expense>,
    pub status: FeedStatus,
    subscription: u64,
}

impl FeedState {
    fn idle(subscription: u64) -> Self {
        FeedState {
            user_id: None,
            expenses: Vec::new(),
            status: FeedStatus::Idle,
            subscription,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.status == FeedStatus::Fresh
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FeedStatus::Stale(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct SubscriptionKey {
    user_id: String,
    generation: u64,
}

struct ActiveSubscription {
    key: SubscriptionKey,
    listener_id: ListenerId,
    task: JoinHandle<()>,
}

pub struct ExpenseFeed<S: DocumentStore + 'static> {
    store: Arc<S>,
    collection: String,
    state: Arc<watch::Sender<FeedState>>,
    active: Mutex<Option<ActiveSubscription>>,
}

impl<S: DocumentStore + 'static> ExpenseFeed<S> {
    pub fn new(store: Arc<S>, collection: &str) -> Self {
        let (state, _) = watch::channel(FeedState::idle(0));
        ExpenseFeed {
            store,
            collection: collection.to_string(),
            state: Arc::new(state),
            active: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> FeedState {
        self.state.borrow().clone()
    }

    /// Opens the live query for `user_id`.
    ///
    /// Calling again with the same user and generation while the query is
    /// alive does nothing. A new user, a new generation, or a query that has
    /// terminated with an error replaces the current subscription.
    pub async fn open(&self, user_id: &str, generation: u64) -> Result<(), TrackerError> {
        let key = SubscriptionKey {
            user_id: user_id.to_string(),
            generation,
        };
        let mut active = self.active.lock().await;
        if let Some(current) = active.as_ref() {
            if current.key == key && !current.task.is_finished() {
                debug!(user_id, generation, "Expense feed already open");
                return Ok(());
            }
        }

        let mut token = 0;
        self.state.send_modify(|s| {
            s.subscription += 1;
            token = s.subscription;
            if s.user_id.as_deref() != Some(user_id) {
                s.user_id = Some(user_id.to_string());
                s.expenses.clear();
            }
            s.status = FeedStatus::Loading;
        });
        if let Some(previous) = active.take() {
            self.teardown(previous).await;
        }

        info!(user_id, generation, "Setting up expense listener");
        let query = Query::collection(&self.collection)
            .where_eq("userId", json!(user_id))
            .order_by("timestamp", Direction::Descending);
        let listener = match self.store.listen(query).await {
            Ok(listener) => listener,
            Err(err) => {
                apply(&self.state, token, Err(err.clone()));
                return Err(err);
            }
        };

        let task = tokio::spawn(pump(listener.events, Arc::clone(&self.state), token));
        *active = Some(ActiveSubscription {
            key,
            listener_id: listener.id,
            task,
        });
        Ok(())
    }

    /// Closes the live query and clears the list.
    pub async fn close(&self) {
        let mut active = self.active.lock().await;
        self.state.send_modify(|s| *s = FeedState::idle(s.subscription + 1));
        if let Some(previous) = active.take() {
            self.teardown(previous).await;
        }
    }

    async fn teardown(&self, subscription: ActiveSubscription) {
        debug!(
            user_id = %subscription.key.user_id,
            generation = subscription.key.generation,
            "Closing expense listener"
        );
        self.store.unlisten(subscription.listener_id).await;
        subscription.task.abort();
    }
}

impl<S: DocumentStore + 'static> Drop for ExpenseFeed<S> {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.task.abort();
        }
    }
}

async fn pump(
    mut events: mpsc::UnboundedReceiver<SnapshotEvent>,
    state: Arc<watch::Sender<FeedState>>,
    token: u64,
) {
    while let Some(event) = events.recv().await {
        let terminal = event.is_err();
        if !apply(&state, token, event.map(|docs| materialize(&docs))) {
            debug!(token, "Discarding notification from a closed subscription");
            break;
        }
        if terminal {
            break;
        }
    }
}

// Returns false when `token` is no longer the current subscription.
fn apply(state: &watch::Sender<FeedState>, token: u64, update: Result<Vec<Expense>, TrackerError>) -> bool {
    let mut current = true;
    state.send_if_modified(|s| {
        if s.subscription != token {
            current = false;
            return false;
        }
        match update {
            Ok(expenses) => {
                debug!(count = expenses.len(), "Received expense snapshot");
                s.expenses = expenses;
                s.status = FeedStatus::Fresh;
            }
            Err(err) => {
                warn!(error = %err, "Error fetching expenses");
                s.status = FeedStatus::Stale(err.feed_message());
            }
        }
        true
    });
    current
}

fn materialize(docs: &[Document]) -> Vec<Expense> {
    docs.iter()
        .filter_map(|doc| match Expense::from_document(doc) {
            Ok(expense) => Some(expense),
            Err(err) => {
                warn!(document_id = %doc.id, error = %err, "Skipping malformed expense document");
                None
            }
        })
        .collect()
}
