mod session_tests;

use crate::config::Config;
use crate::core::errors::TrackerError;
use crate::core::feed::FeedState;
use crate::core::gateway::ExpenseInput;
use crate::core::models::user::Identity;
use crate::infrastructure::auth::AuthProvider;
use crate::infrastructure::auth::in_memory::InMemoryAuth;
use crate::infrastructure::store::in_memory::InMemoryDocumentStore;
use crate::infrastructure::store::{DocumentStore, Fields, Listener, ListenerId, Query};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

pub const IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

pub fn test_config() -> Config {
    Config {
        session_idle_timeout: IDLE_TIMEOUT,
        bcrypt_cost: 4,
        ..Config::default()
    }
}

pub fn create_test_auth() -> Arc<InMemoryAuth> {
    let config = test_config();
    Arc::new(InMemoryAuth::new(config.jwt_secret, config.token_ttl, config.bcrypt_cost))
}

/// Store that enforces owner rules against `auth`.
pub fn create_test_store(auth: &InMemoryAuth) -> Arc<CountingStore> {
    Arc::new(CountingStore::new(
        InMemoryDocumentStore::new().with_auth(auth.watch_identity()),
    ))
}

pub async fn sign_up(auth: &InMemoryAuth, email: &str) -> Identity {
    auth.sign_up(email, "correct-horse").await.unwrap()
}

pub fn input(category: &str, amount: &str, note: &str) -> ExpenseInput {
    ExpenseInput {
        category: category.to_string(),
        amount: amount.to_string(),
        note: note.to_string(),
    }
}

pub async fn wait_for_feed<F>(updates: &mut watch::Receiver<FeedState>, predicate: F) -> FeedState
where
    F: FnMut(&FeedState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), updates.wait_for(predicate))
        .await
        .expect("feed did not reach the expected state")
        .expect("feed channel closed")
        .clone()
}

/// Counts the writes that actually reach the backend.
pub struct CountingStore {
    pub inner: InMemoryDocumentStore,
    creates: AtomicUsize,
    deletes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: InMemoryDocumentStore) -> Self {
        CountingStore {
            inner,
            creates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, TrackerError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(collection, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), TrackerError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(collection, id).await
    }

    async fn listen(&self, query: Query) -> Result<Listener, TrackerError> {
        self.inner.listen(query).await
    }

    async fn unlisten(&self, id: ListenerId) {
        self.inner.unlisten(id).await
    }
}
