use crate::core::errors::TrackerError;
use crate::core::models::user::Identity;
use crate::infrastructure::store::{
    Document, DocumentStore, FieldValue, Fields, Listener, ListenerId, Operation, Query, SnapshotEvent,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, watch};
use tracing::{debug, warn};
use uuid::Uuid;

const OWNER_FIELD: &str = "userId";

struct ListenerEntry {
    query: Query,
    sender: mpsc::UnboundedSender<SnapshotEvent>,
}

#[derive(Default)]
struct StoreState {
    collections: HashMap<String, HashMap<String, Map<String, Value>>>,
    listeners: HashMap<ListenerId, ListenerEntry>,
    next_listener_id: ListenerId,
    last_timestamp: Option<DateTime<Utc>>,
    faults: HashMap<Operation, TrackerError>,
}

impl StoreState {
    fn snapshot(&self, query: &Query) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .filter(|doc| query.matches(doc))
                    .collect()
            })
            .unwrap_or_default();
        docs.sort_by(|a, b| query.compare(a, b));
        docs
    }

    // Strictly increasing so that ordering by timestamp is total.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }
}

/// Document store held in memory, with live queries and owner rules.
///
/// When built with [`InMemoryDocumentStore::with_auth`], every operation is
/// checked against the signed-in identity: writes must carry the caller's
/// uid in `userId`, and live queries must filter on it.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    state: Arc<RwLock<StoreState>>,
    identity: Option<watch::Receiver<Option<Identity>>>,
    pending_writes: bool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        InMemoryDocumentStore {
            state: Arc::new(RwLock::new(StoreState::default())),
            identity: None,
            pending_writes: false,
        }
    }

    pub fn with_auth(mut self, identity: watch::Receiver<Option<Identity>>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Emit new documents once with a null server timestamp before the
    /// resolved version, the way a client-side cache reports local writes.
    pub fn with_pending_writes(mut self, enabled: bool) -> Self {
        self.pending_writes = enabled;
        self
    }

    /// Makes the next call of `operation` fail with `error`.
    pub async fn inject_fault(&self, operation: Operation, error: TrackerError) {
        self.state.write().await.faults.insert(operation, error);
    }

    /// Terminates every open live query with `error`.
    pub async fn fail_listeners(&self, error: TrackerError) {
        let mut state = self.state.write().await;
        for (id, entry) in state.listeners.drain() {
            debug!(listener_id = id, "Failing live query");
            let _ = entry.sender.send(Err(error.clone()));
        }
    }

    pub async fn listener_count(&self) -> usize {
        self.state.read().await.listeners.len()
    }

    pub async fn document_count(&self, collection: &str) -> usize {
        self.state
            .read()
            .await
            .collections
            .get(collection)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    fn caller_uid(&self) -> Result<Option<String>, TrackerError> {
        match &self.identity {
            None => Ok(None),
            Some(rx) => rx
                .borrow()
                .as_ref()
                .map(|identity| Some(identity.uid.clone()))
                .ok_or_else(|| TrackerError::Unauthenticated("No signed-in user".to_string())),
        }
    }

    fn check_owner(&self, owner: Option<&Value>) -> Result<(), TrackerError> {
        if let Some(uid) = self.caller_uid()? {
            if owner.and_then(Value::as_str) != Some(uid.as_str()) {
                return Err(TrackerError::PermissionDenied(
                    "Missing or insufficient permissions".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn broadcast(state: &mut StoreState, collection: &str) {
        let mut closed = Vec::new();
        for (id, entry) in state.listeners.iter().filter(|(_, e)| e.query.collection == collection) {
            if entry.sender.send(Ok(state.snapshot(&entry.query))).is_err() {
                closed.push(*id);
            }
        }
        for id in closed {
            state.listeners.remove(&id);
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_fields(fields: &Fields, server_timestamp: &Value) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| {
            let value = match value {
                FieldValue::Value(v) => v.clone(),
                FieldValue::ServerTimestamp => server_timestamp.clone(),
            };
            (name.clone(), value)
        })
        .collect()
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, TrackerError> {
        let mut state = self.state.write().await;
        if let Some(err) = state.faults.remove(&Operation::Create) {
            return Err(err);
        }
        let owner = match fields.get(OWNER_FIELD) {
            Some(FieldValue::Value(v)) => Some(v),
            _ => None,
        };
        self.check_owner(owner)?;

        let id = Uuid::new_v4().simple().to_string();
        let has_server_timestamp = fields.values().any(|v| *v == FieldValue::ServerTimestamp);

        if self.pending_writes && has_server_timestamp {
            let pending = resolve_fields(&fields, &Value::Null);
            state
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), pending);
            Self::broadcast(&mut state, collection);
        }

        let ts = state.next_timestamp();
        let resolved = resolve_fields(
            &fields,
            &Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), resolved);
        Self::broadcast(&mut state, collection);

        debug!(collection, document_id = %id, "Document created");
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), TrackerError> {
        let mut state = self.state.write().await;
        if let Some(err) = state.faults.remove(&Operation::Delete) {
            return Err(err);
        }
        let owner = state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| data.get(OWNER_FIELD).cloned())
            .ok_or_else(|| TrackerError::ExpenseNotFound(id.to_string()))?;
        self.check_owner(owner.as_ref())?;

        if let Some(docs) = state.collections.get_mut(collection) {
            docs.remove(id);
        }
        Self::broadcast(&mut state, collection);

        debug!(collection, document_id = %id, "Document deleted");
        Ok(())
    }

    async fn listen(&self, query: Query) -> Result<Listener, TrackerError> {
        let mut state = self.state.write().await;
        let (sender, events) = mpsc::unbounded_channel();
        state.next_listener_id += 1;
        let id = state.next_listener_id;

        let rejected = match state.faults.remove(&Operation::Listen) {
            Some(err) => Some(err),
            None => self.check_owner(query.equality_on(OWNER_FIELD)).err(),
        };
        if let Some(err) = rejected {
            warn!(listener_id = id, collection = %query.collection, error = %err, "Live query rejected");
            let _ = sender.send(Err(err));
            return Ok(Listener { id, events });
        }

        let _ = sender.send(Ok(state.snapshot(&query)));
        state.listeners.insert(id, ListenerEntry { query, sender });
        debug!(listener_id = id, "Live query opened");
        Ok(Listener { id, events })
    }

    async fn unlisten(&self, id: ListenerId) {
        if self.state.write().await.listeners.remove(&id).is_some() {
            debug!(listener_id = id, "Live query closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::Direction;
    use serde_json::json;

    fn expense_fields(user_id: &str, amount: f64) -> Fields {
        Fields::from([
            ("userId".to_string(), FieldValue::from(json!(user_id))),
            ("category".to_string(), FieldValue::from(json!("Food"))),
            ("amount".to_string(), FieldValue::from(json!(amount))),
            ("timestamp".to_string(), FieldValue::ServerTimestamp),
        ])
    }

    fn user_query(user_id: &str) -> Query {
        Query::collection("expenses")
            .where_eq("userId", json!(user_id))
            .order_by("timestamp", Direction::Descending)
    }

    #[tokio::test]
    async fn listen_delivers_initial_then_full_snapshots_in_order() {
        let store = InMemoryDocumentStore::new();
        let first = store.create("expenses", expense_fields("u1", 1.0)).await.unwrap();
        let mut listener = store.listen(user_query("u1")).await.unwrap();

        let initial = listener.events.recv().await.unwrap().unwrap();
        assert_eq!(initial.len(), 1);

        let second = store.create("expenses", expense_fields("u1", 2.0)).await.unwrap();
        store.create("expenses", expense_fields("u2", 3.0)).await.unwrap();

        let after_second = listener.events.recv().await.unwrap().unwrap();
        let ids: Vec<_> = after_second.iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids, vec![second, first.clone()]);

        // The other user's write still notifies, with an unchanged result set.
        let after_other = listener.events.recv().await.unwrap().unwrap();
        assert_eq!(after_other.len(), 2);
    }

    #[tokio::test]
    async fn pending_writes_emit_null_timestamp_first() {
        let store = InMemoryDocumentStore::new().with_pending_writes(true);
        let mut listener = store.listen(user_query("u1")).await.unwrap();
        let _ = listener.events.recv().await;

        store.create("expenses", expense_fields("u1", 5.0)).await.unwrap();

        let pending = listener.events.recv().await.unwrap().unwrap();
        assert_eq!(pending[0].data.get("timestamp"), Some(&Value::Null));
        let resolved = listener.events.recv().await.unwrap().unwrap();
        assert!(resolved[0].data.get("timestamp").and_then(Value::as_str).is_some());
    }

    #[tokio::test]
    async fn unlisten_stops_notifications() {
        let store = InMemoryDocumentStore::new();
        let mut listener = store.listen(user_query("u1")).await.unwrap();
        let _ = listener.events.recv().await;

        store.unlisten(listener.id).await;
        store.create("expenses", expense_fields("u1", 1.0)).await.unwrap();

        assert_eq!(store.listener_count().await, 0);
        assert!(listener.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn deleting_a_missing_document_fails() {
        let store = InMemoryDocumentStore::new();
        let result = store.delete("expenses", "nope").await;
        assert_eq!(result, Err(TrackerError::ExpenseNotFound("nope".to_string())));
    }

    #[tokio::test]
    async fn owner_rules_follow_the_signed_in_identity() {
        let (tx, rx) = watch::channel(None);
        let store = InMemoryDocumentStore::new().with_auth(rx);

        let anonymous = store.create("expenses", expense_fields("u1", 1.0)).await;
        assert!(matches!(anonymous, Err(TrackerError::Unauthenticated(_))));

        tx.send_replace(Some(Identity {
            uid: "u1".to_string(),
            email: "u1@example.com".to_string(),
            id_token: String::new(),
        }));

        let foreign = store.create("expenses", expense_fields("u2", 1.0)).await;
        assert!(matches!(foreign, Err(TrackerError::PermissionDenied(_))));
        assert!(store.create("expenses", expense_fields("u1", 1.0)).await.is_ok());

        let mut foreign_query = store.listen(user_query("u2")).await.unwrap();
        assert!(matches!(
            foreign_query.events.recv().await,
            Some(Err(TrackerError::PermissionDenied(_)))
        ));
        assert_eq!(store.listener_count().await, 0);
    }

    #[tokio::test]
    async fn injected_faults_fire_once() {
        let store = InMemoryDocumentStore::new();
        store
            .inject_fault(Operation::Create, TrackerError::Unavailable("offline".to_string()))
            .await;

        let first = store.create("expenses", expense_fields("u1", 1.0)).await;
        assert!(matches!(first, Err(TrackerError::Unavailable(_))));
        assert!(store.create("expenses", expense_fields("u1", 1.0)).await.is_ok());
        assert_eq!(store.document_count("expenses").await, 1);
    }
}
