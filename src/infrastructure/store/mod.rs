pub mod in_memory;

use crate::core::errors::TrackerError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// A field written by `create`. `ServerTimestamp` is resolved by the store.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Value(Value),
    ServerTimestamp,
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

pub type Fields = BTreeMap<String, FieldValue>;

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn collection(name: &str) -> Self {
        Query {
            collection: name.to_string(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    pub fn where_eq(mut self, field: &str, value: Value) -> Self {
        self.filters.push((field.to_string(), value));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    /// Value the query requires for `field`, if it filters on it.
    pub fn equality_on(&self, field: &str) -> Option<&Value> {
        self.filters.iter().find(|(f, _)| f == field).map(|(_, v)| v)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| doc.data.get(field) == Some(expected))
    }

    /// Orders two matching documents; ties fall back to the document id.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let by_field = match &self.order_by {
            Some((field, direction)) => {
                let ord = compare_values(a.data.get(field), b.data.get(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            }
            None => Ordering::Equal,
        };
        by_field.then_with(|| a.id.cmp(&b.id))
    }
}

// Missing and null values sort after everything else, so pending server
// timestamps come first in a descending order.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// One notification from a live query: a full snapshot or a terminal error.
pub type SnapshotEvent = Result<Vec<Document>, TrackerError>;

pub type ListenerId = u64;

pub struct Listener {
    pub id: ListenerId,
    pub events: mpsc::UnboundedReceiver<SnapshotEvent>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Delete,
    Listen,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, TrackerError>;
    async fn delete(&self, collection: &str, id: &str) -> Result<(), TrackerError>;
    /// Opens a live query. The current snapshot is delivered first, then a
    /// full snapshot after every change to the collection.
    async fn listen(&self, query: Query) -> Result<Listener, TrackerError>;
    /// No event is sent to the listener once this returns.
    async fn unlisten(&self, id: ListenerId);
}
