use crate::constants::{EXPENSE_ADDED, EXPENSE_DELETED};
use crate::core::errors::TrackerError;
use crate::core::models::user::Identity;
use crate::infrastructure::logging::ActivityLog;
use crate::infrastructure::store::{DocumentStore, FieldValue, Fields};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Raw form input, exactly as typed.
#[derive(Clone, Debug, Default)]
pub struct ExpenseInput {
    pub category: String,
    pub amount: String,
    pub note: String,
}

/// A validated expense ready to be written.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpenseDraft {
    pub category: String,
    pub amount: f64,
    pub note: String,
}

impl ExpenseDraft {
    pub fn parse(input: &ExpenseInput) -> Result<Self, TrackerError> {
        let category = input.category.trim();
        let amount = input.amount.trim();
        if category.is_empty() || amount.is_empty() {
            return Err(TrackerError::invalid_input(
                if category.is_empty() { "category" } else { "amount" },
                "Missing field",
                "Please fill in category and amount",
            ));
        }

        let amount = amount
            .parse::<f64>()
            .ok()
            .filter(|a| a.is_finite() && *a > 0.0)
            .ok_or_else(|| TrackerError::invalid_input("amount", "Invalid Amount", "Please enter a valid amount"))?;

        Ok(ExpenseDraft {
            category: category.to_string(),
            amount,
            note: input.note.trim().to_string(),
        })
    }

    fn into_fields(self, user_id: &str) -> Fields {
        Fields::from([
            ("userId".to_string(), FieldValue::from(json!(user_id))),
            ("category".to_string(), FieldValue::from(json!(self.category))),
            ("amount".to_string(), FieldValue::from(json!(self.amount))),
            ("note".to_string(), FieldValue::from(json!(self.note))),
            ("timestamp".to_string(), FieldValue::ServerTimestamp),
            (
                "createdAt".to_string(),
                FieldValue::from(json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))),
            ),
        ])
    }
}

/// Blocking yes/no prompt shown before destructive actions.
pub trait Confirmation {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirmation for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this expense?";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

/// Writes and deletes expenses. Never patches the materialized list and
/// never retries: the live feed is the only source of list changes.
pub struct ExpenseGateway<S: DocumentStore, L: ActivityLog> {
    store: Arc<S>,
    activity: Arc<L>,
    collection: String,
}

impl<S: DocumentStore, L: ActivityLog> ExpenseGateway<S, L> {
    pub fn new(store: Arc<S>, activity: Arc<L>, collection: &str) -> Self {
        ExpenseGateway {
            store,
            activity,
            collection: collection.to_string(),
        }
    }

    pub async fn add_expense(&self, identity: &Identity, input: &ExpenseInput) -> Result<String, TrackerError> {
        let draft = ExpenseDraft::parse(input)?;
        info!(user_id = %identity.uid, category = %draft.category, amount = draft.amount, "Adding expense");

        let details = json!({ "category": draft.category, "amount": draft.amount });
        let id = self
            .store
            .create(&self.collection, draft.into_fields(&identity.uid))
            .await
            .inspect_err(|e| error!(user_id = %identity.uid, error = %e, "Failed to add expense"))?;

        info!(user_id = %identity.uid, expense_id = %id, "Expense added");
        self.log(EXPENSE_ADDED, details, &identity.uid, &id).await;
        Ok(id)
    }

    pub async fn delete_expense(
        &self,
        identity: &Identity,
        expense_id: &str,
        confirmation: &dyn Confirmation,
    ) -> Result<DeleteOutcome, TrackerError> {
        if !confirmation.confirm(DELETE_PROMPT) {
            return Ok(DeleteOutcome::Cancelled);
        }

        self.store
            .delete(&self.collection, expense_id)
            .await
            .inspect_err(|e| error!(expense_id, error = %e, "Error deleting expense"))?;

        self.log(EXPENSE_DELETED, json!({}), &identity.uid, expense_id).await;
        Ok(DeleteOutcome::Deleted)
    }

    // The activity log is best-effort; a failed entry does not undo the write.
    async fn log(&self, action: &str, mut details: serde_json::Value, user_id: &str, expense_id: &str) {
        details["expense_id"] = json!(expense_id);
        if let Err(e) = self.activity.record(action, details, Some(user_id)).await {
            error!(action, error = %e, "Failed to record activity");
        }
    }
}
