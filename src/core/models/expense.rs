use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::infrastructure::store::Document;

pub const SUGGESTED_CATEGORIES: [&str; 9] = [
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Entertainment",
    "Bills & Utilities",
    "Healthcare",
    "Travel",
    "Education",
    "Other",
];

/// A single expense as materialized from the store.
///
/// `timestamp` is assigned by the backend and is `None` while the write is
/// still pending; `created_at` is the client clock at submission time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: String,
}

impl Expense {
    pub fn from_document(doc: &Document) -> Result<Self, serde_json::Error> {
        let mut data = doc.data.clone();
        data.insert("id".to_string(), serde_json::Value::String(doc.id.clone()));
        serde_json::from_value(serde_json::Value::Object(data))
    }

    /// Server timestamp when known, otherwise the client-side creation time.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.or_else(|| {
            DateTime::parse_from_rfc3339(&self.created_at)
                .ok()
                .map(|t| t.with_timezone(&Utc))
        })
    }

    pub fn is_pending(&self) -> bool {
        self.timestamp.is_none()
    }

    pub fn display_date(&self) -> String {
        self.occurred_at()
            .map(|t| t.format("%b %-d, %Y, %I:%M %p").to_string())
            .unwrap_or_else(|| "Invalid Date".to_string())
    }

    pub fn display_amount(&self) -> String {
        format_usd(self.amount)
    }
}

/// Formats an amount as US dollars with thousands separators, e.g. `$1,234.50`.
pub fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}
