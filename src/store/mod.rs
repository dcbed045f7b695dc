//! Record store abstraction.
//!
//! Conversation records live in an external table-oriented store that is
//! queried by field value. The relay only needs three operations, captured by
//! [`RecordStore`]:
//!
//! - `find`: records matching a [`Filter`], in store order
//! - `create`: insert a record with the given fields
//! - `update`: merge fields into an existing record
//!
//! No operation spans more than one call, so callers that read before writing
//! are racy by construction.

pub mod providers;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Field map of a record.
pub type Fields = serde_json::Map<String, Value>;

/// A stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identifier.
    pub id: String,
    /// Creation time as reported by the store.
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default)]
    pub fields: Fields,
}

impl Record {
    /// Read a string field.
    #[must_use]
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// Record selection criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Exact string match on one field.
    FieldEquals { field: String, value: String },
}

impl Filter {
    #[must_use]
    pub fn field_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Render as an Airtable formula, e.g. `{SessionID} = 'abc'`.
    ///
    /// String literals are single-quoted with backslash escapes, so a value
    /// cannot terminate the literal early.
    #[must_use]
    pub fn to_formula(&self) -> String {
        match self {
            Self::FieldEquals { field, value } => {
                let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
                format!("{{{field}}} = '{escaped}'")
            }
        }
    }

    /// Evaluate against a field map.
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Self::FieldEquals { field, value } => {
                fields.get(field).and_then(Value::as_str) == Some(value.as_str())
            }
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Records in `table` matching `filter`, in store order.
    async fn find(&self, table: &str, filter: &Filter) -> Result<Vec<Record>, StoreError>;

    /// Insert a new record.
    async fn create(&self, table: &str, fields: Fields) -> Result<Record, StoreError>;

    /// Merge `fields` into an existing record; fields not named are kept.
    async fn update(&self, table: &str, record_id: &str, fields: Fields)
    -> Result<Record, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formula_escapes_quotes() {
        let filter = Filter::field_equals("SessionID", "it's");
        assert_eq!(filter.to_formula(), r"{SessionID} = 'it\'s'");

        let filter = Filter::field_equals("SessionID", r"a\' OR TRUE()");
        assert_eq!(filter.to_formula(), r"{SessionID} = 'a\\\' OR TRUE()'");
    }

    #[test]
    fn filter_matches_exact_string_only() {
        let filter = Filter::field_equals("SessionID", "abc");
        let mut fields = Fields::new();
        fields.insert("SessionID".into(), json!("abc"));
        assert!(filter.matches(&fields));

        fields.insert("SessionID".into(), json!("abcd"));
        assert!(!filter.matches(&fields));

        fields.insert("SessionID".into(), json!(1));
        assert!(!filter.matches(&fields));
    }

    #[test]
    fn record_parses_store_payload() {
        let record: Record = serde_json::from_value(json!({
            "id": "rec123",
            "createdTime": "2024-01-01T00:00:00.000Z",
            "fields": { "SessionID": "abc", "ThreadID": "thread_1" }
        }))
        .unwrap();
        assert_eq!(record.text("ThreadID"), Some("thread_1"));
        assert_eq!(record.text("Conversation"), None);
    }
}
