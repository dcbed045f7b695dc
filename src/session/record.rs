//! Conversation record layout.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{Fields, Filter, Record};

/// Store column holding the session identifier (lookup key).
pub const SESSION_ID: &str = "SessionID";
/// Store column holding the remote thread identifier.
pub const THREAD_ID: &str = "ThreadID";
/// Store column holding the append-only conversation log.
pub const CONVERSATION: &str = "Conversation";
/// Store column holding the latest user message.
pub const MESSAGE: &str = "Message";
/// Store column holding the last-write time.
pub const TIMESTAMP: &str = "Timestamp";

/// Typed view of a session's store record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRecord {
    pub record_id: String,
    pub session_id: String,
    pub thread_id: String,
    pub conversation: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
}

impl TryFrom<&Record> for ConversationRecord {
    type Error = StoreError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        let thread_id = record
            .text(THREAD_ID)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| StoreError::Malformed {
                id: record.id.clone(),
                reason: format!("missing {THREAD_ID}"),
            })?;

        Ok(Self {
            record_id: record.id.clone(),
            session_id: record.text(SESSION_ID).unwrap_or_default().to_string(),
            thread_id: thread_id.to_string(),
            conversation: record.text(CONVERSATION).map(ToString::to_string),
            message: record.text(MESSAGE).map(ToString::to_string),
            timestamp: record.text(TIMESTAMP).map(ToString::to_string),
        })
    }
}

/// Filter selecting the records of one session.
#[must_use]
pub fn session_filter(session_id: &str) -> Filter {
    Filter::field_equals(SESSION_ID, session_id)
}

/// Current time in the store's timestamp format.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Small builder for record field maps.
#[derive(Debug, Default)]
pub(crate) struct FieldsBuilder(Fields);

impl FieldsBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn text(mut self, field: &str, value: impl Into<String>) -> Self {
        self.0.insert(field.to_string(), Value::String(value.into()));
        self
    }

    pub(crate) fn text_if(self, enabled: bool, field: &str, value: impl Into<String>) -> Self {
        if enabled { self.text(field, value) } else { self }
    }

    pub(crate) fn build(self) -> Fields {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_complete_record() {
        let record: Record = serde_json::from_value(json!({
            "id": "rec1",
            "fields": {
                "SessionID": "abc",
                "ThreadID": "thread_1",
                "Conversation": "User: hi\nAssistant: hello",
                "Timestamp": "2024-01-01T00:00:00.000Z"
            }
        }))
        .unwrap();

        let conv = ConversationRecord::try_from(&record).unwrap();
        assert_eq!(conv.thread_id, "thread_1");
        assert_eq!(conv.session_id, "abc");
        assert_eq!(conv.message, None);
        assert!(conv.conversation.unwrap().starts_with("User: hi"));
    }

    #[test]
    fn rejects_record_without_thread() {
        let record: Record = serde_json::from_value(json!({
            "id": "rec1",
            "fields": { "SessionID": "abc", "ThreadID": "" }
        }))
        .unwrap();

        let err = ConversationRecord::try_from(&record).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }
}
