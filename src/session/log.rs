//! Conversation log persistence.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::StoreError;
use crate::store::{Record, RecordStore};

use super::record::{
    CONVERSATION, ConversationRecord, FieldsBuilder, MESSAGE, SESSION_ID, THREAD_ID, TIMESTAMP,
    now_timestamp, session_filter,
};

/// One user/assistant turn to append to a session's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub session_id: String,
    pub thread_id: String,
    pub user: String,
    pub assistant: String,
}

/// Appends exchanges to the free-text `Conversation` field.
///
/// Every append reads the record, concatenates, and writes the full text back.
/// Nothing spans the read and the write: concurrent appends for one session
/// lose updates (last write wins).
#[derive(Debug, Clone)]
pub struct ConversationLog {
    store: Arc<dyn RecordStore>,
    table: String,
    line_timestamps: bool,
    record_last_message: bool,
}

impl ConversationLog {
    /// With `record_last_message`, a record created here also carries the
    /// user message in its `Message` field.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        table: impl Into<String>,
        line_timestamps: bool,
        record_last_message: bool,
    ) -> Self {
        Self {
            store,
            table: table.into(),
            line_timestamps,
            record_last_message,
        }
    }

    /// Append `exchange`, creating the session record if none exists.
    pub async fn append(&self, exchange: &Exchange) -> Result<Record, StoreError> {
        let timestamp = now_timestamp();
        let stamp = self.line_timestamps.then_some(timestamp.as_str());
        let lines = format_exchange(&exchange.user, &exchange.assistant, stamp);

        let records = self
            .store
            .find(&self.table, &session_filter(&exchange.session_id))
            .await?;

        if let Some(first) = records.first() {
            let existing = ConversationRecord::try_from(first)?;
            let fields = FieldsBuilder::new()
                .text(
                    CONVERSATION,
                    append_lines(existing.conversation.as_deref(), &lines),
                )
                .text(TIMESTAMP, timestamp)
                .build();
            let record = self
                .store
                .update(&self.table, &existing.record_id, fields)
                .await?;
            debug!(session_id = %exchange.session_id, "Conversation log updated");
            return Ok(record);
        }

        let fields = FieldsBuilder::new()
            .text(SESSION_ID, exchange.session_id.as_str())
            .text(THREAD_ID, exchange.thread_id.as_str())
            .text(TIMESTAMP, timestamp)
            .text_if(self.record_last_message, MESSAGE, exchange.user.as_str())
            .text(CONVERSATION, lines)
            .build();
        let record = self.store.create(&self.table, fields).await?;
        debug!(session_id = %exchange.session_id, "Conversation log created");
        Ok(record)
    }

    /// Append in a detached task.
    ///
    /// Failures are reported through `tracing` only; the handle is returned so
    /// callers that care (tests) can wait for completion.
    pub fn spawn_append(self: &Arc<Self>, exchange: Exchange) -> JoinHandle<()> {
        let log = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = log.append(&exchange).await {
                error!(
                    name: "conversation.log.failed",
                    session_id = %exchange.session_id,
                    error = %e,
                    "Failed to append conversation log"
                );
            }
        })
    }
}

/// Render one exchange as `User: …\nAssistant: …`, optionally prefixing each
/// line with `[timestamp] `.
#[must_use]
pub fn format_exchange(user: &str, assistant: &str, timestamp: Option<&str>) -> String {
    match timestamp {
        Some(ts) => format!("[{ts}] User: {user}\n[{ts}] Assistant: {assistant}"),
        None => format!("User: {user}\nAssistant: {assistant}"),
    }
}

/// Join new lines onto an existing log; the existing text stays a prefix.
#[must_use]
pub fn append_lines(existing: Option<&str>, lines: &str) -> String {
    match existing {
        Some(prior) if !prior.is_empty() => format!("{prior}\n{lines}"),
        _ => lines.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_plain_exchange() {
        assert_eq!(
            format_exchange("hi", "hello", None),
            "User: hi\nAssistant: hello"
        );
    }

    #[test]
    fn formats_timestamped_exchange() {
        assert_eq!(
            format_exchange("hi", "hello", Some("2024-01-01T00:00:00.000Z")),
            "[2024-01-01T00:00:00.000Z] User: hi\n[2024-01-01T00:00:00.000Z] Assistant: hello"
        );
    }

    #[test]
    fn append_keeps_prior_text_as_prefix() {
        let prior = "User: a\nAssistant: b";
        let next = append_lines(Some(prior), "User: c\nAssistant: d");
        assert!(next.starts_with(prior));
        assert!(next.len() > prior.len());
        assert_eq!(next, "User: a\nAssistant: b\nUser: c\nAssistant: d");
    }

    #[test]
    fn append_to_empty_log() {
        assert_eq!(append_lines(None, "User: a"), "User: a");
        assert_eq!(append_lines(Some(""), "User: a"), "User: a");
    }
}
