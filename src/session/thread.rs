//! Session to thread reconciliation.

use std::sync::Arc;

use tracing::{debug, info};

use crate::assistant::AssistantApi;
use crate::error::ChatError;
use crate::store::RecordStore;

use super::record::{
    ConversationRecord, FieldsBuilder, MESSAGE, SESSION_ID, THREAD_ID, TIMESTAMP, now_timestamp,
    session_filter,
};

/// Outcome of [`SessionReconciler::resolve_thread`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedThread {
    /// Remote thread bound to the session.
    pub thread_id: String,
    /// Store record holding the mapping.
    pub record_id: String,
    /// Whether this call created the thread and the record.
    pub created: bool,
}

/// Maps session identifiers to remote threads.
///
/// Lookups take the first record whose `SessionID` matches. There is no lock
/// between the lookup and the write, so two concurrent first requests for the
/// same session can each create a thread and a record.
#[derive(Debug, Clone)]
pub struct SessionReconciler {
    store: Arc<dyn RecordStore>,
    assistant: Arc<dyn AssistantApi>,
    table: String,
    record_last_message: bool,
}

impl SessionReconciler {
    /// Create a reconciler over `table`.
    ///
    /// With `record_last_message`, every call also writes the user message to
    /// the record's `Message` field.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        assistant: Arc<dyn AssistantApi>,
        table: impl Into<String>,
        record_last_message: bool,
    ) -> Self {
        Self {
            store,
            assistant,
            table: table.into(),
            record_last_message,
        }
    }

    /// Store table holding conversation records.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Return the thread bound to `session_id`, creating and recording a new
    /// one if the session is unknown.
    ///
    /// Performs exactly one store write: an update of the existing record, or
    /// the creation of a new one.
    pub async fn resolve_thread(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ResolvedThread, ChatError> {
        let records = self
            .store
            .find(&self.table, &session_filter(session_id))
            .await?;

        if let Some(first) = records.first() {
            if records.len() > 1 {
                debug!(
                    session_id = %session_id,
                    count = records.len(),
                    "Multiple records for session, using the first"
                );
            }
            let existing = ConversationRecord::try_from(first)?;

            let fields = FieldsBuilder::new()
                .text(TIMESTAMP, now_timestamp())
                .text_if(self.record_last_message, MESSAGE, message)
                .build();
            self.store
                .update(&self.table, &existing.record_id, fields)
                .await?;

            return Ok(ResolvedThread {
                thread_id: existing.thread_id,
                record_id: existing.record_id,
                created: false,
            });
        }

        let thread = self.assistant.create_thread().await?;
        let fields = FieldsBuilder::new()
            .text(SESSION_ID, session_id)
            .text(THREAD_ID, thread.id.as_str())
            .text(TIMESTAMP, now_timestamp())
            .text_if(self.record_last_message, MESSAGE, message)
            .build();
        let record = self.store.create(&self.table, fields).await?;

        info!(
            name: "session.thread.created",
            session_id = %session_id,
            thread_id = %thread.id,
            "New thread bound to session"
        );

        Ok(ResolvedThread {
            thread_id: thread.id,
            record_id: record.id,
            created: true,
        })
    }
}
