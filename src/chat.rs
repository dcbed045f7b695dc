//! One chat request/response cycle.
//!
//! [`ChatService::handle_chat`] validates the request, resolves the session's
//! thread, posts the user message, runs the assistant, waits for the run to
//! complete and assembles the reply from the thread's assistant messages.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::assistant::{
    AssistantApi, ContentSegment, MessageRole, PollPolicy, ReplyScope, ThreadMessage,
    wait_for_completion,
};
use crate::error::ChatError;
use crate::session::{ConversationLog, Exchange, SessionReconciler};
use crate::store::RecordStore;

/// Whether finished exchanges are appended to the store's conversation log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationLogMode {
    /// Append every exchange in a detached task.
    #[default]
    Append,
    /// Only the session/thread mapping is stored.
    Off,
}

/// Behavior switches for [`ChatService`].
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Assistant every run executes.
    pub assistant_id: String,
    /// Store table holding conversation records.
    pub table: String,
    /// Reject requests without a session identifier.
    pub require_session_id: bool,
    /// Write the latest user message to the record on every request.
    pub record_last_message: bool,
    pub conversation_log: ConversationLogMode,
    /// Prefix log lines with `[timestamp]`.
    pub log_timestamps: bool,
    pub reply_scope: ReplyScope,
    pub poll: PollPolicy,
}

/// Result of a successful chat cycle.
#[derive(Debug)]
pub struct ChatOutcome {
    /// Reply text returned to the widget.
    pub response: String,
    pub thread_id: String,
    pub run_id: String,
    /// Detached log append, when one was started.
    pub log_task: Option<JoinHandle<()>>,
}

/// Drives the assistant through one request/response cycle.
#[derive(Debug)]
pub struct ChatService {
    assistant: Arc<dyn AssistantApi>,
    reconciler: SessionReconciler,
    log: Option<Arc<ConversationLog>>,
    options: ChatOptions,
}

impl ChatService {
    #[must_use]
    pub fn new(
        assistant: Arc<dyn AssistantApi>,
        store: Arc<dyn RecordStore>,
        options: ChatOptions,
    ) -> Self {
        let reconciler = SessionReconciler::new(
            Arc::clone(&store),
            Arc::clone(&assistant),
            options.table.clone(),
            options.record_last_message,
        );
        let log = (options.conversation_log == ConversationLogMode::Append).then(|| {
            Arc::new(ConversationLog::new(
                store,
                options.table.clone(),
                options.log_timestamps,
                options.record_last_message,
            ))
        });

        Self {
            assistant,
            reconciler,
            log,
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    #[must_use]
    pub fn reconciler(&self) -> &SessionReconciler {
        &self.reconciler
    }

    /// Run one chat cycle for `message` in `session_id`.
    ///
    /// Absent and empty values count as missing. When the session identifier
    /// is optional and absent, the message goes to a fresh thread that is not
    /// recorded anywhere.
    pub async fn handle_chat(
        &self,
        message: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<ChatOutcome, ChatError> {
        let message = message.filter(|m| !m.is_empty());
        let session_id = session_id.filter(|s| !s.is_empty());

        let mut missing = Vec::new();
        if message.is_none() {
            missing.push("message");
        }
        if session_id.is_none() && self.options.require_session_id {
            missing.push("sessionId");
        }
        let Some(message) = message.filter(|_| missing.is_empty()) else {
            return Err(ChatError::MissingFields(missing));
        };

        let thread_id = match session_id {
            Some(session_id) => {
                self.reconciler
                    .resolve_thread(session_id, message)
                    .await?
                    .thread_id
            }
            None => self.assistant.create_thread().await?.id,
        };

        self.assistant
            .add_message(&thread_id, MessageRole::User, message)
            .await?;

        let run = self
            .assistant
            .create_run(&thread_id, &self.options.assistant_id)
            .await?;
        debug!(thread_id = %thread_id, run_id = %run.id, "Run started");

        let run = wait_for_completion(
            self.assistant.as_ref(),
            &thread_id,
            &run.id,
            self.options.poll,
        )
        .await?;

        let scope = match self.options.reply_scope {
            ReplyScope::Thread => None,
            ReplyScope::Run => Some(run.id.as_str()),
        };
        let messages = self.assistant.list_messages(&thread_id, scope).await?;
        let response = collect_reply(&messages);

        info!(
            name: "chat.reply.ready",
            thread_id = %thread_id,
            run_id = %run.id,
            reply_len = response.len(),
            "Assistant reply ready"
        );

        let log_task = match (&self.log, session_id) {
            (Some(log), Some(session_id)) => Some(log.spawn_append(Exchange {
                session_id: session_id.to_string(),
                thread_id: thread_id.clone(),
                user: message.to_string(),
                assistant: response.clone(),
            })),
            _ => None,
        };

        Ok(ChatOutcome {
            response,
            thread_id,
            run_id: run.id,
            log_task,
        })
    }
}

/// Join the text of every assistant message, in list order.
///
/// Segments of one message are joined with `\n`, and so are messages.
/// Non-text segments and user messages are skipped.
#[must_use]
pub fn collect_reply(messages: &[ThreadMessage]) -> String {
    messages
        .iter()
        .filter(|m| m.role == MessageRole::Assistant)
        .map(|m| {
            m.content
                .iter()
                .filter_map(ContentSegment::as_text)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
