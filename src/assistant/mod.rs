//! Hosted assistant API client.
//!
//! This module wraps the "threads and runs" style assistant API: a remote
//! thread accumulates messages, and a run executes a configured assistant
//! against the thread until it reaches a terminal status.
//!
//! # Overview
//!
//! The [`AssistantApi`] trait is the seam the chat handler and the session
//! reconciler depend on. [`OpenAiAssistantClient`] implements it over HTTP;
//! tests substitute scripted stubs.
//!
//! - [`provider`]: URL and authentication differences between providers
//! - [`poll`]: bounded polling of run status
//!
//! # Example
//!
//! ```rust,ignore
//! use assistant_relay::assistant::{
//!     AssistantSettings, OpenAiAssistantClient, Provider,
//! };
//!
//! let settings = AssistantSettings {
//!     base_url: "https://api.openai.com".to_string(),
//!     api_key: "sk-...".to_string(),
//!     assistant_id: "asst_...".to_string(),
//!     provider: Provider::OpenAI,
//! };
//! let client = OpenAiAssistantClient::new(settings);
//! ```

pub mod openai;
pub mod poll;
pub mod provider;

pub use openai::OpenAiAssistantClient;
pub use poll::{PollPolicy, wait_for_completion};
pub use provider::Provider;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AssistantError;

/// Assistant API connection settings.
#[derive(Clone)]
pub struct AssistantSettings {
    /// Base URL for the API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// API key used for authentication.
    pub api_key: String,
    /// Identifier of the assistant every run executes.
    pub assistant_id: String,
    /// Provider type (auto-detected from `base_url` when loaded from config).
    pub provider: Provider,
}

impl fmt::Debug for AssistantSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("assistant_id", &self.assistant_id)
            .field("provider", &self.provider)
            .finish()
    }
}

/// Which messages are collected into the reply after a run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyScope {
    /// Every assistant message on the thread, in list order.
    #[default]
    Thread,
    /// Only messages produced by the run that just completed.
    Run,
}

/// Role of a thread message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// End-user message.
    User,
    /// Assistant response.
    Assistant,
}

impl MessageRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A remote conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// One invocation of the assistant against a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    /// Populated by the API when the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<RunError>,
}

/// Failure details attached to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub code: String,
    pub message: String,
}

/// Run lifecycle status.
///
/// Unknown status strings are kept verbatim in [`RunStatus::Other`] so that a
/// new status introduced upstream does not break deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    Other(String),
}

impl RunStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Other(s) => s,
        }
    }

    /// Statuses a run never leaves without outside intervention.
    ///
    /// `requires_action` is included: this relay never submits tool outputs,
    /// so such a run would otherwise sit until it expires.
    #[must_use]
    pub fn is_dead_end(&self) -> bool {
        matches!(
            self,
            Self::RequiresAction | Self::Cancelled | Self::Failed | Self::Incomplete | Self::Expired
        )
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "requires_action" => Self::RequiresAction,
            "cancelling" => Self::Cancelling,
            "cancelled" => Self::Cancelled,
            "failed" => Self::Failed,
            "completed" => Self::Completed,
            "incomplete" => Self::Incomplete,
            "expired" => Self::Expired,
            _ => Self::Other(s),
        }
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message stored on a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    /// Run that produced this message (assistant messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentSegment>,
}

/// A typed content segment of a thread message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSegment {
    /// Text content.
    Text {
        /// The text payload.
        text: TextContent,
    },
    /// Images, refusals and anything else; ignored when building replies.
    #[serde(other)]
    Other,
}

impl ContentSegment {
    /// Create a text segment.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            text: TextContent {
                value: value.into(),
            },
        }
    }

    /// The text value, if this is a text segment.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(&text.value),
            Self::Other => None,
        }
    }
}

/// Text payload of a [`ContentSegment::Text`]; annotations are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
}

/// Operations the relay needs from the hosted assistant API.
#[async_trait::async_trait]
pub trait AssistantApi: Send + Sync + fmt::Debug {
    /// Create an empty thread.
    async fn create_thread(&self) -> Result<Thread, AssistantError>;

    /// Append a message to a thread.
    async fn add_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), AssistantError>;

    /// Start a run of `assistant_id` against the thread.
    async fn create_run(&self, thread_id: &str, assistant_id: &str)
    -> Result<Run, AssistantError>;

    /// Fetch the current state of a run.
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError>;

    /// List thread messages in the order the API returns them, optionally
    /// restricted to one run.
    async fn list_messages(
        &self,
        thread_id: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<ThreadMessage>, AssistantError>;
}
