//! Error types shared across the relay.

use std::time::Duration;

use thiserror::Error;

use crate::assistant::RunStatus;

/// Errors raised while talking to the hosted assistant API.
#[derive(Error, Debug)]
pub enum AssistantError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// API returned an error response.
    #[error("assistant API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error body returned by the API.
        message: String,
    },

    /// The run did not reach `completed` before the poll deadline.
    #[error("run {run_id} did not complete within {waited:?} ({polls} polls)")]
    RunTimedOut {
        run_id: String,
        polls: u32,
        waited: Duration,
    },

    /// The run reached a status it will never leave on its own.
    #[error("run {run_id} ended with status {status}{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    RunEnded {
        run_id: String,
        status: RunStatus,
        detail: Option<String>,
    },
}

/// Errors raised by a [`RecordStore`](crate::store::RecordStore) provider.
#[derive(Error, Debug)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Store API returned an error response.
    #[error("store API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Update targeted a record that does not exist.
    #[error("record {id} not found in table {table}")]
    NotFound { table: String, id: String },

    /// A record was found but its fields cannot be used.
    #[error("malformed record {id}: {reason}")]
    Malformed { id: String, reason: String },
}

/// Errors surfaced by one chat request cycle.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Required request fields were absent or empty.
    #[error("{}", describe_missing(.0))]
    MissingFields(Vec<&'static str>),

    #[error(transparent)]
    Assistant(#[from] AssistantError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChatError {
    /// Whether the caller is at fault (maps to a 4xx response).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingFields(_))
    }
}

fn describe_missing(fields: &[&str]) -> String {
    match fields {
        [] => "request is missing required fields".to_string(),
        [one] => format!("{one} is required"),
        many => format!("{} are required", many.join(" and ")),
    }
}
