//! Session and conversation thread management.
//!
//! A session is an opaque identifier generated by the browser widget. This
//! module binds each session to one remote assistant thread and keeps the
//! session's record in the conversation store up to date.
//!
//! # Architecture
//!
//! - [`SessionReconciler`]: resolves a session to its thread, creating both
//!   the thread and the record on first contact
//! - [`ConversationLog`]: appends user/assistant exchanges to the record's log
//! - [`record`]: store column names and the typed [`ConversationRecord`] view
//!
//! # Example
//!
//! ```rust,ignore
//! use assistant_relay::session::SessionReconciler;
//!
//! let reconciler = SessionReconciler::new(store, assistant, "Threads", true);
//! let resolved = reconciler.resolve_thread("k3j9x0a1b", "Hello!").await?;
//! println!("thread {}", resolved.thread_id);
//! ```

pub mod log;
pub mod record;
mod thread;

pub use log::{ConversationLog, Exchange};
pub use record::ConversationRecord;
pub use thread::{ResolvedThread, SessionReconciler};
