//! Shared fixtures for integration tests: a scripted assistant and helpers
//! that build configuration and state around the in-memory store.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use assistant_relay::AppState;
use assistant_relay::assistant::{
    AssistantApi, ContentSegment, MessageRole, ReplyScope, Run, RunStatus, Thread, ThreadMessage,
};
use assistant_relay::chat::{ChatService, ConversationLogMode};
use assistant_relay::config::{
    AppConfig, AssistantConfig, ChatConfig, PollingConfig, ServerConfig, StoreConfig,
    StoreProvider,
};
use assistant_relay::error::AssistantError;
use assistant_relay::store::providers::MemoryRecordStore;
use tokio::sync::Barrier;
use tokio::time::Instant;

/// Assistant double with scripted run statuses and canned replies.
#[derive(Debug)]
pub struct StubAssistant {
    statuses: Mutex<VecDeque<RunStatus>>,
    fallback_status: RunStatus,
    replies: Vec<ThreadMessage>,
    thread_barrier: Option<Barrier>,
    fail_runs: AtomicBool,
    threads_created: AtomicUsize,
    runs_created: AtomicUsize,
    polls: Mutex<Vec<Instant>>,
    posted: Mutex<Vec<(String, String)>>,
}

impl Default for StubAssistant {
    fn default() -> Self {
        Self {
            statuses: Mutex::new(VecDeque::new()),
            fallback_status: RunStatus::Completed,
            replies: Vec::new(),
            thread_barrier: None,
            fail_runs: AtomicBool::new(false),
            threads_created: AtomicUsize::new(0),
            runs_created: AtomicUsize::new(0),
            polls: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
        }
    }
}

impl StubAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with one assistant message per entry, each made of the given
    /// text segments.
    pub fn replying(mut self, messages: &[&[&str]]) -> Self {
        self.replies = messages
            .iter()
            .enumerate()
            .map(|(i, segments)| ThreadMessage {
                id: format!("msg_{i}"),
                role: MessageRole::Assistant,
                run_id: None,
                content: segments.iter().map(|s| ContentSegment::text(*s)).collect(),
            })
            .collect();
        self
    }

    /// Statuses returned by successive `get_run` calls before falling back
    /// to `completed`.
    pub fn with_statuses(self, statuses: impl IntoIterator<Item = RunStatus>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into_iter().collect();
        self
    }

    /// Never leave `in_progress`.
    pub fn stuck(mut self) -> Self {
        self.fallback_status = RunStatus::InProgress;
        self
    }

    /// Hold `create_thread` until `parties` callers are inside it.
    pub fn with_thread_barrier(mut self, parties: usize) -> Self {
        self.thread_barrier = Some(Barrier::new(parties));
        self
    }

    /// Fail every `create_run` with an upstream error.
    pub fn failing_runs(self) -> Self {
        self.fail_runs.store(true, Ordering::SeqCst);
        self
    }

    pub fn threads_created(&self) -> usize {
        self.threads_created.load(Ordering::SeqCst)
    }

    pub fn runs_created(&self) -> usize {
        self.runs_created.load(Ordering::SeqCst)
    }

    pub fn poll_instants(&self) -> Vec<Instant> {
        self.polls.lock().unwrap().clone()
    }

    /// `(thread_id, content)` of every message posted.
    pub fn posted(&self) -> Vec<(String, String)> {
        self.posted.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AssistantApi for StubAssistant {
    async fn create_thread(&self) -> Result<Thread, AssistantError> {
        let n = self.threads_created.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(barrier) = &self.thread_barrier {
            barrier.wait().await;
        }
        Ok(Thread {
            id: format!("thread_{n}"),
        })
    }

    async fn add_message(
        &self,
        thread_id: &str,
        _role: MessageRole,
        content: &str,
    ) -> Result<(), AssistantError> {
        self.posted
            .lock()
            .unwrap()
            .push((thread_id.to_string(), content.to_string()));
        Ok(())
    }

    async fn create_run(
        &self,
        _thread_id: &str,
        _assistant_id: &str,
    ) -> Result<Run, AssistantError> {
        if self.fail_runs.load(Ordering::SeqCst) {
            return Err(AssistantError::Api {
                status: 503,
                message: "upstream unavailable".to_string(),
            });
        }
        let n = self.runs_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Run {
            id: format!("run_{n}"),
            status: RunStatus::Queued,
            last_error: None,
        })
    }

    async fn get_run(&self, _thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        self.polls.lock().unwrap().push(Instant::now());
        let status = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback_status.clone());
        Ok(Run {
            id: run_id.to_string(),
            status,
            last_error: None,
        })
    }

    async fn list_messages(
        &self,
        _thread_id: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<ThreadMessage>, AssistantError> {
        Ok(self
            .replies
            .iter()
            .filter(|m| run_id.is_none() || m.run_id.as_deref() == run_id)
            .cloned()
            .collect())
    }
}

/// Configuration backed by the in-memory store with a fast poll interval.
pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            static_dir: "static".to_string(),
        },
        assistant: AssistantConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "sk-test".to_string(),
            assistant_id: "asst_test".to_string(),
            api_version: None,
            reply_scope: ReplyScope::Thread,
        },
        store: StoreConfig {
            provider: StoreProvider::Memory,
            endpoint_url: "http://127.0.0.1:9".to_string(),
            api_key: String::new(),
            base_id: String::new(),
            table: "Threads".to_string(),
        },
        polling: PollingConfig {
            interval_ms: 10,
            max_wait_secs: 5,
        },
        chat: ChatConfig {
            require_session_id: true,
            record_last_message: true,
            conversation_log: ConversationLogMode::Off,
            log_timestamps: false,
        },
    }
}

/// State wired to the given doubles instead of the real HTTP clients.
pub fn test_state(
    assistant: Arc<StubAssistant>,
    store: Arc<MemoryRecordStore>,
    config: AppConfig,
) -> AppState {
    let chat = ChatService::new(assistant, store, config.chat_options());
    AppState {
        chat: Arc::new(chat),
        config: Arc::new(config),
    }
}
