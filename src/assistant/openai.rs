//! `OpenAI` Assistants API client.
//!
//! This module implements [`AssistantApi`] over the `OpenAI` Assistants v2 REST
//! endpoints (`/v1/threads/...`). Azure `OpenAI` is supported through
//! [`Provider`](super::Provider) URL and header differences.

use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::AssistantError;

use super::{AssistantApi, AssistantSettings, MessageRole, Run, Thread, ThreadMessage};

/// Beta header required by the assistants endpoints.
const ASSISTANTS_BETA: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

/// Envelope of the list-messages endpoint.
#[derive(Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

/// HTTP client for the Assistants API.
#[derive(Clone)]
pub struct OpenAiAssistantClient {
    http: reqwest::Client,
    settings: AssistantSettings,
}

impl std::fmt::Debug for OpenAiAssistantClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAssistantClient")
            .field("settings", &self.settings)
            .finish()
    }
}

impl OpenAiAssistantClient {
    /// Create a new client with the given settings.
    #[must_use]
    pub fn new(settings: AssistantSettings) -> Self {
        Self::with_client(settings, reqwest::Client::new())
    }

    /// Create a new client with a custom reqwest client.
    #[must_use]
    pub fn with_client(settings: AssistantSettings, http: reqwest::Client) -> Self {
        Self { http, settings }
    }

    /// Settings this client was built with.
    #[must_use]
    pub fn settings(&self) -> &AssistantSettings {
        &self.settings
    }

    fn url(&self, path: &str) -> Result<Url, AssistantError> {
        Ok(self
            .settings
            .provider
            .endpoint(&self.settings.base_url, path)?)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let rb = self
            .http
            .request(method, url)
            .header(ASSISTANTS_BETA.0, ASSISTANTS_BETA.1);
        self.settings.provider.authorize(rb, &self.settings.api_key)
    }

    async fn send<T: DeserializeOwned>(rb: reqwest::RequestBuilder) -> Result<T, AssistantError> {
        let response = rb.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(AssistantError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait::async_trait]
impl AssistantApi for OpenAiAssistantClient {
    async fn create_thread(&self) -> Result<Thread, AssistantError> {
        let url = self.url("threads")?;
        let thread: Thread =
            Self::send(self.request(Method::POST, url).json(&serde_json::json!({}))).await?;
        tracing::debug!(thread_id = %thread.id, "Thread created");
        Ok(thread)
    }

    async fn add_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), AssistantError> {
        let url = self.url(&format!("threads/{thread_id}/messages"))?;
        let body = serde_json::json!({
            "role": role.as_str(),
            "content": content,
        });
        let _: serde_json::Value = Self::send(self.request(Method::POST, url).json(&body)).await?;
        Ok(())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<Run, AssistantError> {
        let url = self.url(&format!("threads/{thread_id}/runs"))?;
        let body = serde_json::json!({ "assistant_id": assistant_id });
        Self::send(self.request(Method::POST, url).json(&body)).await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        let url = self.url(&format!("threads/{thread_id}/runs/{run_id}"))?;
        Self::send(self.request(Method::GET, url)).await
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<ThreadMessage>, AssistantError> {
        let mut url = self.url(&format!("threads/{thread_id}/messages"))?;
        if let Some(run_id) = run_id {
            url.query_pairs_mut().append_pair("run_id", run_id);
        }
        let list: MessageList = Self::send(self.request(Method::GET, url)).await?;
        Ok(list.data)
    }
}
