use std::env;
use std::time::Duration;

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::assistant::{AssistantSettings, PollPolicy, Provider, ReplyScope};
use crate::chat::{ChatOptions, ConversationLogMode};
use crate::store::providers::airtable::DEFAULT_ENDPOINT as AIRTABLE_ENDPOINT;

/// Prefix of structured environment overrides, e.g. `RELAY_SERVER__PORT`.
const ENV_PREFIX: &str = "RELAY";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Record store provider (airtable or memory)
    #[arg(long, env = "STORE_PROVIDER")]
    pub store_provider: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub assistant: AssistantConfig,
    pub store: StoreConfig,
    pub polling: PollingConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Directory served as the chat widget.
    pub static_dir: String,
}

#[derive(Deserialize, Clone)]
pub struct AssistantConfig {
    pub base_url: String,
    pub api_key: String,
    pub assistant_id: String,
    /// Azure `OpenAI` API version; ignored by other providers.
    pub api_version: Option<String>,
    pub reply_scope: ReplyScope,
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("assistant_id", &self.assistant_id)
            .field("api_version", &self.api_version)
            .field("reply_scope", &self.reply_scope)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    Airtable,
    Memory,
}

#[derive(Deserialize, Clone)]
pub struct StoreConfig {
    pub provider: StoreProvider,
    pub endpoint_url: String,
    pub api_key: String,
    pub base_id: String,
    pub table: String,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("provider", &self.provider)
            .field("endpoint_url", &self.endpoint_url)
            .field("api_key", &"<redacted>")
            .field("base_id", &self.base_id)
            .field("table", &self.table)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub max_wait_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub require_session_id: bool,
    pub record_last_message: bool,
    pub conversation_log: ConversationLogMode,
    pub log_timestamps: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(|e| ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.static_dir", "static")?
            .set_default("assistant.base_url", "https://api.openai.com")?
            .set_default("assistant.api_key", "")?
            .set_default("assistant.assistant_id", "")?
            .set_default("assistant.reply_scope", "thread")?
            .set_default("store.provider", "airtable")?
            .set_default("store.endpoint_url", AIRTABLE_ENDPOINT)?
            .set_default("store.api_key", "")?
            .set_default("store.base_id", "")?
            .set_default("store.table", "Threads")?
            .set_default("polling.interval_ms", 1000)?
            .set_default("polling.max_wait_secs", 300)?
            .set_default("chat.require_session_id", true)?
            .set_default("chat.record_last_message", true)?
            .set_default("chat.conversation_log", "append")?
            .set_default("chat.log_timestamps", false)?;

        // 2. Config file: explicit path is required to exist, ./config.* is optional
        builder = match non_empty(cli.config) {
            Some(path) => builder.add_source(File::with_name(&path).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // 3. Environment variables (prefixed with RELAY_), e.g. RELAY_STORE__TABLE=Chats
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. Legacy environment names used by existing deployments
        for (var, key) in [
            ("OPENAI_API_KEY", "assistant.api_key"),
            ("OPENAI_BASE_URL", "assistant.base_url"),
            ("ASSISTANT_ID", "assistant.assistant_id"),
            ("AIRTABLE_API_KEY", "store.api_key"),
            ("AIRTABLE_BEARER_TOKEN", "store.api_key"),
            ("AIRTABLE_BASE_ID", "store.base_id"),
        ] {
            if let Ok(val) = env::var(var) {
                if !val.trim().is_empty() {
                    builder = builder.set_override(key, val)?;
                }
            }
        }

        // 5. CLI flags (clap also resolves their env aliases such as PORT)
        // Empty values (`PORT=`) count as unset.
        if let Some(port) = non_empty(cli.port) {
            let port: u16 = port
                .parse()
                .map_err(|e| ConfigError::Message(format!("invalid port '{port}': {e}")))?;
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(host) = non_empty(cli.host) {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(provider) = non_empty(cli.store_provider) {
            builder = builder.set_override("store.provider", provider)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Check settings the server cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.assistant.api_key.trim().is_empty() {
            missing.push("assistant.api_key (OPENAI_API_KEY)");
        }
        if self.assistant.assistant_id.trim().is_empty() {
            missing.push("assistant.assistant_id (ASSISTANT_ID)");
        }
        if self.store.provider == StoreProvider::Airtable {
            if self.store.api_key.trim().is_empty() {
                missing.push("store.api_key (AIRTABLE_BEARER_TOKEN)");
            }
            if self.store.base_id.trim().is_empty() {
                missing.push("store.base_id (AIRTABLE_BASE_ID)");
            }
        }
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Message(
                "polling.interval_ms must be greater than zero".to_string(),
            ));
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )))
        }
    }

    #[must_use]
    pub fn assistant_settings(&self) -> AssistantSettings {
        AssistantSettings {
            base_url: self.assistant.base_url.clone(),
            api_key: self.assistant.api_key.clone(),
            assistant_id: self.assistant.assistant_id.clone(),
            provider: Provider::detect_from_url(
                &self.assistant.base_url,
                self.assistant.api_version.as_deref(),
            ),
        }
    }

    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.polling.interval_ms),
            max_wait: Duration::from_secs(self.polling.max_wait_secs),
        }
    }

    #[must_use]
    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            assistant_id: self.assistant.assistant_id.clone(),
            table: self.store.table.clone(),
            require_session_id: self.chat.require_session_id,
            record_last_message: self.chat.record_last_message,
            conversation_log: self.chat.conversation_log,
            log_timestamps: self.chat.log_timestamps,
            reply_scope: self.assistant.reply_scope,
            poll: self.poll_policy(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
