//! Assistant Relay Server
//!
//! Entry point: load configuration, initialize logging, serve.

use std::sync::Arc;

use anyhow::Context;
use assistant_relay::{config::AppConfig, server, telemetry};
use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before anything reads the environment
    let _ = dotenvy::dotenv();

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    server::start_server(Arc::new(config)).await
}
