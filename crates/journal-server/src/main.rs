//! Journal Server Binary
//!
//! Standalone server for the journal editorial workflow.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use journal_core::JournalConfig;
use journal_server::{serve, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,journal_server=debug")),
        )
        .init();

    let config = JournalConfig::load_standard()?;
    let addr = config.server.addr.clone();
    let state = Arc::new(AppState::from_config(config)?);

    serve(&addr, state).await
}
