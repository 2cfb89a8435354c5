//! Journal Server - Editorial workflow API
//!
//! HTTP server exposing registration, sessions, the manuscript workflow,
//! role dashboards and the manuscript report.

pub mod auth;
pub mod error;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use journal_core::{Journal, JournalConfig, JournalError};

use crate::auth::SessionStore;

/// Largest accepted request body, sized for manuscript uploads
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Shared application state
pub struct AppState {
    pub journal: RwLock<Journal>,
    pub sessions: SessionStore,
    pub config: JournalConfig,
}

impl AppState {
    pub fn new(journal: Journal, config: JournalConfig) -> Self {
        Self {
            journal: RwLock::new(journal),
            sessions: SessionStore::with_idle_timeout(Duration::from_secs(
                config.session.idle_timeout_secs,
            )),
            config,
        }
    }

    /// Open the stores named by the configuration
    pub fn from_config(config: JournalConfig) -> Result<Self, JournalError> {
        let journal = Journal::from_config(&config)?;
        tracing::info!(
            policy = ?journal.policy(),
            upload_dir = %config.storage.upload_dir.display(),
            "Journal opened"
        );
        Ok(Self::new(journal, config))
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Session endpoints
        .route("/", get(http::index))
        .route("/register", get(http::register_form).post(http::register))
        .route("/login", get(http::login_form).post(http::login))
        .route("/logout", get(http::logout))
        // Workflow endpoints
        .route(
            "/submit-manuscript",
            get(http::submission_form).post(http::submit_manuscript),
        )
        .route(
            "/submit-review/{id}",
            get(http::review_form).post(http::submit_review),
        )
        .route("/assign-reviewer", axum::routing::post(http::assign_reviewer))
        // Dashboards
        .route("/author-dashboard", get(http::author_dashboard))
        .route("/reviewer-dashboard", get(http::reviewer_dashboard))
        .route("/editor-dashboard", get(http::editor_dashboard))
        .route("/reader-dashboard", get(http::reader_dashboard))
        .route("/view-reviews/{id}", get(http::view_reviews))
        // Files and reports
        .route("/download/{id}", get(http::download))
        .route("/export-excel", get(http::export_report))
        // Middleware
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Journal server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
