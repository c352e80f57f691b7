pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod render;
pub mod security;
pub mod services;
pub mod validation;
pub mod wizard;

use axum::{
    middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use config::Settings;
use services::{api_client::FormApi, sessions::SessionStore};

/// Largest accepted form post
const MAX_BODY_BYTES: usize = 256 * 1024;

// Application state
pub struct AppState {
    pub api: Arc<dyn FormApi>,
    pub sessions: SessionStore,
    pub settings: Settings,
}

impl AppState {
    pub fn new(api: Arc<dyn FormApi>, settings: Settings) -> Self {
        Self {
            api,
            sessions: SessionStore::new(),
            settings,
        }
    }
}

// Public function to create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::forms::index))
        .route("/open", get(handlers::forms::open))

        // Opening a form starts a wizard session
        .route("/forms/{form_id}/fill", get(handlers::forms::fill))
        .route("/forms/{form_id}/preview", get(handlers::forms::preview))
        .route(
            "/forms/{form_id}/submissions/{submission_id}/edit",
            get(handlers::forms::edit_submission),
        )
        .route(
            "/forms/{form_id}/submissions/{submission_id}/print",
            get(handlers::forms::print_submission),
        )

        // Wizard sessions
        .route(
            "/sessions/{id}",
            get(handlers::sessions::show).post(handlers::sessions::update),
        )

        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(security::security_headers))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
        .with_state(state)
}
