use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use formpilot::{
    config::Settings,
    create_router,
    services::{api_client::{FormApi, HttpFormApi}, form_source::FileFormApi},
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("formpilot=info,tower_http=info")),
        )
        .init();

    let settings = Settings::parse()?;

    let api: Arc<dyn FormApi> = match &settings.form_file {
        Some(path) => Arc::new(FileFormApi::load(path).await?),
        None => {
            tracing::info!(api_url = %settings.api_url, "Using form backend");
            Arc::new(HttpFormApi::new(&settings.api_url, settings.api_token.clone())?)
        }
    };

    let bind = settings.bind;
    let app = create_router(Arc::new(AppState::new(api, settings)));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    tracing::info!("Listening on http://{}", bind);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
