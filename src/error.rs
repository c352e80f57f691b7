// Error handling for formpilot

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::fmt;

use crate::services::api_client::NotFound;

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    status: &'a str,
    message: &'a str,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    TemplateRender(String),
    NotFound(String),
    BadRequest(String),
    /// The form backend failed or could not be reached
    Upstream(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::TemplateRender(msg) => write!(f, "Template rendering error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Upstream(msg) => write!(f, "Form service error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// Implement IntoResponse so Axum can convert errors to HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::TemplateRender(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Template error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, format!("Not found: {}", msg)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, format!("Bad request: {}", msg)),
            AppError::Upstream(msg) => {
                tracing::warn!("Form service error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "The form service is unavailable right now. Please try again.".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.".to_string())
            }
        };

        let page = ErrorTemplate {
            status: status.as_str(),
            message: &message,
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {}", e);
                (status, message).into_response()
            }
        }
    }
}

// Helper to convert template errors
impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::TemplateRender(err.to_string())
    }
}

// Extension trait for form service result handling
pub trait UpstreamResultExt<T> {
    /// Missing resources become `NotFound`, everything else `Upstream`
    fn upstream_err(self) -> Result<T, AppError>;
}

impl<T> UpstreamResultExt<T> for anyhow::Result<T> {
    fn upstream_err(self) -> Result<T, AppError> {
        self.map_err(|e| match e.downcast_ref::<NotFound>() {
            Some(missing) => AppError::NotFound(missing.to_string()),
            None => AppError::Upstream(format!("{:#}", e)),
        })
    }
}
