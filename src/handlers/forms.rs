// Form entry points: open a wizard session, print a submission

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
};
use serde::Deserialize;
use std::sync::Arc;

use super::session_url;
use crate::{
    error::{AppError, UpstreamResultExt},
    render::print::{print_pages, PrintPage},
    services::{
        api_client::FormSummary,
        autosave::DraftAutosaver,
        sessions::{SessionMode, WizardSession},
    },
    wizard::{Wizard, WizardOptions},
    AppState,
};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    forms: Vec<FormSummary>,
}

#[derive(Template)]
#[template(path = "print.html")]
struct PrintTemplate {
    form_name: String,
    submission_id: String,
    submitted_at: String,
    pages: Vec<PrintPage>,
}

#[derive(Deserialize)]
pub struct OpenParams {
    form_id: String,
    mode: Option<String>,
}

#[derive(Deserialize)]
pub struct PreviewParams {
    readonly: Option<bool>,
}

// GET / - Form picker
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    // The listing is a convenience; an unreachable backend still lets forms be opened by id
    let forms = match state.api.list_forms().await {
        Ok(forms) => forms,
        Err(e) => {
            tracing::warn!("Could not list forms: {:#}", e);
            Vec::new()
        }
    };

    Ok(Html(IndexTemplate { forms }.render()?))
}

// GET /open?form_id=..&mode=fill|preview
pub async fn open(Query(params): Query<OpenParams>) -> Result<Redirect, AppError> {
    let form_id = params.form_id.trim();
    if form_id.is_empty() {
        return Err(AppError::BadRequest("Form id is required".to_string()));
    }

    let target = match params.mode.as_deref().unwrap_or("fill") {
        "fill" => "fill",
        "preview" => "preview",
        other => return Err(AppError::BadRequest(format!("Unknown mode '{}'", other))),
    };
    Ok(Redirect::to(&format!("/forms/{}/{}", urlencoding::encode(form_id), target)))
}

// GET /forms/{form_id}/fill - Respondent session with draft auto-save
pub async fn fill(
    Path(form_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Redirect, AppError> {
    let form = state.api.get_public_form(&form_id).await.upstream_err()?;

    // A draft that cannot be fetched only costs the respondent a blank start
    let draft = match state.api.get_draft(&form.id).await {
        Ok(draft) => draft,
        Err(e) => {
            tracing::warn!(form_id = %form.id, "Could not load draft: {:#}", e);
            None
        }
    };
    let resumed = draft.is_some();

    let wizard = Wizard::new(
        &form,
        WizardOptions {
            read_only: false,
            default_values: draft.map(|d| d.data),
        },
    );
    let autosaver = DraftAutosaver::spawn(state.api.clone(), form.id.clone(), state.settings.autosave_delay);

    let mut session = WizardSession::new(&form.id, SessionMode::Fill, wizard).with_autosaver(autosaver);
    if resumed {
        session.notice = "Your saved draft has been restored.".to_string();
    }

    let id = state.sessions.insert(session).await;
    Ok(Redirect::to(&session_url(&id)))
}

// GET /forms/{form_id}/preview[?readonly=true] - Author preview, nothing is stored
pub async fn preview(
    Path(form_id): Path<String>,
    Query(params): Query<PreviewParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Redirect, AppError> {
    let form = state.api.get_form(&form_id).await.upstream_err()?;

    let wizard = Wizard::new(
        &form,
        WizardOptions {
            read_only: params.readonly.unwrap_or(false),
            default_values: None,
        },
    );

    let id = state
        .sessions
        .insert(WizardSession::new(&form.id, SessionMode::Preview, wizard))
        .await;
    Ok(Redirect::to(&session_url(&id)))
}

// GET /forms/{form_id}/submissions/{submission_id}/edit - Correct a stored submission
pub async fn edit_submission(
    Path((form_id, submission_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Redirect, AppError> {
    let form = state.api.get_form(&form_id).await.upstream_err()?;
    let submission = state
        .api
        .get_submission(&form.id, &submission_id)
        .await
        .upstream_err()?;

    let wizard = Wizard::new(
        &form,
        WizardOptions {
            read_only: false,
            default_values: Some(submission.data),
        },
    );
    let mode = SessionMode::Edit {
        submission_id: submission.id,
    };

    let id = state
        .sessions
        .insert(WizardSession::new(&form.id, mode, wizard))
        .await;
    Ok(Redirect::to(&session_url(&id)))
}

// GET /forms/{form_id}/submissions/{submission_id}/print
pub async fn print_submission(
    Path((form_id, submission_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, AppError> {
    let form = state.api.get_form(&form_id).await.upstream_err()?;
    let submission = state
        .api
        .get_submission(&form.id, &submission_id)
        .await
        .upstream_err()?;

    let template = PrintTemplate {
        form_name: form.name.clone(),
        submitted_at: submission
            .submitted_at
            .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_default(),
        pages: print_pages(&form, &submission.data),
        submission_id: submission.id,
    };
    Ok(Html(template.render()?))
}
