// Wizard session pages

use askama::Template;
use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::session_url;
use crate::{
    error::AppError,
    render::{
        posted::{self, PostedForm},
        view_nodes, WizardTemplate,
    },
    services::sessions::{Completed, SessionMode, SharedSession, WizardSession},
    wizard::{Effect, WizardEvent},
    AppState,
};

#[derive(Template)]
#[template(path = "submitted.html")]
struct SubmittedTemplate {
    form_name: String,
    message: String,
    print_link: String,
    payload: String,
}

async fn find_session(state: &AppState, id: &str) -> Result<(Uuid, SharedSession), AppError> {
    let missing = || AppError::NotFound("This form session has expired or does not exist".to_string());
    let id = Uuid::parse_str(id).map_err(|_| missing())?;
    let session = state.sessions.get(&id).await.ok_or_else(missing)?;
    Ok((id, session))
}

// GET /sessions/{id} - Current page, group view, or the submitted screen
pub async fn show(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, AppError> {
    let (id, session) = find_session(&state, &id).await?;
    let mut session = session.lock().await;

    if let Some(completed) = &session.completed {
        return Ok(Html(submitted_page(&session, completed)?));
    }

    let notice = std::mem::take(&mut session.notice);
    let template = WizardTemplate::build(
        &session.wizard,
        &id.to_string(),
        session.mode.label(session.wizard.is_read_only()),
        session.mode.submit_label(),
        &notice,
    )?;
    Ok(Html(template.render()?))
}

// POST /sessions/{id} - Apply the posted answers, then the pressed button
pub async fn update(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Redirect, AppError> {
    let (id, session) = find_session(&state, &id).await?;
    let mut session = session.lock().await;
    let target = session_url(&id);

    if session.completed.is_some() {
        return Ok(Redirect::to(&target));
    }

    let posted = PostedForm::parse(&body);

    // Only fields of the view that was posted are taken from the body
    let updates = posted::updates(&view_nodes(&session.wizard), &posted);
    let effect = session.wizard.set_values(updates);
    apply_effect(&state, &mut session, effect).await;

    if let Some(action) = posted.first("action") {
        match action.parse::<WizardEvent>() {
            Ok(event) => {
                let effect = session.wizard.dispatch(event);
                apply_effect(&state, &mut session, effect).await;
            }
            Err(e) => tracing::warn!(session_id = %id, "Ignoring posted action: {}", e),
        }
    }

    Ok(Redirect::to(&target))
}

async fn apply_effect(state: &AppState, session: &mut WizardSession, effect: Effect) {
    match effect {
        Effect::Nothing => {}
        Effect::ValuesChanged(data) => {
            if let Some(autosaver) = &session.autosaver {
                autosaver.notify(data);
            }
        }
        Effect::Submit(data) => submit(state, session, data).await,
    }
}

async fn submit(state: &AppState, session: &mut WizardSession, data: Value) {
    if session.wizard.is_submitting() {
        return;
    }
    session.wizard.set_submitting(true);

    let form_id = session.form_id.clone();
    let result = match &session.mode {
        SessionMode::Fill => state.api.submit(&form_id, &data).await.map(|s| Some(s.id)),
        SessionMode::Preview => Ok(None),
        SessionMode::Edit { submission_id } => state
            .api
            .update_submission(&form_id, submission_id, &data)
            .await
            .map(|s| Some(s.id)),
    };

    match result {
        Ok(submission_id) => {
            tracing::info!(form_id = %form_id, submission_id = ?submission_id, "Form submitted");
            session.complete(Completed { submission_id, data });
        }
        Err(e) => {
            tracing::warn!(form_id = %form_id, "Submit failed: {:#}", e);
            session.wizard.set_submitting(false);
            session.notice = "Your answers could not be submitted. Please try again.".to_string();
        }
    }
}

fn submitted_page(session: &WizardSession, completed: &Completed) -> Result<String, AppError> {
    let print_link = completed
        .submission_id
        .as_deref()
        .map(|sid| {
            format!(
                "/forms/{}/submissions/{}/print",
                urlencoding::encode(&session.form_id),
                urlencoding::encode(sid)
            )
        })
        .unwrap_or_default();

    let (message, payload) = match session.mode {
        SessionMode::Fill => ("Thank you! Your response has been recorded.", String::new()),
        SessionMode::Edit { .. } => ("The submission has been updated.", String::new()),
        SessionMode::Preview => (
            "Preview submitted. Nothing was stored.",
            serde_json::to_string_pretty(&completed.data).map_err(|e| AppError::Internal(e.to_string()))?,
        ),
    };

    let template = SubmittedTemplate {
        form_name: session.wizard.title().to_string(),
        message: message.to_string(),
        print_link,
        payload,
    };
    Ok(template.render()?)
}
