// In-memory registry of open wizard sessions

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::autosave::DraftAutosaver;
use crate::wizard::Wizard;

/// What a session's submit does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    /// Respondent filling a published form, with draft auto-save
    Fill,
    /// Author preview, submit only echoes the payload
    Preview,
    /// Correcting an existing submission
    Edit { submission_id: String },
}

impl SessionMode {
    pub fn label(&self, read_only: bool) -> &'static str {
        match self {
            SessionMode::Fill => "",
            SessionMode::Preview if read_only => "Preview (read only)",
            SessionMode::Preview => "Preview",
            SessionMode::Edit { .. } => "Editing a submission",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self {
            SessionMode::Edit { .. } => "Save changes",
            _ => "Submit",
        }
    }
}

/// Outcome of a successful submit
#[derive(Debug, Clone, PartialEq)]
pub struct Completed {
    /// Stored submission, none for previews
    pub submission_id: Option<String>,
    pub data: Value,
}

pub struct WizardSession {
    pub form_id: String,
    pub mode: SessionMode,
    pub wizard: Wizard,
    pub autosaver: Option<DraftAutosaver>,
    /// One-off message shown on the next render
    pub notice: String,
    pub completed: Option<Completed>,
}

impl WizardSession {
    pub fn new(form_id: impl Into<String>, mode: SessionMode, wizard: Wizard) -> Self {
        Self {
            form_id: form_id.into(),
            mode,
            wizard,
            autosaver: None,
            notice: String::new(),
            completed: None,
        }
    }

    pub fn with_autosaver(mut self, autosaver: DraftAutosaver) -> Self {
        self.autosaver = Some(autosaver);
        self
    }

    /// Record a finished submit and stop auto-saving
    pub fn complete(&mut self, completed: Completed) {
        self.autosaver = None;
        self.completed = Some(completed);
    }
}

pub type SharedSession = Arc<Mutex<WizardSession>>;

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: WizardSession) -> Uuid {
        let id = Uuid::new_v4();
        tracing::info!(session_id = %id, form_id = %session.form_id, mode = ?session.mode, "Opened wizard session");
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Drop a session, cancelling its pending auto-save
    pub async fn remove(&self, id: &Uuid) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
