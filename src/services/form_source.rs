// Forms served from a local YAML or JSON file
//
// Submissions and drafts only live in memory. Saving elements writes the
// whole file back in its own format.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::api_client::{FormApi, FormSummary, NotFound};
use super::serializers::{self, FormSerializer};
use crate::domain::element::{Form, FormElement, FormStatus, Submission, SubmissionStatus};

pub struct FileFormApi {
    path: Option<PathBuf>,
    serializer: Box<dyn FormSerializer>,
    forms: RwLock<Vec<Form>>,
    submissions: RwLock<HashMap<String, Submission>>,
    drafts: RwLock<HashMap<String, Submission>>,
}

impl FileFormApi {
    /// Load every form in the file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read form file {}", path.display()))?;

        let serializer = serializers::for_path(path);
        let forms = serializer
            .deserialize(&content)
            .with_context(|| format!("Failed to parse form file {}", path.display()))?;

        tracing::info!(path = %path.display(), forms = forms.len(), "Loaded form file");

        Ok(Self {
            path: Some(path.to_path_buf()),
            serializer,
            forms: RwLock::new(forms),
            submissions: RwLock::new(HashMap::new()),
            drafts: RwLock::new(HashMap::new()),
        })
    }

    /// Forms held in memory only, nothing is written back
    pub fn in_memory(forms: Vec<Form>) -> Self {
        Self {
            path: None,
            serializer: Box::new(serializers::YamlSerializer),
            forms: RwLock::new(forms),
            submissions: RwLock::new(HashMap::new()),
            drafts: RwLock::new(HashMap::new()),
        }
    }

    async fn find(&self, form_id: &str) -> Result<Form> {
        self.forms
            .read()
            .await
            .iter()
            .find(|f| f.id == form_id)
            .cloned()
            .ok_or_else(|| NotFound(format!("form '{}'", form_id)).into())
    }

    async fn write_back(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = self.serializer.serialize(&self.forms.read().await)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write form file {}", path.display()))
    }

    fn new_submission(form_id: &str, data: &Value, status: SubmissionStatus) -> Submission {
        let now = Utc::now();
        Submission {
            id: Uuid::new_v4().to_string(),
            form_id: form_id.to_string(),
            data: data.clone(),
            status,
            submitted_at: (status == SubmissionStatus::Submitted).then_some(now),
            updated_at: Some(now),
        }
    }
}

#[async_trait]
impl FormApi for FileFormApi {
    async fn list_forms(&self) -> Result<Vec<FormSummary>> {
        Ok(self.forms.read().await.iter().map(FormSummary::from).collect())
    }

    async fn get_form(&self, form_id: &str) -> Result<Form> {
        self.find(form_id).await
    }

    /// A local file is an authoring copy, so any status may be filled
    async fn get_public_form(&self, form_id: &str) -> Result<Form> {
        let form = self.find(form_id).await?;
        if form.status == FormStatus::Archived {
            return Err(NotFound(format!("form '{}'", form_id)).into());
        }
        Ok(form)
    }

    async fn submit(&self, form_id: &str, data: &Value) -> Result<Submission> {
        self.find(form_id).await?;
        let submission = Self::new_submission(form_id, data, SubmissionStatus::Submitted);
        self.submissions
            .write()
            .await
            .insert(submission.id.clone(), submission.clone());
        self.drafts.write().await.remove(form_id);
        tracing::info!(form_id, submission_id = %submission.id, "Stored submission");
        Ok(submission)
    }

    async fn get_draft(&self, form_id: &str) -> Result<Option<Submission>> {
        Ok(self.drafts.read().await.get(form_id).cloned())
    }

    async fn save_draft(&self, form_id: &str, data: &Value) -> Result<Submission> {
        self.find(form_id).await?;
        let mut drafts = self.drafts.write().await;
        let draft = match drafts.get(form_id) {
            Some(existing) => Submission {
                data: data.clone(),
                updated_at: Some(Utc::now()),
                ..existing.clone()
            },
            None => Self::new_submission(form_id, data, SubmissionStatus::Draft),
        };
        drafts.insert(form_id.to_string(), draft.clone());
        Ok(draft)
    }

    async fn get_submission(&self, form_id: &str, submission_id: &str) -> Result<Submission> {
        self.submissions
            .read()
            .await
            .get(submission_id)
            .filter(|s| s.form_id == form_id)
            .cloned()
            .ok_or_else(|| NotFound(format!("submission '{}'", submission_id)).into())
    }

    async fn update_submission(&self, form_id: &str, submission_id: &str, data: &Value) -> Result<Submission> {
        let mut submissions = self.submissions.write().await;
        let submission = submissions
            .get_mut(submission_id)
            .filter(|s| s.form_id == form_id)
            .ok_or_else(|| NotFound(format!("submission '{}'", submission_id)))?;
        submission.data = data.clone();
        submission.updated_at = Some(Utc::now());
        Ok(submission.clone())
    }

    async fn save_elements(&self, form_id: &str, elements: &[FormElement]) -> Result<Vec<FormElement>> {
        {
            let mut forms = self.forms.write().await;
            let form = forms
                .iter_mut()
                .find(|f| f.id == form_id)
                .ok_or_else(|| NotFound(format!("form '{}'", form_id)))?;

            if form.pages.is_empty() {
                form.elements = elements.to_vec();
            } else {
                // Root elements go back to the page they name
                for page in form.pages.iter_mut() {
                    page.elements = elements
                        .iter()
                        .filter(|e| e.page_id.as_deref() == Some(page.id.as_str()))
                        .cloned()
                        .collect();
                }
                form.elements = elements
                    .iter()
                    .filter(|e| e.page_id.is_none())
                    .cloned()
                    .collect();
            }
            form.updated_at = Some(Utc::now());
        }
        self.write_back().await?;
        Ok(elements.to_vec())
    }
}
