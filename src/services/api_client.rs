// Client for the form backend API

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::domain::element::{ElementConfiguration, ElementType, Form, FormElement, FormStatus, Submission};

/// The backend has no such resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound(pub String);

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} not found", self.0)
    }
}

impl std::error::Error for NotFound {}

/// Entry of the form listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: FormStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub element_count: usize,
}

impl From<&Form> for FormSummary {
    fn from(form: &Form) -> Self {
        let page_elements: usize = form.pages.iter().map(|p| p.elements.len()).sum();
        Self {
            id: form.id.clone(),
            name: form.name.clone(),
            description: form.description.clone(),
            status: form.status,
            created_at: form.created_at,
            updated_at: form.updated_at,
            element_count: form.elements.len().max(page_elements),
        }
    }
}

/// Everything the wizard and builder need from the backend
#[async_trait]
pub trait FormApi: Send + Sync {
    async fn list_forms(&self) -> Result<Vec<FormSummary>> {
        Ok(Vec::new())
    }

    /// Form with its full element tree, any status
    async fn get_form(&self, form_id: &str) -> Result<Form>;

    /// Published form for respondents
    async fn get_public_form(&self, form_id: &str) -> Result<Form>;

    async fn submit(&self, form_id: &str, data: &Value) -> Result<Submission>;

    async fn get_draft(&self, form_id: &str) -> Result<Option<Submission>>;

    async fn save_draft(&self, form_id: &str, data: &Value) -> Result<Submission>;

    async fn get_submission(&self, form_id: &str, submission_id: &str) -> Result<Submission>;

    async fn update_submission(&self, form_id: &str, submission_id: &str, data: &Value) -> Result<Submission>;

    /// Persist the current tree shape of a form. Returns the tree as stored,
    /// carrying any ids the backend assigned to new elements.
    async fn save_elements(&self, form_id: &str, elements: &[FormElement]) -> Result<Vec<FormElement>>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ElementRequest<'a> {
    #[serde(rename = "type")]
    element_type: &'a ElementType,
    label: &'a str,
    field_name: &'a str,
    sort_order: i32,
    configuration: &'a ElementConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_element_id: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReorderRequest<'a> {
    element_ids: Vec<&'a str>,
}

/// `FormApi` over HTTP
pub struct HttpFormApi {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpFormApi {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let mut base = Url::parse(base_url).with_context(|| format!("Invalid API url '{}'", base_url))?;
        if base.cannot_be_a_base() {
            bail!("API url '{}' cannot be used as a base", base_url);
        }
        // Url::join replaces the last segment unless the base ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base, token })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let path = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        self.base
            .join(&path)
            .with_context(|| format!("Invalid API path '{}'", path))
    }

    async fn send(&self, method: Method, segments: &[&str], body: Option<&Value>) -> Result<Response> {
        let url = self.url(segments)?;
        tracing::debug!(%method, %url, "Calling form API");

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{} {} failed", method, url))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(NotFound(segments.join("/")).into());
        }
        if !status.is_success() {
            tracing::warn!(%method, %url, %status, "Form API returned an error");
            bail!("{} {} returned {}", method, url, status);
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(&self, method: Method, segments: &[&str], body: Option<&Value>) -> Result<T> {
        let response = self.send(method, segments, body).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("Unexpected response from /{}", segments.join("/")))
    }
}

#[async_trait]
impl FormApi for HttpFormApi {
    async fn list_forms(&self) -> Result<Vec<FormSummary>> {
        self.json(Method::GET, &["forms"], None).await
    }

    async fn get_form(&self, form_id: &str) -> Result<Form> {
        self.json(Method::GET, &["forms", form_id], None).await
    }

    async fn get_public_form(&self, form_id: &str) -> Result<Form> {
        self.json(Method::GET, &["public", "forms", form_id], None).await
    }

    async fn submit(&self, form_id: &str, data: &Value) -> Result<Submission> {
        let body = json!({ "data": data });
        self.json(Method::POST, &["public", "forms", form_id, "submit"], Some(&body))
            .await
    }

    async fn get_draft(&self, form_id: &str) -> Result<Option<Submission>> {
        let response = match self.send(Method::GET, &["public", "forms", form_id, "draft"], None).await {
            Ok(response) => response,
            Err(e) if e.is::<NotFound>() => return Ok(None),
            Err(e) => return Err(e),
        };
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let bytes = response.bytes().await.context("Failed to read draft")?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let draft = serde_json::from_slice::<Option<Submission>>(&bytes).context("Unexpected draft response")?;
        Ok(draft)
    }

    async fn save_draft(&self, form_id: &str, data: &Value) -> Result<Submission> {
        let body = json!({ "data": data });
        self.json(Method::PUT, &["public", "forms", form_id, "draft"], Some(&body))
            .await
    }

    async fn get_submission(&self, form_id: &str, submission_id: &str) -> Result<Submission> {
        self.json(Method::GET, &["forms", form_id, "submissions", submission_id], None)
            .await
    }

    async fn update_submission(&self, form_id: &str, submission_id: &str, data: &Value) -> Result<Submission> {
        let body = json!({ "data": data });
        self.json(
            Method::PUT,
            &["forms", form_id, "submissions", submission_id],
            Some(&body),
        )
        .await
    }

    /// Bring the stored tree in line with `elements`. Stored elements that
    /// are gone are deleted (with their subtree), unknown ids are created and
    /// the rest updated, parents before children in display order, then the
    /// roots are reordered. Requests are sent one at a time and the first
    /// failure stops the loop.
    async fn save_elements(&self, form_id: &str, elements: &[FormElement]) -> Result<Vec<FormElement>> {
        let stored = self.get_form(form_id).await.context("Failed to load stored elements")?;
        let stored_roots: Vec<&FormElement> = stored
            .elements
            .iter()
            .chain(stored.pages.iter().flat_map(|page| page.elements.iter()))
            .collect();

        let mut stored_ids = HashSet::new();
        collect_ids(stored_roots.iter().copied(), &mut stored_ids);
        let mut kept_ids = HashSet::new();
        collect_ids(elements.iter(), &mut kept_ids);

        let mut deleted = 0usize;
        let mut gone = stored_roots;
        while let Some(element) = gone.pop() {
            if kept_ids.contains(element.id.as_str()) {
                gone.extend(element.children());
                continue;
            }
            match self.send(Method::DELETE, &["forms", form_id, "elements", &element.id], None).await {
                Ok(_) => deleted += 1,
                Err(e) if e.is::<NotFound>() => {}
                Err(e) => return Err(e.context(format!("Failed to delete element '{}'", element.field_name))),
            }
        }

        let roots = display_order(elements);
        let mut assigned: HashMap<String, String> = HashMap::new();
        let mut created = 0usize;
        let mut updated = 0usize;
        let mut pending: Vec<(&FormElement, Option<String>)> = roots.iter().rev().map(|e| (*e, None)).collect();

        while let Some((element, parent)) = pending.pop() {
            let request = ElementRequest {
                element_type: &element.element_type,
                label: &element.label,
                field_name: &element.field_name,
                sort_order: element.sort_order,
                configuration: &element.configuration,
                page_id: element.page_id.as_deref(),
                parent_element_id: parent.as_deref(),
            };
            let body = serde_json::to_value(&request)?;

            let id = if stored_ids.contains(element.id.as_str()) {
                self.send(Method::PUT, &["forms", form_id, "elements", &element.id], Some(&body))
                    .await
                    .with_context(|| format!("Failed to save element '{}'", element.field_name))?;
                updated += 1;
                element.id.clone()
            } else {
                let saved: FormElement = self
                    .json(Method::POST, &["forms", form_id, "elements"], Some(&body))
                    .await
                    .with_context(|| format!("Failed to create element '{}'", element.field_name))?;
                created += 1;
                assigned.insert(element.id.clone(), saved.id.clone());
                saved.id
            };

            let children = display_order(element.children());
            pending.extend(children.into_iter().rev().map(|child| (child, Some(id.clone()))));
        }

        let body = serde_json::to_value(ReorderRequest {
            element_ids: roots
                .iter()
                .map(|e| assigned.get(&e.id).map_or(e.id.as_str(), String::as_str))
                .collect(),
        })?;
        self.send(Method::PUT, &["forms", form_id, "elements", "reorder"], Some(&body))
            .await
            .context("Failed to reorder elements")?;

        tracing::info!(form_id, created, updated, deleted, "Saved form elements");
        Ok(with_assigned_ids(elements, &assigned))
    }
}

fn display_order(elements: &[FormElement]) -> Vec<&FormElement> {
    let mut ordered: Vec<&FormElement> = elements.iter().collect();
    ordered.sort_by_key(|e| e.sort_order);
    ordered
}

fn collect_ids<'a>(elements: impl Iterator<Item = &'a FormElement>, ids: &mut HashSet<&'a str>) {
    for element in elements {
        ids.insert(element.id.as_str());
        collect_ids(element.children().iter(), ids);
    }
}

/// Swap client-side ids for the ones the backend assigned
fn with_assigned_ids(elements: &[FormElement], assigned: &HashMap<String, String>) -> Vec<FormElement> {
    elements
        .iter()
        .map(|element| {
            let mut saved = element.clone();
            if let Some(id) = assigned.get(&element.id) {
                saved.id = id.clone();
            }
            if let Some(parent) = element.parent_id.as_ref().and_then(|p| assigned.get(p)) {
                saved.parent_id = Some(parent.clone());
            }
            if let Some(children) = &element.children {
                saved.children = Some(with_assigned_ids(children, assigned));
            }
            saved
        })
        .collect()
}
