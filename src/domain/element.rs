// Form data model shared with the form backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fallback lower bound for repeatable groups and fields
pub const DEFAULT_MIN_INSTANCES: usize = 1;
/// Fallback upper bound for repeatable groups and fields
pub const DEFAULT_MAX_INSTANCES: usize = 10;
/// Neither bound may exceed this, whatever the stored configuration says
pub const INSTANCE_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementType {
    TextInput,
    TextArea,
    Number,
    Email,
    Date,
    Checkbox,
    RadioGroup,
    Select,
    CheckboxGroup,
    ElementGroup,
    StaticText,
    PageBreak,
}

impl ElementType {
    pub const ALL: [ElementType; 12] = [
        ElementType::TextInput,
        ElementType::TextArea,
        ElementType::Number,
        ElementType::Email,
        ElementType::Date,
        ElementType::Checkbox,
        ElementType::RadioGroup,
        ElementType::Select,
        ElementType::CheckboxGroup,
        ElementType::ElementGroup,
        ElementType::StaticText,
        ElementType::PageBreak,
    ];

    /// Static text and page breaks never carry a value
    pub fn is_structural(self) -> bool {
        matches!(self, ElementType::StaticText | ElementType::PageBreak)
    }

    pub fn has_options(self) -> bool {
        matches!(
            self,
            ElementType::RadioGroup | ElementType::Select | ElementType::CheckboxGroup
        )
    }

    /// Human readable name used by the builder palette
    pub fn display_name(self) -> &'static str {
        match self {
            ElementType::TextInput => "Text Input",
            ElementType::TextArea => "Text Area",
            ElementType::Number => "Number",
            ElementType::Email => "Email",
            ElementType::Date => "Date",
            ElementType::Checkbox => "Checkbox",
            ElementType::RadioGroup => "Radio Group",
            ElementType::Select => "Select",
            ElementType::CheckboxGroup => "Checkbox Group",
            ElementType::ElementGroup => "Element Group",
            ElementType::StaticText => "Static Text",
            ElementType::PageBreak => "Page Break",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementOption {
    pub label: String,
    pub value: String,
}

impl ElementOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Type-dependent configuration bag. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ElementOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Rich text for STATIC_TEXT, rendered verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeatable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_instances: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_page: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_other: Option<bool>,
}

impl ElementConfiguration {
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    pub fn is_repeatable(&self) -> bool {
        self.repeatable.unwrap_or(false)
    }

    pub fn allows_other(&self) -> bool {
        self.allow_other.unwrap_or(false)
    }

    pub fn options(&self) -> &[ElementOption] {
        self.options.as_deref().unwrap_or(&[])
    }

    /// Instance bounds clamped so that `0 <= min <= max <= INSTANCE_LIMIT`
    pub fn instance_bounds(&self) -> (usize, usize) {
        let clamp = |n: i64| n.clamp(0, INSTANCE_LIMIT as i64) as usize;
        let min = self.min_instances.map(clamp).unwrap_or(DEFAULT_MIN_INSTANCES);
        let max = self
            .max_instances
            .map(clamp)
            .unwrap_or(DEFAULT_MAX_INSTANCES)
            .max(min);
        (min, max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormElement {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub label: String,
    pub field_name: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub configuration: ElementConfiguration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(default, alias = "parentElementId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FormElement>>,
}

impl FormElement {
    pub fn new(
        id: impl Into<String>,
        element_type: ElementType,
        label: impl Into<String>,
        field_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            element_type,
            label: label.into(),
            field_name: field_name.into(),
            sort_order: 0,
            configuration: ElementConfiguration::default(),
            page_id: None,
            parent_id: None,
            children: None,
        }
    }

    pub fn with_configuration(mut self, configuration: ElementConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn with_children(mut self, children: Vec<FormElement>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_page(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = Some(page_id.into());
        self
    }

    pub fn children(&self) -> &[FormElement] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn is_group(&self) -> bool {
        self.element_type == ElementType::ElementGroup
    }

    pub fn is_repeatable(&self) -> bool {
        self.configuration.is_repeatable()
    }

    /// Full-page only applies to groups
    pub fn is_full_page(&self) -> bool {
        self.is_group() && self.configuration.full_page.unwrap_or(false)
    }

    /// Label used for a single instance of a repeatable group
    pub fn instance_label(&self) -> &str {
        self.configuration
            .instance_label
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(&self.label)
    }
}

/// Children sorted by `sort_order`, stable for ties
pub fn sorted(elements: &[FormElement]) -> Vec<&FormElement> {
    let mut sorted: Vec<&FormElement> = elements.iter().collect();
    sorted.sort_by_key(|e| e.sort_order);
    sorted
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPage {
    pub id: String,
    pub page_number: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub elements: Vec<FormElement>,
}

impl FormPage {
    pub fn new(id: impl Into<String>, page_number: i32, elements: Vec<FormElement>) -> Self {
        Self {
            id: id.into(),
            page_number,
            title: None,
            description: None,
            elements,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Page title, falling back to "Page N" for the given 0-based index
    pub fn display_title(&self, index: usize) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("Page {}", index + 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: FormStatus,
    #[serde(default)]
    pub elements: Vec<FormElement>,
    #[serde(default)]
    pub pages: Vec<FormPage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl Form {
    /// Pages in `page_number` order. A form without pages gets a single
    /// synthetic page holding its root elements.
    pub fn ordered_pages(&self) -> Vec<FormPage> {
        if self.pages.is_empty() {
            return vec![FormPage::new(
                format!("{}-page-1", self.id),
                1,
                self.elements.clone(),
            )];
        }

        let mut pages = self.pages.clone();
        pages.sort_by_key(|p| p.page_number);
        pages
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub form_id: String,
    /// Field name to value, nested for repeatable groups
    pub data: Value,
    #[serde(default = "default_submission_status")]
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_submission_status() -> SubmissionStatus {
    SubmissionStatus::Submitted
}
