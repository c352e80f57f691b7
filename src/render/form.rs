// Single-page renderer: element list + value state -> view nodes
//
// Every input is named by its value path (`prefix.fieldName`), so posting
// the form back writes each value to the place it was read from.

use serde_json::Value;

use crate::domain::element::{sorted, ElementType, FormElement};
use crate::domain::other_option::{self, OTHER_MARKER};
use crate::domain::schema::{derive_schema, FieldErrors, SchemaScope};
use crate::domain::values;
use crate::wizard::WizardEvent;

/// Maximum characters of an instance summary
const SUMMARY_LIMIT: usize = 60;
/// Child values joined into an instance summary
const SUMMARY_FIELDS: usize = 3;

pub struct RenderContext<'a> {
    pub values: &'a Value,
    pub errors: &'a FieldErrors,
    pub read_only: bool,
    /// Render full-page groups as links / summaries instead of inline
    pub full_page_groups: bool,
}

impl RenderContext<'_> {
    fn inline(&self) -> RenderContext<'_> {
        RenderContext {
            values: self.values,
            errors: self.errors,
            read_only: self.read_only,
            full_page_groups: false,
        }
    }

    fn error(&self, path: &str) -> Option<String> {
        self.errors.get(path).map(str::to_string)
    }

    fn has_errors_under<'k>(&self, keys: impl IntoIterator<Item = &'k str>) -> bool {
        keys.into_iter().any(|key| {
            let nested = format!("{}.", key);
            self.errors.iter().any(|(path, _)| path == key || path.starts_with(&nested))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Text,
    TextArea,
    Number,
    Email,
    Date,
    Checkbox,
    Radio,
    Select,
    CheckboxGroup,
}

impl Control {
    pub fn for_type(element_type: ElementType) -> Option<Control> {
        let control = match element_type {
            ElementType::TextInput => Control::Text,
            ElementType::TextArea => Control::TextArea,
            ElementType::Number => Control::Number,
            ElementType::Email => Control::Email,
            ElementType::Date => Control::Date,
            ElementType::Checkbox => Control::Checkbox,
            ElementType::RadioGroup => Control::Radio,
            ElementType::Select => Control::Select,
            ElementType::CheckboxGroup => Control::CheckboxGroup,
            ElementType::ElementGroup | ElementType::StaticText | ElementType::PageBreak => return None,
        };
        Some(control)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Control::Text => "text",
            Control::TextArea => "textarea",
            Control::Number => "number",
            Control::Email => "email",
            Control::Date => "date",
            Control::Checkbox => "checkbox",
            Control::Radio => "radio",
            Control::Select => "select",
            Control::CheckboxGroup => "checkbox-group",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceView {
    pub label: String,
    pub value: String,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct FieldView {
    pub path: String,
    pub label: String,
    pub control: Control,
    pub required: bool,
    pub placeholder: String,
    pub value: String,
    pub checked: bool,
    pub options: Vec<ChoiceView>,
    pub allow_other: bool,
    pub other_selected: bool,
    pub other_text: String,
    pub error: Option<String>,
    pub read_only: bool,
}

impl FieldView {
    pub fn kind(&self) -> &'static str {
        self.control.as_str()
    }

    /// Name of the free-text input paired with the "Other" choice
    pub fn other_name(&self) -> String {
        other_input_name(&self.path)
    }

    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }

    pub fn other_marker(&self) -> &'static str {
        OTHER_MARKER
    }
}

pub fn other_input_name(path: &str) -> String {
    format!("{}#other", path)
}

#[derive(Debug, Clone)]
pub struct InstanceView {
    pub title: String,
    pub remove_action: String,
    pub can_remove: bool,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct ItemView {
    pub field: FieldView,
    pub remove_action: String,
    pub can_remove: bool,
}

#[derive(Debug, Clone)]
pub struct SummaryView {
    pub title: String,
    pub summary: String,
    pub edit_action: String,
    pub remove_action: String,
    pub can_remove: bool,
    pub has_errors: bool,
}

#[derive(Debug, Clone)]
pub enum Node {
    Field(FieldView),
    Fieldset {
        label: String,
        children: Vec<Node>,
    },
    RepeatableGroup {
        label: String,
        instances: Vec<InstanceView>,
        add_label: String,
        add_action: String,
        can_add: bool,
        error: Option<String>,
        read_only: bool,
    },
    RepeatableField {
        label: String,
        items: Vec<ItemView>,
        add_action: String,
        can_add: bool,
        error: Option<String>,
        read_only: bool,
    },
    /// Author-supplied markup, emitted verbatim
    StaticText { content: String },
    Divider,
    FullPageLink {
        label: String,
        action: String,
        has_errors: bool,
    },
    FullPageList {
        label: String,
        add_label: String,
        entries: Vec<SummaryView>,
        add_action: String,
        can_add: bool,
        error: Option<String>,
        read_only: bool,
    },
}

/// Render `elements` (already in display order) under `prefix`
pub fn render_elements(elements: &[&FormElement], prefix: &str, ctx: &RenderContext<'_>) -> Vec<Node> {
    elements
        .iter()
        .map(|element| render_element(element, prefix, ctx))
        .collect()
}

fn render_children(element: &FormElement, prefix: &str, ctx: &RenderContext<'_>) -> Vec<Node> {
    render_elements(&sorted(element.children()), prefix, ctx)
}

fn render_element(element: &FormElement, prefix: &str, ctx: &RenderContext<'_>) -> Node {
    match element.element_type {
        ElementType::StaticText => Node::StaticText {
            content: element.configuration.content.clone().unwrap_or_default(),
        },
        ElementType::PageBreak => Node::Divider,
        ElementType::ElementGroup => render_group(element, prefix, ctx),
        _ if element.is_repeatable() => render_repeatable_field(element, prefix, ctx),
        _ => {
            let path = values::join(prefix, &element.field_name);
            Node::Field(field_view(element, path, ctx))
        }
    }
}

fn render_group(element: &FormElement, prefix: &str, ctx: &RenderContext<'_>) -> Node {
    let list_path = values::join(prefix, &element.field_name);

    if ctx.full_page_groups && element.is_full_page() {
        if element.is_repeatable() {
            return full_page_list(element, &list_path, ctx);
        }

        let keys: Vec<String> = derive_schema(element.children(), SchemaScope::Full)
            .keys()
            .map(|key| values::join(prefix, key))
            .collect();
        return Node::FullPageLink {
            label: format!("Fill {}", element.label),
            action: WizardEvent::Fill(element.field_name.clone()).to_string(),
            has_errors: ctx.has_errors_under(keys.iter().map(String::as_str)),
        };
    }

    if !element.is_repeatable() {
        return Node::Fieldset {
            label: element.label.clone(),
            children: render_children(element, prefix, ctx),
        };
    }

    let (min, max) = element.configuration.instance_bounds();
    let count = values::array_len(ctx.values, &list_path);
    let inline = ctx.inline();

    let instances = (0..count)
        .map(|index| {
            let instance_path = values::join(&list_path, &index.to_string());
            InstanceView {
                title: format!("{} {}", element.instance_label(), index + 1),
                remove_action: WizardEvent::Remove(instance_path.clone()).to_string(),
                can_remove: count > min,
                children: render_children(element, &instance_path, &inline),
            }
        })
        .collect();

    Node::RepeatableGroup {
        label: element.label.clone(),
        instances,
        add_label: format!("Add {}", element.instance_label()),
        add_action: WizardEvent::Add(list_path.clone()).to_string(),
        can_add: count < max,
        error: ctx.error(&list_path),
        read_only: ctx.read_only,
    }
}

fn full_page_list(element: &FormElement, list_path: &str, ctx: &RenderContext<'_>) -> Node {
    let (min, max) = element.configuration.instance_bounds();
    let count = values::array_len(ctx.values, list_path);

    let entries = (0..count)
        .map(|index| {
            let instance_path = values::join(list_path, &index.to_string());
            SummaryView {
                title: format!("{} {}", element.instance_label(), index + 1),
                summary: instance_summary(element, &instance_path, ctx.values),
                edit_action: WizardEvent::Edit(element.field_name.clone(), index).to_string(),
                remove_action: WizardEvent::Remove(instance_path.clone()).to_string(),
                can_remove: count > min,
                has_errors: ctx.has_errors_under([instance_path.as_str()]),
            }
        })
        .collect();

    Node::FullPageList {
        label: element.label.clone(),
        add_label: format!("Add {}", element.instance_label()),
        entries,
        add_action: WizardEvent::Add(list_path.to_string()).to_string(),
        can_add: count < max,
        error: ctx.error(list_path),
        read_only: ctx.read_only,
    }
}

/// Up to three non-empty child values of one instance, joined and truncated
pub fn instance_summary(element: &FormElement, instance_path: &str, data: &Value) -> String {
    let parts: Vec<String> = sorted(element.children())
        .into_iter()
        .filter(|child| Control::for_type(child.element_type).is_some() && !child.is_repeatable())
        .filter_map(|child| {
            let value = values::get(data, &values::join(instance_path, &child.field_name))?;
            let text = match value {
                Value::Bool(true) => child.label.clone(),
                Value::Bool(false) => return None,
                Value::String(s) => other_option::resolve_label(s, child.configuration.options()),
                other => values::display_text(other),
            };
            let text = text.trim().to_string();
            (!text.is_empty()).then_some(text)
        })
        .take(SUMMARY_FIELDS)
        .collect();

    if parts.is_empty() {
        return "Not filled in yet".to_string();
    }

    let summary = parts.join(", ");
    if summary.chars().count() > SUMMARY_LIMIT {
        let truncated: String = summary.chars().take(SUMMARY_LIMIT).collect();
        format!("{}…", truncated.trim_end())
    } else {
        summary
    }
}

fn render_repeatable_field(element: &FormElement, prefix: &str, ctx: &RenderContext<'_>) -> Node {
    let list_path = values::join(prefix, &element.field_name);
    let (min, max) = element.configuration.instance_bounds();
    let count = values::array_len(ctx.values, &list_path);

    let items = (0..count)
        .map(|index| {
            let item_path = values::join(&list_path, &index.to_string());
            let mut field = field_view(element, item_path.clone(), ctx);
            field.label = format!("{} {}", element.label, index + 1);
            ItemView {
                field,
                remove_action: WizardEvent::Remove(item_path).to_string(),
                can_remove: count > min,
            }
        })
        .collect();

    Node::RepeatableField {
        label: element.label.clone(),
        items,
        add_action: WizardEvent::Add(list_path.clone()).to_string(),
        can_add: count < max,
        error: ctx.error(&list_path),
        read_only: ctx.read_only,
    }
}

fn field_view(element: &FormElement, path: String, ctx: &RenderContext<'_>) -> FieldView {
    let config = &element.configuration;
    let control = Control::for_type(element.element_type).unwrap_or(Control::Text);
    let current = values::get(ctx.values, &path);

    let mut view = FieldView {
        label: element.label.clone(),
        control,
        required: config.is_required(),
        placeholder: config.placeholder.clone().unwrap_or_default(),
        value: String::new(),
        checked: false,
        options: Vec::new(),
        allow_other: config.allows_other() && element.element_type.has_options(),
        other_selected: false,
        other_text: String::new(),
        error: ctx.error(&path),
        read_only: ctx.read_only,
        path,
    };

    match control {
        Control::Checkbox => view.checked = matches!(current, Some(Value::Bool(true))),
        Control::CheckboxGroup => {
            let selected: Vec<String> = match current {
                Some(Value::Array(items)) => items.iter().map(values::display_text).collect(),
                Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
                _ => Vec::new(),
            };
            view.options = choices(element, |value| selected.iter().any(|s| s == value));
            if let Some(text) = selected.iter().find_map(|s| other_option::decode(s)) {
                view.other_selected = true;
                view.other_text = text.to_string();
            }
        }
        Control::Radio | Control::Select => {
            let value = current.map(values::display_text).unwrap_or_default();
            view.options = choices(element, |option| option == value);
            if let Some(text) = other_option::decode(&value) {
                view.other_selected = true;
                view.other_text = text.to_string();
            }
            view.value = value;
        }
        _ => view.value = current.map(values::display_text).unwrap_or_default(),
    }

    view
}

fn choices(element: &FormElement, selected: impl Fn(&str) -> bool) -> Vec<ChoiceView> {
    element
        .configuration
        .options()
        .iter()
        .map(|option| ChoiceView {
            label: option.label.clone(),
            value: option.value.clone(),
            selected: selected(&option.value),
        })
        .collect()
}
