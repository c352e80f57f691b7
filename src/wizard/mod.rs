// Multi-page wizard with a navigation stack into full-page groups
//
// The wizard owns the value tree, the current page index, and the stack of
// groups the respondent has drilled into. Every change arrives as a
// `WizardEvent`; the returned `Effect` tells the caller whether to persist a
// draft or submit.

pub mod navigation;
pub mod sections;

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::domain::element::{sorted, Form, FormElement, FormPage};
use crate::domain::schema::{
    self, derive_schema, page_gate_schema, pages_schema, FieldErrors, ObjectSchema, SchemaNode, SchemaScope,
};
use crate::domain::values;

pub use navigation::{Crumb, Level, NavigationStack, StackEntry};

#[derive(Debug, Clone, Default)]
pub struct WizardOptions {
    pub read_only: bool,
    /// Values to start from instead of the derived defaults (a draft or an
    /// existing submission)
    pub default_values: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    Next,
    Previous,
    Submit,
    /// Append an instance to the list at this path
    Add(String),
    /// Remove the list entry at this path (`list.index`)
    Remove(String),
    /// Open a non-repeatable full-page group
    Fill(String),
    /// Open one instance of a repeatable full-page group
    Edit(String, usize),
    Done,
    /// Return to a breadcrumb depth (0 is the page itself)
    Crumb(usize),
    SectionNext,
    SectionPrevious,
}

impl fmt::Display for WizardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardEvent::Next => write!(f, "next"),
            WizardEvent::Previous => write!(f, "prev"),
            WizardEvent::Submit => write!(f, "submit"),
            WizardEvent::Add(path) => write!(f, "add:{}", path),
            WizardEvent::Remove(path) => write!(f, "remove:{}", path),
            WizardEvent::Fill(field) => write!(f, "fill:{}", field),
            WizardEvent::Edit(field, index) => write!(f, "edit:{}:{}", field, index),
            WizardEvent::Done => write!(f, "done"),
            WizardEvent::Crumb(depth) => write!(f, "crumb:{}", depth),
            WizardEvent::SectionNext => write!(f, "section-next"),
            WizardEvent::SectionPrevious => write!(f, "section-prev"),
        }
    }
}

impl FromStr for WizardEvent {
    type Err = String;

    fn from_str(action: &str) -> Result<Self, Self::Err> {
        let unknown = || format!("Unknown action '{}'", action);

        let event = match action.split_once(':') {
            None => match action {
                "next" => WizardEvent::Next,
                "prev" => WizardEvent::Previous,
                "submit" => WizardEvent::Submit,
                "done" => WizardEvent::Done,
                "section-next" => WizardEvent::SectionNext,
                "section-prev" => WizardEvent::SectionPrevious,
                _ => return Err(unknown()),
            },
            Some(("add", path)) if !path.is_empty() => WizardEvent::Add(path.to_string()),
            Some(("remove", path)) if !path.is_empty() => WizardEvent::Remove(path.to_string()),
            Some(("fill", field)) if !field.is_empty() => WizardEvent::Fill(field.to_string()),
            Some(("edit", rest)) => {
                let (field, index) = rest.rsplit_once(':').ok_or_else(unknown)?;
                let index = index.parse().map_err(|_| unknown())?;
                WizardEvent::Edit(field.to_string(), index)
            }
            Some(("crumb", depth)) => WizardEvent::Crumb(depth.parse().map_err(|_| unknown())?),
            Some(_) => return Err(unknown()),
        };
        Ok(event)
    }
}

/// What the caller should do after an event
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Nothing,
    /// Values changed; hand them to the draft autosaver
    ValuesChanged(Value),
    /// Validation passed; submit this payload
    Submit(Value),
}

/// Elements shown in the current view and the value path they live under
#[derive(Debug, Clone)]
pub struct ViewScope<'a> {
    pub elements: Vec<&'a FormElement>,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub label: String,
    pub percent: usize,
}

#[derive(Debug, Clone)]
pub struct Wizard {
    title: String,
    pages: Vec<FormPage>,
    schema: ObjectSchema,
    values: Value,
    errors: FieldErrors,
    current_page: usize,
    stack: NavigationStack,
    section: usize,
    read_only: bool,
    submitting: bool,
}

impl Wizard {
    pub fn new(form: &Form, options: WizardOptions) -> Self {
        Self::from_pages(form.name.clone(), form.ordered_pages(), options)
    }

    pub fn from_pages(title: impl Into<String>, mut pages: Vec<FormPage>, options: WizardOptions) -> Self {
        if pages.is_empty() {
            pages.push(FormPage::new("page-1", 1, Vec::new()));
        }

        let schema = pages_schema(&pages);
        let values = match &options.default_values {
            Some(provided) => schema.seed(provided),
            None => schema.default_value(),
        };

        Self {
            title: title.into(),
            pages,
            schema,
            values,
            errors: FieldErrors::new(),
            current_page: 0,
            stack: NavigationStack::new(),
            section: 0,
            read_only: options.read_only,
            submitting: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn pages(&self) -> &[FormPage] {
        &self.pages
    }

    pub fn schema(&self) -> &ObjectSchema {
        &self.schema
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn set_submitting(&mut self, submitting: bool) {
        self.submitting = submitting;
    }

    pub fn current_page_index(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_page(&self) -> &FormPage {
        &self.pages[self.current_page]
    }

    pub fn current_page_title(&self) -> String {
        self.current_page().display_title(self.current_page)
    }

    pub fn is_first_page(&self) -> bool {
        self.current_page == 0
    }

    pub fn is_last_page(&self) -> bool {
        self.current_page + 1 == self.pages.len()
    }

    pub fn stack(&self) -> &NavigationStack {
        &self.stack
    }

    /// True while a full-page group detail view is open
    pub fn in_group_view(&self) -> bool {
        !self.levels().is_empty()
    }

    pub fn levels(&self) -> Vec<Level<'_>> {
        navigation::resolve(&self.current_page().elements, &self.stack, &self.values)
    }

    pub fn breadcrumbs(&self) -> Vec<Crumb> {
        navigation::breadcrumbs(&self.current_page_title(), &self.levels())
    }

    /// `"{title} (Page N of M)"` or `"Page N of M"`; None for single-page forms
    pub fn progress(&self) -> Option<Progress> {
        let total = self.pages.len();
        if total <= 1 {
            return None;
        }

        let number = self.current_page + 1;
        let label = match self.current_page().title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => format!("{} (Page {} of {})", title, number, total),
            _ => format!("Page {} of {}", number, total),
        };
        Some(Progress {
            label,
            percent: number * 100 / total,
        })
    }

    pub fn section_index(&self) -> usize {
        self.section.min(self.section_count().saturating_sub(1))
    }

    /// Number of sections in the open group's detail view (1 on a page)
    pub fn section_count(&self) -> usize {
        match self.levels().last() {
            Some(level) => sections::split(level.element.children()).len(),
            None => 1,
        }
    }

    /// What the current view renders
    pub fn view(&self) -> ViewScope<'_> {
        let levels = self.levels();
        match levels.last() {
            Some(level) => {
                let mut sections = sections::split(level.element.children());
                let index = self.section.min(sections.len() - 1);
                ViewScope {
                    elements: sections.swap_remove(index),
                    prefix: level.prefix.clone(),
                }
            }
            None => ViewScope {
                elements: sorted(&self.current_page().elements),
                prefix: String::new(),
            },
        }
    }

    /// Write one value. Clears the errors recorded for that path. Returns
    /// whether anything changed.
    pub fn set_value(&mut self, path: &str, value: Value) -> bool {
        if self.read_only || values::get(&self.values, path) == Some(&value) {
            return false;
        }
        if !values::set(&mut self.values, path, value) {
            return false;
        }
        self.errors.clear_under(path);
        true
    }

    /// Write a batch of values, reporting a single change effect
    pub fn set_values(&mut self, updates: impl IntoIterator<Item = (String, Value)>) -> Effect {
        let mut changed = false;
        for (path, value) in updates {
            changed |= self.set_value(&path, value);
        }
        self.normalize_stack();

        if changed {
            Effect::ValuesChanged(self.values.clone())
        } else {
            Effect::Nothing
        }
    }

    pub fn dispatch(&mut self, event: WizardEvent) -> Effect {
        tracing::debug!(%event, page = self.current_page, depth = self.stack.len(), "wizard event");

        let effect = match event {
            WizardEvent::Next => self.next(),
            WizardEvent::Previous => self.previous(),
            WizardEvent::Submit => self.submit(),
            WizardEvent::Add(path) => self.add_instance(&path),
            WizardEvent::Remove(path) => self.remove_instance(&path),
            WizardEvent::Fill(field) => self.open_group(&field, None),
            WizardEvent::Edit(field, index) => self.open_group(&field, Some(index)),
            WizardEvent::Done => self.done(),
            WizardEvent::Crumb(depth) => {
                self.stack.truncate(depth);
                self.section = 0;
                Effect::Nothing
            }
            WizardEvent::SectionNext => {
                if self.section_index() + 1 < self.section_count() {
                    self.section = self.section_index() + 1;
                }
                Effect::Nothing
            }
            WizardEvent::SectionPrevious => {
                self.section = self.section_index().saturating_sub(1);
                Effect::Nothing
            }
        };

        self.normalize_stack();
        effect
    }

    /// Drop stack entries that no longer resolve
    fn normalize_stack(&mut self) {
        let depth = self.levels().len();
        if depth < self.stack.len() {
            tracing::debug!(depth, stale = self.stack.len() - depth, "dropping unresolvable navigation entries");
            self.stack.truncate(depth);
            self.section = 0;
        }
    }

    fn next(&mut self) -> Effect {
        if !self.stack.is_empty() || self.is_last_page() {
            return Effect::Nothing;
        }

        if !self.read_only {
            let gate = page_gate_schema(self.current_page());
            let errors = schema::validate_keys(&gate, gate.keys(), &self.values);
            let blocked = !errors.is_empty();
            self.errors.replace_under(gate.keys(), errors);
            if blocked {
                return Effect::Nothing;
            }
        }

        self.current_page += 1;
        self.section = 0;
        Effect::Nothing
    }

    fn previous(&mut self) -> Effect {
        if self.stack.is_empty() && self.current_page > 0 {
            self.current_page -= 1;
            self.section = 0;
        }
        Effect::Nothing
    }

    fn submit(&mut self) -> Effect {
        if self.read_only || self.submitting || !self.stack.is_empty() || !self.is_last_page() {
            return Effect::Nothing;
        }

        match schema::validate(&self.schema, &self.values) {
            Ok(data) => {
                self.errors.clear();
                Effect::Submit(data)
            }
            Err(errors) => {
                tracing::debug!(count = errors.len(), "submit blocked by field errors");
                self.errors = errors;
                Effect::Nothing
            }
        }
    }

    fn add_instance(&mut self, path: &str) -> Effect {
        if self.read_only {
            return Effect::Nothing;
        }

        let item = match self.schema.node_at(path) {
            Some(SchemaNode::List { max, item, .. }) if values::array_len(&self.values, path) < *max => {
                item.default_value()
            }
            _ => return Effect::Nothing,
        };

        if !values::push(&mut self.values, path, item) {
            return Effect::Nothing;
        }
        self.errors.remove(path);
        Effect::ValuesChanged(self.values.clone())
    }

    fn remove_instance(&mut self, path: &str) -> Effect {
        if self.read_only {
            return Effect::Nothing;
        }

        let (list_path, _) = values::split_last(path);
        match self.schema.node_at(list_path) {
            Some(SchemaNode::List { min, .. }) if values::array_len(&self.values, list_path) > *min => {}
            _ => return Effect::Nothing,
        }

        if !values::remove_index(&mut self.values, path) {
            return Effect::Nothing;
        }
        // later instances shift down, so their errors no longer line up
        self.errors.clear_under(list_path);
        Effect::ValuesChanged(self.values.clone())
    }

    fn open_group(&mut self, field_name: &str, instance: Option<usize>) -> Effect {
        let found = {
            let scope = self.view();
            navigation::find_full_page(&scope.elements, field_name).is_some_and(|element| {
                match (element.is_repeatable(), instance) {
                    (true, Some(index)) => {
                        let list_path = values::join(&scope.prefix, field_name);
                        index < values::array_len(&self.values, &list_path)
                    }
                    (false, None) => true,
                    _ => false,
                }
            })
        };

        if found {
            self.stack.push(field_name, instance);
            self.section = 0;
        }
        Effect::Nothing
    }

    /// Pop one level. The group's own fields are checked on the way out so
    /// their errors show, but leaving is never blocked.
    fn done(&mut self) -> Effect {
        let checked = self.levels().last().map(|level| {
            let group_schema = derive_schema(level.element.children(), SchemaScope::Full);
            let keys: Vec<String> = group_schema
                .keys()
                .map(|key| values::join(&level.prefix, key))
                .collect();
            let errors = schema::validate_at(&group_schema, &level.prefix, &self.values);
            (keys, errors)
        });

        if let Some((keys, errors)) = checked {
            if !self.read_only {
                self.errors.replace_under(keys.iter().map(String::as_str), errors);
            }
        }

        self.stack.pop();
        self.section = 0;
        Effect::Nothing
    }
}
