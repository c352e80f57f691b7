// Navigation stack into nested full-page groups
//
// Entries refer to groups by field name so they survive re-renders. They are
// resolved against the current page on every use; an entry that no longer
// resolves ends the path there.

use serde_json::Value;

use crate::domain::element::FormElement;
use crate::domain::values;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEntry {
    pub field_name: String,
    /// Instance index for repeatable groups
    pub instance: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationStack {
    entries: Vec<StackEntry>,
}

impl NavigationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field_name: impl Into<String>, instance: Option<usize>) {
        self.entries.push(StackEntry {
            field_name: field_name.into(),
            instance,
        });
    }

    pub fn pop(&mut self) -> Option<StackEntry> {
        self.entries.pop()
    }

    /// Keep the first `depth` entries
    pub fn truncate(&mut self, depth: usize) {
        self.entries.truncate(depth);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[StackEntry] {
        &self.entries
    }
}

/// One resolved stack entry
#[derive(Debug, Clone)]
pub struct Level<'a> {
    pub element: &'a FormElement,
    pub instance: Option<usize>,
    /// Value path the group's children live under
    pub prefix: String,
}

impl Level<'_> {
    /// Breadcrumb text: the group label, plus the instance ordinal for
    /// repeatable groups
    pub fn label(&self) -> String {
        match self.instance {
            Some(index) => format!(
                "{}: {} {}",
                self.element.label,
                self.element.instance_label(),
                index + 1
            ),
            None => self.element.label.clone(),
        }
    }
}

/// Find a full-page group by field name among `scope`, looking through plain
/// inline groups (which share their parent's value scope). Repeatable inline
/// groups are not entered: full-page groups inside them render inline.
pub fn find_full_page<'a>(scope: &[&'a FormElement], field_name: &str) -> Option<&'a FormElement> {
    for &element in scope {
        if element.is_full_page() && element.field_name == field_name {
            return Some(element);
        }
        if element.is_group() && !element.is_full_page() && !element.is_repeatable() {
            let children: Vec<&FormElement> = element.children().iter().collect();
            if let Some(found) = find_full_page(&children, field_name) {
                return Some(found);
            }
        }
    }
    None
}

/// Resolve the stack from the page's root elements. Stops at the first entry
/// that cannot be found, has the wrong shape, or points past the instances
/// currently in `data`.
pub fn resolve<'a>(page_elements: &'a [FormElement], stack: &NavigationStack, data: &Value) -> Vec<Level<'a>> {
    let mut levels: Vec<Level<'a>> = Vec::new();
    let mut scope: Vec<&'a FormElement> = page_elements.iter().collect();
    let mut prefix = String::new();

    for entry in stack.entries() {
        let element = match find_full_page(&scope, &entry.field_name) {
            Some(element) => element,
            None => break,
        };

        let level_prefix = match (element.is_repeatable(), entry.instance) {
            (true, Some(index)) => {
                let list_path = values::join(&prefix, &element.field_name);
                if index >= values::array_len(data, &list_path) {
                    break;
                }
                values::join(&list_path, &index.to_string())
            }
            (false, None) => prefix.clone(),
            _ => break,
        };

        levels.push(Level {
            element,
            instance: entry.instance,
            prefix: level_prefix.clone(),
        });
        scope = element.children().iter().collect();
        prefix = level_prefix;
    }

    levels
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub label: String,
    /// Stack depth this crumb returns to; None for the current level
    pub target: Option<usize>,
}

/// Page title followed by one crumb per resolved level. Every crumb except
/// the last pops back to its own depth.
pub fn breadcrumbs(page_title: &str, levels: &[Level<'_>]) -> Vec<Crumb> {
    let mut labels = vec![page_title.to_string()];
    labels.extend(levels.iter().map(Level::label));

    let last = labels.len() - 1;
    labels
        .into_iter()
        .enumerate()
        .map(|(depth, label)| Crumb {
            label,
            target: (depth < last).then_some(depth),
        })
        .collect()
}
