// Print view of a stored submission
//
// Pages in page order, elements in sort order, option values resolved to
// their labels and "other" answers decoded.

use serde_json::Value;

use crate::domain::element::{sorted, ElementType, Form, FormElement};
use crate::domain::other_option;
use crate::domain::values;

const EMPTY: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintRow {
    pub label: String,
    /// Empty for headings
    pub value: String,
    pub heading: bool,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintPage {
    pub title: String,
    pub rows: Vec<PrintRow>,
}

pub fn print_pages(form: &Form, data: &Value) -> Vec<PrintPage> {
    form.ordered_pages()
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let mut rows = Vec::new();
            for element in sorted(&page.elements) {
                push_rows(element, "", data, 0, &mut rows);
            }
            PrintPage {
                title: page.display_title(index),
                rows,
            }
        })
        .collect()
}

fn push_rows(element: &FormElement, prefix: &str, data: &Value, depth: usize, rows: &mut Vec<PrintRow>) {
    if element.element_type.is_structural() {
        return;
    }

    let path = values::join(prefix, &element.field_name);

    if element.is_group() {
        rows.push(heading(&element.label, depth));

        if !element.is_repeatable() {
            for child in sorted(element.children()) {
                push_rows(child, prefix, data, depth + 1, rows);
            }
            return;
        }

        let count = values::array_len(data, &path);
        if count == 0 {
            rows.push(PrintRow {
                label: String::new(),
                value: EMPTY.to_string(),
                heading: false,
                depth: depth + 1,
            });
        }
        for index in 0..count {
            let instance_path = values::join(&path, &index.to_string());
            rows.push(heading(&format!("{} {}", element.instance_label(), index + 1), depth + 1));
            for child in sorted(element.children()) {
                push_rows(child, &instance_path, data, depth + 2, rows);
            }
        }
        return;
    }

    let value = match values::get(data, &path) {
        Some(Value::Array(items)) if element.is_repeatable() => items
            .iter()
            .map(|item| format_value(element, item))
            .filter(|text| text != EMPTY)
            .collect::<Vec<_>>()
            .join(", "),
        Some(value) => format_value(element, value),
        None => String::new(),
    };

    rows.push(PrintRow {
        label: element.label.clone(),
        value: if value.is_empty() { EMPTY.to_string() } else { value },
        heading: false,
        depth,
    });
}

fn heading(label: &str, depth: usize) -> PrintRow {
    PrintRow {
        label: label.to_string(),
        value: String::new(),
        heading: true,
        depth,
    }
}

/// Display text of one stored value
pub fn format_value(element: &FormElement, value: &Value) -> String {
    let options = element.configuration.options();

    let text = match (element.element_type, value) {
        (ElementType::Checkbox, Value::Bool(checked)) => (if *checked { "Yes" } else { "No" }).to_string(),
        (ElementType::CheckboxGroup, Value::Array(items)) => items
            .iter()
            .map(values::display_text)
            .filter(|s| !s.is_empty())
            .map(|s| other_option::resolve_label(&s, options))
            .collect::<Vec<_>>()
            .join(", "),
        (ElementType::RadioGroup | ElementType::Select | ElementType::CheckboxGroup, Value::String(s))
            if !s.is_empty() =>
        {
            other_option::resolve_label(s, options)
        }
        (_, other) => values::display_text(other),
    };

    if text.trim().is_empty() {
        EMPTY.to_string()
    } else {
        text
    }
}
