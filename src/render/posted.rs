// Posted form bodies -> value updates
//
// A browser only posts the inputs it shows, and leaves out unchecked boxes
// entirely. Updates are therefore derived from the fields of the view that
// was posted rather than from the body alone.

use serde_json::Value;

use super::form::{other_input_name, Control, FieldView, Node};
use crate::domain::other_option;

/// An `application/x-www-form-urlencoded` body, keeping repeated keys
#[derive(Debug, Clone, Default)]
pub struct PostedForm {
    pairs: Vec<(String, String)>,
}

impl PostedForm {
    pub fn parse(body: &str) -> Self {
        let pairs = body
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode(key), decode(value))
            })
            .collect();
        Self { pairs }
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

fn decode(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw)
}

/// Value updates for every field rendered in `nodes`
pub fn updates(nodes: &[Node], posted: &PostedForm) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    collect(nodes, posted, &mut out);
    out
}

fn collect(nodes: &[Node], posted: &PostedForm, out: &mut Vec<(String, Value)>) {
    for node in nodes {
        match node {
            Node::Field(field) => out.extend(field_update(field, posted)),
            Node::Fieldset { children, .. } => collect(children, posted, out),
            Node::RepeatableGroup { instances, .. } => {
                for instance in instances {
                    collect(&instance.children, posted, out);
                }
            }
            Node::RepeatableField { items, .. } => {
                for item in items {
                    out.extend(field_update(&item.field, posted));
                }
            }
            Node::StaticText { .. } | Node::Divider | Node::FullPageLink { .. } | Node::FullPageList { .. } => {}
        }
    }
}

fn field_update(field: &FieldView, posted: &PostedForm) -> Option<(String, Value)> {
    let other_text = || posted.first(&other_input_name(&field.path));

    let value = match field.control {
        Control::Checkbox => Value::Bool(posted.first(&field.path).is_some()),
        Control::CheckboxGroup => Value::Array(
            posted
                .all(&field.path)
                .into_iter()
                .map(|choice| Value::String(other_option::fold_choice(choice, other_text())))
                .collect(),
        ),
        Control::Radio | Control::Select => {
            let choice = posted.first(&field.path).unwrap_or("");
            Value::String(other_option::fold_choice(choice, other_text()))
        }
        _ => Value::String(posted.first(&field.path)?.to_string()),
    };

    Some((field.path.clone(), value))
}
