// Validation schema derived from a form element tree
//
// A schema is an ordered object of field-name keys. Non-repeatable groups
// contribute their children's keys directly; repeatable groups and fields
// become lists with instance bounds.

mod derive;
mod validate;

pub use derive::{derive, derive_defaults, derive_schema, page_gate_schema, pages_schema, Derived, SchemaScope};
pub use validate::{validate, validate_at, validate_keys, FieldErrors};

use regex::Regex;
use serde_json::{Map, Value};

/// Per-type value rule of a single field
#[derive(Debug, Clone)]
pub enum FieldRule {
    Text {
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<Regex>,
        pattern_message: Option<String>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
    },
    Checkbox,
    Email,
    /// Checkbox group: a list of selected option values
    Choices,
}

#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub label: String,
    pub required: bool,
    pub rule: FieldRule,
}

impl FieldSchema {
    /// Empty value a fresh form starts with
    pub fn default_value(&self) -> Value {
        match self.rule {
            FieldRule::Checkbox => Value::Bool(false),
            FieldRule::Choices => Value::Array(Vec::new()),
            _ => Value::String(String::new()),
        }
    }
}

/// Wording of list-bound errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Repeatable group, counted in instances
    Group,
    /// Repeatable single field, counted in values
    Field,
}

impl ListKind {
    fn unit(self) -> &'static str {
        match self {
            ListKind::Group => "instance(s)",
            ListKind::Field => "value(s)",
        }
    }
}

#[derive(Debug, Clone)]
pub enum SchemaNode {
    Field(FieldSchema),
    List {
        label: String,
        kind: ListKind,
        min: usize,
        max: usize,
        item: Box<SchemaNode>,
    },
    Object(ObjectSchema),
}

impl SchemaNode {
    /// Default value; lists start with `min` instances
    pub fn default_value(&self) -> Value {
        match self {
            SchemaNode::Field(field) => field.default_value(),
            SchemaNode::List { min, item, .. } => {
                Value::Array((0..*min).map(|_| item.default_value()).collect())
            }
            SchemaNode::Object(object) => object.default_value(),
        }
    }

    /// Overlay `provided` onto this node's defaults. Keys outside the schema
    /// are dropped and list items are completed to the item shape.
    pub fn seed(&self, provided: Option<&Value>) -> Value {
        match (self, provided) {
            (_, None) | (_, Some(Value::Null)) => self.default_value(),
            (SchemaNode::Field(_), Some(value)) => value.clone(),
            (SchemaNode::List { item, .. }, Some(Value::Array(items))) => {
                Value::Array(items.iter().map(|v| item.seed(Some(v))).collect())
            }
            (SchemaNode::Object(object), Some(value)) => object.seed(value),
            (SchemaNode::List { .. }, Some(_)) => self.default_value(),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            SchemaNode::Object(object) => Some(object),
            _ => None,
        }
    }
}

/// Ordered field-name -> schema mapping
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    entries: Vec<(String, SchemaNode)>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key. A repeated key replaces the earlier entry in place.
    pub fn insert(&mut self, key: impl Into<String>, node: SchemaNode) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = node,
            None => self.entries.push((key, node)),
        }
    }

    /// Append every entry of `other`
    pub fn extend(&mut self, other: ObjectSchema) {
        for (key, node) in other.entries {
            self.insert(key, node);
        }
    }

    pub fn get(&self, key: &str) -> Option<&SchemaNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, n)| n)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), n))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn default_value(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(k, n)| (k.clone(), n.default_value()))
            .collect();
        Value::Object(map)
    }

    pub fn seed(&self, provided: &Value) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(k, n)| (k.clone(), n.seed(provided.get(k.as_str()))))
            .collect();
        Value::Object(map)
    }

    /// Schema node at a dot path. Numeric segments step into list items.
    pub fn node_at(&self, path: &str) -> Option<&SchemaNode> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut node = self.get(first)?;

        for segment in segments {
            node = match node {
                SchemaNode::Object(object) => object.get(segment)?,
                SchemaNode::List { item, .. } => {
                    segment.parse::<usize>().ok()?;
                    item
                }
                SchemaNode::Field(_) => return None,
            };
        }

        Some(node)
    }
}
