// Validate a value tree against a derived schema
//
// Validation coerces as it goes (numeric text becomes a number, a single
// posted choice becomes a one-element list) and keeps only schema keys in
// its output. Errors are keyed by field path; the first error on a path wins.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use super::{FieldRule, FieldSchema, ListKind, ObjectSchema, SchemaNode};
use crate::domain::values;
use crate::validation;

/// Field path -> message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error unless the path already has one
    pub fn insert(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.entry(path.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn remove(&mut self, path: &str) {
        self.0.remove(path);
    }

    /// Drop errors on `path` and everything below it
    pub fn clear_under(&mut self, path: &str) {
        let nested = format!("{}.", path);
        self.0.retain(|k, _| k != path && !k.starts_with(&nested));
    }

    /// Replace errors under each of `keys` with those from `other`
    pub fn replace_under<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>, other: FieldErrors) {
        for key in keys {
            self.clear_under(key);
        }
        self.0.extend(other.0);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Validate a whole value tree. Returns the coerced tree on success.
pub fn validate(schema: &ObjectSchema, data: &Value) -> Result<Value, FieldErrors> {
    let mut errors = FieldErrors::new();
    let output = validate_object(schema, Some(data), "", &mut errors);

    if errors.is_empty() {
        Ok(output)
    } else {
        Err(errors)
    }
}

/// Validate only the given top-level keys of `schema` (a trigger on a subset
/// of fields). Returns the errors found under those keys.
pub fn validate_keys<'a>(
    schema: &ObjectSchema,
    keys: impl IntoIterator<Item = &'a str>,
    data: &Value,
) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for key in keys {
        if let Some(node) = schema.get(key) {
            validate_node(node, values::get(data, key), key, &mut errors);
        }
    }
    errors
}

/// Validate the object at `prefix` against `schema`, reporting full paths.
/// A group detail view uses this to check only its own fields.
pub fn validate_at(schema: &ObjectSchema, prefix: &str, data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    validate_object(schema, values::get(data, prefix), prefix, &mut errors);
    errors
}

fn validate_object(
    schema: &ObjectSchema,
    value: Option<&Value>,
    path: &str,
    errors: &mut FieldErrors,
) -> Value {
    let empty = Map::new();
    let map = match value {
        Some(Value::Object(map)) => map,
        _ => &empty,
    };

    let mut output = Map::new();
    for (key, node) in schema.iter() {
        let child_path = values::join(path, key);
        if let Some(v) = validate_node(node, map.get(key), &child_path, errors) {
            output.insert(key.to_string(), v);
        }
    }
    Value::Object(output)
}

fn validate_node(
    node: &SchemaNode,
    value: Option<&Value>,
    path: &str,
    errors: &mut FieldErrors,
) -> Option<Value> {
    match node {
        SchemaNode::Field(field) => validate_field(field, value, path, errors),
        SchemaNode::Object(object) => Some(validate_object(object, value, path, errors)),
        SchemaNode::List {
            label,
            kind,
            min,
            max,
            item,
        } => Some(validate_list(label, *kind, *min, *max, item, value, path, errors)),
    }
}

#[allow(clippy::too_many_arguments)]
fn validate_list(
    label: &str,
    kind: ListKind,
    min: usize,
    max: usize,
    item: &SchemaNode,
    value: Option<&Value>,
    path: &str,
    errors: &mut FieldErrors,
) -> Value {
    let items: &[Value] = match value {
        Some(Value::Array(items)) => items.as_slice(),
        Some(Value::Null) | None => &[],
        Some(_) => {
            errors.insert(path, format!("{} must be a list", label));
            &[]
        }
    };

    if items.len() < min {
        errors.insert(path, format!("{} requires at least {} {}", label, min, kind.unit()));
    } else if items.len() > max {
        errors.insert(path, format!("{} allows at most {} {}", label, max, kind.unit()));
    }

    let output = items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let item_path = values::join(path, &i.to_string());
            validate_node(item, Some(v), &item_path, errors).unwrap_or(Value::Null)
        })
        .collect();
    Value::Array(output)
}

fn required_message(field: &FieldSchema) -> String {
    format!("{} is required", field.label)
}

fn validate_field(
    field: &FieldSchema,
    value: Option<&Value>,
    path: &str,
    errors: &mut FieldErrors,
) -> Option<Value> {
    let result = match &field.rule {
        FieldRule::Text {
            min_length,
            max_length,
            pattern,
            pattern_message,
        } => check_text(field, value, |text| {
            validation::validate_length(&field.label, text, *min_length, *max_length)?;
            if let Some(pattern) = pattern {
                validation::validate_pattern(&field.label, text, pattern, pattern_message.as_deref())?;
            }
            Ok(())
        }),
        FieldRule::Email => check_text(field, value, validation::validate_email),
        FieldRule::Number { min, max } => check_number(field, value, *min, *max),
        FieldRule::Checkbox => check_checkbox(field, value),
        FieldRule::Choices => check_choices(field, value),
    };

    match result {
        Ok(output) => output,
        Err(message) => {
            errors.insert(path, message);
            value.cloned()
        }
    }
}

type FieldResult = Result<Option<Value>, String>;

/// Strings: required means non-blank; rules apply to non-empty values only
fn check_text(
    field: &FieldSchema,
    value: Option<&Value>,
    rules: impl Fn(&str) -> Result<(), String>,
) -> FieldResult {
    let text = match value {
        None | Some(Value::Null) => {
            return if field.required {
                Err(required_message(field))
            } else {
                Ok(None)
            };
        }
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(format!("{} is invalid", field.label)),
    };

    if text.is_empty() {
        if field.required {
            return Err(required_message(field));
        }
        return Ok(Some(Value::String(text)));
    }

    rules(&text)?;
    Ok(Some(Value::String(text)))
}

fn check_number(field: &FieldSchema, value: Option<&Value>, min: Option<f64>, max: Option<f64>) -> FieldResult {
    let number = match value {
        None | Some(Value::Null) => {
            return if field.required {
                Err(required_message(field))
            } else {
                Ok(None)
            };
        }
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return if field.required {
                Err(required_message(field))
            } else {
                Ok(Some(Value::String(s.clone())))
            };
        }
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    let number = match number {
        Some(n) if n.is_finite() => n,
        _ => return Err(format!("{} must be a number", field.label)),
    };

    validation::validate_range(&field.label, number, min, max)?;
    Ok(Some(number_value(number)))
}

/// Integral values stay integers on the wire
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn check_checkbox(field: &FieldSchema, value: Option<&Value>) -> FieldResult {
    let checked = match value {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) => match s.as_str() {
            "true" | "on" => Some(true),
            "false" | "" => Some(false),
            _ => return Err(format!("{} is invalid", field.label)),
        },
        Some(_) => return Err(format!("{} is invalid", field.label)),
    };

    if field.required && checked != Some(true) {
        return Err(required_message(field));
    }
    Ok(checked.map(Value::Bool))
}

fn check_choices(field: &FieldSchema, value: Option<&Value>) -> FieldResult {
    let selected: Vec<Value> = match value {
        None | Some(Value::Null) => {
            return if field.required {
                Err(required_message(field))
            } else {
                Ok(None)
            };
        }
        Some(Value::Array(items)) => {
            if !items.iter().all(Value::is_string) {
                return Err(format!("{} is invalid", field.label));
            }
            items.clone()
        }
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(Value::String(s)) => vec![Value::String(s.clone())],
        Some(_) => return Err(format!("{} is invalid", field.label)),
    };

    if field.required && selected.is_empty() {
        return Err(required_message(field));
    }
    Ok(Some(Value::Array(selected)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::element::{ElementConfiguration, ElementType, FormElement};
    use crate::domain::schema::{derive, derive_schema, SchemaScope};
    use serde_json::json;

    fn field(element_type: ElementType, label: &str, name: &str, required: bool) -> FormElement {
        FormElement::new(name, element_type, label, name).with_configuration(ElementConfiguration {
            required: Some(required),
            ..Default::default()
        })
    }

    fn schema_of(elements: &[FormElement]) -> ObjectSchema {
        derive_schema(elements, SchemaScope::Full)
    }

    #[test]
    fn test_required_text() {
        let schema = schema_of(&[field(ElementType::TextInput, "Name", "name", true)]);

        let errors = validate(&schema, &json!({"name": ""})).unwrap_err();
        assert_eq!(errors.get("name"), Some("Name is required"));

        let errors = validate(&schema, &json!({})).unwrap_err();
        assert_eq!(errors.get("name"), Some("Name is required"));

        let output = validate(&schema, &json!({"name": "John Doe"})).unwrap();
        assert_eq!(output, json!({"name": "John Doe"}));

        // any character counts, whitespace included
        let output = validate(&schema, &json!({"name": "  "})).unwrap();
        assert_eq!(output, json!({"name": "  "}));
    }

    #[test]
    fn test_required_email() {
        let schema = schema_of(&[field(ElementType::Email, "Email", "email", true)]);

        let errors = validate(&schema, &json!({"email": "not-an-email"})).unwrap_err();
        assert_eq!(errors.get("email"), Some("Please enter a valid email address"));

        let errors = validate(&schema, &json!({"email": ""})).unwrap_err();
        assert_eq!(errors.get("email"), Some("Email is required"));

        assert!(validate(&schema, &json!({"email": "a@b.com"})).is_ok());
    }

    #[test]
    fn test_optional_email_accepts_empty() {
        let schema = schema_of(&[field(ElementType::Email, "Email", "email", false)]);
        assert!(validate(&schema, &json!({"email": ""})).is_ok());
        assert!(validate(&schema, &json!({"email": "bad"})).is_err());
    }

    #[test]
    fn test_number_coercion() {
        let schema = schema_of(&[field(ElementType::Number, "Age", "age", true)]);

        let output = validate(&schema, &json!({"age": "42"})).unwrap();
        assert_eq!(output, json!({"age": 42}));

        let output = validate(&schema, &json!({"age": " 2.5 "})).unwrap();
        assert_eq!(output, json!({"age": 2.5}));

        let errors = validate(&schema, &json!({"age": "abc"})).unwrap_err();
        assert_eq!(errors.get("age"), Some("Age must be a number"));

        let errors = validate(&schema, &json!({"age": ""})).unwrap_err();
        assert_eq!(errors.get("age"), Some("Age is required"));
    }

    #[test]
    fn test_optional_number_keeps_empty_text() {
        let schema = schema_of(&[field(ElementType::Number, "Age", "age", false)]);
        assert_eq!(validate(&schema, &json!({"age": ""})).unwrap(), json!({"age": ""}));
    }

    #[test]
    fn test_number_bounds() {
        let element = FormElement::new("n", ElementType::Number, "Age", "age").with_configuration(
            ElementConfiguration {
                min: Some(18.0),
                max: Some(99.0),
                ..Default::default()
            },
        );
        let schema = schema_of(&[element]);
        let errors = validate(&schema, &json!({"age": "12"})).unwrap_err();
        assert_eq!(errors.get("age"), Some("Age must be at least 18"));
    }

    #[test]
    fn test_required_checkbox_must_be_true() {
        let schema = schema_of(&[field(ElementType::Checkbox, "Terms", "terms", true)]);

        let errors = validate(&schema, &json!({"terms": false})).unwrap_err();
        assert_eq!(errors.get("terms"), Some("Terms is required"));
        assert_eq!(validate(&schema, &json!({"terms": true})).unwrap(), json!({"terms": true}));
    }

    #[test]
    fn test_checkbox_group_required() {
        let schema = schema_of(&[field(ElementType::CheckboxGroup, "Colors", "colors", true)]);

        let errors = validate(&schema, &json!({"colors": []})).unwrap_err();
        assert_eq!(errors.get("colors"), Some("Colors is required"));

        let output = validate(&schema, &json!({"colors": ["red", "other:teal"]})).unwrap();
        assert_eq!(output, json!({"colors": ["red", "other:teal"]}));
    }

    #[test]
    fn test_other_answer_is_plain_text() {
        let select = FormElement::new("s", ElementType::Select, "Color", "color").with_configuration(
            ElementConfiguration {
                required: Some(true),
                allow_other: Some(true),
                ..Default::default()
            },
        );
        let schema = schema_of(&[select]);
        assert!(validate(&schema, &json!({"color": "other:Teal"})).is_ok());
    }

    #[test]
    fn test_repeatable_group_bounds_and_paths() {
        let group = FormElement::new("g", ElementType::ElementGroup, "Mutations", "mutations")
            .with_configuration(ElementConfiguration {
                repeatable: Some(true),
                min_instances: Some(1),
                max_instances: Some(2),
                ..Default::default()
            })
            .with_children(vec![field(ElementType::TextInput, "Allele", "allele", true)]);
        let schema = schema_of(&[group]);

        let errors = validate(&schema, &json!({"mutations": []})).unwrap_err();
        assert_eq!(
            errors.get("mutations"),
            Some("Mutations requires at least 1 instance(s)")
        );

        let errors = validate(
            &schema,
            &json!({"mutations": [{"allele": "x"}, {"allele": ""}, {"allele": "z"}]}),
        )
        .unwrap_err();
        assert_eq!(errors.get("mutations"), Some("Mutations allows at most 2 instance(s)"));
        assert_eq!(errors.get("mutations.1.allele"), Some("Allele is required"));
    }

    #[test]
    fn test_repeatable_field_bound_wording() {
        let element = FormElement::new("t", ElementType::TextInput, "Tags", "tags").with_configuration(
            ElementConfiguration {
                repeatable: Some(true),
                min_instances: Some(2),
                ..Default::default()
            },
        );
        let schema = schema_of(&[element]);
        let errors = validate(&schema, &json!({"tags": ["a"]})).unwrap_err();
        assert_eq!(errors.get("tags"), Some("Tags requires at least 2 value(s)"));
    }

    #[test]
    fn test_unknown_keys_are_dropped() {
        let schema = schema_of(&[field(ElementType::TextInput, "Name", "name", false)]);
        let output = validate(&schema, &json!({"name": "x", "break_1": "y"})).unwrap();
        assert_eq!(output, json!({"name": "x"}));
    }

    #[test]
    fn test_defaults_validate_to_same_shape() {
        let group = FormElement::new("g", ElementType::ElementGroup, "People", "people")
            .with_configuration(ElementConfiguration {
                repeatable: Some(true),
                min_instances: Some(2),
                ..Default::default()
            })
            .with_children(vec![
                field(ElementType::TextInput, "Name", "name", false),
                field(ElementType::Number, "Age", "age", false),
                field(ElementType::Checkbox, "Member", "member", false),
            ]);
        let elements = vec![field(ElementType::CheckboxGroup, "Tags", "tags", false), group];

        let derived = derive(&elements);
        let output = validate(&derived.schema, &derived.defaults).unwrap();
        assert_eq!(output, derived.defaults);
    }

    #[test]
    fn test_validate_keys_limits_scope() {
        let schema = schema_of(&[
            field(ElementType::TextInput, "Name", "name", true),
            field(ElementType::TextInput, "City", "city", true),
        ]);
        let errors = validate_keys(&schema, ["name"], &json!({}));
        assert_eq!(errors.len(), 1);
        assert!(errors.get("city").is_none());
    }

    #[test]
    fn test_validate_at_reports_full_paths() {
        let item = schema_of(&[field(ElementType::TextInput, "Allele", "allele", true)]);
        let data = json!({"mutations": [{"allele": "a1"}, {"allele": ""}]});

        let errors = validate_at(&item, "mutations.1", &data);
        assert_eq!(errors.get("mutations.1.allele"), Some("Allele is required"));
        assert!(validate_at(&item, "mutations.0", &data).is_empty());
    }

    #[test]
    fn test_errors_clear_under_path() {
        let mut errors = FieldErrors::new();
        errors.insert("mutations", "too few");
        errors.insert("mutations.0.allele", "required");
        errors.insert("mutations_extra", "kept");
        errors.clear_under("mutations");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("mutations_extra"), Some("kept"));
    }
}
