// Schema and default-value derivation from element trees

use serde_json::Value;

use super::{FieldRule, FieldSchema, ListKind, ObjectSchema, SchemaNode};
use crate::domain::element::{sorted, ElementType, FormElement, FormPage};
use crate::validation;

/// Which elements take part in a derived schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaScope {
    /// Every value-carrying element
    Full,
    /// A page-advance gate: full-page groups are validated in their own
    /// detail view or at final submit, so they are left out
    PageGate,
}

/// Schema and matching defaults for one element list
#[derive(Debug, Clone)]
pub struct Derived {
    pub schema: ObjectSchema,
    pub defaults: Value,
}

pub fn derive(elements: &[FormElement]) -> Derived {
    let schema = derive_schema(elements, SchemaScope::Full);
    let defaults = schema.default_value();
    Derived { schema, defaults }
}

pub fn derive_schema(elements: &[FormElement], scope: SchemaScope) -> ObjectSchema {
    let mut shape = ObjectSchema::new();
    for element in sorted(elements) {
        add_element(&mut shape, element, scope);
    }
    shape
}

pub fn derive_defaults(elements: &[FormElement]) -> Value {
    derive_schema(elements, SchemaScope::Full).default_value()
}

/// Schema over every page, in page order
pub fn pages_schema(pages: &[FormPage]) -> ObjectSchema {
    let mut shape = ObjectSchema::new();
    for page in pages {
        shape.extend(derive_schema(&page.elements, SchemaScope::Full));
    }
    shape
}

/// Schema a page must satisfy before the wizard advances past it
pub fn page_gate_schema(page: &FormPage) -> ObjectSchema {
    derive_schema(&page.elements, SchemaScope::PageGate)
}

fn add_element(shape: &mut ObjectSchema, element: &FormElement, scope: SchemaScope) {
    match element.element_type {
        ElementType::StaticText | ElementType::PageBreak => {}
        ElementType::ElementGroup => {
            if scope == SchemaScope::PageGate && element.is_full_page() {
                return;
            }

            if element.is_repeatable() {
                let item = derive_schema(element.children(), scope);
                shape.insert(
                    element.field_name.clone(),
                    list_node(element, ListKind::Group, SchemaNode::Object(item)),
                );
            } else {
                // a plain group only organises its children
                for child in sorted(element.children()) {
                    add_element(shape, child, scope);
                }
            }
        }
        _ => {
            let field = SchemaNode::Field(field_schema(element));
            let node = if element.is_repeatable() {
                list_node(element, ListKind::Field, field)
            } else {
                field
            };
            shape.insert(element.field_name.clone(), node);
        }
    }
}

fn list_node(element: &FormElement, kind: ListKind, item: SchemaNode) -> SchemaNode {
    let (min, max) = element.configuration.instance_bounds();
    SchemaNode::List {
        label: element.label.clone(),
        kind,
        min,
        max,
        item: Box::new(item),
    }
}

/// Per-type rule dispatch
fn field_schema(element: &FormElement) -> FieldSchema {
    let config = &element.configuration;

    let rule = match element.element_type {
        ElementType::Number => FieldRule::Number {
            min: config.min,
            max: config.max,
        },
        ElementType::Checkbox => FieldRule::Checkbox,
        ElementType::Email => FieldRule::Email,
        ElementType::CheckboxGroup => FieldRule::Choices,
        ElementType::TextInput
        | ElementType::TextArea
        | ElementType::Date
        | ElementType::RadioGroup
        | ElementType::Select
        | ElementType::ElementGroup
        | ElementType::StaticText
        | ElementType::PageBreak => FieldRule::Text {
            min_length: config.min_length,
            max_length: config.max_length,
            pattern: config
                .pattern
                .as_deref()
                .filter(|p| !p.is_empty())
                .and_then(validation::compile_pattern),
            pattern_message: config.pattern_message.clone(),
        },
    };

    FieldSchema {
        label: element.label.clone(),
        required: config.is_required(),
        rule,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::element::ElementConfiguration;
    use serde_json::json;

    fn el(id: &str, element_type: ElementType, field_name: &str) -> FormElement {
        FormElement::new(id, element_type, field_name.to_uppercase(), field_name)
    }

    fn repeatable(min: Option<i64>, max: Option<i64>) -> ElementConfiguration {
        ElementConfiguration {
            repeatable: Some(true),
            min_instances: min,
            max_instances: max,
            ..Default::default()
        }
    }

    #[test]
    fn test_every_value_type_gets_one_key() {
        let elements: Vec<FormElement> = ElementType::ALL
            .iter()
            .enumerate()
            .map(|(i, t)| el(&format!("e{}", i), *t, &format!("f{}", i)).with_sort_order(i as i32))
            .collect();

        let schema = derive_schema(&elements, SchemaScope::Full);
        let keys: Vec<&str> = schema.keys().collect();

        // groups without children contribute nothing; structural types never do
        let expected: Vec<String> = ElementType::ALL
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_structural() && **t != ElementType::ElementGroup)
            .map(|(i, _)| format!("f{}", i))
            .collect();
        assert_eq!(keys, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_structural_elements_are_excluded_everywhere() {
        let group = el("g", ElementType::ElementGroup, "items")
            .with_configuration(repeatable(Some(1), None))
            .with_children(vec![
                el("s", ElementType::StaticText, "intro"),
                el("b", ElementType::PageBreak, "brk"),
                el("c", ElementType::TextInput, "title"),
            ]);
        let elements = vec![el("pb", ElementType::PageBreak, "top_break"), group];

        let derived = derive(&elements);
        assert_eq!(derived.schema.keys().collect::<Vec<_>>(), vec!["items"]);
        assert_eq!(derived.defaults, json!({"items": [{"title": ""}]}));
    }

    #[test]
    fn test_plain_group_flattens_children() {
        let inner = el("i", ElementType::ElementGroup, "inner")
            .with_children(vec![el("z", ElementType::Checkbox, "agree")]);
        let group = el("g", ElementType::ElementGroup, "address").with_children(vec![
            el("a", ElementType::TextInput, "street"),
            inner,
        ]);

        let derived = derive(&[group]);
        assert_eq!(derived.defaults, json!({"street": "", "agree": false}));
        assert!(!derived.schema.contains_key("address"));
    }

    #[test]
    fn test_repeatable_group_defaults_to_min_instances() {
        let group = el("g", ElementType::ElementGroup, "people")
            .with_configuration(repeatable(Some(2), Some(4)))
            .with_children(vec![
                el("a", ElementType::TextInput, "name"),
                el("b", ElementType::CheckboxGroup, "roles"),
            ]);

        let derived = derive(&[group]);
        assert_eq!(
            derived.defaults,
            json!({"people": [{"name": "", "roles": []}, {"name": "", "roles": []}]})
        );
        match derived.schema.get("people") {
            Some(SchemaNode::List { min, max, kind, .. }) => {
                assert_eq!((*min, *max), (2, 4));
                assert_eq!(*kind, ListKind::Group);
            }
            _ => panic!("Expected list"),
        }
    }

    #[test]
    fn test_zero_min_instances_yields_empty_list() {
        let group = el("g", ElementType::ElementGroup, "mutations")
            .with_configuration(ElementConfiguration {
                full_page: Some(true),
                ..repeatable(Some(0), Some(5))
            })
            .with_children(vec![el("a", ElementType::TextInput, "allele")]);

        assert_eq!(derive_defaults(&[group]), json!({"mutations": []}));
    }

    #[test]
    fn test_nested_repeatable_groups() {
        let inner = el("i", ElementType::ElementGroup, "samples")
            .with_configuration(repeatable(Some(1), None))
            .with_children(vec![el("n", ElementType::Number, "depth")]);
        let outer = el("o", ElementType::ElementGroup, "sites")
            .with_configuration(repeatable(Some(1), None))
            .with_children(vec![el("a", ElementType::TextInput, "site"), inner]);

        let derived = derive(&[outer]);
        assert_eq!(
            derived.defaults,
            json!({"sites": [{"site": "", "samples": [{"depth": ""}]}]})
        );
        assert!(matches!(
            derived.schema.node_at("sites.0.samples.0.depth"),
            Some(SchemaNode::Field(_))
        ));
    }

    #[test]
    fn test_repeatable_field_becomes_list() {
        let field = el("n", ElementType::Number, "scores").with_configuration(repeatable(Some(3), None));
        let derived = derive(&[field]);
        assert_eq!(derived.defaults, json!({"scores": ["", "", ""]}));
        match derived.schema.get("scores") {
            Some(SchemaNode::List { kind, item, .. }) => {
                assert_eq!(*kind, ListKind::Field);
                assert!(matches!(**item, SchemaNode::Field(_)));
            }
            _ => panic!("Expected list"),
        }
    }

    #[test]
    fn test_page_gate_skips_full_page_groups() {
        let full_page = el("g", ElementType::ElementGroup, "details")
            .with_configuration(ElementConfiguration {
                full_page: Some(true),
                ..Default::default()
            })
            .with_children(vec![el("d", ElementType::TextInput, "notes")]);
        let page = FormPage::new("p1", 1, vec![el("n", ElementType::TextInput, "name"), full_page]);

        let gate = page_gate_schema(&page);
        assert_eq!(gate.keys().collect::<Vec<_>>(), vec!["name"]);

        let full = pages_schema(&[page]);
        assert_eq!(full.keys().collect::<Vec<_>>(), vec!["name", "notes"]);
    }

    #[test]
    fn test_sort_order_defines_key_order() {
        let elements = vec![
            el("b", ElementType::TextInput, "second").with_sort_order(1),
            el("a", ElementType::TextInput, "first").with_sort_order(0),
        ];
        let schema = derive_schema(&elements, SchemaScope::Full);
        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["first", "second"]);
    }
}
