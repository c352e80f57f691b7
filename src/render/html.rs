// View nodes -> HTML through askama partials
//
// Templates do not recurse, so children are rendered first and handed to
// their parent template as pre-escaped markup.

use askama::Template;

use super::form::{FieldView, Node, SummaryView};

#[derive(Template)]
#[template(path = "partials/field.html")]
struct FieldTemplate<'a> {
    field: &'a FieldView,
}

#[derive(Template)]
#[template(path = "partials/fieldset.html")]
struct FieldsetTemplate<'a> {
    label: &'a str,
    body_html: String,
}

struct InstanceHtml {
    title: String,
    remove_action: String,
    can_remove: bool,
    body_html: String,
}

#[derive(Template)]
#[template(path = "partials/repeatable_group.html")]
struct RepeatableGroupTemplate<'a> {
    label: &'a str,
    instances: Vec<InstanceHtml>,
    add_label: &'a str,
    add_action: &'a str,
    can_add: bool,
    error: &'a str,
    read_only: bool,
}

struct ItemHtml {
    remove_action: String,
    can_remove: bool,
    field_html: String,
}

#[derive(Template)]
#[template(path = "partials/repeatable_field.html")]
struct RepeatableFieldTemplate<'a> {
    label: &'a str,
    items: Vec<ItemHtml>,
    add_action: &'a str,
    can_add: bool,
    error: &'a str,
    read_only: bool,
}

#[derive(Template)]
#[template(path = "partials/full_page_link.html")]
struct FullPageLinkTemplate<'a> {
    label: &'a str,
    action: &'a str,
    has_errors: bool,
}

#[derive(Template)]
#[template(path = "partials/full_page_list.html")]
struct FullPageListTemplate<'a> {
    label: &'a str,
    add_label: &'a str,
    entries: &'a [SummaryView],
    add_action: &'a str,
    can_add: bool,
    error: &'a str,
    read_only: bool,
}

pub fn nodes_to_html(nodes: &[Node]) -> Result<String, askama::Error> {
    let mut html = String::new();
    for node in nodes {
        html.push_str(&node_to_html(node)?);
        html.push('\n');
    }
    Ok(html)
}

fn node_to_html(node: &Node) -> Result<String, askama::Error> {
    match node {
        Node::Field(field) => FieldTemplate { field }.render(),
        Node::Fieldset { label, children } => FieldsetTemplate {
            label,
            body_html: nodes_to_html(children)?,
        }
        .render(),
        Node::RepeatableGroup {
            label,
            instances,
            add_label,
            add_action,
            can_add,
            error,
            read_only,
        } => {
            let instances = instances
                .iter()
                .map(|instance| {
                    Ok(InstanceHtml {
                        title: instance.title.clone(),
                        remove_action: instance.remove_action.clone(),
                        can_remove: instance.can_remove,
                        body_html: nodes_to_html(&instance.children)?,
                    })
                })
                .collect::<Result<Vec<_>, askama::Error>>()?;

            RepeatableGroupTemplate {
                label,
                instances,
                add_label,
                add_action,
                can_add: *can_add,
                error: error.as_deref().unwrap_or(""),
                read_only: *read_only,
            }
            .render()
        }
        Node::RepeatableField {
            label,
            items,
            add_action,
            can_add,
            error,
            read_only,
        } => {
            let items = items
                .iter()
                .map(|item| {
                    Ok(ItemHtml {
                        remove_action: item.remove_action.clone(),
                        can_remove: item.can_remove,
                        field_html: FieldTemplate { field: &item.field }.render()?,
                    })
                })
                .collect::<Result<Vec<_>, askama::Error>>()?;

            RepeatableFieldTemplate {
                label,
                items,
                add_action,
                can_add: *can_add,
                error: error.as_deref().unwrap_or(""),
                read_only: *read_only,
            }
            .render()
        }
        Node::StaticText { content } => Ok(format!("<div class=\"static-text\">{}</div>", content)),
        Node::Divider => Ok("<hr class=\"page-break\">".to_string()),
        Node::FullPageLink {
            label,
            action,
            has_errors,
        } => FullPageLinkTemplate {
            label,
            action,
            has_errors: *has_errors,
        }
        .render(),
        Node::FullPageList {
            label,
            add_label,
            entries,
            add_action,
            can_add,
            error,
            read_only,
        } => FullPageListTemplate {
            label,
            add_label,
            entries,
            add_action,
            can_add: *can_add,
            error: error.as_deref().unwrap_or(""),
            read_only: *read_only,
        }
        .render(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::element::{ElementConfiguration, ElementType, FormElement};
    use crate::domain::schema::FieldErrors;
    use crate::render::form::{render_elements, RenderContext};
    use serde_json::json;

    fn render(elements: &[&FormElement], data: &serde_json::Value, errors: &FieldErrors) -> String {
        let ctx = RenderContext {
            values: data,
            errors,
            read_only: false,
            full_page_groups: true,
        };
        nodes_to_html(&render_elements(elements, "", &ctx)).unwrap()
    }

    #[test]
    fn test_field_renders_value_and_error_below() {
        let element = FormElement::new("n", ElementType::TextInput, "Name", "name").with_configuration(
            ElementConfiguration {
                required: Some(true),
                ..Default::default()
            },
        );
        let mut errors = FieldErrors::new();
        errors.insert("name", "Name is required");

        let html = render(&[&element], &json!({"name": "<b>"}), &errors);
        assert!(html.contains("name=\"name\""));
        assert!(!html.contains("<b>"));
        let input = html.find("name=\"name\"").unwrap();
        let error = html.find("Name is required").unwrap();
        assert!(error > input);
    }

    #[test]
    fn test_static_text_is_verbatim() {
        let element = FormElement::new("s", ElementType::StaticText, "", "intro").with_configuration(
            ElementConfiguration {
                content: Some("<p>Welcome</p>".to_string()),
                ..Default::default()
            },
        );
        let html = render(&[&element], &json!({}), &FieldErrors::new());
        assert!(html.contains("<p>Welcome</p>"));
    }

    #[test]
    fn test_add_button_disabled_at_max() {
        let group = FormElement::new("g", ElementType::ElementGroup, "People", "people")
            .with_configuration(ElementConfiguration {
                repeatable: Some(true),
                min_instances: Some(1),
                max_instances: Some(1),
                ..Default::default()
            })
            .with_children(vec![FormElement::new("n", ElementType::TextInput, "Name", "name")]);

        let html = render(&[&group], &json!({"people": [{"name": ""}]}), &FieldErrors::new());
        assert!(html.contains("value=\"add:people\" disabled"));
        assert!(html.contains("value=\"remove:people.0\" disabled"));
        assert!(html.contains("name=\"people.0.name\""));
    }
}
