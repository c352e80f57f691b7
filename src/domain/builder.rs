// Builder store: the element tree being edited before it is saved
//
// Every structural change goes through a function that takes the current
// tree and returns a rebuilt one. Nodes that are not touched keep their
// position and contents.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;

use crate::domain::element::{ElementConfiguration, ElementOption, ElementType, Form, FormElement};
use crate::services::api_client::FormApi;
use crate::validation;

/// Partial update applied by `update_element`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementUpdate {
    #[serde(rename = "type")]
    pub element_type: Option<ElementType>,
    pub label: Option<String>,
    pub field_name: Option<String>,
    pub sort_order: Option<i32>,
    pub configuration: Option<ElementConfiguration>,
    pub page_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Default)]
pub struct BuilderStore {
    form: Option<Form>,
    elements: Vec<FormElement>,
    selected_element_id: Option<String>,
    is_dirty: bool,
}

impl BuilderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a freshly fetched form. The tree starts clean. Forms that only
    /// carry elements inside their pages are flattened into one root list
    /// tagged with page ids.
    pub fn set_form(&mut self, form: Form) {
        self.elements = if form.elements.is_empty() {
            form.pages
                .iter()
                .flat_map(|page| {
                    page.elements.iter().map(move |element| {
                        let mut element = element.clone();
                        element.page_id.get_or_insert_with(|| page.id.clone());
                        element
                    })
                })
                .collect()
        } else {
            form.elements.clone()
        };
        self.form = Some(form);
        self.selected_element_id = None;
        self.is_dirty = false;
    }

    pub fn set_elements(&mut self, elements: Vec<FormElement>) {
        self.elements = elements;
    }

    pub fn form(&self) -> Option<&Form> {
        self.form.as_ref()
    }

    pub fn elements(&self) -> &[FormElement] {
        &self.elements
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.is_dirty = dirty;
    }

    pub fn selected_element_id(&self) -> Option<&str> {
        self.selected_element_id.as_deref()
    }

    fn commit(&mut self, elements: Vec<FormElement>) {
        self.elements = elements;
        self.is_dirty = true;
    }

    pub fn add_element(&mut self, element: FormElement) {
        let next = append_root(&self.elements, element);
        self.commit(next);
    }

    /// Append a child to the group `parent_id`. Returns false (and leaves the
    /// tree alone) when no such group exists.
    pub fn add_element_to_group(&mut self, parent_id: &str, element: FormElement) -> bool {
        match insert_child(&self.elements, parent_id, element) {
            Some(next) => {
                self.commit(next);
                true
            }
            None => false,
        }
    }

    pub fn update_element(&mut self, id: &str, update: ElementUpdate) {
        let next = update_in_tree(&self.elements, id, &update);
        self.commit(next);
    }

    /// Remove a node and its whole subtree
    pub fn remove_element(&mut self, id: &str) {
        let next = remove_from_tree(&self.elements, id);
        if self.selected_element_id.as_deref() == Some(id) {
            self.selected_element_id = None;
        }
        self.commit(next);
    }

    /// Move a root element from `old_index` to `new_index` and renumber roots
    pub fn reorder_elements(&mut self, old_index: usize, new_index: usize) {
        let next = reorder(&self.elements, old_index, new_index);
        self.commit(next);
    }

    pub fn move_element_up(&mut self, id: &str) {
        let next = move_element(&self.elements, id, Direction::Up);
        self.commit(next);
    }

    pub fn move_element_down(&mut self, id: &str) {
        let next = move_element(&self.elements, id, Direction::Down);
        self.commit(next);
    }

    pub fn select_element(&mut self, id: Option<&str>) {
        self.selected_element_id = id.map(str::to_string);
    }

    pub fn selected_element(&self) -> Option<&FormElement> {
        self.selected_element_id
            .as_deref()
            .and_then(|id| find_element(&self.elements, id))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Persist the tree through the backend and adopt the stored tree, which
    /// carries the ids the backend gave new elements. The dirty flag is
    /// cleared only when the save went through.
    pub async fn save(&mut self, api: &dyn FormApi) -> Result<()> {
        let form_id = self
            .form
            .as_ref()
            .map(|f| f.id.clone())
            .context("no form loaded in builder")?;

        let problems = tree_problems(&self.elements);
        if !problems.is_empty() {
            bail!("Cannot save form: {}", problems.join("; "));
        }

        let saved = api
            .save_elements(&form_id, &self.elements)
            .await
            .context("Failed to save form elements")?;

        self.elements = saved;
        if self.selected_element().is_none() {
            self.selected_element_id = None;
        }
        self.is_dirty = false;
        Ok(())
    }
}

/// Depth-first search by id
pub fn find_element<'a>(tree: &'a [FormElement], id: &str) -> Option<&'a FormElement> {
    tree.iter().find_map(|element| {
        if element.id == id {
            Some(element)
        } else {
            find_element(element.children(), id)
        }
    })
}

fn next_sort_order(siblings: &[FormElement]) -> i32 {
    siblings.iter().map(|e| e.sort_order + 1).max().unwrap_or(0)
}

fn append_root(tree: &[FormElement], mut element: FormElement) -> Vec<FormElement> {
    element.sort_order = next_sort_order(tree);
    element.parent_id = None;

    let mut next = tree.to_vec();
    next.push(element);
    next
}

fn insert_child(tree: &[FormElement], parent_id: &str, element: FormElement) -> Option<Vec<FormElement>> {
    match find_element(tree, parent_id) {
        Some(parent) if parent.is_group() => {}
        _ => return None,
    }

    let mut pending = Some(element);
    Some(rebuild(tree, &mut |node| {
        if node.id != parent_id {
            return node;
        }
        let mut node = node;
        if let Some(mut child) = pending.take() {
            let children = node.children.take().unwrap_or_default();
            child.sort_order = next_sort_order(&children);
            child.parent_id = Some(parent_id.to_string());
            child.page_id = None;
            let mut children = children;
            children.push(child);
            node.children = Some(children);
        }
        node
    }))
}

/// Rebuild the tree bottom-up, passing every node (with rebuilt children)
/// through `f`
fn rebuild(tree: &[FormElement], f: &mut dyn FnMut(FormElement) -> FormElement) -> Vec<FormElement> {
    tree.iter()
        .map(|element| {
            let mut node = element.clone();
            if let Some(children) = &element.children {
                node.children = Some(rebuild(children, f));
            }
            f(node)
        })
        .collect()
}

fn update_in_tree(tree: &[FormElement], id: &str, update: &ElementUpdate) -> Vec<FormElement> {
    rebuild(tree, &mut |mut node| {
        if node.id == id {
            if let Some(element_type) = update.element_type {
                node.element_type = element_type;
            }
            if let Some(label) = &update.label {
                node.label = label.clone();
            }
            if let Some(field_name) = &update.field_name {
                node.field_name = field_name.clone();
            }
            if let Some(sort_order) = update.sort_order {
                node.sort_order = sort_order;
            }
            if let Some(configuration) = &update.configuration {
                node.configuration = configuration.clone();
            }
            if let Some(page_id) = &update.page_id {
                node.page_id = Some(page_id.clone());
            }
            if node.is_group() && node.children.is_none() {
                node.children = Some(Vec::new());
            }
        }
        node
    })
}

fn remove_from_tree(tree: &[FormElement], id: &str) -> Vec<FormElement> {
    tree.iter()
        .filter(|element| element.id != id)
        .map(|element| {
            let mut node = element.clone();
            if let Some(children) = &element.children {
                node.children = Some(remove_from_tree(children, id));
            }
            node
        })
        .collect()
}

fn reorder(tree: &[FormElement], old_index: usize, new_index: usize) -> Vec<FormElement> {
    let mut next = tree.to_vec();
    if old_index >= next.len() {
        return next;
    }

    let moved = next.remove(old_index);
    let new_index = new_index.min(next.len());
    next.insert(new_index, moved);
    renumber(next)
}

fn renumber(elements: Vec<FormElement>) -> Vec<FormElement> {
    elements
        .into_iter()
        .enumerate()
        .map(|(index, mut element)| {
            element.sort_order = index as i32;
            element
        })
        .collect()
}

/// Siblings in the order they are displayed: by `sort_order`, ties kept in
/// stored order
fn display_order(siblings: &[FormElement]) -> Vec<FormElement> {
    let mut ordered = siblings.to_vec();
    ordered.sort_by_key(|e| e.sort_order);
    ordered
}

/// Swap `id` with its displayed neighbour among the siblings that
/// `same_scope` accepts, then renumber densely in display order. `None` when
/// `id` is not one of the siblings.
fn swap_displayed(
    siblings: &[FormElement],
    id: &str,
    direction: Direction,
    same_scope: impl Fn(&FormElement, &FormElement) -> bool,
) -> Option<Vec<FormElement>> {
    let mut ordered = display_order(siblings);
    let index = ordered.iter().position(|e| e.id == id)?;
    let neighbour = match direction {
        Direction::Up => (0..index).rev().find(|&j| same_scope(&ordered[j], &ordered[index])),
        Direction::Down => (index + 1..ordered.len()).find(|&j| same_scope(&ordered[j], &ordered[index])),
    };

    match neighbour {
        Some(j) => {
            ordered.swap(index, j);
            Some(renumber(ordered))
        }
        None => Some(siblings.to_vec()),
    }
}

/// Root elements swap with the nearest displayed neighbour on the same page;
/// nested elements swap within their parent's children.
fn move_element(tree: &[FormElement], id: &str, direction: Direction) -> Vec<FormElement> {
    if let Some(next) = swap_displayed(tree, id, direction, |a, b| a.page_id == b.page_id) {
        return next;
    }

    rebuild(tree, &mut |mut node| {
        if let Some(children) = swap_displayed(node.children(), id, direction, |_, _| true) {
            node.children = Some(children);
        }
        node
    })
}

/// Field-name problems that would corrupt submitted data: invalid keys and
/// keys repeated within one value scope. A page (with its plain groups
/// flattened in) is one scope; each repeatable group's children form another.
pub fn tree_problems(tree: &[FormElement]) -> Vec<String> {
    let mut problems = Vec::new();

    let mut seen_pages = HashSet::new();
    for page in tree.iter().map(|e| e.page_id.as_deref()) {
        if !seen_pages.insert(page) {
            continue;
        }
        let roots: Vec<&FormElement> = tree.iter().filter(|e| e.page_id.as_deref() == page).collect();
        check_scope(&roots, &mut problems);
    }

    problems
}

fn check_scope(elements: &[&FormElement], problems: &mut Vec<String>) {
    let mut seen = HashSet::new();
    collect_scope(elements, &mut seen, problems);
}

fn collect_scope<'a>(elements: &[&'a FormElement], seen: &mut HashSet<&'a str>, problems: &mut Vec<String>) {
    for element in elements {
        if element.element_type.is_structural() {
            continue;
        }

        let children: Vec<&FormElement> = element.children().iter().collect();
        if element.is_group() && !element.is_repeatable() {
            collect_scope(&children, seen, problems);
            continue;
        }

        if let Err(message) = validation::validate_field_name(&element.field_name) {
            problems.push(message);
        }
        if !seen.insert(element.field_name.as_str()) {
            problems.push(format!("Duplicate field name '{}'", element.field_name));
        }
        if element.is_group() {
            check_scope(&children, problems);
        }
    }
}

/// A new element of `element_type` with palette defaults and a fresh id
pub fn new_element(element_type: ElementType, sort_order: i32) -> FormElement {
    let label = element_type.display_name();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let field_name = format!("{}_{}", label.to_lowercase().replace(' ', "_"), &suffix[..8]);

    let choices = || {
        Some(vec![
            ElementOption::new("Option 1", "option1"),
            ElementOption::new("Option 2", "option2"),
        ])
    };

    let mut configuration = ElementConfiguration {
        required: Some(false),
        ..Default::default()
    };
    match element_type {
        ElementType::TextInput | ElementType::TextArea => {
            configuration.placeholder = Some("Enter text...".to_string());
        }
        ElementType::Number => configuration.placeholder = Some("Enter number...".to_string()),
        ElementType::Email => configuration.placeholder = Some("Enter email...".to_string()),
        ElementType::RadioGroup | ElementType::Select | ElementType::CheckboxGroup => {
            configuration.options = choices();
        }
        ElementType::StaticText => {
            configuration.required = None;
            configuration.content = Some("<p>Enter your text here</p>".to_string());
        }
        ElementType::PageBreak => configuration.required = None,
        ElementType::ElementGroup => {
            configuration.required = None;
            configuration.repeatable = Some(false);
        }
        ElementType::Date | ElementType::Checkbox => {}
    }

    let mut element = FormElement::new(
        uuid::Uuid::new_v4().to_string(),
        element_type,
        label,
        field_name,
    )
    .with_configuration(configuration)
    .with_sort_order(sort_order);

    if element_type == ElementType::ElementGroup {
        element.children = Some(Vec::new());
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::element::{FormStatus, Submission};

    fn el(id: &str) -> FormElement {
        FormElement::new(id, ElementType::TextInput, id.to_uppercase(), id)
    }

    fn group(id: &str, children: Vec<FormElement>) -> FormElement {
        FormElement::new(id, ElementType::ElementGroup, id.to_uppercase(), id).with_children(children)
    }

    fn store_with(elements: Vec<FormElement>) -> BuilderStore {
        let mut store = BuilderStore::new();
        store.set_elements(elements);
        store
    }

    fn ids(elements: &[FormElement]) -> Vec<&str> {
        elements.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_reorder_assigns_dense_sort_order() {
        let mut store = store_with(vec![
            el("a").with_sort_order(0),
            el("b").with_sort_order(1),
            el("c").with_sort_order(2),
        ]);

        store.reorder_elements(0, 2);

        assert_eq!(ids(store.elements()), vec!["b", "c", "a"]);
        let orders: Vec<i32> = store.elements().iter().map(|e| e.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_reorder_out_of_range_is_noop() {
        let mut store = store_with(vec![el("a"), el("b")]);
        store.reorder_elements(5, 0);
        assert_eq!(ids(store.elements()), vec!["a", "b"]);
    }

    #[test]
    fn test_add_element_appends_with_next_sort_order() {
        let mut store = store_with(vec![el("a").with_sort_order(0), el("b").with_sort_order(4)]);
        store.add_element(el("c"));
        assert_eq!(store.elements()[2].sort_order, 5);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_add_element_to_group() {
        let mut store = store_with(vec![group("g", vec![el("x")]), el("a")]);

        assert!(store.add_element_to_group("g", el("y")));
        let g = find_element(store.elements(), "g").unwrap();
        assert_eq!(ids(g.children()), vec!["x", "y"]);
        assert_eq!(g.children()[1].parent_id.as_deref(), Some("g"));
        assert_eq!(g.children()[1].sort_order, 1);

        assert!(!store.add_element_to_group("a", el("z")));
        assert!(!store.add_element_to_group("missing", el("z")));
    }

    #[test]
    fn test_update_element_nested() {
        let mut store = store_with(vec![group("g", vec![el("x")])]);
        store.update_element(
            "x",
            ElementUpdate {
                label: Some("Renamed".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(find_element(store.elements(), "x").unwrap().label, "Renamed");
    }

    #[test]
    fn test_remove_takes_subtree_and_clears_selection() {
        let mut store = store_with(vec![group("g", vec![el("x"), group("h", vec![el("y")])]), el("a")]);
        store.select_element(Some("g"));

        store.remove_element("g");

        assert_eq!(ids(store.elements()), vec!["a"]);
        assert!(find_element(store.elements(), "y").is_none());
        assert!(store.selected_element_id().is_none());
    }

    #[test]
    fn test_remove_nested_keeps_siblings() {
        let mut store = store_with(vec![group("g", vec![el("x"), el("y"), el("z")])]);
        store.select_element(Some("x"));
        store.remove_element("y");

        let g = find_element(store.elements(), "g").unwrap();
        assert_eq!(ids(g.children()), vec!["x", "z"]);
        assert_eq!(store.selected_element().map(|e| e.id.as_str()), Some("x"));
    }

    #[test]
    fn test_move_root_skips_other_pages() {
        let mut store = store_with(vec![
            el("a").with_page("p1").with_sort_order(0),
            el("b").with_page("p2").with_sort_order(1),
            el("c").with_page("p1").with_sort_order(2),
        ]);

        store.move_element_up("c");

        assert_eq!(ids(store.elements()), vec!["c", "b", "a"]);
        assert_eq!(store.elements()[0].sort_order, 0);
        assert_eq!(store.elements()[2].sort_order, 2);
    }

    #[test]
    fn test_move_nested_within_parent() {
        let mut store = store_with(vec![group("g", vec![el("x"), el("y")])]);

        store.move_element_down("x");
        let g = find_element(store.elements(), "g").unwrap();
        assert_eq!(ids(g.children()), vec!["y", "x"]);

        // already last: nothing moves
        store.move_element_down("x");
        let g = find_element(store.elements(), "g").unwrap();
        assert_eq!(ids(g.children()), vec!["y", "x"]);
        assert_eq!(g.children()[1].sort_order, 1);
    }

    #[test]
    fn test_move_nested_follows_display_order() {
        // stored out of order: displayed as b, c, a
        let mut store = store_with(vec![group(
            "g",
            vec![el("a").with_sort_order(2), el("b").with_sort_order(0), el("c").with_sort_order(1)],
        )]);

        store.move_element_up("c");

        let g = find_element(store.elements(), "g").unwrap();
        assert_eq!(ids(&display_order(g.children())), vec!["c", "b", "a"]);
        let orders: Vec<i32> = g.children().iter().map(|e| e.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_move_root_follows_display_order() {
        // stored as a, c, b but displayed as a, b, c
        let mut store = store_with(vec![
            el("a").with_sort_order(0),
            el("c").with_sort_order(2),
            el("b").with_sort_order(1),
        ]);

        store.move_element_up("c");
        assert_eq!(ids(&display_order(store.elements())), vec!["a", "c", "b"]);

        store.move_element_down("a");
        assert_eq!(ids(&display_order(store.elements())), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_move_at_edge_leaves_order_alone() {
        let mut store = store_with(vec![el("a").with_sort_order(5), el("b").with_sort_order(9)]);
        store.move_element_up("a");
        let orders: Vec<i32> = store.elements().iter().map(|e| e.sort_order).collect();
        assert_eq!(orders, vec![5, 9]);
    }

    #[test]
    fn test_select_and_find() {
        let mut store = store_with(vec![group("g", vec![el("x")])]);
        assert!(store.selected_element().is_none());

        store.select_element(Some("x"));
        assert_eq!(store.selected_element().unwrap().id, "x");
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_tree_problems_scopes() {
        let mut dup = el("b");
        dup.field_name = "a".to_string();

        // plain groups share their parent's scope
        let tree = vec![el("a"), group("g", vec![dup.clone()])];
        assert_eq!(tree_problems(&tree), vec!["Duplicate field name 'a'".to_string()]);

        // repeatable groups open a new scope
        let mut rep = group("r", vec![dup]);
        rep.configuration.repeatable = Some(true);
        assert!(tree_problems(&[el("a"), rep]).is_empty());

        // pages are separate scopes
        let mut other = el("a2").with_page("p2");
        other.field_name = "a".to_string();
        assert!(tree_problems(&[el("a").with_page("p1"), other]).is_empty());
    }

    /// Backend that gives every element a server id on save
    struct RenamingApi;

    #[async_trait::async_trait]
    impl FormApi for RenamingApi {
        async fn get_form(&self, _form_id: &str) -> Result<Form> {
            bail!("not used")
        }

        async fn get_public_form(&self, _form_id: &str) -> Result<Form> {
            bail!("not used")
        }

        async fn submit(&self, _form_id: &str, _data: &serde_json::Value) -> Result<Submission> {
            bail!("not used")
        }

        async fn get_draft(&self, _form_id: &str) -> Result<Option<Submission>> {
            Ok(None)
        }

        async fn save_draft(&self, _form_id: &str, _data: &serde_json::Value) -> Result<Submission> {
            bail!("not used")
        }

        async fn get_submission(&self, _form_id: &str, _submission_id: &str) -> Result<Submission> {
            bail!("not used")
        }

        async fn update_submission(
            &self,
            _form_id: &str,
            _submission_id: &str,
            _data: &serde_json::Value,
        ) -> Result<Submission> {
            bail!("not used")
        }

        async fn save_elements(&self, _form_id: &str, elements: &[FormElement]) -> Result<Vec<FormElement>> {
            Ok(elements
                .iter()
                .map(|e| {
                    let mut saved = e.clone();
                    saved.id = format!("srv-{}", e.field_name);
                    saved
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_save_adopts_stored_ids() {
        let mut store = BuilderStore::new();
        store.set_form(Form {
            id: "f1".to_string(),
            name: "Form".to_string(),
            description: None,
            status: FormStatus::Draft,
            elements: Vec::new(),
            pages: Vec::new(),
            created_at: None,
            updated_at: None,
            published_at: None,
        });
        store.add_element(el("a"));
        store.select_element(Some("a"));

        store.save(&RenamingApi).await.unwrap();

        assert_eq!(ids(store.elements()), vec!["srv-a"]);
        assert!(store.selected_element_id().is_none());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_new_element_defaults() {
        let select = new_element(ElementType::Select, 3);
        assert_eq!(select.label, "Select");
        assert_eq!(select.sort_order, 3);
        assert!(select.field_name.starts_with("select_"));
        assert_eq!(select.configuration.options().len(), 2);
        assert!(validation::validate_field_name(&select.field_name).is_ok());

        let group = new_element(ElementType::ElementGroup, 0);
        assert_eq!(group.children.as_deref().map(<[FormElement]>::len), Some(0));

        assert_ne!(new_element(ElementType::Date, 0).field_name, new_element(ElementType::Date, 0).field_name);
    }
}
