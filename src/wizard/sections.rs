// Sections of a group detail view, split at PAGE_BREAK markers

use crate::domain::element::{sorted, ElementType, FormElement};

/// Children in sort order, split at each page break. Empty sections are
/// dropped; there is always at least one section.
pub fn split(children: &[FormElement]) -> Vec<Vec<&FormElement>> {
    let mut sections: Vec<Vec<&FormElement>> = vec![Vec::new()];

    for child in sorted(children) {
        if child.element_type == ElementType::PageBreak {
            sections.push(Vec::new());
        } else if let Some(current) = sections.last_mut() {
            current.push(child);
        }
    }

    sections.retain(|section| !section.is_empty());
    if sections.is_empty() {
        sections.push(Vec::new());
    }
    sections
}
