// Server-side rendering of the wizard and submissions

pub mod form;
pub mod html;
pub mod posted;
pub mod print;

use askama::Template;

use crate::wizard::{Wizard, WizardEvent};
use form::{render_elements, Node, RenderContext};

/// View nodes of whatever the wizard currently shows
pub fn view_nodes(wizard: &Wizard) -> Vec<Node> {
    let scope = wizard.view();
    let ctx = RenderContext {
        values: wizard.values(),
        errors: wizard.errors(),
        read_only: wizard.is_read_only(),
        full_page_groups: true,
    };
    render_elements(&scope.elements, &scope.prefix, &ctx)
}

pub struct CrumbView {
    pub label: String,
    pub action: String,
    pub current: bool,
}

#[derive(Template)]
#[template(path = "wizard.html")]
pub struct WizardTemplate {
    pub form_name: String,
    pub session_id: String,
    /// Banner naming the mode (preview, editing), empty when filling
    pub mode_label: String,
    pub notice: String,
    pub show_progress: bool,
    pub progress_label: String,
    pub progress_percent: usize,
    pub page_title: String,
    pub page_description: String,
    pub in_group_view: bool,
    pub crumbs: Vec<CrumbView>,
    pub body_html: String,
    pub show_previous: bool,
    pub show_next: bool,
    pub show_submit: bool,
    pub submit_disabled: bool,
    pub submit_label: String,
    pub section_label: String,
    pub has_section_previous: bool,
    pub has_section_next: bool,
    pub error_count: usize,
}

impl WizardTemplate {
    pub fn build(
        wizard: &Wizard,
        session_id: &str,
        mode_label: &str,
        submit_label: &str,
        notice: &str,
    ) -> Result<Self, askama::Error> {
        let body_html = html::nodes_to_html(&view_nodes(wizard))?;
        let in_group_view = wizard.in_group_view();
        let progress = wizard.progress();

        let crumbs = if in_group_view {
            wizard
                .breadcrumbs()
                .into_iter()
                .map(|crumb| CrumbView {
                    action: crumb
                        .target
                        .map(|depth| WizardEvent::Crumb(depth).to_string())
                        .unwrap_or_default(),
                    current: crumb.target.is_none(),
                    label: crumb.label,
                })
                .collect()
        } else {
            Vec::new()
        };

        let section_count = wizard.section_count();
        let section = wizard.section_index();
        let section_label = if in_group_view && section_count > 1 {
            format!("Section {} of {}", section + 1, section_count)
        } else {
            String::new()
        };

        Ok(Self {
            form_name: wizard.title().to_string(),
            session_id: session_id.to_string(),
            mode_label: mode_label.to_string(),
            notice: notice.to_string(),
            show_progress: progress.is_some(),
            progress_label: progress.as_ref().map(|p| p.label.clone()).unwrap_or_default(),
            progress_percent: progress.map(|p| p.percent).unwrap_or(100),
            page_title: wizard.current_page_title(),
            page_description: wizard.current_page().description.clone().unwrap_or_default(),
            in_group_view,
            crumbs,
            body_html,
            show_previous: !in_group_view && !wizard.is_first_page(),
            show_next: !in_group_view && !wizard.is_last_page(),
            show_submit: !in_group_view && wizard.is_last_page() && !wizard.is_read_only(),
            submit_disabled: wizard.is_submitting(),
            submit_label: submit_label.to_string(),
            section_label,
            has_section_previous: in_group_view && section > 0,
            has_section_next: in_group_view && section + 1 < section_count,
            error_count: wizard.errors().len(),
        })
    }
}
