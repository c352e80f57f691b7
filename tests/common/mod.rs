// Common test utilities shared across test files

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt; // for `collect`
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use formpilot::{
    config::Settings,
    create_router,
    domain::element::Form,
    services::form_source::FileFormApi,
    AppState,
};

/// Two pages; the second holds a full-page repeatable group split into two
/// sections by a page break
pub const FORMS_YAML: &str = r#"
- id: intake
  name: Patient intake
  status: PUBLISHED
  pages:
    - id: p2
      pageNumber: 2
      title: Genetics
      elements:
        - id: e-mutations
          type: ELEMENT_GROUP
          label: Mutations
          fieldName: mutations
          sortOrder: 0
          configuration: { repeatable: true, fullPage: true, minInstances: 1, maxInstances: 3, instanceLabel: Mutation }
          children:
            - { id: e-allele, type: TEXT_INPUT, label: Allele, fieldName: allele, sortOrder: 0, configuration: { required: true } }
            - { id: e-break, type: PAGE_BREAK, label: "", fieldName: break_1, sortOrder: 1 }
            - { id: e-notes, type: TEXT_AREA, label: Notes, fieldName: notes, sortOrder: 2 }
    - id: p1
      pageNumber: 1
      title: About you
      elements:
        - id: e-name
          type: TEXT_INPUT
          label: Full name
          fieldName: name
          sortOrder: 0
          configuration: { required: true }
        - id: e-email
          type: EMAIL
          label: Email
          fieldName: email
          sortOrder: 1
          configuration: { required: true }
        - id: e-color
          type: RADIO_GROUP
          label: Colour
          fieldName: color
          sortOrder: 2
          configuration:
            allowOther: true
            options:
              - { label: Red, value: red }
              - { label: Blue, value: blue }
        - id: e-intro
          type: STATIC_TEXT
          label: ""
          fieldName: intro
          sortOrder: 3
          configuration: { content: "<p>All answers are confidential.</p>" }
- id: feedback
  name: Feedback
  status: DRAFT
  elements:
    - { id: f-comment, type: TEXT_INPUT, label: Comment, fieldName: comment, configuration: { required: true } }
    - { id: f-agree, type: CHECKBOX, label: I agree, fieldName: agree }
"#;

#[allow(dead_code)]
pub fn test_forms() -> Vec<Form> {
    serde_yaml::from_str(FORMS_YAML).unwrap()
}

/// Router over an in-memory form source. The state is returned so tests can
/// reach the stored submissions.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<FileFormApi>) {
    let api = Arc::new(FileFormApi::in_memory(test_forms()));
    let settings = Settings {
        autosave_delay: std::time::Duration::from_millis(20),
        ..Settings::default()
    };
    let state = Arc::new(AppState::new(api.clone(), settings));
    (create_router(state), api)
}

#[allow(dead_code)]
pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn post_form(app: &Router, uri: &str, body: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_string(response: Response<Body>) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

#[allow(dead_code)]
pub fn location(response: &Response<Body>) -> String {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

/// Open a session and return its url
#[allow(dead_code)]
pub async fn open_session(app: &Router, uri: &str) -> String {
    let response = get(app, uri).await;
    let session = location(&response);
    assert!(session.starts_with("/sessions/"));
    session
}

/// Post to a session, expecting the usual redirect back, and return the
/// page it then shows
#[allow(dead_code)]
pub async fn post_and_follow(app: &Router, session: &str, body: &str) -> String {
    let response = post_form(app, session, body).await;
    assert_eq!(location(&response), session);
    body_string(get(app, session).await).await
}
