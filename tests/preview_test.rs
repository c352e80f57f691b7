// Preview, edit mode and the surrounding pages

mod common;

use axum::http::{header, StatusCode};
use common::{body_string, create_test_app, get, open_session, post_and_follow};
use formpilot::services::api_client::FormApi;
use serde_json::json;

#[tokio::test]
async fn test_index_lists_forms() {
    let (app, _) = create_test_app();

    let response = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;

    assert!(html.contains("Formpilot"));
    assert!(html.contains("Patient intake"));
    assert!(html.contains("/forms/intake/fill"));
    assert!(html.contains("/forms/feedback/preview"));
}

#[tokio::test]
async fn test_security_headers() {
    let (app, _) = create_test_app();
    let response = get(&app, "/").await;

    let csp = response
        .headers()
        .get(header::CONTENT_SECURITY_POLICY)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(csp.contains("script-src 'none'"));
    assert!(csp.contains("form-action 'self'"));
    assert_eq!(response.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
}

#[tokio::test]
async fn test_read_only_preview_navigates_without_validation() {
    let (app, api) = create_test_app();
    let session = open_session(&app, "/forms/intake/preview?readonly=true").await;

    let html = body_string(get(&app, &session).await).await;
    assert!(html.contains("Preview (read only)"));
    assert!(html.contains(" readonly"));

    // Edits are ignored and Next is not gated
    let html = post_and_follow(&app, &session, "name=Mallory&action=next").await;
    assert!(html.contains("Genetics (Page 2 of 2)"));
    assert!(!html.contains("Full name is required"));
    assert!(!html.contains("value=\"submit\""));
    assert!(!html.contains("Add Mutation"));
    assert!(html.contains(">View<"));

    let html = post_and_follow(&app, &session, "action=prev").await;
    assert!(!html.contains("value=\"Mallory\""));

    // Previews never write a draft
    assert!(api.get_draft("intake").await.unwrap().is_none());
}

#[tokio::test]
async fn test_preview_submit_shows_payload() {
    let (app, _) = create_test_app();
    let session = open_session(&app, "/forms/feedback/preview").await;

    let html = body_string(get(&app, &session).await).await;
    assert!(html.contains("Preview"));
    assert!(html.contains("value=\"submit\""));

    let html = post_and_follow(&app, &session, "action=submit").await;
    assert!(html.contains("Comment is required"));

    let html = post_and_follow(&app, &session, "comment=Lovely&action=submit").await;
    assert!(html.contains("Preview submitted. Nothing was stored."));
    assert!(html.contains("Lovely"));
    assert!(html.contains("agree"));
    assert!(!html.contains("View your answers"));
}

#[tokio::test]
async fn test_edit_mode_updates_submission() {
    let (app, api) = create_test_app();
    let created = api
        .submit("feedback", &json!({"comment": "Old", "agree": true}))
        .await
        .unwrap();

    let session = open_session(&app, &format!("/forms/feedback/submissions/{}/edit", created.id)).await;
    let html = body_string(get(&app, &session).await).await;
    assert!(html.contains("Editing a submission"));
    assert!(html.contains("value=\"Old\""));
    assert!(html.contains(" checked"));
    assert!(html.contains("Save changes"));

    // Unchecking the box means it is simply absent from the post
    let html = post_and_follow(&app, &session, "comment=New&action=submit").await;
    assert!(html.contains("The submission has been updated."));
    assert!(html.contains(&format!("/forms/feedback/submissions/{}/print", created.id)));

    let stored = api.get_submission("feedback", &created.id).await.unwrap();
    assert_eq!(stored.data, json!({"comment": "New", "agree": false}));
}

#[tokio::test]
async fn test_edit_unknown_submission_is_not_found() {
    let (app, _) = create_test_app();
    let response = get(&app, "/forms/feedback/submissions/missing/edit").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_print_view_resolves_values() {
    let (app, api) = create_test_app();
    let created = api
        .submit("feedback", &json!({"comment": "", "agree": true}))
        .await
        .unwrap();

    let response = get(&app, &format!("/forms/feedback/submissions/{}/print", created.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;

    assert!(html.contains(&format!("Submission {}", created.id)));
    assert!(html.contains("<td>I agree</td>"));
    assert!(html.contains("<td>Yes</td>"));
    assert!(html.contains("<td>—</td>"));
}
