//! Registration, login, logout and password reset over HTTP.

#![allow(clippy::unwrap_used)]

use blossom_integration_tests::{PASSWORD, RecordingMailer, TestApp, json, reset_token};
use serde_json::json;

#[tokio::test]
async fn test_register_then_duplicate_conflicts() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    app.register(&client, "Rosa", "rosa@example.com").await;

    let response = client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "name": "Rosa Again", "email": "ROSA@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 409);
    let body = json(response).await;
    assert_eq!(body["message"], "An account with this email already exists");
    assert!(body.get("data").is_none());
    assert_eq!(app.store.row_counts(), (1, 1, 1));
}

#[tokio::test]
async fn test_register_validates_input() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let short_password = client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "name": "Iris", "email": "iris@example.com", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(short_password.status(), 400);

    let bad_email = client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "name": "Iris", "email": "not-an-email", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_email.status(), 400);

    let missing_field = client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "name": "Iris" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_field.status(), 400);

    assert_eq!(app.store.row_counts(), (0, 0, 0));
}

#[tokio::test]
async fn test_login_logout_cycle() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();
    app.register(&client, "Dahlia", "dahlia@example.com").await;

    let wrong = client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "dahlia@example.com", "password": "wrong password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);

    let body = app.login(&client, "Dahlia@Example.com").await;
    assert_eq!(body["data"]["email"], "dahlia@example.com");

    let addresses = client
        .get(app.url("/api/user/addresses"))
        .send()
        .await
        .unwrap();
    assert_eq!(addresses.status(), 200);

    let logout = client.post(app.url("/api/auth/logout")).send().await.unwrap();
    assert_eq!(logout.status(), 200);

    let after = client
        .get(app.url("/api/user/addresses"))
        .send()
        .await
        .unwrap();
    assert_eq!(after.status(), 401);
}

#[tokio::test]
async fn test_forgot_password_answers_the_same_for_unknown_email() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();
    app.register(&client, "Lily", "lily@example.com").await;

    let unknown = client
        .post(app.url("/api/auth/forgot-password"))
        .json(&json!({ "email": "nobody@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 200);
    let unknown_body = json(unknown).await;

    let known = client
        .post(app.url("/api/auth/forgot-password"))
        .json(&json!({ "email": "lily@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(known.status(), 200);
    assert_eq!(json(known).await, unknown_body);

    let sent = app.wait_for_emails(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "lily@example.com");
}

#[tokio::test]
async fn test_reset_token_is_single_use() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();
    app.register(&client, "Violet", "violet@example.com").await;

    client
        .post(app.url("/api/auth/forgot-password"))
        .json(&json!({ "email": "violet@example.com" }))
        .send()
        .await
        .unwrap();
    let sent = app.wait_for_emails(1).await;
    let token = reset_token(&sent[0]).unwrap();

    let reset = client
        .post(app.url("/api/auth/reset-password"))
        .json(&json!({ "token": token, "password": "a brand new password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(reset.status(), 200);

    let reused = client
        .post(app.url("/api/auth/reset-password"))
        .json(&json!({ "token": token, "password": "another new password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(reused.status(), 400);

    let old_password = client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "violet@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(old_password.status(), 401);

    let new_password = client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "violet@example.com", "password": "a brand new password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(new_password.status(), 200);
}

#[tokio::test]
async fn test_reset_token_persists_when_delivery_fails() {
    let app = TestApp::spawn_with_mailer(RecordingMailer::failing()).await;
    let client = TestApp::client();
    app.register(&client, "Fern", "fern@example.com").await;

    let response = client
        .post(app.url("/api/auth/forgot-password"))
        .json(&json!({ "email": "fern@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let attempted = app.wait_for_emails(1).await;
    let token = reset_token(&attempted[0]).unwrap();

    let reset = client
        .post(app.url("/api/auth/reset-password"))
        .json(&json!({ "token": token, "password": "a brand new password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(reset.status(), 200);

    let login = client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "fern@example.com", "password": "a brand new password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 200);
}
