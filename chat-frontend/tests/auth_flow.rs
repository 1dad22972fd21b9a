mod common;

use axum::http::StatusCode;
use common::{assert_redirects_to, body_text, hx_redirect, TestApp};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn login_then_account_page_uses_issued_token() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(header("x-custom-header", "foobar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t1"})))
        .expect(1)
        .mount(&app.backend)
        .await;
    // once for login, once for the account page
    Mock::given(method("GET"))
        .and(path("/user/me"))
        .and(header("authorization", "Bearer t1"))
        .and(header("x-custom-header", "foobar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "email": "a@b.com",
            "created_at": "2024-05-01T10:00:00Z"
        })))
        .expect(2)
        .mount(&app.backend)
        .await;

    let response = app.login().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(hx_redirect(&response).as_deref(), Some("/"));

    let response = app.get("/settings/account").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("a@b.com"));
    assert!(body.contains("May 1, 2024"));
}

#[tokio::test]
async fn wrong_password_shows_banner_without_refresh() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Email or Passowrd is not matching"})),
        )
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.backend)
        .await;

    let response = app.login().await;

    assert!(hx_redirect(&response).is_none());
    assert!(body_text(response).await.contains("Invalid email or password."));
}

#[tokio::test]
async fn failed_profile_fetch_leaves_visitor_signed_out() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t1"})))
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/me"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.backend)
        .await;

    let response = app.login().await;
    assert!(body_text(response).await.contains("Invalid email or password."));

    let response = app.get("/settings/account").await;
    assert_redirects_to(&response, "/login");
}

#[tokio::test]
async fn invalid_login_form_never_reaches_backend() {
    let mut app = TestApp::spawn().await;

    let response = app
        .post_form("/login", "email=not-an-email&password=123")
        .await;

    let body = body_text(response).await;
    assert!(body.contains("Invalid email address"));
    assert!(body.contains("Password must be at least 6 characters"));
    assert!(app.backend.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn register_rejects_mismatched_passwords() {
    let mut app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/register",
            "email=a%40b.com&username=alice&password=secret1&confirm_password=secret2",
        )
        .await;

    assert!(body_text(response).await.contains("Passwords don't match"));
    assert!(app.backend.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn register_success_redirects_to_login() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "User registered successfully"})))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app
        .post_form(
            "/register",
            "email=a%40b.com&username=alice&password=secret1&confirm_password=secret1",
        )
        .await;

    assert_eq!(hx_redirect(&response).as_deref(), Some("/login"));
}

#[tokio::test]
async fn register_failure_shows_banner() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Email already registered"})))
        .mount(&app.backend)
        .await;

    let response = app
        .post_form(
            "/register",
            "email=a%40b.com&username=alice&password=secret1&confirm_password=secret1",
        )
        .await;

    assert!(body_text(response)
        .await
        .contains("Registration failed. User might already exist."));
}

#[tokio::test]
async fn settings_require_login() {
    let mut app = TestApp::spawn().await;

    assert_redirects_to(&app.get("/settings/account").await, "/login");
    assert_redirects_to(&app.get("/settings/change-password").await, "/login");
}

#[tokio::test]
async fn expired_refresh_sends_visitor_to_login() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t1"})))
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"email": "a@b.com"})))
        .up_to_n_times(1)
        .mount(&app.backend)
        .await;
    assert!(hx_redirect(&app.login().await).is_some());

    // the token has since expired and so has the refresh cookie
    Mock::given(method("GET"))
        .and(path("/user/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&app.backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&app.backend)
        .await;

    assert_redirects_to(&app.get("/settings/account").await, "/login");
    assert_redirects_to(&app.get("/settings/account").await, "/login");
}

#[tokio::test]
async fn change_password_goes_through_backend() {
    let mut app = TestApp::spawn().await;
    app.mount_login_backend("t1").await;
    Mock::given(method("POST"))
        .and(path("/user/change-password"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.backend)
        .await;
    app.login().await;

    let response = app
        .post_form(
            "/settings/change-password",
            "current_password=secret1&new_password=secret2&confirm_password=secret2",
        )
        .await;

    assert!(body_text(response).await.contains("Password updated successfully."));
}

#[tokio::test]
async fn logout_clears_session_even_if_backend_fails() {
    let mut app = TestApp::spawn().await;
    app.mount_login_backend("t1").await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.backend)
        .await;
    app.login().await;

    let response = app.post_form("/logout", "").await;
    assert_eq!(hx_redirect(&response).as_deref(), Some("/"));

    assert_redirects_to(&app.get("/settings/account").await, "/login");
}
