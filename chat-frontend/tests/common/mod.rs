#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use chat_frontend::config::{BackendSettings, ServerSettings};
use chat_frontend::startup::build_router;
use chat_frontend::AppState;
use http_body_util::BodyExt;
use serde_json::json;
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BOUNDARY: &str = "chat-frontend-test-boundary";

/// The router wired against a mock backend, with a browser-like session
/// cookie carried between requests.
pub struct TestApp {
    pub backend: MockServer,
    router: Router,
    session_cookie: Option<String>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let backend = MockServer::start().await;
        let state = AppState::new(&BackendSettings::with_url(backend.uri()))
            .expect("Failed to build app state");
        let server = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            session_ttl_hours: 1,
            secure_cookies: false,
            max_upload_bytes: 1024 * 1024,
            static_dir: "static".to_string(),
        };

        Self {
            backend,
            router: build_router(state, &server),
            session_cookie: None,
        }
    }

    pub async fn send(&mut self, mut request: Request<Body>) -> Response<Body> {
        if let Some(cookie) = &self.session_cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            let pair = set_cookie.split(';').next().unwrap_or_default().to_string();
            self.session_cookie = Some(pair);
        }
        response
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    /// An HTMX form post.
    pub async fn post_form(&mut self, uri: &str, body: &str) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header("hx-request", "true")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// An HTMX multipart post with text fields and an optional file.
    pub async fn post_multipart(
        &mut self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
    ) -> Response<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content_type, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        self.send(
            Request::post(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .header("hx-request", "true")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// Mount a backend that accepts `a@b.com` and serves its profile.
    pub async fn mount_login_backend(&self, token: &str) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("set-cookie", "refresh_token=r1; Path=/; HttpOnly")
                    .set_body_json(json!({"access_token": token, "token_type": "bearer"})),
            )
            .mount(&self.backend)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 42,
                "email": "a@b.com",
                "username": "alice",
                "is_active": true,
                "created_at": "2024-05-01T10:00:00Z"
            })))
            .mount(&self.backend)
            .await;
    }

    pub async fn login(&mut self) -> Response<Body> {
        self.post_form("/login", "email=a%40b.com&password=secret1")
            .await
    }
}

/// Response body with HTML entities decoded, for substring assertions.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes)
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&#x2f;", "/")
        .replace("&amp;", "&")
}

pub fn hx_redirect(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get("hx-redirect")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

pub fn assert_redirects_to(response: &Response<Body>, location: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some(location)
    );
}
