use crate::http::{ApiError, ApiRequest, ApiTransport, Credentials, HttpClientFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What a successful credential exchange hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub access_token: String,
    /// Session cookies the backend set during login (the refresh token
    /// lives here).
    pub cookie: Option<String>,
}

impl LoginGrant {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            access_token: self.access_token.clone(),
            cookie: self.cookie.clone(),
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize, Clone)]
pub struct RegisterPayload {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Login, register and logout against the backend. None of these go
/// through the refresh interceptor.
#[derive(Clone)]
pub struct AuthService {
    factory: Arc<HttpClientFactory>,
}

impl AuthService {
    pub fn new(factory: Arc<HttpClientFactory>) -> Self {
        Self { factory }
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, ApiError> {
        let client = self.factory.create(None)?;
        let request = ApiRequest::post(self.factory.endpoints().login.clone())
            .json(&LoginRequest { email, password })?;

        let response = client.send(request).await?;
        let token: TokenResponse = response.json()?;

        Ok(LoginGrant {
            access_token: token.access_token,
            cookie: client.cookie_header(),
        })
    }

    #[tracing::instrument(skip(self, payload), fields(email = %payload.email))]
    pub async fn register(&self, payload: &RegisterPayload) -> Result<(), ApiError> {
        let client = self.factory.create(None)?;
        let request = ApiRequest::post(self.factory.endpoints().register.clone()).json(payload)?;
        client.send(request).await?;
        Ok(())
    }

    pub async fn logout(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let client = self.factory.for_credentials(credentials)?;
        client
            .send(ApiRequest::post(self.factory.endpoints().logout.clone()))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendSettings;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> AuthService {
        let factory = HttpClientFactory::new(&BackendSettings::with_url(server.uri())).unwrap();
        AuthService::new(Arc::new(factory))
    }

    #[tokio::test]
    async fn login_captures_token_and_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "a@b.com", "password": "secret1"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("set-cookie", "refresh_token=r1; Path=/; HttpOnly")
                    .set_body_json(json!({"access_token": "t1", "token_type": "bearer"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let grant = service(&server).login("a@b.com", "secret1").await.unwrap();
        assert_eq!(grant.access_token, "t1");
        assert_eq!(grant.cookie.as_deref(), Some("refresh_token=r1"));
    }

    #[tokio::test]
    async fn login_rejection_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"detail": "Email or Passowrd is not matching"})),
            )
            .mount(&server)
            .await;

        let err = service(&server).login("a@b.com", "wrong01").await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn register_posts_all_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .and(body_json(json!({
                "email": "a@b.com",
                "username": "alice",
                "password": "secret1",
                "confirm_password": "secret1"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "User registered successfully"})))
            .expect(1)
            .mount(&server)
            .await;

        let payload = RegisterPayload {
            email: "a@b.com".to_string(),
            username: "alice".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        };
        service(&server).register(&payload).await.unwrap();
    }

    #[tokio::test]
    async fn logout_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .and(header("authorization", "Bearer t1"))
            .and(header("cookie", "refresh_token=r1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let credentials = Credentials {
            access_token: "t1".to_string(),
            cookie: Some("refresh_token=r1".to_string()),
        };
        service(&server).logout(&credentials).await.unwrap();
    }
}
