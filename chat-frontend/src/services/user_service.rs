use super::{send_authenticated, CallResult, WithCredentials};
use crate::http::{ApiRequest, Credentials, HttpClientFactory};
use crate::models::User;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct ChangePasswordRequest<'a> {
    current_password: &'a str,
    new_password: &'a str,
}

/// Calls made on behalf of a signed-in user. Every call goes through the
/// refresh interceptor.
#[derive(Clone)]
pub struct UserService {
    factory: Arc<HttpClientFactory>,
}

impl UserService {
    pub fn new(factory: Arc<HttpClientFactory>) -> Self {
        Self { factory }
    }

    pub async fn get_user_current(&self, credentials: &Credentials) -> CallResult<User> {
        let request = ApiRequest::get(self.factory.endpoints().current_user.clone());
        send_authenticated(&self.factory, credentials, request)
            .await
            .and_then(|response| response.json())
    }

    pub async fn change_password(
        &self,
        credentials: &Credentials,
        current_password: &str,
        new_password: &str,
    ) -> CallResult<()> {
        let body = ChangePasswordRequest {
            current_password,
            new_password,
        };
        let request = match ApiRequest::post(self.factory.endpoints().change_password.clone())
            .json(&body)
        {
            Ok(request) => request,
            Err(e) => return WithCredentials::failed(e),
        };

        send_authenticated(&self.factory, credentials, request)
            .await
            .and_then(|_| {
                tracing::info!("Password changed");
                Ok(())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendSettings;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> UserService {
        let factory = HttpClientFactory::new(&BackendSettings::with_url(server.uri())).unwrap();
        UserService::new(Arc::new(factory))
    }

    fn credentials() -> Credentials {
        Credentials {
            access_token: "t1".to_string(),
            cookie: Some("refresh_token=r1".to_string()),
        }
    }

    #[tokio::test]
    async fn fetches_current_user_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/me"))
            .and(header("authorization", "Bearer t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7, "email": "a@b.com", "username": "alice", "is_active": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = service(&server).get_user_current(&credentials()).await;
        assert_eq!(result.value.unwrap().email, "a@b.com");
        assert_eq!(result.credentials, Some(credentials()));
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_rotated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/me"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t2"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/me"))
            .and(header("authorization", "Bearer t2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"email": "a@b.com"})))
            .expect(1)
            .mount(&server)
            .await;

        let result = service(&server).get_user_current(&credentials()).await;
        assert!(result.value.is_ok());
        let rotated = result.credentials.unwrap();
        assert_eq!(rotated.access_token, "t2");
    }

    #[tokio::test]
    async fn change_password_posts_both_passwords() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/change-password"))
            .and(body_json(json!({"current_password": "old123", "new_password": "new123"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        service(&server)
            .change_password(&credentials(), "old123", "new123")
            .await
            .value
            .unwrap();
    }

    #[tokio::test]
    async fn rotation_is_reported_when_replay_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/me"))
            .and(header("authorization", "Bearer t1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("set-cookie", "refresh_token=r2; Path=/; HttpOnly")
                    .set_body_json(json!({"access_token": "t2"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/me"))
            .and(header("authorization", "Bearer t2"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let result = service(&server).get_user_current(&credentials()).await;

        let err = result.value.unwrap_err();
        assert_eq!(err.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(
            result.credentials,
            Some(Credentials {
                access_token: "t2".to_string(),
                cookie: Some("refresh_token=r2".to_string()),
            })
        );
    }
}
