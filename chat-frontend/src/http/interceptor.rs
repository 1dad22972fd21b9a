//! One-shot session refresh for expired access tokens.
//!
//! A request that comes back `401` is answered by exactly one `POST` to the
//! refresh endpoint on the same client instance, followed by exactly one
//! replay of the original request. Login, register and the refresh call
//! itself are never retried: a 401 there means bad credentials, not an
//! expired session.
//!
//! Each interceptor owns its own client instance, so concurrent requests
//! that all hit a 401 each refresh independently.

use super::client::{ApiClient, ApiTransport, Credentials};
use super::error::ApiError;
use super::request::{ApiRequest, ApiResponse};
use crate::config::Endpoints;
use crate::services::metrics;
use async_trait::async_trait;

pub struct RefreshInterceptor {
    client: ApiClient,
    refresh_path: String,
    excluded: Vec<String>,
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.trim_matches('/')
}

impl RefreshInterceptor {
    pub fn new(client: ApiClient, endpoints: &Endpoints) -> Self {
        let excluded = [&endpoints.login, &endpoints.register, &endpoints.refresh]
            .iter()
            .map(|p| normalize(p).to_string())
            .collect();

        Self {
            client,
            refresh_path: endpoints.refresh.clone(),
            excluded,
        }
    }

    fn is_excluded(&self, path: &str) -> bool {
        let path = normalize(path);
        self.excluded.iter().any(|e| e == path)
    }

    fn should_refresh(&self, request: &ApiRequest, err: &ApiError) -> bool {
        err.is_unauthorized() && !request.is_retried() && !self.is_excluded(request.path())
    }

    async fn refresh(&self) -> Result<(), ApiError> {
        let mut request = ApiRequest::post(self.refresh_path.clone());
        request.mark_retried();

        match self.client.execute(&request).await {
            Ok(response) => {
                self.client.absorb_refresh(&response);
                metrics::record_token_refresh("success");
                tracing::info!("Session refreshed");
                Ok(())
            }
            Err(e) => {
                metrics::record_token_refresh("failure");
                tracing::error!(error = %e, "Refresh token expired, re-login required");
                Err(ApiError::RefreshFailed(Box::new(e)))
            }
        }
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut request = request;

        match self.client.execute(&request).await {
            Err(err) if self.should_refresh(&request, &err) => {
                tracing::debug!(path = %request.path(), "Access token rejected, refreshing session");
                request.mark_retried();
                self.refresh().await?;
                self.client.execute(&request).await
            }
            outcome => outcome,
        }
    }
}

#[async_trait]
impl ApiTransport for RefreshInterceptor {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        RefreshInterceptor::send(self, request).await
    }

    fn credentials(&self) -> Option<Credentials> {
        self.client.credentials()
    }
}
