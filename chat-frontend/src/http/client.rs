use super::cookies::CookieHeader;
use super::error::ApiError;
use super::interceptor::RefreshInterceptor;
use super::request::{ApiRequest, ApiResponse};
use crate::config::{BackendSettings, Endpoints};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::Url;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// What a signed-in visitor presents to the backend: the access token and
/// the backend's cookie header (which carries the refresh token).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub cookie: Option<String>,
}

/// Anything that can deliver an [`ApiRequest`] to the backend.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;

    /// Credentials as they stand after the last call (a refresh may have
    /// rotated them).
    fn credentials(&self) -> Option<Credentials>;
}

/// Builds one configured [`ApiClient`] per call.
pub struct HttpClientFactory {
    base_url: Url,
    custom_header: (HeaderName, HeaderValue),
    timeout: Duration,
    endpoints: Endpoints,
}

impl HttpClientFactory {
    pub fn new(settings: &BackendSettings) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(&settings.url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", settings.url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(settings.url.clone()));
        }
        // Url::join drops the last segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let name = HeaderName::from_bytes(settings.custom_header_name.as_bytes())
            .map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
        let value = HeaderValue::from_str(&settings.custom_header_value)
            .map_err(|e| ApiError::InvalidHeader(e.to_string()))?;

        Ok(Self {
            base_url,
            custom_header: (name, value),
            timeout: Duration::from_secs(settings.timeout_seconds),
            endpoints: settings.endpoints.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// A fresh client instance. When `cookie` is given it is forwarded
    /// verbatim as the `Cookie` header; there is no browser cookie jar on
    /// the server side to supply it.
    pub fn create(&self, cookie: Option<&str>) -> Result<ApiClient, ApiError> {
        let jar = Arc::new(Jar::default());

        let mut headers = HeaderMap::new();
        headers.insert(self.custom_header.0.clone(), self.custom_header.1.clone());

        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .map_err(ApiError::ClientBuild)?;

        let cookie = cookie
            .map(CookieHeader::parse)
            .filter(|header| !header.is_empty());

        Ok(ApiClient {
            http,
            base_url: self.base_url.clone(),
            jar,
            cookie: RwLock::new(cookie),
            bearer: RwLock::new(None),
        })
    }

    pub fn for_credentials(&self, credentials: &Credentials) -> Result<ApiClient, ApiError> {
        Ok(self
            .create(credentials.cookie.as_deref())?
            .with_bearer(&credentials.access_token))
    }

    /// Wrap a client so a 401 triggers one refresh and one replay.
    pub fn with_refresh(&self, client: ApiClient) -> RefreshInterceptor {
        RefreshInterceptor::new(client, &self.endpoints)
    }

    /// Shorthand for `with_refresh(for_credentials(..))`.
    pub fn authenticated(&self, credentials: &Credentials) -> Result<RefreshInterceptor, ApiError> {
        Ok(self.with_refresh(self.for_credentials(credentials)?))
    }
}

/// One configured connection to the backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    jar: Arc<Jar>,
    cookie: RwLock<Option<CookieHeader>>,
    bearer: RwLock<Option<Secret<String>>>,
}

impl ApiClient {
    pub fn with_bearer(self, token: &str) -> Self {
        self.set_bearer(token);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn set_bearer(&self, token: &str) {
        let mut bearer = self.bearer.write().unwrap_or_else(|e| e.into_inner());
        *bearer = Some(Secret::new(token.to_string()));
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.bearer
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.expose_secret().clone())
    }

    fn literal_cookie(&self) -> Option<String> {
        self.cookie
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|c| c.to_string())
    }

    /// The cookie header this instance would send next: the forwarded
    /// literal (with any rotations applied), otherwise whatever the jar
    /// collected from the backend.
    pub fn cookie_header(&self) -> Option<String> {
        self.literal_cookie().or_else(|| {
            self.jar
                .cookies(&self.base_url)
                .and_then(|value| value.to_str().ok().map(String::from))
        })
    }

    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Send once. Non-2xx statuses come back as `ApiError::Status`.
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let path = request.path().to_string();
        let url = self.url_for(&path)?;

        let mut builder = self.http.request(request.method().clone(), url);
        if let Some(cookie) = self.literal_cookie() {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(token) = self.bearer_token() {
            builder = builder.bearer_auth(token);
        }

        let transport = |source| ApiError::Transport {
            path: path.clone(),
            source,
        };

        let built = request
            .body()
            .apply(builder)
            .and_then(|b| b.build())
            .map_err(transport)?;

        let response = self.http.traced_execute(built).await.map_err(|e| {
            tracing::error!(path = %path, error = %e, "Backend request failed");
            transport(e)
        })?;

        let response = ApiResponse::read(&path, response).await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            tracing::debug!(path = %path, status = %response.status(), "Backend returned error status");
            Err(response.into_status_error())
        }
    }

    /// Pick up the credentials a refresh response hands out: rotated cookies
    /// and, when the body carries one, a new access token.
    pub(crate) fn absorb_refresh(&self, response: &ApiResponse) {
        {
            let mut cookie = self.cookie.write().unwrap_or_else(|e| e.into_inner());
            if let Some(cookie) = cookie.as_mut() {
                for set_cookie in response.set_cookies() {
                    cookie.apply_set_cookie(set_cookie);
                }
            }
        }

        if let Ok(body) = response.json::<serde_json::Value>() {
            if let Some(token) = body.get("access_token").and_then(|t| t.as_str()) {
                self.set_bearer(token);
            }
        }
    }
}

#[async_trait]
impl ApiTransport for ApiClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.execute(&request).await
    }

    fn credentials(&self) -> Option<Credentials> {
        self.bearer_token().map(|access_token| Credentials {
            access_token,
            cookie: self.cookie_header(),
        })
    }
}
