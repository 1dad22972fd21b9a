//! HTTP plumbing towards the chat backend.
pub mod client;
pub mod cookies;
pub mod error;
pub mod interceptor;
pub mod request;

pub use client::{ApiClient, ApiTransport, Credentials, HttpClientFactory};
pub use cookies::CookieHeader;
pub use error::ApiError;
pub use interceptor::RefreshInterceptor;
pub use request::{ApiRequest, ApiResponse, MultipartBody, RequestBody, RetryState};
