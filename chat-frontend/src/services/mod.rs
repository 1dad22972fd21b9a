pub mod auth_service;
pub mod chat_service;
pub mod metrics;
pub mod user_service;

use crate::http::{ApiError, ApiRequest, ApiResponse, ApiTransport, Credentials, HttpClientFactory};

pub use auth_service::{AuthService, LoginGrant, RegisterPayload};
pub use chat_service::{ChatService, ConversationContext, SendOutcome};
pub use user_service::UserService;

/// A backend result together with the credentials the call ended with. A
/// refresh during the call rotates them, and the caller has to persist the
/// new pair.
#[derive(Debug, Clone)]
pub struct WithCredentials<T> {
    pub value: T,
    pub credentials: Option<Credentials>,
}

/// Outcome of an authenticated call. The credentials are reported on
/// failure too: a refresh can succeed and the replay still fail.
pub type CallResult<T> = WithCredentials<Result<T, ApiError>>;

impl<T> WithCredentials<T> {
    pub fn new(value: T, credentials: Option<Credentials>) -> Self {
        Self { value, credentials }
    }

    pub fn into_parts(self) -> (T, Option<Credentials>) {
        (self.value, self.credentials)
    }
}

impl<T> WithCredentials<Result<T, ApiError>> {
    pub fn failed(error: ApiError) -> Self {
        Self::new(Err(error), None)
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U, ApiError>) -> CallResult<U> {
        WithCredentials::new(self.value.and_then(f), self.credentials)
    }
}

/// Send through a fresh client wrapped in the refresh interceptor.
pub(crate) async fn send_authenticated(
    factory: &HttpClientFactory,
    credentials: &Credentials,
    request: ApiRequest,
) -> CallResult<ApiResponse> {
    let transport = match factory.authenticated(credentials) {
        Ok(transport) => transport,
        Err(e) => return WithCredentials::failed(e),
    };
    let result = transport.send(request).await;
    WithCredentials::new(result, transport.credentials())
}
