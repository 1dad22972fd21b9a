use super::error::ApiError;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Whether a request has already been replayed after a session refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryState {
    #[default]
    Initial,
    Retried,
}

/// A backend request that can be sent more than once.
///
/// The body is kept as a description and rebuilt for every send, so the
/// interceptor can replay it verbatim.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: RequestBody,
    retry: RetryState,
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Vec<u8>),
    Multipart(MultipartBody),
}

#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    fields: Vec<MultipartField>,
}

#[derive(Debug, Clone)]
enum MultipartField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            retry: RetryState::Initial,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let bytes = serde_json::to_vec(body).map_err(|source| ApiError::Encode {
            path: self.path.clone(),
            source,
        })?;
        self.body = RequestBody::Json(bytes);
        Ok(self)
    }

    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.body = RequestBody::Multipart(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn is_retried(&self) -> bool {
        self.retry == RetryState::Retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retry = RetryState::Retried;
    }
}

impl RequestBody {
    pub(crate) fn apply(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, reqwest::Error> {
        Ok(match self {
            RequestBody::Empty => builder,
            RequestBody::Json(bytes) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes.clone()),
            RequestBody::Multipart(form) => builder.multipart(form.to_form()?),
        })
    }
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(MultipartField::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.fields.push(MultipartField::File {
            name: name.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        });
        self
    }

    #[cfg(test)]
    fn field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(|field| match field {
                MultipartField::Text { name, .. } | MultipartField::File { name, .. } => {
                    name.as_str()
                }
            })
            .collect()
    }

    fn to_form(&self) -> Result<Form, reqwest::Error> {
        let mut form = Form::new();
        for field in &self.fields {
            form = match field {
                MultipartField::Text { name, value } => form.text(name.clone(), value.clone()),
                MultipartField::File {
                    name,
                    file_name,
                    content_type,
                    bytes,
                } => form.part(
                    name.clone(),
                    Part::bytes(bytes.clone())
                        .file_name(file_name.clone())
                        .mime_str(content_type)?,
                ),
            };
        }
        Ok(form)
    }
}

/// A fully read backend response with a 2xx status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    path: String,
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub(crate) async fn read(path: &str, response: reqwest::Response) -> Result<Self, ApiError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport {
                path: path.to_string(),
                source,
            })?
            .to_vec();

        Ok(Self {
            path: path.to_string(),
            status,
            headers,
            body,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|source| ApiError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    /// All `Set-Cookie` values the backend sent.
    pub fn set_cookies(&self) -> impl Iterator<Item = &str> {
        self.headers
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
    }

    /// Turn a non-2xx response into `ApiError::Status`, pulling FastAPI's
    /// `detail` (or `message`) out of the body when present.
    pub(crate) fn into_status_error(self) -> ApiError {
        let message = serde_json::from_slice::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|value| {
                ["detail", "message", "error"]
                    .iter()
                    .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(String::from))
            })
            .unwrap_or_else(|| {
                let text = String::from_utf8_lossy(&self.body);
                text.chars().take(200).collect()
            });

        ApiError::Status {
            path: self.path,
            status: self.status,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: StatusCode, body: &str) -> ApiResponse {
        ApiResponse {
            path: "/auth/login".to_string(),
            status,
            headers: HeaderMap::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn new_requests_start_initial() {
        let request = ApiRequest::get("/user/me");
        assert_eq!(request.retry, RetryState::Initial);
        assert!(!request.is_retried());
    }

    #[test]
    fn cloned_request_keeps_retry_marker() {
        let mut request = ApiRequest::get("/user/me");
        request.mark_retried();
        assert!(request.clone().is_retried());
    }

    #[test]
    fn status_error_uses_fastapi_detail() {
        let err = response(
            StatusCode::UNAUTHORIZED,
            r#"{"detail":"Email or Passowrd is not matching"}"#,
        )
        .into_status_error();
        match err {
            ApiError::Status {
                status, message, ..
            } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "Email or Passowrd is not matching");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn status_error_falls_back_to_text() {
        let err = response(StatusCode::BAD_GATEWAY, "upstream down").into_status_error();
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn multipart_keeps_field_order() {
        let body = MultipartBody::new()
            .text("message", "is this venomous?")
            .file("file", "snake.jpg", "image/jpeg", vec![1, 2, 3]);
        assert_eq!(body.field_names(), vec!["message", "file"]);
        assert!(body.to_form().is_ok());
    }
}
