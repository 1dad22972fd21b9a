use reqwest::StatusCode;
use service_core::error::AppError;
use thiserror::Error;

/// Failure of a call to the chat backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("failed to encode request body for {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned {status}: {message}")]
    Status {
        path: String,
        status: StatusCode,
        message: String,
    },

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The refresh endpoint rejected the session; the user must log in again.
    #[error("session refresh failed: {0}")]
    RefreshFailed(#[source] Box<ApiError>),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// True when no amount of retrying helps and the visitor has to log in.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::RefreshFailed(_)) || self.is_unauthorized()
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            e if e.requires_login() => AppError::Unauthorized(anyhow::Error::new(e)),
            ApiError::Status { status, .. } if status == StatusCode::NOT_FOUND => {
                AppError::NotFound(anyhow::anyhow!("resource not found"))
            }
            e @ ApiError::Status { .. } | e @ ApiError::Decode { .. } => {
                AppError::BadGateway(e.to_string())
            }
            ApiError::Transport { .. } => AppError::ServiceUnavailable,
            e => AppError::InternalError(anyhow::Error::new(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode as AxumStatus;

    fn status_error(status: StatusCode) -> ApiError {
        ApiError::Status {
            path: "/user/me".to_string(),
            status,
            message: "nope".to_string(),
        }
    }

    #[test]
    fn refresh_failure_requires_login() {
        let err = ApiError::RefreshFailed(Box::new(status_error(StatusCode::UNAUTHORIZED)));
        assert!(err.requires_login());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn maps_into_app_error() {
        let app: AppError = status_error(StatusCode::UNAUTHORIZED).into();
        assert_eq!(app.status_code(), AxumStatus::UNAUTHORIZED);

        let app: AppError = status_error(StatusCode::INTERNAL_SERVER_ERROR).into();
        assert_eq!(app.status_code(), AxumStatus::BAD_GATEWAY);

        let app: AppError = status_error(StatusCode::NOT_FOUND).into();
        assert_eq!(app.status_code(), AxumStatus::NOT_FOUND);
    }
}
