//! Error types for backend API calls

use thiserror::Error;

/// Failure of a backend call.
///
/// `Transport`, `Status`, `Decode` and `InvalidUrl` are transport-level
/// failures. `Application` is raised only when a caller asks for the payload
/// of an envelope that reported `is_successful: false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("app store error: {0}")]
    Store(String),

    #[error("{}", .message.as_deref().unwrap_or("request was not successful"))]
    Application {
        code: Option<String>,
        message: Option<String>,
    },
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_error_uses_backend_message() {
        let err = ApiError::Application {
            code: Some("E_NOT_READY".to_string()),
            message: Some("cluster discovery pending".to_string()),
        };
        assert_eq!(err.to_string(), "cluster discovery pending");

        let err = ApiError::Application {
            code: None,
            message: None,
        };
        assert_eq!(err.to_string(), "request was not successful");
    }

    #[test]
    fn test_status_error_display() {
        let err = ApiError::Status {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "API error (503): unavailable");
    }
}
