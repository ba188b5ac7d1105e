use reqwest::header::HeaderMap;
use thiserror::Error;

use crate::status::ErrorKind;

/// Error response returned by the FCM / IID endpoints
///
/// Carries everything the caller needs to run its own retry policy.
#[derive(Debug, Clone)]
pub struct HttpErrorResponse {
    pub kind: ErrorKind,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

/// FCM Client Error Types
#[derive(Error, Debug)]
pub enum FcmError {
    #[error("A network error occurred: {0}")]
    Network(String),

    #[error("Received an error response {} {}: {}", .0.status, .0.kind, .0.body)]
    Client(HttpErrorResponse),

    #[error("Received an error response {} {}: {}", .0.status, .0.kind, .0.body)]
    Server(HttpErrorResponse),

    #[error("Failed to get access token: {0}")]
    Authentication(String),

    #[error("Failed to decode batch response: {0}")]
    BatchDecode(String),

    #[error("Failed to parse FCM response: {0}")]
    ResponseParse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("FCM configuration error: {0}")]
    Config(String),
}

impl FcmError {
    /// Build the classified error for a mapped status code.
    pub(crate) fn from_response(kind: ErrorKind, headers: HeaderMap, body: String) -> Self {
        let response = HttpErrorResponse {
            kind,
            status: kind.status(),
            headers,
            body,
        };

        if kind.is_server_error() {
            FcmError::Server(response)
        } else {
            FcmError::Client(response)
        }
    }

    /// Error response details, for `Client` and `Server` errors
    pub fn response(&self) -> Option<&HttpErrorResponse> {
        match self {
            FcmError::Client(response) | FcmError::Server(response) => Some(response),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.response().map(|r| r.kind)
    }

    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_buckets_by_status() {
        let err = FcmError::from_response(ErrorKind::NotFound, HeaderMap::new(), "{}".into());
        assert!(matches!(err, FcmError::Client(_)));
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));

        let err = FcmError::from_response(
            ErrorKind::ServiceUnavailable,
            HeaderMap::new(),
            String::new(),
        );
        assert!(matches!(err, FcmError::Server(_)));
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn test_http_error_message() {
        let err = FcmError::from_response(
            ErrorKind::TooManyRequests,
            HeaderMap::new(),
            "quota exceeded".into(),
        );
        assert_eq!(
            err.to_string(),
            "Received an error response 429 TooManyRequests: quota exceeded"
        );
    }

    #[test]
    fn test_non_http_errors_have_no_response() {
        let err = FcmError::Network("connection reset".into());
        assert!(err.response().is_none());
        assert!(err.status().is_none());
        assert!(err.to_string().contains("connection reset"));
    }
}
