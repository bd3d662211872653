//! Application error types
//!
//! Every failure inside the payment core is converted into an [`AppError`] at the
//! component boundary. The kind decides the HTTP status; the detailed message is for
//! logs only and never reaches the caller for server-side failures.

use axum::http::StatusCode;
use std::fmt;
use thiserror::Error;

/// Result type for payment operations
pub type AppResult<T> = Result<T, AppError>;

/// Caller supplied something unusable
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing {field}")]
    MissingField { field: String },

    #[error("Invalid {field}: only letters, digits, '-' and '_' are allowed")]
    InvalidIdentifier { field: String },

    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("Invalid request body: {message}")]
    MalformedBody { message: String },

    #[error("Invalid query string: {message}")]
    MalformedQuery { message: String },
}

/// The gateway could not be reached or answered with something unreadable
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExternalError {
    #[error("{provider} request failed: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider} request timed out after {seconds} seconds")]
    Timeout { provider: String, seconds: u64 },

    #[error("{provider} returned an invalid response: {message}")]
    InvalidResponse { provider: String, message: String },
}

/// An inbound encoded payload could not be decoded
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is not valid base64: {message}")]
    Base64 { message: String },

    #[error("payload is not valid UTF-8: {message}")]
    Utf8 { message: String },

    #[error("payload is not valid JSON: {message}")]
    Json { message: String },

    #[error("payload is not valid form data: {message}")]
    Form { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorKind {
    Validation(ValidationError),
    External(ExternalError),
    Decode(DecodeError),
    Internal { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub context: Option<String>,
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::MissingField {
            field: field.into(),
        }))
    }

    pub fn invalid_identifier(field: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::InvalidIdentifier {
            field: field.into(),
        }))
    }

    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::InvalidAmount {
            reason: reason.into(),
        }))
    }

    pub fn malformed_body(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::MalformedBody {
            message: message.into(),
        }))
    }

    pub fn malformed_query(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::MalformedQuery {
            message: message.into(),
        }))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Internal {
            message: message.into(),
        })
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.kind, AppErrorKind::Validation(_))
    }

    pub fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Message safe to return to the caller
    ///
    /// Client errors describe what was wrong with the input. Everything else collapses
    /// to a generic message so gateway and decoder internals stay in the logs.
    pub fn public_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Validation(e) => e.to_string(),
            _ => "Internal Server Error".to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match &self.kind {
            AppErrorKind::Validation(e) => e.to_string(),
            AppErrorKind::External(e) => e.to_string(),
            AppErrorKind::Decode(e) => e.to_string(),
            AppErrorKind::Internal { message } => format!("Internal error: {}", message),
        };

        if let Some(context) = &self.context {
            write!(f, "{} ({})", message, context)
        } else {
            write!(f, "{}", message)
        }
    }
}

impl std::error::Error for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::new(AppErrorKind::Validation(err))
    }
}

impl From<ExternalError> for AppError {
    fn from(err: ExternalError) -> Self {
        Self::new(AppErrorKind::External(err))
    }
}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        Self::new(AppErrorKind::Decode(err))
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(err: base64::DecodeError) -> Self {
        DecodeError::Base64 {
            message: err.to_string(),
        }
        .into()
    }
}

impl From<std::string::FromUtf8Error> for AppError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        DecodeError::Utf8 {
            message: err.to_string(),
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_client_errors() {
        let err = AppError::missing_field("transactionId");
        assert!(err.is_client_error());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Missing transactionId");
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err: AppError = ExternalError::Transport {
            provider: "PhonePe".to_string(),
            message: "connection refused".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal Server Error");
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_context_is_appended() {
        let err = AppError::internal("boom").with_context("initiate");
        assert_eq!(err.to_string(), "Internal error: boom (initiate)");
    }

    #[test]
    fn test_base64_error_maps_to_decode() {
        use base64::Engine;
        let err: AppError = base64::engine::general_purpose::STANDARD
            .decode("%%%")
            .unwrap_err()
            .into();
        assert!(matches!(err.kind, AppErrorKind::Decode(DecodeError::Base64 { .. })));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
