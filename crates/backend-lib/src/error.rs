// crates/backend-lib/src/error.rs

//! Central error types + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use idgate_common::messages;
use thiserror::Error;

/// Classified outcome of a failed login.
///
/// The `Display` text is the exact message shown on the login page.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("{}", messages::MISSING_USERNAME)]
    MissingUsername,

    #[error("{}", messages::MISSING_PASSWORD)]
    MissingPassword,

    /// Bad credentials, unknown user, lookup failure or protocol rejection
    #[error("{}", messages::INVALID_LOGIN)]
    InvalidLogin,

    /// Credentials were accepted but the provider session could not be confirmed
    #[error("{}", messages::PROVIDER_UNREACHABLE)]
    ProviderUnreachable,
}

impl AuthError {
    /// Short label used in log fields and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingUsername => "missing_username",
            AuthError::MissingPassword => "missing_password",
            AuthError::InvalidLogin => "invalid_login",
            AuthError::ProviderUnreachable => "provider_unreachable",
        }
    }
}

/// Errors raised by the identity provider client
#[derive(Error, Debug)]
pub enum IdpError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("login rejected: {reason}")]
    Rejected { reason: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("provider did not issue a session")]
    NoSession,
}

/// Errors raised by the user directory client
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("user not found: {0}")]
    NotFound(String),

    #[error("directory not configured")]
    NotConfigured,

    #[error("directory bind failed: {0}")]
    Bind(#[source] IdpError),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Errors raised by the session store
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("refusing to commit session without {0}")]
    Incomplete(&'static str),

    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Invalid CSRF token")]
    Csrf,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Csrf => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Session(_) => "SESS_001",
            AppError::Template(_) => "TPL_001",
            AppError::Csrf => "CSRF_001",
            AppError::Config(_) => "CFG_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Csrf => "Invalid CSRF token".to_string(),
            _ => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %self, "request failed");
        }

        // Diagnostic detail never leaves the process
        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": self.sanitized_message(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<handlebars::RenderError> for AppError {
    fn from(err: handlebars::RenderError) -> Self {
        AppError::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for AppError {
    fn from(err: handlebars::TemplateError) -> Self {
        AppError::Template(err.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
