//! Domain error types for server operations.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

/// Errors that stop the server from starting.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration could not be loaded or is inconsistent.
    Configuration { details: String },
    /// A configured provider could not be constructed.
    Provider { details: String },
    /// Page templates failed to compile.
    Templates { details: String },
    /// The listen address could not be bound.
    Bind { addr: String, details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => write!(f, "invalid configuration: {details}"),
            Self::Provider { details } => write!(f, "provider setup failed: {details}"),
            Self::Templates { details } => write!(f, "template error: {details}"),
            Self::Bind { addr, details } => write!(f, "failed to bind to '{addr}': {details}"),
        }
    }
}

impl std::error::Error for StartupError {}

/// A page failed to render.
#[derive(Debug)]
pub struct PageError {
    pub page: &'static str,
    pub details: String,
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to render '{}': {}", self.page, self.details)
    }
}

impl std::error::Error for PageError {}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Page rendering failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_error_display() {
        let err = StartupError::Bind {
            addr: "0.0.0.0:8080".to_string(),
            details: "address in use".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to bind to '0.0.0.0:8080': address in use"
        );
    }

    #[test]
    fn page_error_is_internal() {
        let response = PageError {
            page: "profile",
            details: "boom".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
