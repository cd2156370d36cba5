use thiserror::Error;

use crate::{domain::error::DomainError, infra::error::InfraError};

/// Why a page of the audit log could not be obtained.
///
/// Failures are plain values: they are cached by nobody, shared between
/// coalesced callers, and rendered as a notification by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("network failure requesting `{url}`: {message}")]
    Network { url: String, message: String },
    #[error("request to `{url}` failed with status {status}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },
    #[error("malformed response from `{url}`: {message}")]
    MalformedResponse { url: String, message: String },
}

impl FetchFailure {
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn http(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    pub fn malformed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable kind, used as a log and metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchFailure::Network { .. } => "network",
            FetchFailure::Http { .. } => "http",
            FetchFailure::MalformedResponse { .. } => "malformed_response",
        }
    }

    /// Human-readable text for an error notification.
    pub fn notification(&self) -> String {
        match self {
            FetchFailure::Network { message, .. } => {
                format!("The server could not be reached ({message}). Please try again.")
            }
            FetchFailure::Http { status: 401, .. } => {
                "Not authenticated or invalid credentials.".to_string()
            }
            FetchFailure::Http { status: 403, .. } => {
                "You are not allowed to read the audit log.".to_string()
            }
            FetchFailure::Http { status, .. } if *status >= 500 => {
                format!("The server failed to answer (status {status}). Please try again later.")
            }
            FetchFailure::Http { status, .. } => {
                format!("The request was rejected (status {status}).")
            }
            FetchFailure::MalformedResponse { message, .. } => {
                format!("The server sent an unexpected response: {message}")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Fetch(#[from] FetchFailure),
    #[error("the audit log is not available for the current user")]
    Unavailable,
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
