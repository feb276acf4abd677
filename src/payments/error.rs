use crate::payments::types::Provider;
use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

/// Coarse classification of a [`PaymentError`], for callers that only need to
/// decide between aborting and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credential/token exchange failed
    Auth,
    /// Provider rejected the payment call, or the call never completed
    Submission,
    /// Missing or invalid configuration
    Config,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{provider} token request failed: {message}")]
    Auth {
        provider: Provider,
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },

    #[error("{provider} payment submission failed: {message}")]
    Submission {
        provider: Provider,
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PaymentError {
    pub fn auth_rejected(provider: Provider, status: u16, body: impl Into<String>) -> Self {
        Self::Auth {
            provider,
            status: Some(status),
            message: format!("HTTP {}", status),
            body: Some(body.into()),
        }
    }

    pub fn auth_transport(provider: Provider, err: &reqwest::Error) -> Self {
        Self::Auth {
            provider,
            status: err.status().map(|s| s.as_u16()),
            message: format!("Request error: {}", err),
            body: None,
        }
    }

    /// The token endpoint answered but its body could not be read.
    pub fn auth_body_read(provider: Provider, status: u16, err: &reqwest::Error) -> Self {
        Self::Auth {
            provider,
            status: Some(status),
            message: format!("HTTP {}, failed to read response body: {}", status, err),
            body: None,
        }
    }

    pub fn malformed_token(provider: Provider, body: impl Into<String>) -> Self {
        Self::Auth {
            provider,
            status: None,
            message: "response did not contain an access_token".to_string(),
            body: Some(body.into()),
        }
    }

    pub fn submission_rejected(provider: Provider, status: u16, body: impl Into<String>) -> Self {
        Self::Submission {
            provider,
            status: Some(status),
            message: format!("HTTP {}", status),
            body: Some(body.into()),
        }
    }

    pub fn submission_transport(provider: Provider, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else {
            format!("Request error: {}", err)
        };

        Self::Submission {
            provider,
            status: err.status().map(|s| s.as_u16()),
            message,
            body: None,
        }
    }

    /// The transaction endpoint answered but its body could not be read, so
    /// the outcome is unknown.
    pub fn submission_body_read(provider: Provider, status: u16, err: &reqwest::Error) -> Self {
        Self::Submission {
            provider,
            status: Some(status),
            message: format!("HTTP {}, failed to read response body: {}", status, err),
            body: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Submission { .. } => ErrorKind::Submission,
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    /// Raw provider response body, when the provider answered at all.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Auth { body, .. } | Self::Submission { body, .. } => body.as_deref(),
            Self::Config { .. } => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Submission { status, .. } => *status,
            Self::Config { .. } => None,
        }
    }
}
