//! Error types for the Ariakey SDK

use thiserror::Error;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseErrorCode {
    /// No license key was supplied.
    MissingKey,
    /// No base URL configured and the key is not a dev key.
    ServerNotConfigured,
    /// The request hit the configured timeout.
    Timeout,
    /// The server could not be reached.
    Network,
    /// The server answered with a non-2xx status.
    Http,
    /// Nothing is stored locally to validate.
    NoCachedState,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LicenseError {
    pub code: LicenseErrorCode,
    pub message: String,
    /// HTTP status for `Http` errors.
    pub status: Option<u16>,
}

impl LicenseError {
    pub fn new(code: LicenseErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: LicenseErrorCode::Http,
            message: message.into(),
            status: Some(status),
        }
    }

    /// True for failures to reach or complete a round trip with the
    /// server. These are the errors the offline grace window absorbs.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.code,
            LicenseErrorCode::Timeout | LicenseErrorCode::Network | LicenseErrorCode::Http
        )
    }
}

pub type Result<T> = std::result::Result<T, LicenseError>;
