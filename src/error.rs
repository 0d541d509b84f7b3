//! Error handling for the posterkit client

use std::fmt;
use thiserror::Error;

/// Distinguished authentication failures surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Wrong email/password combination, or unknown account
    InvalidCredentials,
    /// The identity provider rejected the password as too weak
    WeakPassword,
    /// An account already exists for this email
    DuplicateAccount,
    /// No session is held, or the bearer token could not be refreshed
    MissingToken,
    /// Any other identity-provider failure
    Provider,
}

/// Distinguished share-flow failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareErrorKind {
    /// Rasterizing the composed canvas failed
    CaptureFailed,
    /// The OS share sheet reported an error
    SheetFailed,
}

/// Unified error type for the posterkit client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication errors from the identity provider or session holder
    #[error("Authentication error: {1}")]
    Auth(AuthErrorKind, String),

    /// Backend replied `success: false`; the message is surfaced verbatim
    #[error("API error: {0}")]
    Api(String),

    /// OS storage permission was denied before capture
    #[error("Permission error: {0}")]
    Permission(String),

    /// Capture or share sheet failure in the composer flow
    #[error("Share error: {1}")]
    Share(ShareErrorKind, String),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(kind: AuthErrorKind, msg: T) -> Self {
        Error::Auth(kind, msg.to_string())
    }

    /// Create a new API error from a backend failure message
    pub fn api<T: fmt::Display>(msg: T) -> Self {
        Error::Api(msg.to_string())
    }

    /// Create a new permission error
    pub fn permission<T: fmt::Display>(msg: T) -> Self {
        Error::Permission(msg.to_string())
    }

    /// Create a new share error
    pub fn share<T: fmt::Display>(kind: ShareErrorKind, msg: T) -> Self {
        Error::Share(kind, msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// The authentication failure kind, if this is an auth error
    pub fn auth_kind(&self) -> Option<AuthErrorKind> {
        match self {
            Error::Auth(kind, _) => Some(*kind),
            _ => None,
        }
    }
}
