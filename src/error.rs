//! Error handling for the chantier client

use std::fmt;
use thiserror::Error;

use crate::models::ProfileStatus;

/// PostgREST code for a unique constraint violation
pub const UNIQUE_VIOLATION: &str = "23505";

/// PostgREST code returned when the requested relation does not exist
pub const UNDEFINED_TABLE: &str = "42P01";

/// Unified error type for the chantier client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Local persisted state could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Authentication errors reported by the auth service
    #[error("Authentication error: {0}")]
    Auth(String),

    /// No identity is signed in
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The signed-in identity has not been approved
    #[error("Account is {0}")]
    NotApproved(ProfileStatus),

    /// A project-scoped operation was attempted without a current project
    #[error("No project selected")]
    NoProjectSelected,

    /// A credential or setting needed by the operation is absent
    #[error("Server configuration error: missing {0}")]
    MissingConfiguration(String),

    /// Approval was requested for an identity that did not arrive by invitation
    #[error("Not an invited user. Please wait for admin approval.")]
    NotInvited,

    /// The profile is not in a state that allows the requested transition
    #[error("Cannot move profile from {from} to {to}")]
    InvalidTransition {
        from: ProfileStatus,
        to: ProfileStatus,
    },

    /// The identity's role does not allow the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Edge Function errors
    #[error("Function error: {0}")]
    Function(String),

    /// The operation was abandoned because its session or view ended
    #[error("Operation cancelled")]
    Cancelled,

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new function error
    pub fn function<T: fmt::Display>(msg: T) -> Self {
        Error::Function(msg.to_string())
    }

    /// Create a new missing configuration error
    pub fn missing_config<T: fmt::Display>(name: T) -> Self {
        Error::MissingConfiguration(name.to_string())
    }

    /// Create a new permission error
    pub fn permission<T: fmt::Display>(msg: T) -> Self {
        Error::PermissionDenied(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// The backend error code, if the backend supplied one
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Whether this is a backend error carrying `code`
    pub fn has_code(&self, code: &str) -> bool {
        self.code() == Some(code)
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
