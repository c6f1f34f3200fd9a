//! Error handler for directory authentication.

use ldap3::LdapError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors returned by directory sessions and the authentication strategy.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing required arguments: {}", .fields.join(", "))]
    MissingArguments { fields: Vec<String> },

    #[error("invalid LDAP settings, {details}")]
    InvalidConfiguration { details: String },

    #[error("directory search failed: {0}")]
    DirectorySearch(#[source] LdapError),

    #[error("directory session is already closed")]
    SessionClosed,

    #[error("user not found")]
    UserNotFound,

    #[error("user is not allowed to sign in")]
    Authorization,

    /// Same message whatever the directory answered.
    #[error("invalid credentials")]
    Authentication,
}

impl AuthError {
    /// Create an [`AuthError::InvalidConfiguration`].
    pub fn configuration(details: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            details: details.into(),
        }
    }

    /// Create an [`AuthError::MissingArguments`] for a single field.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingArguments {
            fields: vec![field.into()],
        }
    }

    /// Whether the caller may retry the same call.
    ///
    /// Incomplete requests can be fixed and sent again, search failures may
    /// be transient. Everything else needs another input or an operator.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::MissingArguments { .. } | Self::DirectorySearch(_))
    }

    /// Short label used on logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingArguments { .. } => "missing_arguments",
            Self::InvalidConfiguration { .. } => "invalid_configuration",
            Self::DirectorySearch(_) => "directory_search",
            Self::SessionClosed => "session_closed",
            Self::UserNotFound => "user_not_found",
            Self::Authorization => "unauthorized",
            Self::Authentication => "invalid_credentials",
        }
    }
}
