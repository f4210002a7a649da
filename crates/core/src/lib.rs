//! Shared primitives for all Rust crates in Restward.

#![forbid(unsafe_code)]

/// Caller primitives shared across services.
pub mod auth;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::Caller;

/// Result type used across Restward crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller requested or changed attributes they are not authorized for.
    #[error("access denied for {facet}: {}", .attributes.join(","))]
    AccessDenied {
        /// Facet or ability family that triggered the denial.
        facet: String,
        /// Offending attribute or relation names.
        attributes: Vec<String>,
    },

    /// Update attempted to change an attribute that never changes through the API.
    #[error("immutable attribute: updating '{0}' is not allowed")]
    ImmutableAttribute(String),

    /// Facet name outside the fixed facet table.
    #[error("unknown facet '{0}'")]
    UnknownFacet(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns a message that is safe to show to an untrusted client.
    ///
    /// Authorization denials and configuration defects keep their detail
    /// server-side; everything else is returned verbatim.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::AccessDenied { .. } => {
                "Unauthorized action. You do not have permission to request or change these fields."
                    .to_owned()
            }
            Self::UnknownFacet(_) | Self::Internal(_) => "internal server error".to_owned(),
            other => other.to_string(),
        }
    }
}
