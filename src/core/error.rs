//! Typed error handling for the lead mirror
//!
//! # Error Categories
//!
//! - [`MirrorError::AuthRequired`]: a write was attempted without a session
//! - [`FetchError`]: any backend call failed (network or server side)
//! - [`ValidationError`]: client-side checks rejected the input before any
//!   network call was made
//! - [`ConfigError`]: the mirror configuration could not be loaded
//!
//! The backend boundary speaks `anyhow::Error`; the mirror converts those into
//! [`FetchError`] at the call site so callers can match on the category.
//!
//! # Example
//!
//! ```rust,ignore
//! match mirror.add_lead(draft).await {
//!     Ok(lead) => println!("added {}", lead.id),
//!     Err(MirrorError::AuthRequired) => show_login(),
//!     Err(MirrorError::Validation(e)) => highlight_fields(&e),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

use crate::core::events::Table;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The main error type returned by mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    /// No session was available for an operation that needs one
    #[error("You must be signed in to perform this action")]
    AuthRequired,

    /// A backend call failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Input was rejected before reaching the backend
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl MirrorError {
    /// Stable error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            MirrorError::AuthRequired => "AUTH_REQUIRED",
            MirrorError::Fetch(_) => "FETCH_ERROR",
            MirrorError::Validation(_) => "VALIDATION_ERROR",
        }
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, MirrorError::AuthRequired)
    }
}

// =============================================================================
// Fetch Errors
// =============================================================================

/// Backend operations the mirror performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Insert,
    Update,
    UpdateStatus,
    Delete,
    SignOut,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Fetch => "fetch",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::UpdateStatus => "update status of",
            Operation::Delete => "delete",
            Operation::SignOut => "sign out",
        })
    }
}

/// A backend call failed
#[derive(Debug, Clone, Error)]
#[error("Failed to {operation} {resource}: {message}")]
pub struct FetchError {
    pub operation: Operation,
    /// Table name, or `session` for auth calls
    pub resource: &'static str,
    pub message: String,
}

impl FetchError {
    pub fn new(operation: Operation, table: Table, message: impl Into<String>) -> Self {
        Self {
            operation,
            resource: table.as_str(),
            message: message.into(),
        }
    }

    /// An auth call failed
    pub fn session(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            resource: "session",
            message: message.into(),
        }
    }

    /// Wrap an opaque backend error
    pub fn from_backend(operation: Operation, table: Table, err: &anyhow::Error) -> Self {
        // `{:#}` keeps the context chain on one line
        Self::new(operation, table, format!("{:#}", err))
    }
}

/// A backend row carried a value outside a closed enumeration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Client-side validation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Single field validation error
    #[error("Validation failed for field '{field}': {message}")]
    FieldError { field: String, message: String },

    /// Multiple field validation errors
    #[error("Validation failed: {}", format_field_errors(.0))]
    FieldErrors(Vec<FieldValidationError>),
}

impl ValidationError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::FieldError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Names of every offending field, in report order
    pub fn fields(&self) -> Vec<&str> {
        match self {
            ValidationError::FieldError { field, .. } => vec![field.as_str()],
            ValidationError::FieldErrors(errors) => {
                errors.iter().map(|e| e.field.as_str()).collect()
            }
        }
    }
}

/// One field's validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

fn format_field_errors(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Config Errors
// =============================================================================

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}
