//! Error types for SLO reconciliation
//!
//! Every lifecycle operation returns `SloResult<T>`. Gateway failures are
//! surfaced verbatim; the only failures swallowed by the orchestrator are
//! `NotFound` on Read (drift) and on Delete (idempotent delete).

use std::fmt;

/// Result type alias for SLO operations
pub type SloResult<T> = Result<T, SloError>;

/// What exactly was wrong with a configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    /// Value is not a member of the allowed set (case-sensitive)
    InvalidEnum {
        value: String,
        allowed: Vec<&'static str>,
    },

    /// Integer outside an inclusive range
    OutOfRange { value: i64, min: i64, max: i64 },

    /// String does not match the field's pattern
    PatternMismatch { value: String, pattern: String },

    /// List has too few or too many elements
    BadCardinality { len: usize, min: usize, max: usize },

    /// A required field is absent
    MissingField,

    /// JSON type of the value differs from the declared field type
    TypeMismatch { expected: &'static str },

    /// The field is not part of the schema
    UnknownField,

    /// A `row_id` appears more than once within an indicator
    DuplicateRowId { row_id: String },

    /// The combination of query group types is not accepted
    InvalidQueryGroups { reason: String },

    /// Not an IANA time zone identifier
    InvalidTimezone { value: String },

    /// Rejected by the server's own validation
    Rejected { message: String },

    /// Cannot be used as a path segment of an endpoint
    InvalidId { value: String },
}

/// A single violation, located by its dotted field path
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// e.g. `indicator.queries.0.query_group.1.row_id`
    pub path: String,
    pub kind: ViolationKind,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn missing(path: impl Into<String>) -> Self {
        Self::new(path, ViolationKind::MissingField)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = &self.path;
        match &self.kind {
            ViolationKind::InvalidEnum { value, allowed } => write!(
                f,
                "{path}: '{value}' is not one of [{}]",
                allowed.join(", ")
            ),
            ViolationKind::OutOfRange { value, min, max } => {
                write!(f, "{path}: {value} is outside {min}..={max}")
            }
            ViolationKind::PatternMismatch { value, pattern } => {
                write!(f, "{path}: '{value}' must match {pattern}")
            }
            ViolationKind::BadCardinality { len, min, max } => {
                write!(f, "{path}: expected {min} to {max} items, got {len}")
            }
            ViolationKind::MissingField => write!(f, "{path}: required field is missing"),
            ViolationKind::TypeMismatch { expected } => {
                write!(f, "{path}: expected a value of type {expected}")
            }
            ViolationKind::UnknownField => write!(f, "{path}: unsupported field"),
            ViolationKind::DuplicateRowId { row_id } => {
                write!(f, "{path}: row_id '{row_id}' is used more than once")
            }
            ViolationKind::InvalidQueryGroups { reason } => write!(f, "{path}: {reason}"),
            ViolationKind::InvalidTimezone { value } => {
                write!(f, "{path}: '{value}' is not an IANA time zone")
            }
            ViolationKind::Rejected { message } => write!(f, "{path}: {message}"),
            ViolationKind::InvalidId { value } => {
                write!(f, "{path}: '{value}' cannot be used as an id")
            }
        }
    }
}

/// Errors that can occur while reconciling an SLO
#[derive(Debug)]
pub enum SloError {
    /// Configuration violates the schema or a cross-field invariant.
    /// Never retryable.
    Validation(Vec<ValidationError>),

    /// The server has no such object
    NotFound { resource: &'static str, id: String },

    /// Optimistic-concurrency failure (version mismatch)
    Conflict(String),

    /// Network failure or unexpected server status. `source` keeps the
    /// client error, when there is one, for the cause chain.
    Transport {
        status: Option<u16>,
        message: String,
        source: Option<reqwest::Error>,
    },

    /// The server answered with a document we could not parse
    Decode(String),

    /// The host rejected a value written back into the resource handle
    StateWriteFailed { field: String, reason: String },

    /// The host aborted the operation
    Cancelled,
}

impl SloError {
    pub fn invalid(path: impl Into<String>, kind: ViolationKind) -> Self {
        SloError::Validation(vec![ValidationError::new(path, kind)])
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SloError::NotFound { .. })
    }

    /// The violations carried by a `Validation` error, empty otherwise
    pub fn violations(&self) -> &[ValidationError] {
        match self {
            SloError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl fmt::Display for SloError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SloError::Validation(errors) => {
                write!(f, "invalid SLO configuration: ")?;
                for (i, error) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{error}")?;
                }
                Ok(())
            }
            SloError::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            SloError::Conflict(msg) => write!(f, "version conflict: {msg}"),
            SloError::Transport {
                status: Some(status),
                message,
                ..
            } => write!(f, "request failed with status {status}: {message}"),
            SloError::Transport {
                status: None,
                message,
                ..
            } => write!(f, "request failed: {message}"),
            SloError::Decode(msg) => write!(f, "unexpected server response: {msg}"),
            SloError::StateWriteFailed { field, reason } => {
                write!(f, "error setting field '{field}' in resource state: {reason}")
            }
            SloError::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for SloError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SloError::Transport {
                source: Some(err), ..
            } => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for SloError {
    fn from(err: ValidationError) -> Self {
        SloError::Validation(vec![err])
    }
}

impl From<Vec<ValidationError>> for SloError {
    fn from(errors: Vec<ValidationError>) -> Self {
        SloError::Validation(errors)
    }
}

impl From<reqwest::Error> for SloError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return SloError::Decode(err.to_string());
        }
        SloError::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for SloError {
    fn from(err: serde_json::Error) -> Self {
        SloError::Decode(err.to_string())
    }
}
