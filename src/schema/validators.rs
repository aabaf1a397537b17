//! Field-local validators
//!
//! Each validator inspects one already type-checked value. Relations between
//! fields are checked later on the decoded record (see `codec`).

use chrono_tz::Tz;
use regex::Regex;
use serde_json::Value;

use crate::error::{ValidationError, ViolationKind};

#[derive(Debug, Clone)]
pub enum Validator {
    /// Member of a tagged enumeration's canonical names
    Enum(&'static [&'static str]),

    /// Member of a plain string set (case-sensitive)
    StringInSlice(&'static [&'static str]),

    /// Inclusive integer range
    IntRange { min: i64, max: i64 },

    /// Whole-string regular expression
    Regex(Regex),

    /// Number of elements in a list
    Cardinality { min: usize, max: usize },

    /// IANA time zone identifier
    IanaTimezone,
}

impl Validator {
    /// Compile a pattern that is part of the static schema.
    pub(crate) fn pattern(pattern: &'static str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => Validator::Regex(regex),
            Err(e) => panic!("invalid schema pattern {pattern}: {e}"),
        }
    }

    pub fn check(&self, path: &str, value: &Value) -> Result<(), ValidationError> {
        match self {
            Validator::Enum(allowed) | Validator::StringInSlice(allowed) => {
                let text = value.as_str().unwrap_or_default();
                if allowed.contains(&text) {
                    return Ok(());
                }
                Err(ValidationError::new(
                    path,
                    ViolationKind::InvalidEnum {
                        value: text.to_string(),
                        allowed: allowed.to_vec(),
                    },
                ))
            }
            Validator::IntRange { min, max } => {
                let Some(number) = value.as_i64() else {
                    return Err(ValidationError::new(
                        path,
                        ViolationKind::TypeMismatch { expected: "integer" },
                    ));
                };
                if (*min..=*max).contains(&number) {
                    return Ok(());
                }
                Err(ValidationError::new(
                    path,
                    ViolationKind::OutOfRange {
                        value: number,
                        min: *min,
                        max: *max,
                    },
                ))
            }
            Validator::Regex(regex) => {
                let text = value.as_str().unwrap_or_default();
                if regex.is_match(text) {
                    return Ok(());
                }
                Err(ValidationError::new(
                    path,
                    ViolationKind::PatternMismatch {
                        value: text.to_string(),
                        pattern: regex.as_str().to_string(),
                    },
                ))
            }
            Validator::Cardinality { min, max } => {
                let len = value.as_array().map_or(0, Vec::len);
                if (*min..=*max).contains(&len) {
                    return Ok(());
                }
                Err(ValidationError::new(
                    path,
                    ViolationKind::BadCardinality {
                        len,
                        min: *min,
                        max: *max,
                    },
                ))
            }
            Validator::IanaTimezone => {
                let text = value.as_str().unwrap_or_default();
                if text.parse::<Tz>().is_ok() {
                    return Ok(());
                }
                Err(ValidationError::new(
                    path,
                    ViolationKind::InvalidTimezone {
                        value: text.to_string(),
                    },
                ))
            }
        }
    }
}
