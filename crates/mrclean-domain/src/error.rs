//! Rule validation errors

use std::fmt;

/// Configuration errors detected while building a [`crate::RetentionRule`].
///
/// These are fatal to startup: a sweep never begins with an invalid rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// A required field was absent from the rule definition
    MissingField {
        /// Rule label as configured
        rule: String,
        /// Name of the missing field
        field: &'static str,
    },

    /// The root path was empty after normalisation
    EmptyRoot {
        /// Rule label as configured
        rule: String,
    },

    /// The root path is not absolute
    RelativeRoot {
        /// Rule label as configured
        rule: String,
        /// Normalised root path
        root: String,
    },

    /// The strategy id is outside `0..=4`
    UnknownStrategy {
        /// Rule label as configured
        rule: String,
        /// Offending id
        id: i64,
    },

    /// The age threshold is negative
    NegativeAge {
        /// Rule label as configured
        rule: String,
        /// Offending value
        days: i64,
    },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::MissingField { rule, field } => {
                write!(f, "rule '{}' is missing required field '{}'", rule, field)
            }
            RuleError::EmptyRoot { rule } => write!(f, "rule '{}' has an empty path", rule),
            RuleError::RelativeRoot { rule, root } => {
                write!(f, "rule '{}' path '{}' is not absolute", rule, root)
            }
            RuleError::UnknownStrategy { rule, id } => {
                write!(f, "rule '{}' has unknown method {} (expected 0-4)", rule, id)
            }
            RuleError::NegativeAge { rule, days } => {
                write!(f, "rule '{}' has negative age {} days", rule, days)
            }
        }
    }
}

impl std::error::Error for RuleError {}
