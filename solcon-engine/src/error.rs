//! Error and warning types for the mapping engine
//!
//! Structural and configuration problems are fatal and surface as [`EngineError`].
//! Data-quality problems never stop a conversion: they are recorded as [`Warning`]s
//! in a [`Diagnostics`] collector and logged, so a human reviewing the output can see
//! everything that looked wrong in one pass.

use std::fmt;
use thiserror::Error;

/// Fatal errors raised while reading, writing or building a mapping table
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A required segment was absent while reading or writing
    #[error("path segment '{segment}' not found in '{path}'")]
    PathNotFound { segment: String, path: String },

    /// A segment was applied to a container of the wrong shape
    #[error("segment '{segment}' of '{path}' does not fit the document: {reason}")]
    StructuralMismatch {
        segment: String,
        path: String,
        reason: String,
    },

    /// A mapping table referenced a logical field name the configuration lacks
    #[error("key '{name}' not found in the '{section}' path configuration")]
    MissingConfigKey { name: String, section: String },

    /// The provider token has no identifier bundle
    #[error("provider '{provider}' not found in possible providers {known:?}")]
    UnknownProvider { provider: String, known: Vec<String> },

    /// The path configuration itself is malformed
    #[error("invalid path configuration: {0}")]
    InvalidConfig(String),

    /// A correspondence already had a parent and the caller did not allow skipping it
    #[error("expected an empty parent link on '{elem}', found '{existing}'")]
    ParentAlreadySet { elem: String, existing: String },
}

impl EngineError {
    pub(crate) fn not_found(segment: impl fmt::Display, path: impl fmt::Display) -> Self {
        EngineError::PathNotFound {
            segment: segment.to_string(),
            path: path.to_string(),
        }
    }

    pub(crate) fn mismatch(
        segment: impl fmt::Display,
        path: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        EngineError::StructuralMismatch {
            segment: segment.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Non-fatal findings accumulated during a conversion
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A value matched none of the allowed enum options
    EnumValidationMiss {
        value: String,
        path: String,
        allowed: Vec<String>,
    },
    /// Two source items collapsed onto the same key; the last one wins
    DuplicateKeyCollision { key: String, context: String },
    /// An optional source read found nothing
    MissingOptionalValue { path: String },
    /// A correspondence lacked the parent its entry requires
    MissingParent { elem: String, path: String },
    /// A numeric transform found no digits to work with
    NotNumeric { value: String, path: String },
    /// A correspondence chain was too short to fill every placeholder of a path
    UnresolvedPlaceholder { elem: String, path: String },
    /// A name that must be unique was found more than once
    AmbiguousName { name: String, context: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EnumValidationMiss {
                value,
                path,
                allowed,
            } => write!(
                f,
                "value '{}' at '{}' not found in valid formats: {:?}",
                value, path, allowed
            ),
            Warning::DuplicateKeyCollision { key, context } => {
                write!(f, "duplicate key '{}' in {}, keeping the last entry", key, context)
            }
            Warning::MissingOptionalValue { path } => write!(f, "no value found at '{}'", path),
            Warning::MissingParent { elem, path } => write!(
                f,
                "parent mapping is required for '{}', but {} does not have one",
                path, elem
            ),
            Warning::NotNumeric { value, path } => {
                write!(f, "value '{}' at '{}' has no digits to keep", value, path)
            }
            Warning::UnresolvedPlaceholder { elem, path } => {
                write!(f, "{} leaves placeholders unfilled in '{}'", elem, path)
            }
            Warning::AmbiguousName { name, context } => {
                write!(f, "'{}' appears more than once in {}", name, context)
            }
        }
    }
}

/// Collector for [`Warning`]s
///
/// Every pushed warning is logged at `warn` level unless the caller marks it silent,
/// in which case it is kept for the report but only logged at `debug`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
    silenced: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn push_silent(&mut self, warning: Warning) {
        log::debug!("SILENT: {}", warning);
        self.warnings.push(warning);
        self.silenced += 1;
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// How many of the warnings were pushed silently
    pub fn silenced(&self) -> usize {
        self.silenced
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Move all warnings from `other` into this collector
    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
        self.silenced += other.silenced;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_segment() {
        let err = EngineError::not_found("vdu", "topology_template;vdu");
        assert_eq!(
            err.to_string(),
            "path segment 'vdu' not found in 'topology_template;vdu'"
        );
    }

    #[test]
    fn test_diagnostics_keep_silent_warnings() {
        let mut diag = Diagnostics::new();
        diag.push_silent(Warning::MissingOptionalValue {
            path: "a.b".to_string(),
        });
        diag.push(Warning::DuplicateKeyCollision {
            key: "c1".to_string(),
            context: "vdu profiles".to_string(),
        });
        assert_eq!(diag.len(), 2);
        assert_eq!(diag.silenced(), 1);
        assert!(matches!(
            diag.warnings()[1],
            Warning::DuplicateKeyCollision { .. }
        ));
    }
}
