//! Error types for config loading, coercion and field validation.

use crate::tag::TagError;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors returned by [`crate::Fig::load`] and friends.
///
/// Structural problems (wrong destination, missing or unreadable file, a
/// document that does not decode) abort the load immediately. Per-field
/// problems are collected into [`Error::Fields`] after a full binding pass.
#[derive(Debug, Error)]
pub enum Error {
    /// The destination is not a record.
    #[error("cfg must be a record, got {type_name}")]
    NotRecord { type_name: &'static str },
    /// No search directory contained the config file.
    #[error("{filename}: file not found")]
    FileNotFound { filename: String },
    /// Reading the config file failed.
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    /// The config file extension has no decoder.
    #[error("unsupported file extension {0:?}")]
    UnsupportedFormat(String),
    /// The config file could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] ParseError),
    /// The parsed document could not be materialized into the record.
    #[error("failed to decode config at {path}: {source}")]
    Decode { path: String, source: CoerceError },
    /// One or more fields failed validation, env overlay or defaulting.
    #[error("{0}")]
    Fields(FieldErrors),
}

impl Error {
    /// Whether this is the sentinel raised when no config file was found.
    pub fn is_file_not_found(&self) -> bool {
        matches!(self, Error::FileNotFound { .. })
    }

    /// Per-field errors, if the load got as far as the binding pass.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Error::Fields(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Parser failures for each supported document format.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("json5: {0}")]
    Json5(#[from] json5::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failures converting a literal or decoded value into a field's type.
#[derive(Debug, Error)]
pub enum CoerceError {
    #[error("invalid bool {0:?}")]
    Bool(String),
    #[error("invalid integer {literal:?}: {source}")]
    Int {
        literal: String,
        source: std::num::ParseIntError,
    },
    #[error("invalid float {literal:?}: {source}")]
    Float {
        literal: String,
        source: std::num::ParseFloatError,
    },
    #[error("value {value} out of range for {type_name}")]
    OutOfRange {
        value: String,
        type_name: &'static str,
    },
    #[error("invalid duration {literal:?}: {source}")]
    Duration {
        literal: String,
        source: humantime::DurationError,
    },
    #[error("invalid time {literal:?} for layout {layout:?}: {source}")]
    Time {
        literal: String,
        layout: String,
        source: chrono::ParseError,
    },
    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),
    #[error("could not unmarshal string {literal:?}: {message}")]
    Unmarshal { literal: String, message: String },
    #[error("unsupported type {0}")]
    Unsupported(&'static str),
    #[error("expected {expected} elements, got {found}")]
    Length { expected: usize, found: usize },
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("unknown key {0:?}")]
    UnknownKey(String),
    /// A failure below a nested location, used while materializing documents.
    #[error("{segment}: {source}")]
    Nested {
        segment: String,
        source: Box<CoerceError>,
    },
}

impl CoerceError {
    /// Wrap this error with one more location segment (`name` or `[index]`).
    pub(crate) fn within(self, segment: impl Into<String>) -> Self {
        CoerceError::Nested {
            segment: segment.into(),
            source: Box::new(self),
        }
    }

    /// Split a nested chain into its joined path and the root cause.
    pub(crate) fn into_located(self) -> (String, CoerceError) {
        let mut path = String::new();
        let mut current = self;
        while let CoerceError::Nested { segment, source } = current {
            crate::flatten::push_segment(&mut path, &segment);
            current = *source;
        }
        (path, current)
    }
}

/// A single field's failure, keyed by path inside [`FieldErrors`].
#[derive(Debug, Error)]
pub enum FieldError {
    #[error(transparent)]
    Tag(#[from] TagError),
    #[error("field cannot have both a required validation and a default value")]
    RequiredWithDefault,
    #[error("unable to set from env: {0}")]
    Env(#[source] CoerceError),
    #[error("required validation failed")]
    Required,
    #[error("unable to set default: {0}")]
    Default(#[source] CoerceError),
    #[error("field is no longer reachable from the root record")]
    Unreachable,
}

/// Aggregate of per-field errors keyed by field path.
///
/// Display renders entries sorted by path as `path: message`, joined by `, `.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: BTreeMap<String, FieldError>,
}

impl FieldErrors {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `path`, replacing any earlier one.
    pub fn insert(&mut self, path: impl Into<String>, error: FieldError) {
        self.errors.insert(path.into(), error);
    }

    /// Error recorded for `path`, if any.
    pub fn get(&self, path: &str) -> Option<&FieldError> {
        self.errors.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.errors.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Paths with errors, in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.errors.iter().map(|(path, err)| (path.as_str(), err))
    }

    /// `Ok(())` when empty, otherwise the aggregate as an [`Error`].
    pub fn into_result(self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Fields(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (path, err)) in self.errors.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{path}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}
