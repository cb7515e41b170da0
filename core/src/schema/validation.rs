//! Bitmask validation error codes and the per-name accumulator.

use std::borrow::Cow;
use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

bitflags! {
    /// Validation failure codes.
    ///
    /// Single bits may be OR-ed together; the compound constants are exact
    /// unions of their parts so callers can test membership with `contains`
    /// or `intersects`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ErrorCode: u32 {
        const WRONG_TYPE = 1;
        const MISSING_REQUIRED = 2;
        const NOT_AN_ARRAY = 4;
        const ARRAY_TOO_SHORT = 8;
        const TOO_MANY_VALUES = 16;
        const VALUE_DISALLOWED = 32;
        const VALUE_OUT_OF_RANGE = 64;
        const UNKNOWN_NAME = 128;
        const BAD_DEFINITION = 256;
        const NOT_LOADED = 512;
        const UNKNOWN_ERROR = 1024;

        const TOO_FEW_VALUES = Self::MISSING_REQUIRED.bits()
            | Self::NOT_AN_ARRAY.bits()
            | Self::ARRAY_TOO_SHORT.bits();
        const WRONG_OCCURRENCES = Self::TOO_FEW_VALUES.bits() | Self::TOO_MANY_VALUES.bits();
        const BAD_VALUE = Self::VALUE_DISALLOWED.bits() | Self::VALUE_OUT_OF_RANGE.bits();
    }
}

const SINGLE_BITS: [(ErrorCode, &str); 11] = [
    (ErrorCode::WRONG_TYPE, "value has the incorrect type"),
    (ErrorCode::MISSING_REQUIRED, "missing value for required parameter"),
    (ErrorCode::NOT_AN_ARRAY, "value should be an array but is not"),
    (ErrorCode::ARRAY_TOO_SHORT, "insufficient number of array values"),
    (ErrorCode::TOO_MANY_VALUES, "too many values provided for parameter"),
    (ErrorCode::VALUE_DISALLOWED, "value is not among the allowed set"),
    (ErrorCode::VALUE_OUT_OF_RANGE, "value is out of range"),
    (ErrorCode::UNKNOWN_NAME, "parameter name is unknown"),
    (ErrorCode::BAD_DEFINITION, "malformed definition"),
    (
        ErrorCode::NOT_LOADED,
        "file not loaded; call load_policy_files() before validating",
    ),
    (ErrorCode::UNKNOWN_ERROR, "unknown error"),
];

const COMPOUNDS: [(ErrorCode, &str); 3] = [
    (ErrorCode::TOO_FEW_VALUES, "not enough values for parameter"),
    (ErrorCode::WRONG_OCCURRENCES, "incorrect number of values for parameter"),
    (ErrorCode::BAD_VALUE, "illegal value"),
];

impl ErrorCode {
    /// Human-readable description of this code.
    ///
    /// Known single bits and documented compounds have a fixed message; any
    /// other combination lists the message of every bit it contains.
    ///
    /// # Examples
    ///
    /// ```
    /// use paf_policy_core::ErrorCode;
    ///
    /// assert_eq!(ErrorCode::VALUE_OUT_OF_RANGE.message(), "value is out of range");
    /// assert_eq!(ErrorCode::BAD_VALUE.message(), "illegal value");
    /// assert_eq!(
    ///     (ErrorCode::WRONG_TYPE | ErrorCode::UNKNOWN_NAME).message(),
    ///     "value has the incorrect type; parameter name is unknown"
    /// );
    /// ```
    pub fn message(self) -> Cow<'static, str> {
        if self.is_empty() {
            return Cow::Borrowed("no problem");
        }
        if let Some((_, message)) = SINGLE_BITS
            .iter()
            .chain(COMPOUNDS.iter())
            .find(|(code, _)| *code == self)
        {
            return Cow::Borrowed(message);
        }

        let parts: Vec<&str> = SINGLE_BITS
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, message)| *message)
            .collect();
        if parts.is_empty() {
            Cow::Borrowed("unknown error")
        } else {
            Cow::Owned(parts.join("; "))
        }
    }
}

/// Accumulates validation failures per parameter name.
///
/// A name is present only once a non-empty code has been recorded for it.
/// Recording several codes for one name ORs them together.
///
/// # Examples
///
/// ```
/// use paf_policy_core::{ErrorCode, ValidationError};
///
/// let mut errs = ValidationError::new();
/// errs.add_error("exposure", ErrorCode::WRONG_TYPE);
/// errs.add_error("exposure", ErrorCode::TOO_MANY_VALUES);
/// errs.add_error("clean", ErrorCode::empty());
///
/// assert_eq!(errs.param_count(), 1);
/// assert!(errs.errors("exposure").contains(ErrorCode::TOO_MANY_VALUES));
/// assert!(errs.errors("exposure").intersects(ErrorCode::WRONG_OCCURRENCES));
/// assert!(errs.errors("clean").is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", describe_errors(.errors, ""))]
pub struct ValidationError {
    errors: BTreeMap<String, ErrorCode>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `code` against `name`; an empty code is ignored.
    pub fn add_error(&mut self, name: impl Into<String>, code: ErrorCode) {
        if code.is_empty() {
            return;
        }
        *self.errors.entry(name.into()).or_insert(ErrorCode::empty()) |= code;
    }

    /// Codes recorded for `name`; empty when none were.
    pub fn errors(&self, name: &str) -> ErrorCode {
        self.errors.get(name).copied().unwrap_or(ErrorCode::empty())
    }

    /// Union of every recorded code.
    pub fn all_errors(&self) -> ErrorCode {
        self.errors
            .values()
            .fold(ErrorCode::empty(), |all, code| all | *code)
    }

    pub fn param_count(&self) -> usize {
        self.errors.len()
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.errors.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ErrorCode)> {
        self.errors.iter().map(|(name, code)| (name.as_str(), *code))
    }

    /// Message for `code`; see [`ErrorCode::message`].
    pub fn message_for(code: ErrorCode) -> Cow<'static, str> {
        code.message()
    }

    /// One line per recorded name, each starting with `prefix`.
    pub fn describe(&self, prefix: &str) -> String {
        describe_errors(&self.errors, prefix)
    }

    /// Copies every error from `other`, prefixing its names with `prefix`.
    pub fn absorb(&mut self, prefix: &str, other: &ValidationError) {
        for (name, code) in &other.errors {
            self.add_error(format!("{prefix}{name}"), *code);
        }
    }
}

fn describe_errors(errors: &BTreeMap<String, ErrorCode>, prefix: &str) -> String {
    errors
        .iter()
        .map(|(name, code)| format!("{prefix}{name}: {}", code.message()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serializes as a map from parameter name to numeric code.
impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.errors.len()))?;
        for (name, code) in &self.errors {
            map.serialize_entry(name, &code.bits())?;
        }
        map.end()
    }
}
