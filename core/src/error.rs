//! Error types for policy store, parser and schema operations.
//!
//! Three families of failure surface through [`PolicyError`]:
//!
//! - structural misuse of the store (unknown names, type mismatches, bad
//!   names), which is always reported to the caller;
//! - schema violations, aggregated into a [`ValidationError`];
//! - parse failures, carried as a [`ParseError`] with a 1-based line number.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::ValueType;
use crate::schema::ValidationError;

/// Errors that can occur while reading, writing, parsing or validating a
/// [`Policy`](crate::Policy).
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The requested name does not exist.
    #[error("{0}: name not found")]
    NameNotFound(String),

    /// The name exists but holds values of a different type.
    #[error("{name}: value has type {actual}, not {expected}")]
    TypeError {
        name: String,
        expected: ValueType,
        actual: ValueType,
    },

    /// An intermediate segment of a hierarchical name does not hold a policy.
    #[error("{name}: '{partial}' holds a {actual} value, not a Policy")]
    NotAPolicy {
        name: String,
        partial: String,
        actual: ValueType,
    },

    /// The name is not a legal dot-delimited parameter name.
    #[error("illegal parameter name: '{0}'")]
    BadName(String),

    /// The dictionary is malformed, missing or not yet loaded.
    #[error("dictionary error: {0}")]
    Dictionary(String),

    /// A lookup crossed a `dictionaryFile` that has not been loaded yet.
    #[error("{name}: dictionary file {} is not loaded", .path.display())]
    DictionaryNotLoaded { name: String, path: PathBuf },

    /// A file reference leads back to a file that is already being
    /// included, or nests too deeply.
    #[error("circular or too deeply nested include of {}", .path.display())]
    CircularInclude { path: PathBuf },

    /// One or more parameters failed schema validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The policy source could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Reading a policy source failed.
    #[error("I/O error{}: {source}", describe_path(.path))]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },
}

impl PolicyError {
    /// Returns `true` for both leaf and intermediate-segment type errors.
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::TypeError { .. } | Self::NotAPolicy { .. })
    }

    pub(crate) fn type_error(name: &str, expected: ValueType, actual: ValueType) -> Self {
        Self::TypeError {
            name: name.to_string(),
            expected,
            actual,
        }
    }

    /// Attaches the name of the file being read to a parse error.
    pub(crate) fn with_origin(self, origin: &str) -> Self {
        match self {
            Self::Parse(err) => Self::Parse(err.with_origin(origin)),
            other => other,
        }
    }
}

fn describe_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" reading {}", path.display()),
        None => String::new(),
    }
}

/// Category of a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// Input ended inside an open block or quoted string.
    Eof,
    /// A line does not follow the general `name: value` grammar.
    Syntax,
    /// A value is malformed for the format (bad literal, mixed array types).
    FormatSyntax,
    /// The construct is recognizable but deliberately unsupported.
    UnsupportedSyntax,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Eof => "unexpected end of input",
            Self::Syntax => "syntax error",
            Self::FormatSyntax => "format syntax error",
            Self::UnsupportedSyntax => "unsupported syntax",
        };
        f.write_str(label)
    }
}

/// A parse failure with optional file and line context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{}: {message}", describe_location(.origin, .line))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// 1-based line number of the offending line, when known.
    pub line: Option<usize>,
    /// Name of the source (usually a file path) being parsed.
    pub origin: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
            origin: None,
        }
    }

    pub fn eof(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Eof, message)
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Syntax, message)
    }

    pub fn format_syntax(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::FormatSyntax, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::UnsupportedSyntax, message)
    }

    /// Sets the line number.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Sets the source name unless one is already present.
    pub fn with_origin(mut self, origin: &str) -> Self {
        if self.origin.is_none() {
            self.origin = Some(origin.to_string());
        }
        self
    }
}

fn describe_location(origin: &Option<String>, line: &Option<usize>) -> String {
    match (origin, line) {
        (Some(origin), Some(line)) => format!(" in {origin} at line {line}"),
        (Some(origin), None) => format!(" in {origin}"),
        (None, Some(line)) => format!(" at line {line}"),
        (None, None) => String::new(),
    }
}

/// Convenience alias for results with [`PolicyError`].
pub type Result<T> = std::result::Result<T, PolicyError>;
