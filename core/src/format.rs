//! Format sniffing and parser lookup.
//!
//! A [`FormatRegistry`] maps the leading line of a policy source (its first
//! non-comment line, or a `#<?cfg FORMAT ... ?>` content-id header) to a
//! format name, and a format name to a [`PolicyParser`] bound to a target
//! [`Policy`]. Only the native PAF format is registered by default; a blank
//! source is treated as PAF.

use std::io::BufRead;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Policy;
use crate::error::{ParseError, Result};
use crate::paf::PafParserFactory;

/// Matches a content-id header such as `#<?cfg paf policy ?>`.
static CONTENT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#\s*<\?cfg\s+(\w+)(\s+\w+)*\s*\?>").expect("valid content-id regex")
});

/// Options shared by every parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Raise on the first malformed construct instead of dropping it.
    pub strict: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

impl ParserOptions {
    pub fn lenient() -> Self {
        Self { strict: false }
    }
}

/// A parser that consumes a stream and populates its target policy.
pub trait PolicyParser {
    /// Parses all of `input`, returning the number of parameters read.
    fn parse(&mut self, input: &mut dyn BufRead) -> Result<usize>;
}

/// Creates parsers for one format.
pub trait ParserFactory {
    /// Format name, e.g. `"PAF"`.
    fn format_name(&self) -> &'static str;

    /// Returns `true` if `leading_line` looks like this format.
    fn recognizes(&self, leading_line: &str) -> bool;

    fn create<'p>(&self, target: &'p mut Policy, options: ParserOptions) -> Box<dyn PolicyParser + 'p>;
}

/// Extracts the format named by a content-id header, if `line` is one.
pub fn content_id_format(line: &str) -> Option<&str> {
    CONTENT_ID
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Returns the line a registry should sniff: the first content-id header or
/// the first non-blank, non-comment line.
pub fn leading_line(text: &str) -> Option<&str> {
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if content_id_format(line).is_some() {
            return Some(line);
        }
        if trimmed.starts_with('#') {
            continue;
        }
        return Some(line);
    }
    None
}

/// Registry of known policy formats.
pub struct FormatRegistry {
    factories: Vec<Box<dyn ParserFactory>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PafParserFactory));
        registry
    }
}

impl FormatRegistry {
    /// Registry with no formats registered.
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    pub fn register(&mut self, factory: Box<dyn ParserFactory>) {
        self.factories.push(factory);
    }

    pub fn format_names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.format_name()).collect()
    }

    /// Names the format of a source given its leading line; `None` (an empty
    /// source) selects PAF.
    pub fn recognize(&self, leading: Option<&str>) -> Option<&'static str> {
        let Some(line) = leading else {
            return Some(PafParserFactory::FORMAT_NAME);
        };
        if let Some(named) = content_id_format(line) {
            return self
                .factory(named)
                .map(|factory| factory.format_name());
        }
        self.factories
            .iter()
            .find(|factory| factory.recognizes(line))
            .map(|factory| factory.format_name())
    }

    /// Creates a parser for `format` bound to `target`.
    ///
    /// # Errors
    ///
    /// Returns a format syntax [`ParseError`] if the format is unknown.
    pub fn create_parser<'p>(
        &self,
        format: &str,
        target: &'p mut Policy,
        options: ParserOptions,
    ) -> Result<Box<dyn PolicyParser + 'p>> {
        let factory = self.factory(format).ok_or_else(|| {
            ParseError::format_syntax(format!("unsupported policy format: {format}"))
        })?;
        Ok(factory.create(target, options))
    }

    fn factory(&self, format: &str) -> Option<&dyn ParserFactory> {
        self.factories
            .iter()
            .find(|factory| factory.format_name().eq_ignore_ascii_case(format))
            .map(|factory| factory.as_ref())
    }
}
