//! Parser for the native PAF policy format.
//!
//! PAF is line oriented:
//!
//! ```text
//! #<?cfg paf policy ?>
//! # comment
//! name: value [value ...]
//! block: {
//!     inner: 1 2 3
//!     label: "a string that may
//!             span lines"
//! }
//! include: @other.paf
//! ```
//!
//! The parser is a small state machine over physical lines. Nested blocks
//! are parsed recursively; whatever a value leaves unconsumed on its line
//! (a closing `}`, a sibling parameter, a trailing comment) is pushed back
//! onto the [`LineCursor`] so the enclosing call sees it next.
//!
//! In strict mode every malformed construct raises a [`ParseError`]. In
//! lenient mode the construct is dropped, logged, recorded in
//! [`PafParser::diagnostics`], and parsing continues.

mod cursor;

use std::io::BufRead;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{ParseError, Result};
use crate::format::{ParserFactory, ParserOptions, PolicyParser, content_id_format};
use crate::source::PolicyFile;
use crate::value::{Value, share};
use crate::Policy;

use cursor::LineCursor;

static PATTERNS: LazyLock<PafPatterns> = LazyLock::new(PafPatterns::new);

struct PafPatterns {
    param_line: Regex,
    name: Regex,
    number: Regex,
    bare_terminator: Regex,
    recognizer: Regex,
}

impl PafPatterns {
    fn new() -> Self {
        Self {
            param_line: Regex::new(r"^\s*([^\s:]+)\s*:").expect("valid regex"),
            name: Regex::new(r"^\w+(\.\w+)*$").expect("valid regex"),
            number: Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("valid regex"),
            bare_terminator: Regex::new(r"\s+[#}]").expect("valid regex"),
            recognizer: Regex::new(r"^\s*\w[\w.]*\s*:").expect("valid regex"),
        }
    }
}

/// Scalar literal kinds that can share a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    Int,
    Double,
    Bool,
}

impl ScalarKind {
    fn classify(token: &str) -> Option<Self> {
        if token == "true" || token == "false" {
            return Some(Self::Bool);
        }
        if !PATTERNS.number.is_match(token) {
            return None;
        }
        if token.contains(['.', 'e', 'E']) {
            Some(Self::Double)
        } else {
            Some(Self::Int)
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::Bool => "bool",
        }
    }
}

/// Creates [`PafParser`]s for the format registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct PafParserFactory;

impl PafParserFactory {
    pub const FORMAT_NAME: &'static str = "PAF";
}

impl ParserFactory for PafParserFactory {
    fn format_name(&self) -> &'static str {
        Self::FORMAT_NAME
    }

    fn recognizes(&self, leading_line: &str) -> bool {
        match content_id_format(leading_line) {
            Some(format) => format.eq_ignore_ascii_case(Self::FORMAT_NAME),
            None => PATTERNS.recognizer.is_match(leading_line),
        }
    }

    fn create<'p>(&self, target: &'p mut Policy, options: ParserOptions) -> Box<dyn PolicyParser + 'p> {
        Box::new(PafParser::new(target, options))
    }
}

/// Parses PAF text into a target [`Policy`].
///
/// # Examples
///
/// ```
/// use paf_policy_core::paf::PafParser;
/// use paf_policy_core::{ParserOptions, Policy, PolicyParser};
///
/// let text = "a: 1 2 3\nblock: { b: true }\n";
/// let mut policy = Policy::new();
/// let count = PafParser::new(&mut policy, ParserOptions::default())
///     .parse(&mut text.as_bytes())
///     .unwrap();
///
/// assert_eq!(count, 3);
/// assert_eq!(policy.get_int_array("a").unwrap(), vec![1, 2, 3]);
/// assert!(policy.get_bool("block.b").unwrap());
/// ```
pub struct PafParser<'p> {
    target: &'p mut Policy,
    state: ParseState,
}

impl<'p> PafParser<'p> {
    pub fn new(target: &'p mut Policy, options: ParserOptions) -> Self {
        Self {
            target,
            state: ParseState {
                options,
                depth: 0,
                diagnostics: Vec::new(),
            },
        }
    }

    /// Constructs dropped so far in lenient mode.
    pub fn diagnostics(&self) -> &[ParseError] {
        &self.state.diagnostics
    }
}

impl PolicyParser for PafParser<'_> {
    fn parse(&mut self, input: &mut dyn BufRead) -> Result<usize> {
        let mut cursor = LineCursor::new(input);
        let count = self.state.parse_block(&mut cursor, &mut *self.target)?;

        if self.state.depth > 0 {
            let open = self.state.depth;
            self.state.depth = 0;
            self.state.report(
                ParseError::eof(format!("end of input with {open} unclosed block(s)"))
                    .at_line(cursor.line_number()),
            )?;
        }

        debug!(
            parameters = count,
            lines = cursor.line_number(),
            dropped = self.state.diagnostics.len(),
            "Parsed PAF policy"
        );
        Ok(count)
    }
}

struct ParseState {
    options: ParserOptions,
    depth: usize,
    diagnostics: Vec<ParseError>,
}

impl ParseState {
    /// Raises `err` in strict mode; records it otherwise.
    fn report(&mut self, err: ParseError) -> Result<()> {
        if self.options.strict {
            return Err(err.into());
        }
        warn!(line = ?err.line, kind = %err.kind, message = %err.message, "Dropping malformed policy input");
        self.diagnostics.push(err);
        Ok(())
    }

    /// Parses parameter lines into `policy` until a closing `}` for the
    /// current depth or end of input. Returns the number of parameters read.
    fn parse_block(&mut self, cursor: &mut LineCursor<'_>, policy: &mut Policy) -> Result<usize> {
        let mut count = 0;

        while let Some(line) = cursor.next_line()? {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('}') {
                let closes_block = self.depth > 0;
                if closes_block {
                    self.depth -= 1;
                } else {
                    self.report(ParseError::syntax("unmatched '}'").at_line(cursor.line_number()))?;
                }
                let rest = rest.trim_start();
                if !rest.is_empty() {
                    cursor.push_back(rest.to_string());
                }
                if closes_block {
                    return Ok(count);
                }
                continue;
            }

            let Some(caps) = PATTERNS.param_line.captures(trimmed) else {
                self.report(
                    ParseError::syntax(format!("bad parameter line: {trimmed}"))
                        .at_line(cursor.line_number()),
                )?;
                continue;
            };
            let name = caps.get(1).map_or("", |m| m.as_str());
            let value_start = caps.get(0).map_or(0, |m| m.end());
            if !PATTERNS.name.is_match(name) {
                self.report(
                    ParseError::syntax(format!("illegal parameter name: {name}"))
                        .at_line(cursor.line_number()),
                )?;
                continue;
            }

            count += self.parse_value(cursor, policy, name, &trimmed[value_start..])?;
        }

        Ok(count)
    }

    fn parse_value(
        &mut self,
        cursor: &mut LineCursor<'_>,
        policy: &mut Policy,
        name: &str,
        text: &str,
    ) -> Result<usize> {
        let text = text.trim_start();
        if text.is_empty() || text.starts_with('#') || text.starts_with('}') {
            self.report(
                ParseError::syntax(format!("missing value for {name}")).at_line(cursor.line_number()),
            )?;
            if text.starts_with('}') {
                cursor.push_back(text.to_string());
            }
            return Ok(0);
        }

        if let Some(rest) = text.strip_prefix('{') {
            return self.parse_block_value(cursor, policy, name, rest);
        }
        if text.starts_with('"') || text.starts_with('\'') {
            return self.parse_quoted(cursor, policy, name, text.to_string());
        }
        match ScalarKind::classify(&text[..token_end(text)]) {
            Some(kind) => self.parse_scalars(cursor, policy, name, kind, text),
            None => self.parse_bare(cursor, policy, name, text),
        }
    }

    fn parse_block_value(
        &mut self,
        cursor: &mut LineCursor<'_>,
        policy: &mut Policy,
        name: &str,
        rest: &str,
    ) -> Result<usize> {
        let line = cursor.line_number();
        self.depth += 1;

        let sub = share(Policy::new());
        let attached = self.add_value(cursor, policy, name, Value::Policy(Rc::clone(&sub)))?;

        let rest = rest.trim();
        if !rest.is_empty() {
            cursor.push_back(rest.to_string());
        }
        let nested = {
            let mut node = sub.borrow_mut();
            self.parse_block(cursor, &mut node)?
        };

        debug!(name, line, nested, "Parsed nested policy block");
        Ok(if attached { 1 + nested } else { 0 })
    }

    /// Parses whitespace-separated ints, doubles or bools; every token must
    /// be of the same kind as the first.
    fn parse_scalars(
        &mut self,
        cursor: &mut LineCursor<'_>,
        policy: &mut Policy,
        name: &str,
        kind: ScalarKind,
        text: &str,
    ) -> Result<usize> {
        let mut added = false;
        let mut rest = text;

        loop {
            rest = rest.trim_start();
            if rest.is_empty() || rest.starts_with('#') {
                break;
            }
            if rest.starts_with('}') {
                cursor.push_back(rest.to_string());
                break;
            }

            let end = token_end(rest);
            let token = &rest[..end];
            rest = &rest[end..];

            match scalar_value(kind, token) {
                Ok(value) => added |= self.add_value(cursor, policy, name, value)?,
                Err(err) => self.report(err.at_line(cursor.line_number()))?,
            }
        }

        Ok(usize::from(added))
    }

    /// Parses one or more quoted strings, following an unclosed quote onto
    /// subsequent lines.
    fn parse_quoted(
        &mut self,
        cursor: &mut LineCursor<'_>,
        policy: &mut Policy,
        name: &str,
        text: String,
    ) -> Result<usize> {
        let mut added = false;
        let mut rest = text;

        loop {
            let trimmed = rest.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                break;
            }
            if trimmed.starts_with('}') {
                cursor.push_back(trimmed.to_string());
                break;
            }

            let quote = match trimmed.chars().next() {
                Some(quote @ ('"' | '\'')) => quote,
                _ => {
                    self.report(
                        ParseError::format_syntax(format!(
                            "expected quoted string for {name}, found: {trimmed}"
                        ))
                        .at_line(cursor.line_number()),
                    )?;
                    break;
                }
            };

            let body = &trimmed[1..];
            let (value, next) = match body.find(quote) {
                Some(close) => (body[..close].to_string(), body[close + 1..].to_string()),
                None => match self.continue_quoted(cursor, quote, body)? {
                    Some(parts) => parts,
                    None => break,
                },
            };
            added |= self.add_value(cursor, policy, name, Value::String(value))?;
            rest = next;
        }

        Ok(usize::from(added))
    }

    /// Accumulates a quoted string across physical lines, joining them with
    /// single spaces. Returns the string and whatever follows the closing
    /// quote, or `None` if input ended first (lenient mode).
    fn continue_quoted(
        &mut self,
        cursor: &mut LineCursor<'_>,
        quote: char,
        first: &str,
    ) -> Result<Option<(String, String)>> {
        let start_line = cursor.line_number();
        let mut value = String::new();
        append_segment(&mut value, first.trim_end());

        loop {
            let Some(line) = cursor.next_line()? else {
                self.report(
                    ParseError::eof(format!("unterminated string opened with {quote}"))
                        .at_line(start_line),
                )?;
                return Ok(None);
            };
            let line = line.trim_start();
            match line.find(quote) {
                Some(close) => {
                    append_segment(&mut value, line[..close].trim_end());
                    return Ok(Some((value, line[close + 1..].to_string())));
                }
                None => append_segment(&mut value, line.trim_end()),
            }
        }
    }

    /// Parses an unquoted string running to whitespace followed by `#` or
    /// `}`; a leading `@` makes it a file reference.
    fn parse_bare(
        &mut self,
        cursor: &mut LineCursor<'_>,
        policy: &mut Policy,
        name: &str,
        text: &str,
    ) -> Result<usize> {
        let (content, remainder) = match PATTERNS.bare_terminator.find(text) {
            Some(m) => (&text[..m.start()], Some(text[m.start()..].trim_start())),
            None => (text, None),
        };
        let content = content.trim_end();

        let value = match content.strip_prefix('@') {
            Some(path) if path.trim().is_empty() => {
                self.report(
                    ParseError::format_syntax(format!("missing file name after '@' for {name}"))
                        .at_line(cursor.line_number()),
                )?;
                None
            }
            Some(path) => Some(Value::File(PolicyFile::new(path.trim()))),
            None => Some(Value::String(content.to_string())),
        };

        let added = match value {
            Some(value) => self.add_value(cursor, policy, name, value)?,
            None => false,
        };
        if let Some(remainder) = remainder {
            cursor.push_back(remainder.to_string());
        }
        Ok(usize::from(added))
    }

    /// Appends through the store so array homogeneity is enforced; a type
    /// change is reported as a format syntax error.
    fn add_value(
        &mut self,
        cursor: &LineCursor<'_>,
        policy: &mut Policy,
        name: &str,
        value: Value,
    ) -> Result<bool> {
        match policy.add(name, value) {
            Ok(()) => Ok(true),
            Err(err) if err.is_type_error() => {
                self.report(
                    ParseError::format_syntax(format!("array type mismatch: {err}"))
                        .at_line(cursor.line_number()),
                )?;
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

/// End of the token starting at `text[0]`.
fn token_end(text: &str) -> usize {
    text.find(|c: char| c.is_whitespace() || c == '}' || c == '#')
        .unwrap_or(text.len())
}

fn scalar_value(kind: ScalarKind, token: &str) -> std::result::Result<Value, ParseError> {
    match (kind, ScalarKind::classify(token)) {
        (ScalarKind::Bool, Some(ScalarKind::Bool)) => Ok(Value::Bool(token == "true")),
        (ScalarKind::Double, Some(ScalarKind::Double)) => token
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| ParseError::format_syntax(format!("malformed double value: {token}"))),
        (ScalarKind::Int, Some(ScalarKind::Int)) => token
            .parse::<i64>()
            .ok()
            .and_then(|wide| i32::try_from(wide).ok())
            .map(Value::Int)
            .ok_or_else(|| {
                ParseError::unsupported(format!(
                    "integer value {token} does not fit in 32 bits"
                ))
            }),
        (expected, _) => Err(ParseError::format_syntax(format!(
            "expected {} value, found: {token}",
            expected.label()
        ))),
    }
}

fn append_segment(value: &mut String, segment: &str) {
    if segment.is_empty() {
        return;
    }
    if !value.is_empty() {
        value.push(' ');
    }
    value.push_str(segment);
}
