//! Policy sources: files on disk and in-memory strings.
//!
//! A [`PolicySource`] sniffs its own format through the default
//! [`FormatRegistry`] and parses itself into a caller-supplied [`Policy`].

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::Policy;
use crate::error::{ParseError, PolicyError, Result};
use crate::format::{FormatRegistry, ParserOptions, leading_line};

/// Something a policy can be read from.
pub trait PolicySource {
    /// Name of the format the source is written in.
    ///
    /// # Errors
    ///
    /// Returns a format syntax error if no registered format recognizes the
    /// source, or an I/O error if it cannot be read.
    fn format_name(&self) -> Result<&'static str>;

    /// Parses the source into `policy`, returning the number of parameters
    /// read.
    fn load_into(&self, policy: &mut Policy, options: ParserOptions) -> Result<usize>;
}

/// A reference to a policy file, optionally anchored at a repository
/// directory.
///
/// Relative paths are resolved against the repository (or the repository
/// passed to [`resolve`](PolicyFile::resolve)); absolute paths are used as
/// given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyFile {
    path: PathBuf,
    repository: Option<PathBuf>,
}

impl PolicyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            repository: None,
        }
    }

    /// Anchors relative paths at `repository` regardless of the repository
    /// later passed to [`resolve`](PolicyFile::resolve).
    pub fn with_repository(mut self, repository: impl Into<PathBuf>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repository(&self) -> Option<&Path> {
        self.repository.as_deref()
    }

    /// Full path to read, given the repository of the including context.
    pub fn resolve(&self, repository: &Path) -> PathBuf {
        if self.path.is_absolute() {
            return self.path.clone();
        }
        self.repository
            .as_deref()
            .unwrap_or(repository)
            .join(&self.path)
    }

    fn read(&self) -> Result<(PathBuf, String)> {
        let path = self.resolve(Path::new(""));
        let text = fs::read_to_string(&path).map_err(|source| PolicyError::Io {
            path: Some(path.clone()),
            source,
        })?;
        Ok((path, text))
    }
}

impl PolicySource for PolicyFile {
    fn format_name(&self) -> Result<&'static str> {
        let (path, text) = self.read()?;
        sniff(&text).map_err(|err| err.with_origin(&path.display().to_string()))
    }

    fn load_into(&self, policy: &mut Policy, options: ParserOptions) -> Result<usize> {
        let (path, text) = self.read()?;
        let origin = path.display().to_string();
        let count = parse_text(&text, policy, options).map_err(|err| err.with_origin(&origin))?;
        debug!(path = %origin, parameters = count, "Loaded policy file");
        Ok(count)
    }
}

/// Policy text held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyString {
    text: String,
}

impl PolicyString {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl PolicySource for PolicyString {
    fn format_name(&self) -> Result<&'static str> {
        sniff(&self.text)
    }

    fn load_into(&self, policy: &mut Policy, options: ParserOptions) -> Result<usize> {
        parse_text(&self.text, policy, options)
    }
}

fn sniff(text: &str) -> Result<&'static str> {
    let leading = leading_line(text);
    FormatRegistry::default().recognize(leading).ok_or_else(|| {
        ParseError::format_syntax(format!(
            "unrecognized policy format: {}",
            leading.unwrap_or_default().trim()
        ))
        .into()
    })
}

fn parse_text(text: &str, policy: &mut Policy, options: ParserOptions) -> Result<usize> {
    let format = sniff(text)?;
    let registry = FormatRegistry::default();
    let mut parser = registry.create_parser(format, policy, options)?;
    parser.parse(&mut text.as_bytes())
}
