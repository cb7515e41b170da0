//! Product repositories and default policy files.
//!
//! A product's installation directory is named by the environment variable
//! `<PRODUCT>_DIR`, where `<PRODUCT>` is the product name upper-cased with
//! dashes turned into underscores (`pipe_tasks` → `PIPE_TASKS_DIR`).

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use paf_policy_core::{ParserOptions, Policy, PolicyFile, PolicySource};
use tracing::debug;

use crate::error::{LoaderError, Result};

/// Resolves product names to their installation directories.
pub struct ProductRepository;

impl ProductRepository {
    /// Environment variable holding the directory of `product`.
    ///
    /// # Examples
    ///
    /// ```
    /// use paf_policy_loader::ProductRepository;
    ///
    /// assert_eq!(ProductRepository::variable_name("pipe_tasks"), "PIPE_TASKS_DIR");
    /// assert_eq!(ProductRepository::variable_name("meas-algorithms"), "MEAS_ALGORITHMS_DIR");
    /// ```
    pub fn variable_name(product: &str) -> String {
        format!("{}_DIR", product.replace('-', "_").to_ascii_uppercase())
    }

    /// Reads the product directory from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::RepositoryNotFound`] if the variable is unset
    /// or empty.
    pub fn resolve(product: &str) -> Result<PathBuf> {
        Self::resolve_with(product, |variable| std::env::var_os(variable))
    }

    /// Like [`resolve`](Self::resolve), with a caller-supplied variable
    /// lookup.
    pub fn resolve_with(
        product: &str,
        lookup: impl Fn(&str) -> Option<OsString>,
    ) -> Result<PathBuf> {
        let variable = Self::variable_name(product);
        match lookup(&variable) {
            Some(dir) if !dir.is_empty() => {
                let dir = PathBuf::from(dir);
                debug!(product, variable = %variable, dir = %dir.display(), "Resolved product repository");
                Ok(dir)
            }
            _ => Err(LoaderError::RepositoryNotFound {
                product: product.to_string(),
                variable,
            }),
        }
    }
}

/// A policy file shipped inside a product's directory.
///
/// File references inside the policy are resolved against the product
/// directory.
#[derive(Debug, Clone)]
pub struct DefaultPolicyFile {
    product: String,
    file: PolicyFile,
}

impl DefaultPolicyFile {
    /// Locates `relative_path` inside the directory of `product`.
    pub fn new(product: &str, relative_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_lookup(product, relative_path, |variable| std::env::var_os(variable))
    }

    pub fn with_lookup(
        product: &str,
        relative_path: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<OsString>,
    ) -> Result<Self> {
        let repository = ProductRepository::resolve_with(product, lookup)?;
        Ok(Self {
            product: product.to_string(),
            file: PolicyFile::new(relative_path.as_ref()).with_repository(repository),
        })
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    /// Product directory the file and its references live in.
    pub fn repository(&self) -> &Path {
        self.file.repository().unwrap_or(Path::new(""))
    }

    /// Full path of the policy file.
    pub fn path(&self) -> PathBuf {
        self.file.resolve(self.repository())
    }

    pub fn file(&self) -> &PolicyFile {
        &self.file
    }

    pub fn into_file(self) -> PolicyFile {
        self.file
    }

    /// Parses the file and loads every file it references.
    pub fn load(&self, strict: bool) -> Result<Policy> {
        let mut policy = Policy::new();
        self.file.load_into(&mut policy, ParserOptions { strict })?;
        let included = policy.load_policy_files(self.repository(), strict)?;
        debug!(
            product = %self.product,
            path = %self.path().display(),
            included,
            "Loaded default policy file"
        );
        Ok(policy)
    }
}
