//! Policy loading with inclusion, defaults and validation.
//!
//! [`PolicyLoader`] runs the usual sequence for an application policy:
//!
//! 1. parse the policy file (or text);
//! 2. load every file it references;
//! 3. if a dictionary is configured, load the dictionary and the files it
//!    references, merge its defaults into the policy and validate the
//!    result into a [`ValidationError`] returned with the policy.
//!
//! ```no_run
//! use paf_policy_loader::PolicyLoader;
//!
//! let loaded = PolicyLoader::new()
//!     .policy("conf/pipeline.paf")
//!     .dictionary("conf/pipeline_dict.paf")
//!     .load()
//!     .unwrap();
//!
//! if !loaded.validation.is_empty() {
//!     eprintln!("{}", loaded.validation);
//! }
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use paf_policy_core::{
    Dictionary, ParserOptions, Policy, PolicyError, PolicyFile, PolicySource, PolicyString,
    ValidationError,
};
use tracing::{debug, info};

use crate::config::LoadConfig;
use crate::error::{LoaderError, Result};
use crate::repository::ProductRepository;

/// Where the policy text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyInput {
    File(PathBuf),
    Text(String),
}

/// The outcome of [`PolicyLoader::load`].
#[derive(Debug)]
pub struct LoadedPolicy {
    pub policy: Policy,
    /// Policy and dictionary files attempted while resolving references.
    pub files_loaded: usize,
    /// Validation failures; empty when valid or when no dictionary was
    /// configured.
    pub validation: ValidationError,
}

impl LoadedPolicy {
    pub fn is_valid(&self) -> bool {
        self.validation.is_empty()
    }
}

/// Builder for a policy load.
#[derive(Debug, Clone)]
pub struct PolicyLoader {
    policy: Option<PolicyInput>,
    dictionary: Option<PathBuf>,
    repository: Option<PathBuf>,
    strict: bool,
    keep_for_validation: bool,
}

impl PolicyLoader {
    /// Creates a strict loader with no sources.
    pub fn new() -> Self {
        Self {
            policy: None,
            dictionary: None,
            repository: None,
            strict: true,
            keep_for_validation: true,
        }
    }

    /// Builds a loader from a [`LoadConfig`], resolving `product` through
    /// the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::RepositoryNotFound`] if `product` is set but
    /// its directory variable is not.
    pub fn from_config(config: &LoadConfig) -> Result<Self> {
        Self::from_config_with(config, |variable| std::env::var_os(variable))
    }

    /// Like [`from_config`](Self::from_config), with a caller-supplied
    /// environment lookup.
    pub fn from_config_with(
        config: &LoadConfig,
        lookup: impl Fn(&str) -> Option<OsString>,
    ) -> Result<Self> {
        let mut loader = Self::new()
            .policy(config.resolve(&config.policy))
            .strict(config.strict)
            .keep_for_validation(config.keep_for_validation);
        if let Some(dictionary) = &config.dictionary {
            loader = loader.dictionary(config.resolve(dictionary));
        }

        let repository = match (&config.product, &config.repository) {
            (Some(product), relative) => {
                let root = ProductRepository::resolve_with(product, lookup)?;
                Some(match relative {
                    Some(relative) => root.join(relative),
                    None => root,
                })
            }
            (None, Some(relative)) => Some(config.resolve(relative)),
            (None, None) => None,
        };
        if let Some(repository) = repository {
            loader = loader.repository(repository);
        }
        Ok(loader)
    }

    /// Loads the policy from a file.
    pub fn policy(mut self, path: impl Into<PathBuf>) -> Self {
        self.policy = Some(PolicyInput::File(path.into()));
        self
    }

    /// Loads the policy from in-memory text.
    pub fn policy_str(mut self, text: impl Into<String>) -> Self {
        self.policy = Some(PolicyInput::Text(text.into()));
        self
    }

    pub fn dictionary(mut self, path: impl Into<PathBuf>) -> Self {
        self.dictionary = Some(path.into());
        self
    }

    /// Directory file references are resolved against, for both the policy
    /// and the dictionary. Without it, each file's own directory is used
    /// (the working directory for text input).
    pub fn repository(mut self, dir: impl Into<PathBuf>) -> Self {
        self.repository = Some(dir.into());
        self
    }

    /// Strict parsing and inclusion (the default) fail on the first error;
    /// lenient loading drops malformed values and substitutes empty
    /// policies for unloadable references.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Attach the dictionary to the loaded policy (the default).
    pub fn keep_for_validation(mut self, keep: bool) -> Self {
        self.keep_for_validation = keep;
        self
    }

    /// Runs the load.
    ///
    /// # Errors
    ///
    /// [`LoaderError::NoSourcesAvailable`] without a policy source; any
    /// read, parse or (in strict mode) inclusion failure as
    /// [`LoaderError::Policy`]. Validation failures are not errors: they are
    /// returned in [`LoadedPolicy::validation`].
    pub fn load(&self) -> Result<LoadedPolicy> {
        let input = self.policy.as_ref().ok_or(LoaderError::NoSourcesAvailable)?;
        let options = ParserOptions {
            strict: self.strict,
        };

        let mut policy = Policy::new();
        let parameters = match input {
            PolicyInput::File(path) => PolicyFile::new(path).load_into(&mut policy, options)?,
            PolicyInput::Text(text) => PolicyString::new(text.as_str()).load_into(&mut policy, options)?,
        };
        let repository = self.repository_for(match input {
            PolicyInput::File(path) => Some(path.as_path()),
            PolicyInput::Text(_) => None,
        });
        let mut files_loaded = policy.load_policy_files(&repository, self.strict)?;
        debug!(parameters, files_loaded, repository = %repository.display(), "Loaded policy");

        let mut validation = ValidationError::new();
        if let Some(path) = &self.dictionary {
            let mut dictionary = Dictionary::from_file(path)?;
            files_loaded += dictionary.load_policy_files(&self.repository_for(Some(path.as_path())), self.strict)?;

            let copied =
                policy.merge_defaults(&dictionary, self.keep_for_validation, Some(&mut validation))?;
            if !self.keep_for_validation {
                dictionary
                    .validate(&policy, Some(&mut validation))
                    .map_err(PolicyError::from)?;
            }
            info!(
                dictionary = %path.display(),
                defaults = copied,
                errors = validation.param_count(),
                "Validated policy"
            );
        }

        Ok(LoadedPolicy {
            policy,
            files_loaded,
            validation,
        })
    }

    fn repository_for(&self, file: Option<&Path>) -> PathBuf {
        if let Some(repository) = &self.repository {
            return repository.clone();
        }
        file.and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

impl Default for PolicyLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paf_policy_core::ErrorCode;
    use std::fs;

    #[test]
    fn test_no_source() {
        assert!(matches!(
            PolicyLoader::new().load(),
            Err(LoaderError::NoSourcesAvailable)
        ));
    }

    #[test]
    fn test_text_without_dictionary() {
        let loaded = PolicyLoader::new().policy_str("a: 1 2\n").load().unwrap();
        assert_eq!(loaded.policy.get_int_array("a").unwrap(), vec![1, 2]);
        assert_eq!(loaded.files_loaded, 0);
        assert!(loaded.is_valid());
    }

    #[test]
    fn test_lenient_text_drops_bad_values() {
        let loaded = PolicyLoader::new()
            .policy_str("a: 1 oops\nb: 2\n")
            .strict(false)
            .load()
            .unwrap();
        assert_eq!(loaded.policy.get_int_array("a").unwrap(), vec![1]);
        assert_eq!(loaded.policy.get_int("b").unwrap(), 2);
    }

    #[test]
    fn test_dictionary_defaults_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let dict_path = dir.path().join("dict.paf");
        fs::write(
            &dict_path,
            "definitions: {\n  a: {\n    type: int\n    maxOccurs: 1\n  }\n  b: {\n    type: bool\n    default: true\n  }\n}\n",
        )
        .unwrap();

        let loaded = PolicyLoader::new()
            .policy_str("a: 1 2\n")
            .dictionary(&dict_path)
            .load()
            .unwrap();
        assert!(loaded.policy.get_bool("b").unwrap());
        assert!(loaded.policy.can_validate());
        assert_eq!(loaded.validation.errors("a"), ErrorCode::TOO_MANY_VALUES);

        let detached = PolicyLoader::new()
            .policy_str("a: 1 2\n")
            .dictionary(&dict_path)
            .keep_for_validation(false)
            .load()
            .unwrap();
        assert!(!detached.policy.can_validate());
        assert_eq!(detached.validation.errors("a"), ErrorCode::TOO_MANY_VALUES);
    }
}
