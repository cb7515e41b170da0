//! Error types for repository resolution and policy loading.

use paf_policy_core::PolicyError;
use thiserror::Error;

/// Errors that can occur while locating, loading or configuring a policy.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Parsing, inclusion, schema or validation failure from the core.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The environment variable naming a product's directory is unset.
    #[error("repository for product '{product}' not found: ${variable} is not set")]
    RepositoryNotFound { product: String, variable: String },

    /// No policy file or text was given to the loader.
    #[error("no policy source configured")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`LoaderError`].
pub type Result<T> = std::result::Result<T, LoaderError>;
