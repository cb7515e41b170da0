//! Locating and loading application policies.
//!
//! This crate sits on top of `paf-policy-core` and provides:
//!
//! - [`ProductRepository`] and [`DefaultPolicyFile`] for policy files that
//!   ship inside a product directory named by a `<PRODUCT>_DIR` variable.
//! - [`PolicyLoader`], a builder that parses a policy, resolves its file
//!   references, merges dictionary defaults and validates the result.
//! - [`LoadConfig`], the YAML description of such a load.
//!
//! # Quick start
//!
//! ```no_run
//! use paf_policy_loader::{LoadConfig, PolicyLoader};
//!
//! let config = LoadConfig::load("conf/load.yaml").unwrap();
//! let loaded = PolicyLoader::from_config(&config).unwrap().load().unwrap();
//!
//! for name in loaded.policy.param_names(false) {
//!     println!("{name}");
//! }
//! if !loaded.is_valid() {
//!     eprintln!("{}", loaded.validation);
//! }
//! ```

mod config;
mod error;
mod loader;
mod repository;

pub use config::LoadConfig;
pub use error::{LoaderError, Result};
pub use loader::{LoadedPolicy, PolicyInput, PolicyLoader};
pub use repository::{DefaultPolicyFile, ProductRepository};
