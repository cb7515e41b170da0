//! YAML configuration for a policy load.
//!
//! # Example YAML
//!
//! ```yaml
//! policy: conf/pipeline.paf
//! dictionary: conf/pipeline_dict.paf
//! repository: conf
//! product: pipe_tasks
//! strict: true
//! keep_for_validation: true
//! ```
//!
//! Relative paths are taken relative to the directory holding the
//! configuration file. When `product` is set, `repository` is taken
//! relative to the product directory instead.

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

fn default_true() -> bool {
    true
}

/// What to load and how.
///
/// # Examples
///
/// ```
/// use paf_policy_loader::LoadConfig;
///
/// let config: LoadConfig = serde_yaml::from_str("policy: main.paf\nstrict: false\n").unwrap();
/// assert_eq!(config.policy.to_str(), Some("main.paf"));
/// assert!(!config.strict);
/// assert!(config.keep_for_validation);
/// assert!(config.dictionary.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Policy file to load.
    pub policy: PathBuf,
    /// Dictionary to merge defaults from and validate against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<PathBuf>,
    /// Directory that file references are resolved against; defaults to the
    /// policy file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<PathBuf>,
    /// Product whose directory anchors `repository`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    /// Fail on the first parse or include error.
    #[serde(default = "default_true")]
    pub strict: bool,
    /// Attach the dictionary to the loaded policy.
    #[serde(default = "default_true")]
    pub keep_for_validation: bool,
    /// Directory of the file this configuration was read from.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl LoadConfig {
    pub fn new(policy: impl Into<PathBuf>) -> Self {
        Self {
            policy: policy.into(),
            dictionary: None,
            repository: None,
            product: None,
            strict: true,
            keep_for_validation: true,
            base_dir: None,
        }
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::LoaderError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::LoaderError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut config: Self = serde_yaml::from_reader(reader)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// `path` anchored at the configuration's directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
policy: conf/pipeline.paf
dictionary: conf/pipeline_dict.paf
repository: conf
product: pipe_tasks
strict: false
keep_for_validation: false
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: LoadConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.policy, PathBuf::from("conf/pipeline.paf"));
        assert_eq!(config.dictionary, Some(PathBuf::from("conf/pipeline_dict.paf")));
        assert_eq!(config.repository, Some(PathBuf::from("conf")));
        assert_eq!(config.product.as_deref(), Some("pipe_tasks"));
        assert!(!config.strict);
        assert!(!config.keep_for_validation);
        assert!(config.base_dir.is_none());
    }

    #[test]
    fn test_missing_policy_is_rejected() {
        let result: std::result::Result<LoadConfig, _> = serde_yaml::from_str("strict: true\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("load.yaml");

        let mut config = LoadConfig::new("main.paf");
        config.dictionary = Some(PathBuf::from("dict.paf"));
        config.save(&path).unwrap();

        let loaded = LoadConfig::load(&path).unwrap();
        assert_eq!(loaded.policy, config.policy);
        assert_eq!(loaded.dictionary, config.dictionary);
        assert_eq!(loaded.base_dir.as_deref(), Some(dir.path()));
        assert_eq!(loaded.resolve(Path::new("main.paf")), dir.path().join("main.paf"));
        assert_eq!(loaded.resolve(Path::new("/abs.paf")), PathBuf::from("/abs.paf"));
    }
}
