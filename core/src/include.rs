//! Resolution of `@file` references into loaded sub-policies.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::Policy;
use crate::error::{PolicyError, Result};
use crate::format::ParserOptions;
use crate::source::{PolicyFile, PolicySource};
use crate::value::{ValueArray, share};

/// Longest chain of nested includes followed before giving up.
pub const MAX_INCLUDE_DEPTH: usize = 32;

impl Policy {
    /// Replaces every file reference in this policy, at any depth, with the
    /// parsed contents of the referenced file.
    ///
    /// Relative paths are resolved against `repository` (unless the
    /// reference carries its own repository); absolute paths are used as
    /// given. An array of references becomes an array of policies in the
    /// same order. Included files are parsed strictly.
    ///
    /// When a file cannot be read or parsed, `strict` returns the error at
    /// once; otherwise an empty policy takes that entry's place and the
    /// remaining references are still loaded.
    ///
    /// A file that includes itself, directly or through other files, is a
    /// failure like an unreadable one ([`PolicyError::CircularInclude`]), as
    /// is a chain of more than [`MAX_INCLUDE_DEPTH`] nested includes.
    ///
    /// Returns the number of files attempted, failures included.
    ///
    /// # Examples
    ///
    /// ```
    /// use paf_policy_core::Policy;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// std::fs::write(dir.path().join("camera.paf"), "gain: 2.5\n").unwrap();
    ///
    /// let mut policy = Policy::parse_str("camera: @camera.paf\n").unwrap();
    /// assert!(policy.is_file("camera"));
    ///
    /// let attempted = policy.load_policy_files(dir.path(), true).unwrap();
    /// assert_eq!(attempted, 1);
    /// assert_eq!(policy.get_double("camera.gain").unwrap(), 2.5);
    /// ```
    pub fn load_policy_files(&mut self, repository: &Path, strict: bool) -> Result<usize> {
        self.load_references(repository, strict, &mut Vec::new())
    }

    /// `chain` holds the files currently being included, outermost first.
    fn load_references(
        &mut self,
        repository: &Path,
        strict: bool,
        chain: &mut Vec<PathBuf>,
    ) -> Result<usize> {
        let references: Vec<(String, Vec<PolicyFile>)> = self
            .local_entries()
            .filter_map(|(name, values)| match values {
                ValueArray::File(files) => Some((name.clone(), files.clone())),
                _ => None,
            })
            .collect();

        let mut attempted = 0;
        for (name, files) in &references {
            let mut loaded = Vec::with_capacity(files.len());
            for file in files {
                let (policy, count) = load_reference(file, repository, strict, chain)?;
                attempted += count;
                loaded.push(share(policy));
            }
            self.replace_local(name, ValueArray::Policy(loaded));
        }

        for (name, values) in self.local_entries() {
            if references.iter().any(|(included, _)| included == name) {
                continue;
            }
            if let ValueArray::Policy(children) = values {
                for child in children {
                    attempted += child.borrow_mut().load_references(repository, strict, chain)?;
                }
            }
        }

        Ok(attempted)
    }
}

/// Loads one referenced file and everything it references in turn. Returns
/// the policy and the number of files attempted.
fn load_reference(
    file: &PolicyFile,
    repository: &Path,
    strict: bool,
    chain: &mut Vec<PathBuf>,
) -> Result<(Policy, usize)> {
    let path = file.resolve(repository);
    let key = path.canonicalize().unwrap_or_else(|_| path.clone());

    let parsed = if chain.len() >= MAX_INCLUDE_DEPTH || chain.contains(&key) {
        Err(PolicyError::CircularInclude { path: path.clone() })
    } else {
        let mut policy = Policy::new();
        PolicyFile::new(&path)
            .load_into(&mut policy, ParserOptions::default())
            .map(|parameters| {
                debug!(
                    path = %path.display(),
                    parameters,
                    depth = chain.len(),
                    "Included policy file"
                );
                policy
            })
    };

    match parsed {
        Ok(mut policy) => {
            chain.push(key);
            let nested = policy.load_references(repository, strict, chain);
            chain.pop();
            Ok((policy, 1 + nested?))
        }
        Err(err) if strict => Err(err),
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "Failed to include policy file, substituting an empty policy"
            );
            Ok((Policy::new(), 1))
        }
    }
}
