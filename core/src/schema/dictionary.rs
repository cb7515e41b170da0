//! Dictionaries: policies that describe the shape of other policies.
//!
//! ```text
//! target: pipeline
//! definitions: {
//!     name: {
//!         type: string
//!         minOccurs: 1
//!     }
//!     stage: {
//!         type: Policy
//!         dictionaryFile: stage_dictionary.paf
//!     }
//! }
//! childDefinition: {
//!     type: int
//! }
//! ```

use std::path::Path;

use tracing::debug;

use crate::Policy;
use crate::error::{PolicyError, Result};
use crate::policy::split_name;
use crate::schema::definition::{Definition, SubDictionary, keyword};
use crate::schema::{ErrorCode, ValidationError};
use crate::source::PolicyFile;
use crate::value::{SharedPolicy, Value};

const TARGET: &str = "target";
const DEFINITIONS: &str = "definitions";
const CHILD_DEFINITION: &str = "childDefinition";

/// Deepest nesting of `dictionaryFile` references that is loaded.
pub const MAX_DICTIONARY_DEPTH: usize = 16;

/// A schema for a [`Policy`].
///
/// The dictionary's own content is an ordinary policy; accessors interpret
/// its `definitions`, `childDefinition` and `target` entries.
///
/// # Examples
///
/// ```
/// use paf_policy_core::{Dictionary, ErrorCode, Policy, ValidationError};
///
/// let dictionary = Dictionary::parse_str(
///     "definitions: {\n  gain: {\n    type: double\n    minOccurs: 1\n  }\n}\n",
/// )
/// .unwrap();
///
/// let policy = Policy::parse_str("gain: 1.5\nextra: 2\n").unwrap();
/// let mut errs = ValidationError::new();
/// dictionary.validate(&policy, Some(&mut errs)).unwrap();
///
/// assert!(errs.errors("gain").is_empty());
/// assert_eq!(errs.errors("extra"), ErrorCode::UNKNOWN_NAME);
/// ```
#[derive(Debug)]
pub struct Dictionary {
    policy: Policy,
}

/// Clones share the dictionary's sub-policies.
impl Clone for Dictionary {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.shallow_copy(),
        }
    }
}

impl Dictionary {
    /// Wraps `policy` as a dictionary.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Dictionary`] unless the policy has a
    /// `definitions` block or a `childDefinition` block.
    pub fn from_policy(policy: Policy) -> Result<Self> {
        for key in [DEFINITIONS, CHILD_DEFINITION] {
            if policy.exists(key) && !policy.is_policy(key) {
                return Err(PolicyError::Dictionary(format!("'{key}' must hold a block")));
            }
        }
        if !policy.exists(DEFINITIONS) && !policy.exists(CHILD_DEFINITION) {
            return Err(PolicyError::Dictionary(
                "no 'definitions' or 'childDefinition' block".into(),
            ));
        }
        Ok(Self { policy })
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        Self::from_policy(Policy::parse_str(text)?)
    }

    /// Reads a dictionary file. Referenced sub-dictionary files are not
    /// loaded until [`load_policy_files`](Dictionary::load_policy_files).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_policy(Policy::from_file(path)?)
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Label naming the kind of policy this dictionary describes.
    pub fn target(&self) -> Option<String> {
        self.policy.get_string(TARGET).ok()
    }

    fn definitions(&self) -> Option<SharedPolicy> {
        self.policy.get_policy(DEFINITIONS).ok()
    }

    /// Names with an explicit definition, in sorted order.
    pub fn defined_names(&self) -> Vec<String> {
        self.definitions()
            .map(|definitions| definitions.borrow().names(true))
            .unwrap_or_default()
    }

    pub fn has_child_definition(&self) -> bool {
        self.policy.is_policy(CHILD_DEFINITION)
    }

    /// Definition for a single (undotted) name: the explicit one if present,
    /// otherwise the child definition.
    ///
    /// # Errors
    ///
    /// [`PolicyError::NameNotFound`] if neither exists,
    /// [`PolicyError::Dictionary`] if the definition is malformed.
    pub fn definition(&self, local: &str) -> Result<Definition> {
        if let Some(definitions) = self.definitions() {
            let definitions = definitions.borrow();
            if definitions.exists(local) {
                let block = definitions.get_policy(local).map_err(|_| {
                    PolicyError::Dictionary(format!("definition of '{local}' is not a block"))
                })?;
                let block = block.borrow();
                return Definition::from_policy(local, &block);
            }
        }
        if let Ok(block) = self.policy.get_policy(CHILD_DEFINITION) {
            let block = block.borrow();
            return Definition::from_policy(local, &block);
        }
        Err(PolicyError::NameNotFound(local.to_string()))
    }

    /// Definition for a hierarchical name, descending through the
    /// sub-dictionaries of each intermediate segment.
    ///
    /// # Errors
    ///
    /// [`PolicyError::NameNotFound`] if a segment is undefined or an
    /// intermediate definition has no sub-dictionary,
    /// [`PolicyError::Dictionary`] if a definition is malformed,
    /// [`PolicyError::DictionaryNotLoaded`] if a sub-dictionary file has not
    /// been loaded.
    pub fn lookup(&self, name: &str) -> Result<Definition> {
        let segments = split_name(name)?;
        let rename = |err: PolicyError| match err {
            PolicyError::NameNotFound(_) => PolicyError::NameNotFound(name.to_string()),
            other => other,
        };

        let mut nested: Option<Dictionary> = None;
        for (depth, segment) in segments.iter().enumerate() {
            let current = nested.as_ref().unwrap_or(self);
            let definition = current.definition(segment).map_err(rename)?;
            if depth + 1 == segments.len() {
                return Ok(definition);
            }
            nested = Some(match definition.into_sub_dictionary() {
                SubDictionary::Inline(dictionary) => dictionary,
                SubDictionary::Unloaded(path) => {
                    return Err(PolicyError::DictionaryNotLoaded {
                        name: segments[..=depth].join("."),
                        path,
                    });
                }
                SubDictionary::None => return Err(PolicyError::NameNotFound(name.to_string())),
            });
        }
        Err(PolicyError::NameNotFound(name.to_string()))
    }

    /// Inline sub-dictionary describing the children of `name`, if any.
    pub fn sub_dictionary(&self, name: &str) -> Result<Option<Dictionary>> {
        match self.lookup(name)?.into_sub_dictionary() {
            SubDictionary::Inline(dictionary) => Ok(Some(dictionary)),
            SubDictionary::Unloaded(path) => Err(PolicyError::DictionaryNotLoaded {
                name: name.to_string(),
                path,
            }),
            SubDictionary::None => Ok(None),
        }
    }

    /// Interprets every definition, recursing into loaded sub-dictionaries.
    ///
    /// # Errors
    ///
    /// Returns the first malformed definition as [`PolicyError::Dictionary`].
    pub fn check(&self) -> Result<()> {
        let mut definitions = Vec::new();
        for name in self.defined_names() {
            definitions.push(self.definition(&name)?);
        }
        if self.has_child_definition() {
            definitions.push(self.definition(CHILD_DEFINITION)?);
        }
        for definition in definitions {
            if let SubDictionary::Inline(sub) = definition.sub_dictionary() {
                sub.check()
                    .map_err(|err| PolicyError::Dictionary(format!("{}: {err}", definition.name())))?;
            }
        }
        Ok(())
    }

    /// Validates the top level of `policy`, recursing into sub-policies that
    /// have sub-dictionaries.
    ///
    /// Every present name is checked against its definition; undeclared
    /// names are `UNKNOWN_NAME` unless a child definition exists, and
    /// declared names that are absent are checked for `minOccurs`.
    ///
    /// With `errs`, failures are recorded there and `Ok(())` is returned.
    /// Without it, any failure is returned once the pass completes.
    pub fn validate(
        &self,
        policy: &Policy,
        errs: Option<&mut ValidationError>,
    ) -> std::result::Result<(), ValidationError> {
        match errs {
            Some(errs) => {
                self.validate_into(policy, errs);
                Ok(())
            }
            None => {
                let mut errs = ValidationError::new();
                self.validate_into(policy, &mut errs);
                if errs.is_empty() { Ok(()) } else { Err(errs) }
            }
        }
    }

    fn validate_into(&self, policy: &Policy, errs: &mut ValidationError) {
        let before = errs.param_count();

        for (name, values) in policy.local_entries() {
            match self.definition(name) {
                Ok(definition) => definition.validate_values(name, values, errs),
                Err(PolicyError::NameNotFound(_)) => errs.add_error(name, ErrorCode::UNKNOWN_NAME),
                Err(_) => errs.add_error(name, ErrorCode::BAD_DEFINITION),
            }
        }

        for name in self.defined_names() {
            if policy.exists(&name) {
                continue;
            }
            match self.definition(&name) {
                Ok(definition) => definition.validate(policy, &name, errs),
                Err(_) => errs.add_error(name, ErrorCode::BAD_DEFINITION),
            }
        }

        debug!(
            names = policy.name_count(),
            failed = errs.param_count() - before,
            target = self.target().as_deref().unwrap_or("-"),
            "Validated policy against dictionary"
        );
    }

    /// Loads every file referenced by the dictionary, turning each
    /// `dictionaryFile` into a loaded inline `dictionary`. Loaded
    /// sub-dictionaries may reference further files; those are loaded too.
    ///
    /// Returns the number of files attempted; `strict` has the same meaning
    /// as for [`Policy::load_policy_files`].
    ///
    /// # Errors
    ///
    /// Besides include failures, returns [`PolicyError::Dictionary`] when
    /// sub-dictionary files nest more than [`MAX_DICTIONARY_DEPTH`] levels
    /// deep, which is what a circular `dictionaryFile` reference produces.
    pub fn load_policy_files(&mut self, repository: &Path, strict: bool) -> Result<usize> {
        let mut attempted = 0;
        for _ in 0..=MAX_DICTIONARY_DEPTH {
            let converted = convert_dictionary_files(&self.policy)?;
            attempted += self.policy.load_policy_files(repository, strict)?;
            if converted == 0 {
                debug!(repository = %repository.display(), attempted, "Loaded dictionary files");
                return Ok(attempted);
            }
        }
        Err(PolicyError::Dictionary(format!(
            "dictionary files under {} nest more than {MAX_DICTIONARY_DEPTH} levels; \
             check for a circular 'dictionaryFile' reference",
            repository.display()
        )))
    }
}

/// Rewrites `dictionaryFile: path` entries as `dictionary: @path` so the
/// generic include pass loads them. Returns how many were rewritten.
fn convert_dictionary_files(dictionary: &Policy) -> Result<usize> {
    let mut blocks = Vec::new();
    if let Ok(definitions) = dictionary.get_policy(DEFINITIONS) {
        let definitions = definitions.borrow();
        for name in definitions.policy_names(true) {
            blocks.push(definitions.get_policy(&name)?);
        }
    }
    if let Ok(child) = dictionary.get_policy(CHILD_DEFINITION) {
        blocks.push(child);
    }

    let mut converted = 0;
    for block in blocks {
        let mut block = block.borrow_mut();
        if block.exists(keyword::DICTIONARY_FILE) && !block.exists(keyword::DICTIONARY) {
            let file = match block.get_value(keyword::DICTIONARY_FILE)? {
                Value::String(path) => PolicyFile::new(path),
                Value::File(file) => file,
                other => {
                    return Err(PolicyError::Dictionary(format!(
                        "'dictionaryFile' must hold a path, not a {} value",
                        other.value_type()
                    )));
                }
            };
            block.remove(keyword::DICTIONARY_FILE)?;
            block.set(keyword::DICTIONARY, file)?;
            converted += 1;
        } else if let Ok(sub) = block.get_policy(keyword::DICTIONARY) {
            converted += convert_dictionary_files(&sub.borrow())?;
        }
    }
    Ok(converted)
}
