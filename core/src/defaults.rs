//! Default extraction and merging.

use tracing::{debug, warn};

use crate::Policy;
use crate::error::{PolicyError, Result};
use crate::schema::{Dictionary, ErrorCode, SubDictionary, ValidationError};
use crate::value::{Value, ValueArray};

/// Where [`Policy::merge_defaults`] takes its defaults from.
pub enum DefaultsSource<'a> {
    /// An ordinary policy whose values are the defaults.
    Policy(&'a Policy),
    /// A dictionary whose definitions' defaults are materialized first.
    Dictionary(&'a Dictionary),
}

impl<'a> From<&'a Policy> for DefaultsSource<'a> {
    fn from(policy: &'a Policy) -> Self {
        Self::Policy(policy)
    }
}

impl<'a> From<&'a Dictionary> for DefaultsSource<'a> {
    fn from(dictionary: &'a Dictionary) -> Self {
        Self::Dictionary(dictionary)
    }
}

/// Builds a policy holding every default declared by `dictionary`.
///
/// Nested dictionaries contribute a sub-policy only when it ends up
/// non-empty. Invalid defaults, malformed definitions and unloaded
/// sub-dictionaries are recorded in `errs` when given; without it the first
/// completed extraction with any problem fails with
/// [`PolicyError::Validation`].
///
/// # Examples
///
/// ```
/// use paf_policy_core::{Dictionary, extract_defaults};
///
/// let dictionary = Dictionary::parse_str(
///     "definitions: {\n  retries: {\n    type: int\n    default: 3\n  }\n  name: {\n    type: string\n  }\n}\n",
/// )
/// .unwrap();
///
/// let defaults = extract_defaults(&dictionary, None).unwrap();
/// assert_eq!(defaults.get_int("retries").unwrap(), 3);
/// assert!(!defaults.exists("name"));
/// ```
pub fn extract_defaults(dictionary: &Dictionary, errs: Option<&mut ValidationError>) -> Result<Policy> {
    Policy::from_dictionary(dictionary, false, errs)
}

impl Policy {
    /// Materializes the defaults of `dictionary`. With `validate`, the
    /// dictionary is attached to the result so later `set`/`add` calls are
    /// checked and [`validate`](Policy::validate) is available.
    pub fn from_dictionary(
        dictionary: &Dictionary,
        validate: bool,
        errs: Option<&mut ValidationError>,
    ) -> Result<Policy> {
        let mut problems = ValidationError::new();
        let mut policy = Policy::new();
        collect_defaults(dictionary, &mut policy, &mut problems)?;

        match errs {
            Some(errs) => errs.absorb("", &problems),
            None if !problems.is_empty() => return Err(problems.into()),
            None => {}
        }
        if validate {
            policy.set_dictionary(dictionary.clone());
        }
        Ok(policy)
    }

    /// Copies every name present in `source` but absent here, returning the
    /// number of names copied. Copied values are deep copies.
    ///
    /// A dictionary source is materialized with [`extract_defaults`] first.
    /// With `keep_for_validation`, a dictionary source (or the dictionary
    /// attached to a policy source) is attached here. If a dictionary is
    /// attached after merging, the result is validated: into `errs` when
    /// given, or failing with [`PolicyError::Validation`] otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use paf_policy_core::Policy;
    ///
    /// let defaults = Policy::parse_str("a: 1\nb: {\n  c: 2\n  d: 3\n}\n").unwrap();
    /// let mut policy = Policy::parse_str("a: 10\nb: {\n  c: 20\n}\n").unwrap();
    ///
    /// let copied = policy.merge_defaults(&defaults, false, None).unwrap();
    /// assert_eq!(copied, 1);
    /// assert_eq!(policy.get_int("a").unwrap(), 10);
    /// assert_eq!(policy.get_int("b.c").unwrap(), 20);
    /// assert_eq!(policy.get_int("b.d").unwrap(), 3);
    /// ```
    pub fn merge_defaults<'a>(
        &mut self,
        source: impl Into<DefaultsSource<'a>>,
        keep_for_validation: bool,
        mut errs: Option<&mut ValidationError>,
    ) -> Result<usize> {
        let materialized;
        let (defaults, schema) = match source.into() {
            DefaultsSource::Policy(policy) => (policy, policy.dictionary().cloned()),
            DefaultsSource::Dictionary(dictionary) => {
                materialized = Policy::from_dictionary(dictionary, false, errs.as_deref_mut())?;
                (&materialized, Some(dictionary.clone()))
            }
        };

        let mut copied = 0;
        for name in defaults.names(false) {
            if self.exists(&name) {
                continue;
            }
            let values = defaults.get_values(&name)?.deep_copy();
            match self.put_values(&name, values) {
                Ok(()) => copied += 1,
                Err(err) if err.is_type_error() => {
                    debug!(name = %name, error = %err, "Skipping default shadowed by a non-policy value");
                }
                Err(err) => return Err(err),
            }
        }

        if keep_for_validation {
            if let Some(schema) = schema {
                self.set_dictionary(schema);
            }
        }
        if self.can_validate() {
            self.validate(errs)?;
        }

        debug!(copied, "Merged defaults");
        Ok(copied)
    }
}

fn collect_defaults(dictionary: &Dictionary, policy: &mut Policy, errs: &mut ValidationError) -> Result<()> {
    for name in dictionary.defined_names() {
        let definition = match dictionary.definition(&name) {
            Ok(definition) => definition,
            Err(PolicyError::Dictionary(message)) => {
                warn!(name = %name, %message, "Skipping malformed definition");
                errs.add_error(name, ErrorCode::BAD_DEFINITION);
                continue;
            }
            Err(err) => return Err(err),
        };

        if definition.default_values().is_some() {
            definition.apply_default_into(policy, &name, Some(&mut *errs))?;
            continue;
        }

        match definition.sub_dictionary() {
            SubDictionary::Inline(sub) => {
                let mut nested = Policy::new();
                let mut nested_errs = ValidationError::new();
                collect_defaults(sub, &mut nested, &mut nested_errs)?;
                errs.absorb(&format!("{name}."), &nested_errs);
                if !nested.is_empty() {
                    policy.put_values(&name, ValueArray::from(Value::from(nested)))?;
                }
            }
            SubDictionary::Unloaded(_) => errs.add_error(name, ErrorCode::NOT_LOADED),
            SubDictionary::None => {}
        }
    }
    Ok(())
}
