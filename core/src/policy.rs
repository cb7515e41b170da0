//! The hierarchical value store.
//!
//! A [`Policy`] maps local name segments to [`ValueArray`]s. Hierarchical
//! names such as `"camera.ccd.gain"` descend through intermediate segments,
//! each of which must hold a sub-policy; the last element of an
//! intermediate array is the one descended into.
//!
//! # Example
//!
//! ```
//! use paf_policy_core::{Policy, ValueType};
//!
//! let mut policy = Policy::new();
//! policy.set("camera.name", "lsst").unwrap();
//! policy.add("camera.ccds", 1).unwrap();
//! policy.add("camera.ccds", 2).unwrap();
//!
//! assert!(policy.is_policy("camera"));
//! assert_eq!(policy.get_string("camera.name").unwrap(), "lsst");
//! assert_eq!(policy.get_int_array("camera.ccds").unwrap(), vec![1, 2]);
//! assert_eq!(policy.value_type("camera.ccds"), Some(ValueType::Int));
//! ```

use std::collections::BTreeMap;
use std::io::{BufRead, Read};
use std::path::Path;
use std::rc::Rc;

use crate::error::{PolicyError, Result};
use crate::format::ParserOptions;
use crate::schema::{Dictionary, ErrorCode, ValidationError};
use crate::source::{PolicyFile, PolicySource, PolicyString};
use crate::value::{PolicyValue, SharedPolicy, Value, ValueArray, ValueType, share};

/// Category filter used when enumerating names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// Every name.
    All,
    /// Names holding anything other than sub-policies.
    Params,
    /// Names holding sub-policies.
    Policies,
    /// Names holding unresolved file references.
    Files,
}

impl NameKind {
    fn accepts(self, values: &ValueArray) -> bool {
        match self {
            Self::All => true,
            Self::Params => !matches!(values, ValueArray::Policy(_)),
            Self::Policies => matches!(values, ValueArray::Policy(_)),
            Self::Files => matches!(values, ValueArray::File(_)),
        }
    }
}

/// A node in the hierarchical configuration tree.
///
/// `Policy` is intentionally not `Clone`: use [`shallow_copy`] to get a new
/// root that shares its sub-policies with the original, or [`deep_copy`] to
/// clone the whole reachable tree.
///
/// [`shallow_copy`]: Policy::shallow_copy
/// [`deep_copy`]: Policy::deep_copy
#[derive(Debug, Default)]
pub struct Policy {
    params: BTreeMap<String, ValueArray>,
    dictionary: Option<Rc<Dictionary>>,
}

impl Policy {
    /// Creates an empty policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses policy text in a recognized format (strict mode).
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Parse`] when the text is malformed.
    pub fn parse_str(text: &str) -> Result<Self> {
        let mut policy = Self::new();
        PolicyString::new(text).load_into(&mut policy, ParserOptions::default())?;
        Ok(policy)
    }

    /// Reads and parses a policy file (strict mode).
    ///
    /// File references inside the file are left unresolved; call
    /// [`load_policy_files`](Policy::load_policy_files) to include them.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Io`] if the file cannot be read, or
    /// [`PolicyError::Parse`] if it is malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut policy = Self::new();
        PolicyFile::new(path.as_ref()).load_into(&mut policy, ParserOptions::default())?;
        Ok(policy)
    }

    /// Parses policy text read from `reader`.
    pub fn from_reader(reader: &mut dyn BufRead, options: ParserOptions) -> Result<Self> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|source| PolicyError::Io { path: None, source })?;
        let mut policy = Self::new();
        PolicyString::new(text).load_into(&mut policy, options)?;
        Ok(policy)
    }

    /// Number of top-level names.
    pub fn name_count(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    // -----------------------------------------------------------------------
    // Name resolution
    // -----------------------------------------------------------------------

    /// Resolves `name` and hands the array stored there (if any) to `f`.
    ///
    /// Fails only when the name is illegal or an intermediate segment holds
    /// something other than a policy.
    fn lookup<R>(&self, name: &str, f: impl FnOnce(Option<&ValueArray>) -> R) -> Result<R> {
        let segments = split_name(name)?;
        self.lookup_segments(name, &segments, 0, f)
    }

    fn lookup_segments<R>(
        &self,
        full: &str,
        segments: &[&str],
        depth: usize,
        f: impl FnOnce(Option<&ValueArray>) -> R,
    ) -> Result<R> {
        let entry = self.params.get(segments[depth]);
        if depth + 1 == segments.len() {
            return Ok(f(entry));
        }
        match entry {
            None => Ok(f(None)),
            Some(ValueArray::Policy(children)) => match children.last() {
                Some(child) => child.borrow().lookup_segments(full, segments, depth + 1, f),
                None => Ok(f(None)),
            },
            Some(other) => Err(PolicyError::NotAPolicy {
                name: full.to_string(),
                partial: segments[..=depth].join("."),
                actual: other.value_type(),
            }),
        }
    }

    /// Resolves the node that owns the last segment of `name` and hands it,
    /// together with that segment, to `f`. With `ensure`, missing
    /// intermediate policies are created on the way down.
    fn resolve_mut<R>(
        &mut self,
        name: &str,
        ensure: bool,
        f: impl FnOnce(&mut Policy, &str) -> Result<R>,
    ) -> Result<R> {
        let segments = split_name(name)?;
        self.resolve_segments_mut(name, &segments, 0, ensure, f)
    }

    fn resolve_segments_mut<R>(
        &mut self,
        full: &str,
        segments: &[&str],
        depth: usize,
        ensure: bool,
        f: impl FnOnce(&mut Policy, &str) -> Result<R>,
    ) -> Result<R> {
        let segment = segments[depth];
        if depth + 1 == segments.len() {
            return f(self, segment);
        }

        let child = match self.params.get(segment) {
            Some(ValueArray::Policy(children)) if !children.is_empty() => {
                Rc::clone(&children[children.len() - 1])
            }
            Some(other) => {
                return Err(PolicyError::NotAPolicy {
                    name: full.to_string(),
                    partial: segments[..=depth].join("."),
                    actual: other.value_type(),
                });
            }
            None if ensure => {
                let child = share(Policy::new());
                self.params
                    .insert(segment.to_string(), ValueArray::Policy(vec![Rc::clone(&child)]));
                child
            }
            None => return Err(PolicyError::NameNotFound(full.to_string())),
        };

        let mut node = child.borrow_mut();
        node.resolve_segments_mut(full, segments, depth + 1, ensure, f)
    }

    // -----------------------------------------------------------------------
    // Predicates
    // -----------------------------------------------------------------------

    /// Returns `true` if a value is stored under `name`.
    pub fn exists(&self, name: &str) -> bool {
        self.value_type(name).is_some()
    }

    /// Returns the type stored under `name`, or `None` if nothing is.
    pub fn value_type(&self, name: &str) -> Option<ValueType> {
        self.lookup(name, |entry| entry.map(ValueArray::value_type))
            .ok()
            .flatten()
    }

    /// Number of values stored under `name`; zero for unknown names.
    pub fn value_count(&self, name: &str) -> usize {
        self.lookup(name, |entry| entry.map_or(0, ValueArray::len))
            .unwrap_or(0)
    }

    /// Returns `true` if more than one value is stored under `name`.
    pub fn is_array(&self, name: &str) -> bool {
        self.value_count(name) > 1
    }

    pub fn is_bool(&self, name: &str) -> bool {
        self.value_type(name) == Some(ValueType::Bool)
    }

    pub fn is_int(&self, name: &str) -> bool {
        self.value_type(name) == Some(ValueType::Int)
    }

    pub fn is_double(&self, name: &str) -> bool {
        self.value_type(name) == Some(ValueType::Double)
    }

    pub fn is_string(&self, name: &str) -> bool {
        self.value_type(name) == Some(ValueType::String)
    }

    pub fn is_policy(&self, name: &str) -> bool {
        self.value_type(name) == Some(ValueType::Policy)
    }

    pub fn is_file(&self, name: &str) -> bool {
        self.value_type(name) == Some(ValueType::File)
    }

    // -----------------------------------------------------------------------
    // Getters
    // -----------------------------------------------------------------------

    /// Returns the last value stored under `name`.
    ///
    /// # Errors
    ///
    /// [`PolicyError::NameNotFound`] if absent, [`PolicyError::TypeError`] if
    /// the stored values are not of type `T`.
    pub fn get<T: PolicyValue>(&self, name: &str) -> Result<T> {
        self.lookup(name, |entry| {
            let values = typed_slice::<T>(name, entry)?;
            values
                .last()
                .cloned()
                .ok_or_else(|| PolicyError::NameNotFound(name.to_string()))
        })?
    }

    /// Returns every value stored under `name`, in insertion order.
    pub fn get_array<T: PolicyValue>(&self, name: &str) -> Result<Vec<T>> {
        self.lookup(name, |entry| typed_slice::<T>(name, entry).map(<[T]>::to_vec))?
    }

    /// Returns the last value stored under `name` regardless of type.
    pub fn get_value(&self, name: &str) -> Result<Value> {
        self.lookup(name, |entry| entry.and_then(ValueArray::last))?
            .ok_or_else(|| PolicyError::NameNotFound(name.to_string()))
    }

    /// Returns a copy of the whole array stored under `name`. Sub-policies in
    /// the copy are shared with this policy.
    pub fn get_values(&self, name: &str) -> Result<ValueArray> {
        self.lookup(name, |entry| entry.cloned())?
            .ok_or_else(|| PolicyError::NameNotFound(name.to_string()))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        self.get(name)
    }

    pub fn get_int(&self, name: &str) -> Result<i32> {
        self.get(name)
    }

    pub fn get_double(&self, name: &str) -> Result<f64> {
        self.get(name)
    }

    pub fn get_string(&self, name: &str) -> Result<String> {
        self.get(name)
    }

    pub fn get_policy(&self, name: &str) -> Result<SharedPolicy> {
        self.get(name)
    }

    pub fn get_file(&self, name: &str) -> Result<PolicyFile> {
        self.get(name)
    }

    pub fn get_bool_array(&self, name: &str) -> Result<Vec<bool>> {
        self.get_array(name)
    }

    pub fn get_int_array(&self, name: &str) -> Result<Vec<i32>> {
        self.get_array(name)
    }

    pub fn get_double_array(&self, name: &str) -> Result<Vec<f64>> {
        self.get_array(name)
    }

    pub fn get_string_array(&self, name: &str) -> Result<Vec<String>> {
        self.get_array(name)
    }

    pub fn get_policy_array(&self, name: &str) -> Result<Vec<SharedPolicy>> {
        self.get_array(name)
    }

    pub fn get_file_array(&self, name: &str) -> Result<Vec<PolicyFile>> {
        self.get_array(name)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Replaces everything stored under `name` with the single `value`,
    /// creating intermediate policies as needed.
    ///
    /// # Errors
    ///
    /// [`PolicyError::BadName`] for an illegal name,
    /// [`PolicyError::NotAPolicy`] if an intermediate segment holds a
    /// non-policy value, or [`PolicyError::Validation`] if a dictionary is
    /// attached and rejects the value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.check_against_dictionary(name, &value, 0)?;
        self.put_values(name, ValueArray::from(value))
    }

    /// Replaces everything stored under `name` with `values`. An empty array
    /// removes the name.
    pub fn set_values(&mut self, name: &str, values: ValueArray) -> Result<()> {
        for (count, value) in values.iter().enumerate() {
            self.check_against_dictionary(name, &value, count)?;
        }
        self.put_values(name, values)
    }

    /// Appends `value` to the array stored under `name`.
    ///
    /// # Errors
    ///
    /// [`PolicyError::TypeError`] if the existing values have a different
    /// type. With a dictionary attached, the value is checked against the
    /// matching definition (including the running count against
    /// `maxOccurs`) and rejected with [`PolicyError::Validation`].
    pub fn add(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let count = self.value_count(name);
        self.check_against_dictionary(name, &value, count)?;
        self.resolve_mut(name, true, |node, local| {
            match node.params.get_mut(local) {
                Some(values) => values.push(value).map_err(|rejected| {
                    PolicyError::type_error(name, values.value_type(), rejected.value_type())
                }),
                None => {
                    node.params.insert(local.to_string(), ValueArray::from(value));
                    Ok(())
                }
            }
        })
    }

    /// Removes `name`; returns whether anything was stored there.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        match self.resolve_mut(name, false, |node, local| Ok(node.params.remove(local).is_some())) {
            Err(PolicyError::NameNotFound(_)) => Ok(false),
            other => other,
        }
    }

    /// Writes `values` without consulting the attached dictionary.
    pub(crate) fn put_values(&mut self, name: &str, values: ValueArray) -> Result<()> {
        self.resolve_mut(name, true, |node, local| {
            if values.is_empty() {
                node.params.remove(local);
            } else {
                node.params.insert(local.to_string(), values);
            }
            Ok(())
        })
    }

    /// Replaces the top-level array stored under `local`.
    pub(crate) fn replace_local(&mut self, local: &str, values: ValueArray) {
        self.params.insert(local.to_string(), values);
    }

    pub(crate) fn local_entries(&self) -> impl Iterator<Item = (&String, &ValueArray)> {
        self.params.iter()
    }

    fn check_against_dictionary(&self, name: &str, value: &Value, count: usize) -> Result<()> {
        let Some(dictionary) = &self.dictionary else {
            return Ok(());
        };
        let mut errs = ValidationError::new();
        match dictionary.lookup(name) {
            Ok(definition) => definition.validate_value(name, value, Some(count), &mut errs),
            Err(PolicyError::NameNotFound(_)) => errs.add_error(name, ErrorCode::UNKNOWN_NAME),
            Err(PolicyError::DictionaryNotLoaded { .. }) => errs.add_error(name, ErrorCode::NOT_LOADED),
            Err(PolicyError::Dictionary(_)) => errs.add_error(name, ErrorCode::BAD_DEFINITION),
            Err(other) => return Err(other),
        }
        if errs.is_empty() {
            Ok(())
        } else {
            Err(errs.into())
        }
    }

    // -----------------------------------------------------------------------
    // Enumeration
    // -----------------------------------------------------------------------

    /// Appends names of the requested `kind` to `out`; returns how many were
    /// appended. Nested names are dotted unless `top_level_only`.
    pub fn collect_names(&self, kind: NameKind, top_level_only: bool, out: &mut Vec<String>) -> usize {
        let before = out.len();
        self.collect_prefixed("", kind, top_level_only, out);
        out.len() - before
    }

    fn collect_prefixed(&self, prefix: &str, kind: NameKind, top_level_only: bool, out: &mut Vec<String>) {
        for (key, values) in &self.params {
            let full = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            if kind.accepts(values) {
                out.push(full.clone());
            }
            if top_level_only {
                continue;
            }
            if let ValueArray::Policy(children) = values {
                if let Some(child) = children.last() {
                    child.borrow().collect_prefixed(&full, kind, false, out);
                }
            }
        }
    }

    /// All names, parents listed before their children.
    pub fn names(&self, top_level_only: bool) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_names(NameKind::All, top_level_only, &mut out);
        out
    }

    pub fn param_names(&self, top_level_only: bool) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_names(NameKind::Params, top_level_only, &mut out);
        out
    }

    pub fn policy_names(&self, top_level_only: bool) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_names(NameKind::Policies, top_level_only, &mut out);
        out
    }

    pub fn file_names(&self, top_level_only: bool) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_names(NameKind::Files, top_level_only, &mut out);
        out
    }

    // -----------------------------------------------------------------------
    // Copying
    // -----------------------------------------------------------------------

    /// New root whose sub-policies are shared with `self`: mutating a
    /// descendant through either copy is visible through both.
    pub fn shallow_copy(&self) -> Policy {
        Policy {
            params: self.params.clone(),
            dictionary: self.dictionary.clone(),
        }
    }

    /// Recursively clones every reachable node.
    pub fn deep_copy(&self) -> Policy {
        Policy {
            params: self
                .params
                .iter()
                .map(|(key, values)| (key.clone(), values.deep_copy()))
                .collect(),
            dictionary: self.dictionary.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Schema attachment
    // -----------------------------------------------------------------------

    /// Attaches a dictionary; subsequent `set`/`add` calls are checked
    /// against it and [`validate`](Policy::validate) becomes available.
    pub fn set_dictionary(&mut self, dictionary: Dictionary) {
        self.dictionary = Some(Rc::new(dictionary));
    }

    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.dictionary.as_deref()
    }

    pub fn can_validate(&self) -> bool {
        self.dictionary.is_some()
    }

    /// Validates this policy against its attached dictionary.
    ///
    /// With an accumulator, errors are recorded there and `Ok(())` is
    /// returned; without one, the first completed pass with any error fails
    /// with [`PolicyError::Validation`].
    pub fn validate(&self, errs: Option<&mut ValidationError>) -> Result<()> {
        let dictionary = self
            .dictionary
            .as_ref()
            .ok_or_else(|| PolicyError::Dictionary("no dictionary attached to policy".into()))?;
        dictionary.validate(self, errs)?;
        Ok(())
    }
}

fn typed_slice<'a, T: PolicyValue>(name: &str, entry: Option<&'a ValueArray>) -> Result<&'a [T]> {
    let values = entry.ok_or_else(|| PolicyError::NameNotFound(name.to_string()))?;
    T::slice(values).ok_or_else(|| PolicyError::type_error(name, T::TYPE, values.value_type()))
}

/// Splits a dotted name into segments, rejecting empty or non-word segments.
pub(crate) fn split_name(name: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.iter().all(|segment| is_name_segment(segment)) {
        Ok(segments)
    } else {
        Err(PolicyError::BadName(name.to_string()))
    }
}

fn is_name_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Policy {
        let mut policy = Policy::new();
        policy.set("name", "isr").unwrap();
        policy.set("stage.threshold", 4.5).unwrap();
        policy.add("stage.ids", 3).unwrap();
        policy.add("stage.ids", 7).unwrap();
        policy.set("stage.inner.enabled", true).unwrap();
        policy
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let policy = sample();
        assert_eq!(policy.get_string("name").unwrap(), "isr");
        assert_eq!(policy.get_double("stage.threshold").unwrap(), 4.5);
        assert!(policy.get_bool("stage.inner.enabled").unwrap());
        assert!(policy.exists("stage.inner"));
    }

    #[test]
    fn test_set_discards_previous_values() {
        let mut policy = sample();
        policy.set("stage.ids", 42).unwrap();
        assert_eq!(policy.get_int_array("stage.ids").unwrap(), vec![42]);
    }

    #[test]
    fn test_scalar_get_returns_last_element() {
        let policy = sample();
        assert_eq!(policy.get_int("stage.ids").unwrap(), 7);
        assert_eq!(policy.value_count("stage.ids"), 2);
        assert!(policy.is_array("stage.ids"));
    }

    #[test]
    fn test_add_rejects_mismatched_type() {
        let mut policy = sample();
        let err = policy.add("stage.ids", "eight").unwrap_err();
        match err {
            PolicyError::TypeError { name, expected, actual } => {
                assert_eq!(name, "stage.ids");
                assert_eq!(expected, ValueType::Int);
                assert_eq!(actual, ValueType::String);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(policy.value_count("stage.ids"), 2);
    }

    #[test]
    fn test_get_reports_missing_and_wrong_type() {
        let policy = sample();
        assert!(matches!(
            policy.get_int("missing"),
            Err(PolicyError::NameNotFound(name)) if name == "missing"
        ));
        assert!(matches!(
            policy.get_int("name"),
            Err(PolicyError::TypeError { actual: ValueType::String, .. })
        ));
    }

    #[test]
    fn test_intermediate_non_policy_is_type_error() {
        let mut policy = sample();
        let err = policy.set("name.first", 1).unwrap_err();
        match err {
            PolicyError::NotAPolicy { name, partial, actual } => {
                assert_eq!(name, "name.first");
                assert_eq!(partial, "name");
                assert_eq!(actual, ValueType::String);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(policy.get_int("name.first").unwrap_err().is_type_error());
    }

    #[test]
    fn test_predicates_never_fail() {
        let policy = sample();
        assert!(!policy.exists("name.first"));
        assert!(!policy.exists("no..name"));
        assert!(!policy.is_int("nothing"));
        assert_eq!(policy.value_count(""), 0);
        assert_eq!(policy.value_type("stage"), Some(ValueType::Policy));
    }

    #[test]
    fn test_bad_names_are_rejected() {
        let mut policy = Policy::new();
        assert!(matches!(policy.set("a..b", 1), Err(PolicyError::BadName(_))));
        assert!(matches!(policy.set(".a", 1), Err(PolicyError::BadName(_))));
        assert!(matches!(policy.set("a b", 1), Err(PolicyError::BadName(_))));
    }

    #[test]
    fn test_names_by_category() {
        let mut policy = sample();
        policy.set("include", PolicyFile::new("other.paf")).unwrap();

        assert_eq!(policy.names(true), vec!["include", "name", "stage"]);
        assert_eq!(
            policy.names(false),
            vec![
                "include",
                "name",
                "stage",
                "stage.ids",
                "stage.inner",
                "stage.inner.enabled",
                "stage.threshold",
            ]
        );
        assert_eq!(policy.policy_names(false), vec!["stage", "stage.inner"]);
        assert_eq!(policy.file_names(false), vec!["include"]);
        assert_eq!(
            policy.param_names(false),
            vec![
                "include",
                "name",
                "stage.ids",
                "stage.inner.enabled",
                "stage.threshold",
            ]
        );
    }

    #[test]
    fn test_collect_names_appends() {
        let policy = sample();
        let mut out = vec!["existing".to_string()];
        let appended = policy.collect_names(NameKind::Policies, true, &mut out);
        assert_eq!(appended, 1);
        assert_eq!(out, vec!["existing", "stage"]);
    }

    #[test]
    fn test_remove() {
        let mut policy = sample();
        assert!(policy.remove("stage.threshold").unwrap());
        assert!(!policy.remove("stage.threshold").unwrap());
        assert!(!policy.remove("nowhere.deep").unwrap());
        assert!(!policy.exists("stage.threshold"));
    }

    #[test]
    fn test_shallow_copy_shares_children() {
        let original = sample();
        let copy = original.shallow_copy();

        original.get_policy("stage").unwrap().borrow_mut().set("threshold", 9.0).unwrap();
        assert_eq!(copy.get_double("stage.threshold").unwrap(), 9.0);
    }

    #[test]
    fn test_deep_copy_detaches_children() {
        let original = sample();
        let copy = original.deep_copy();

        original.get_policy("stage").unwrap().borrow_mut().set("threshold", 9.0).unwrap();
        original
            .get_policy("stage.inner")
            .unwrap()
            .borrow_mut()
            .set("enabled", false)
            .unwrap();
        assert_eq!(copy.get_double("stage.threshold").unwrap(), 4.5);
        assert!(copy.get_bool("stage.inner.enabled").unwrap());
    }

    #[test]
    fn test_set_values_empty_removes() {
        let mut policy = sample();
        policy.set_values("name", ValueArray::String(Vec::new())).unwrap();
        assert!(!policy.exists("name"));
    }

    #[test]
    fn test_validate_without_dictionary_fails() {
        let policy = sample();
        assert!(!policy.can_validate());
        assert!(matches!(policy.validate(None), Err(PolicyError::Dictionary(_))));
    }

    #[test]
    fn test_set_through_unloaded_dictionary_file() {
        let dictionary = crate::Dictionary::parse_str(
            "definitions: {\n  io: {\n    type: Policy\n    dictionaryFile: io_dict.paf\n  }\n  odd: {\n    type: quaternion\n  }\n}\n",
        )
        .unwrap();
        let mut policy = Policy::new();
        policy.set_dictionary(dictionary);

        let err = policy.set("io.buffer", 1).unwrap_err();
        assert!(matches!(err, PolicyError::Validation(errs) if errs.errors("io.buffer") == ErrorCode::NOT_LOADED));

        let err = policy.set("odd", 1).unwrap_err();
        assert!(matches!(err, PolicyError::Validation(errs) if errs.errors("odd") == ErrorCode::BAD_DEFINITION));
    }
}
