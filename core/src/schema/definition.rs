//! A single named schema entry.
//!
//! A definition block in a dictionary looks like:
//!
//! ```text
//! exposure: {
//!     type: double
//!     description: "exposure time in seconds"
//!     minOccurs: 1
//!     maxOccurs: 1
//!     default: 15.0
//!     allowed: {
//!         min: 0.0
//!         max: 3600.0
//!     }
//! }
//! ```
//!
//! Policy-typed entries may describe their children with an inline
//! `dictionary` block or a `dictionaryFile` reference.

use std::cmp::Ordering;
use std::path::PathBuf;

use crate::Policy;
use crate::error::{PolicyError, Result};
use crate::schema::{Dictionary, ErrorCode, ValidationError};
use crate::value::{PolicyValue, Value, ValueArray, ValueType};

/// Definition keywords.
pub(crate) mod keyword {
    pub const TYPE: &str = "type";
    pub const DESCRIPTION: &str = "description";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const DEFAULT: &str = "default";
    pub const ALLOWED: &str = "allowed";
    pub const DICTIONARY: &str = "dictionary";
    pub const DICTIONARY_FILE: &str = "dictionaryFile";
    pub const VALUE: &str = "value";
    pub const MIN: &str = "min";
    pub const MAX: &str = "max";
}

/// Constraints from the `allowed` blocks of a definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allowed {
    /// Discrete permitted values; empty means any value.
    pub values: Vec<Value>,
    pub min: Option<Value>,
    pub max: Option<Value>,
}

impl Allowed {
    pub fn is_unconstrained(&self) -> bool {
        self.values.is_empty() && self.min.is_none() && self.max.is_none()
    }

    fn check(&self, value: &Value) -> ErrorCode {
        let mut code = ErrorCode::empty();

        let below = self
            .min
            .as_ref()
            .is_some_and(|min| compare(value, min) == Some(Ordering::Less));
        let above = self
            .max
            .as_ref()
            .is_some_and(|max| compare(value, max) == Some(Ordering::Greater));
        if below || above {
            code |= ErrorCode::VALUE_OUT_OF_RANGE;
        }

        if !self.values.is_empty() && !self.values.iter().any(|allowed| same_value(value, allowed)) {
            code |= ErrorCode::VALUE_DISALLOWED;
        }
        code
    }
}

/// Where a Policy-typed definition gets the schema for its children.
#[derive(Debug, Clone)]
pub enum SubDictionary {
    None,
    Inline(Dictionary),
    /// A `dictionaryFile` that has not been loaded yet.
    Unloaded(PathBuf),
}

/// One parameter's schema.
#[derive(Debug, Clone)]
pub struct Definition {
    name: String,
    value_type: Option<ValueType>,
    description: Option<String>,
    min_occurs: usize,
    max_occurs: Option<usize>,
    default: Option<ValueArray>,
    allowed: Allowed,
    sub_dictionary: SubDictionary,
}

impl Definition {
    /// Definition with no constraints at all.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: None,
            description: None,
            min_occurs: 0,
            max_occurs: None,
            default: None,
            allowed: Allowed::default(),
            sub_dictionary: SubDictionary::None,
        }
    }

    /// Interprets a definition block.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Dictionary`] if a keyword holds the wrong kind
    /// of value, the type name is unknown, or an inline sub-dictionary is
    /// malformed.
    pub fn from_policy(name: &str, block: &Policy) -> Result<Self> {
        let mut definition = Self::new(name);

        if let Some(type_name) = keyword_value::<String>(block, name, keyword::TYPE)? {
            let value_type = ValueType::from_name(&type_name).ok_or_else(|| {
                PolicyError::Dictionary(format!("{name}: unknown type '{type_name}'"))
            })?;
            definition.value_type = Some(value_type);
        }
        definition.description = keyword_value::<String>(block, name, keyword::DESCRIPTION)?;

        if let Some(min) = keyword_value::<i32>(block, name, keyword::MIN_OCCURS)? {
            definition.min_occurs = usize::try_from(min).map_err(|_| {
                PolicyError::Dictionary(format!("{name}: minOccurs must not be negative"))
            })?;
        }
        if let Some(max) = keyword_value::<i32>(block, name, keyword::MAX_OCCURS)? {
            definition.max_occurs = usize::try_from(max).ok();
        }

        if block.exists(keyword::DEFAULT) {
            let defaults = block.get_values(keyword::DEFAULT)?;
            definition.default = Some(match definition.value_type {
                Some(ValueType::Double) => promote_ints(defaults),
                _ => defaults,
            });
        }

        if block.exists(keyword::ALLOWED) {
            definition.allowed = definition.read_allowed(block)?;
        }

        definition.sub_dictionary = read_sub_dictionary(name, block)?;
        Ok(definition)
    }

    fn read_allowed(&self, block: &Policy) -> Result<Allowed> {
        let entries = block.get_policy_array(keyword::ALLOWED).map_err(|_| {
            PolicyError::Dictionary(format!("{}: 'allowed' must hold blocks", self.name))
        })?;
        let promote = |value: Value| match (self.value_type, value) {
            (Some(ValueType::Double), Value::Int(v)) => Value::Double(f64::from(v)),
            (_, value) => value,
        };

        let mut allowed = Allowed::default();
        for entry in entries {
            let entry = entry.borrow();
            if entry.exists(keyword::VALUE) {
                allowed
                    .values
                    .extend(entry.get_values(keyword::VALUE)?.into_values().into_iter().map(promote));
            }
            if entry.exists(keyword::MIN) {
                allowed.min = Some(promote(entry.get_value(keyword::MIN)?));
            }
            if entry.exists(keyword::MAX) {
                allowed.max = Some(promote(entry.get_value(keyword::MAX)?));
            }
        }
        Ok(allowed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expected type; `None` accepts any type.
    pub fn value_type(&self) -> Option<ValueType> {
        self.value_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn min_occurs(&self) -> usize {
        self.min_occurs
    }

    /// Upper occurrence bound; `None` is unbounded.
    pub fn max_occurs(&self) -> Option<usize> {
        self.max_occurs
    }

    pub fn default_values(&self) -> Option<&ValueArray> {
        self.default.as_ref()
    }

    pub fn allowed(&self) -> &Allowed {
        &self.allowed
    }

    pub fn sub_dictionary(&self) -> &SubDictionary {
        &self.sub_dictionary
    }

    pub(crate) fn into_sub_dictionary(self) -> SubDictionary {
        self.sub_dictionary
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Validates whatever `policy` holds under `name` against this
    /// definition.
    pub fn validate(&self, policy: &Policy, name: &str, errs: &mut ValidationError) {
        match policy.get_values(name) {
            Ok(values) => self.validate_values(name, &values, errs),
            Err(PolicyError::NameNotFound(_)) => self.check_occurrences(name, 0, errs),
            Err(_) => errs.add_error(name, ErrorCode::WRONG_TYPE),
        }
    }

    /// Validates a complete array: type, occurrence bounds, per-element
    /// constraints and, for sub-policies, their own schema.
    pub fn validate_values(&self, name: &str, values: &ValueArray, errs: &mut ValidationError) {
        self.check_occurrences(name, values.len(), errs);
        if let Some(code) = self.type_mismatch(values.value_type()) {
            errs.add_error(name, code);
            return;
        }

        for value in values.iter() {
            errs.add_error(name, self.allowed.check(&value));
            self.check_nested(name, &value, errs);
        }
    }

    /// Validates one value about to be stored. With `current_count`, the
    /// value is treated as an addition to that many existing values.
    ///
    /// Only the type, the running count and the `allowed` constraints are
    /// checked; a sub-policy's own schema is left to a full validation.
    pub fn validate_value(
        &self,
        name: &str,
        value: &Value,
        current_count: Option<usize>,
        errs: &mut ValidationError,
    ) {
        if let Some(code) = self.type_mismatch(value.value_type()) {
            errs.add_error(name, code);
            return;
        }
        if let (Some(count), Some(max)) = (current_count, self.max_occurs) {
            if count + 1 > max {
                errs.add_error(name, ErrorCode::TOO_MANY_VALUES);
            }
        }
        errs.add_error(name, self.allowed.check(value));
    }

    fn type_mismatch(&self, actual: ValueType) -> Option<ErrorCode> {
        match self.value_type {
            Some(expected) if expected == actual => None,
            Some(ValueType::Policy) if actual == ValueType::File => Some(ErrorCode::NOT_LOADED),
            Some(_) => Some(ErrorCode::WRONG_TYPE),
            None => None,
        }
    }

    fn check_occurrences(&self, name: &str, count: usize, errs: &mut ValidationError) {
        let min = self.min_occurs;
        if count == 0 && min > 0 {
            errs.add_error(name, ErrorCode::MISSING_REQUIRED);
        } else if count == 1 && min > 1 {
            errs.add_error(name, ErrorCode::NOT_AN_ARRAY);
        } else if count > 0 && count < min {
            errs.add_error(name, ErrorCode::ARRAY_TOO_SHORT);
        }
        if self.max_occurs.is_some_and(|max| count > max) {
            errs.add_error(name, ErrorCode::TOO_MANY_VALUES);
        }
    }

    fn check_nested(&self, name: &str, value: &Value, errs: &mut ValidationError) {
        let Value::Policy(child) = value else {
            return;
        };
        match &self.sub_dictionary {
            SubDictionary::Inline(dictionary) => {
                let mut nested = ValidationError::new();
                // The accumulator form never returns an error.
                let _ = dictionary.validate(&child.borrow(), Some(&mut nested));
                errs.absorb(&format!("{name}."), &nested);
            }
            SubDictionary::Unloaded(_) => errs.add_error(name, ErrorCode::NOT_LOADED),
            SubDictionary::None => {}
        }
    }

    // -----------------------------------------------------------------------
    // Defaults
    // -----------------------------------------------------------------------

    /// Writes this definition's defaults into `policy` under `name`: the
    /// first value replaces whatever is there, the rest are appended.
    ///
    /// The defaults are validated first. Problems are recorded in `errs`
    /// when given (and nothing is written); otherwise they are returned as
    /// [`PolicyError::Validation`]. Returns whether anything was written.
    pub fn apply_default_into(
        &self,
        policy: &mut Policy,
        name: &str,
        errs: Option<&mut ValidationError>,
    ) -> Result<bool> {
        let Some(defaults) = &self.default else {
            return Ok(false);
        };

        let mut problems = ValidationError::new();
        self.validate_values(name, defaults, &mut problems);
        if !problems.is_empty() {
            return match errs {
                Some(errs) => {
                    errs.absorb("", &problems);
                    Ok(false)
                }
                None => Err(problems.into()),
            };
        }

        let mut values = defaults.deep_copy().into_values().into_iter();
        if let Some(first) = values.next() {
            policy.set(name, first)?;
        }
        for value in values {
            policy.add(name, value)?;
        }
        Ok(true)
    }
}

fn keyword_value<T: PolicyValue>(block: &Policy, name: &str, key: &str) -> Result<Option<T>> {
    if !block.exists(key) {
        return Ok(None);
    }
    block.get::<T>(key).map(Some).map_err(|_| {
        PolicyError::Dictionary(format!("{name}: '{key}' must hold a {} value", T::TYPE))
    })
}

fn read_sub_dictionary(name: &str, block: &Policy) -> Result<SubDictionary> {
    if block.exists(keyword::DICTIONARY) {
        return match block.get_value(keyword::DICTIONARY)? {
            Value::Policy(inline) => Dictionary::from_policy(inline.borrow().shallow_copy())
                .map(SubDictionary::Inline)
                .map_err(|err| PolicyError::Dictionary(format!("{name}: {err}"))),
            Value::File(file) => Ok(SubDictionary::Unloaded(file.path().to_path_buf())),
            other => Err(PolicyError::Dictionary(format!(
                "{name}: 'dictionary' must hold a block, not a {} value",
                other.value_type()
            ))),
        };
    }
    if block.exists(keyword::DICTIONARY_FILE) {
        return match block.get_value(keyword::DICTIONARY_FILE)? {
            Value::String(path) => Ok(SubDictionary::Unloaded(PathBuf::from(path))),
            Value::File(file) => Ok(SubDictionary::Unloaded(file.path().to_path_buf())),
            other => Err(PolicyError::Dictionary(format!(
                "{name}: 'dictionaryFile' must hold a path, not a {} value",
                other.value_type()
            ))),
        };
    }
    Ok(SubDictionary::None)
}

fn promote_ints(values: ValueArray) -> ValueArray {
    match values {
        ValueArray::Int(ints) => ValueArray::Double(ints.into_iter().map(f64::from).collect()),
        other => other,
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(v) => Some(f64::from(*v)),
        Value::Double(v) => Some(*v),
        _ => None,
    }
}

fn compare(value: &Value, bound: &Value) -> Option<Ordering> {
    match (value, bound) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => numeric(value)?.partial_cmp(&numeric(bound)?),
    }
}

fn same_value(value: &Value, allowed: &Value) -> bool {
    match (numeric(value), numeric(allowed)) {
        (Some(a), Some(b)) => a == b,
        _ => value == allowed,
    }
}
