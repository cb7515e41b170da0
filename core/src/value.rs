//! Value types stored in a [`Policy`].
//!
//! Every parameter name maps to a non-empty [`ValueArray`] whose elements
//! all share one [`ValueType`]. A "scalar" read returns the last element.
//! Sub-policies are held as [`SharedPolicy`] handles so that a shallow copy
//! of a parent can alias its children.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::Policy;
use crate::source::PolicyFile;

/// Reference-counted handle to a policy node that may have several parents.
pub type SharedPolicy = Rc<RefCell<Policy>>;

/// Wraps a policy in a new shared handle.
pub fn share(policy: Policy) -> SharedPolicy {
    Rc::new(RefCell::new(policy))
}

/// Kind of the values held under a name.
///
/// # Examples
///
/// ```
/// use paf_policy_core::ValueType;
///
/// assert_eq!(ValueType::from_name("Integer"), Some(ValueType::Int));
/// assert_eq!(ValueType::Policy.to_string(), "Policy");
/// assert_eq!(ValueType::from_name("complex"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Int,
    Double,
    String,
    Policy,
    File,
}

impl ValueType {
    /// Canonical type name as used in dictionaries.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Double => "double",
            Self::String => "string",
            Self::Policy => "Policy",
            Self::File => "PolicyFile",
        }
    }

    /// Looks up a type by name, ignoring case and accepting common synonyms.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Some(Self::Bool),
            "int" | "integer" => Some(Self::Int),
            "double" | "float" => Some(Self::Double),
            "string" => Some(Self::String),
            "policy" => Some(Self::Policy),
            "file" | "policyfile" => Some(Self::File),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single value.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Double(f64),
    String(String),
    Policy(SharedPolicy),
    File(PolicyFile),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Double(_) => ValueType::Double,
            Self::String(_) => ValueType::String,
            Self::Policy(_) => ValueType::Policy,
            Self::File(_) => ValueType::File,
        }
    }

    /// Clones the value, recursively copying sub-policies instead of sharing
    /// them.
    pub fn deep_copy(&self) -> Self {
        match self {
            Self::Policy(policy) => Self::Policy(share(policy.borrow().deep_copy())),
            other => other.clone(),
        }
    }
}

/// Policies compare by identity; every other kind compares by value.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Policy(a), Self::Policy(b)) => Rc::ptr_eq(a, b),
            (Self::File(a), Self::File(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Policy> for Value {
    fn from(value: Policy) -> Self {
        Self::Policy(share(value))
    }
}

impl From<SharedPolicy> for Value {
    fn from(value: SharedPolicy) -> Self {
        Self::Policy(value)
    }
}

impl From<PolicyFile> for Value {
    fn from(value: PolicyFile) -> Self {
        Self::File(value)
    }
}

/// A homogeneously-typed array of values.
#[derive(Debug, Clone)]
pub enum ValueArray {
    Bool(Vec<bool>),
    Int(Vec<i32>),
    Double(Vec<f64>),
    String(Vec<String>),
    Policy(Vec<SharedPolicy>),
    File(Vec<PolicyFile>),
}

impl ValueArray {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Double(_) => ValueType::Double,
            Self::String(_) => ValueType::String,
            Self::Policy(_) => ValueType::Policy,
            Self::File(_) => ValueType::File,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Bool(values) => values.len(),
            Self::Int(values) => values.len(),
            Self::Double(values) => values.len(),
            Self::String(values) => values.len(),
            Self::Policy(values) => values.len(),
            Self::File(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index` as a [`Value`].
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            Self::Bool(values) => values.get(index).copied().map(Value::Bool),
            Self::Int(values) => values.get(index).copied().map(Value::Int),
            Self::Double(values) => values.get(index).copied().map(Value::Double),
            Self::String(values) => values.get(index).cloned().map(Value::String),
            Self::Policy(values) => values.get(index).cloned().map(Value::Policy),
            Self::File(values) => values.get(index).cloned().map(Value::File),
        }
    }

    pub fn last(&self) -> Option<Value> {
        self.len().checked_sub(1).and_then(|index| self.get(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).filter_map(|index| self.get(index))
    }

    pub fn into_values(self) -> Vec<Value> {
        match self {
            Self::Bool(values) => values.into_iter().map(Value::Bool).collect(),
            Self::Int(values) => values.into_iter().map(Value::Int).collect(),
            Self::Double(values) => values.into_iter().map(Value::Double).collect(),
            Self::String(values) => values.into_iter().map(Value::String).collect(),
            Self::Policy(values) => values.into_iter().map(Value::Policy).collect(),
            Self::File(values) => values.into_iter().map(Value::File).collect(),
        }
    }

    /// Appends `value`, or hands it back when its type differs from the
    /// array's.
    pub fn push(&mut self, value: Value) -> Result<(), Value> {
        match (self, value) {
            (Self::Bool(values), Value::Bool(v)) => values.push(v),
            (Self::Int(values), Value::Int(v)) => values.push(v),
            (Self::Double(values), Value::Double(v)) => values.push(v),
            (Self::String(values), Value::String(v)) => values.push(v),
            (Self::Policy(values), Value::Policy(v)) => values.push(v),
            (Self::File(values), Value::File(v)) => values.push(v),
            (_, other) => return Err(other),
        }
        Ok(())
    }

    /// Clones the array; sub-policies are recursively copied, not shared.
    pub fn deep_copy(&self) -> Self {
        match self {
            Self::Policy(values) => Self::Policy(
                values
                    .iter()
                    .map(|policy| share(policy.borrow().deep_copy()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl From<Value> for ValueArray {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(v) => Self::Bool(vec![v]),
            Value::Int(v) => Self::Int(vec![v]),
            Value::Double(v) => Self::Double(vec![v]),
            Value::String(v) => Self::String(vec![v]),
            Value::Policy(v) => Self::Policy(vec![v]),
            Value::File(v) => Self::File(vec![v]),
        }
    }
}

/// Element types that can be read out of a [`ValueArray`] by the generic
/// accessors [`Policy::get`] and [`Policy::get_array`].
pub trait PolicyValue: Clone {
    const TYPE: ValueType;

    fn slice(array: &ValueArray) -> Option<&[Self]>;
}

macro_rules! impl_policy_value {
    ($ty:ty, $variant:ident) => {
        impl PolicyValue for $ty {
            const TYPE: ValueType = ValueType::$variant;

            fn slice(array: &ValueArray) -> Option<&[Self]> {
                match array {
                    ValueArray::$variant(values) => Some(values),
                    _ => None,
                }
            }
        }
    };
}

impl_policy_value!(bool, Bool);
impl_policy_value!(i32, Int);
impl_policy_value!(f64, Double);
impl_policy_value!(String, String);
impl_policy_value!(SharedPolicy, Policy);
impl_policy_value!(PolicyFile, File);
