//! Hierarchical policy store, PAF parser and dictionary-based validation.
//!
//! This crate provides:
//!
//! - [`Policy`]: a tree of named, homogeneously-typed value arrays with
//!   dotted hierarchical names and type-checked accessors.
//! - [`paf`]: the parser for the native PAF text format, reached through a
//!   [`FormatRegistry`] and the [`PolicySource`] implementations
//!   [`PolicyFile`] and [`PolicyString`].
//! - File inclusion ([`Policy::load_policy_files`]) that replaces `@file`
//!   references with the policies they name.
//! - A schema engine: a [`Dictionary`] of [`Definition`]s validates a policy
//!   and supplies defaults ([`extract_defaults`], [`Policy::merge_defaults`]),
//!   recording failures per name in a [`ValidationError`].
//!
//! # Example
//!
//! ```
//! use paf_policy_core::*;
//!
//! let dictionary = Dictionary::parse_str(
//!     "definitions: {\n\
//!        exposure: {\n\
//!          type: double\n\
//!          minOccurs: 1\n\
//!        }\n\
//!        filters: {\n\
//!          type: string\n\
//!          default: \"g\" \"r\"\n\
//!        }\n\
//!      }\n",
//! )
//! .unwrap();
//!
//! let mut policy = Policy::parse_str("exposure: 30.0\n").unwrap();
//! let mut errs = ValidationError::new();
//! policy.merge_defaults(&dictionary, true, Some(&mut errs)).unwrap();
//!
//! assert!(errs.is_empty());
//! assert_eq!(policy.get_string_array("filters").unwrap(), vec!["g", "r"]);
//!
//! // The attached dictionary now checks every write.
//! assert!(policy.add("exposure", "long").is_err());
//! ```

mod defaults;
mod error;
mod format;
mod include;
pub mod paf;
mod policy;
mod schema;
mod source;
mod value;

pub use defaults::{DefaultsSource, extract_defaults};
pub use error::{ParseError, ParseErrorKind, PolicyError, Result};
pub use format::{
    FormatRegistry, ParserFactory, ParserOptions, PolicyParser, content_id_format, leading_line,
};
pub use include::MAX_INCLUDE_DEPTH;
pub use policy::{NameKind, Policy};
pub use schema::{
    Allowed, Definition, Dictionary, ErrorCode, MAX_DICTIONARY_DEPTH, SubDictionary, ValidationError,
};
pub use source::{PolicyFile, PolicySource, PolicyString};
pub use value::{PolicyValue, SharedPolicy, Value, ValueArray, ValueType, share};
