//! Schema engine: dictionaries, definitions and validation errors.

mod definition;
mod dictionary;
mod validation;

pub use definition::{Allowed, Definition, SubDictionary};
pub use dictionary::{Dictionary, MAX_DICTIONARY_DEPTH};
pub use validation::{ErrorCode, ValidationError};
