//! Id codec, well-known ids, values, and errors for Stratum.
//!
//! This crate provides:
//! - [`Id`] - Packed entity and relationship-pair identifiers
//! - [`builtin`] - Well-known ids (`WILDCARD`, `CHILD_OF`, hook kinds, ...)
//! - [`Value`] - The dynamic value type stored in component columns
//! - [`Error`] - Error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod builtin;
pub mod error;
pub mod id;
pub mod value;

pub use error::{Error, ErrorKind};
pub use id::{GENERATION_BITS, INDEX_BITS, Id, MAX_GENERATION, MAX_INDEX, pair};
pub use value::{List, Map, Value};

/// Result type alias using Stratum's Error.
pub type Result<T> = std::result::Result<T, Error>;
