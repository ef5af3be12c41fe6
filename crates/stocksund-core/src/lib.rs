#![forbid(unsafe_code)]

//! Shared building blocks for the stocksund crates: the error type,
//! algorithm identifiers and namespace/element name constants.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
