#![forbid(unsafe_code)]

//! XML Digital Signature (XML-DSig) for enveloped signatures.
//!
//! Verification checks one element's enveloped signature against a pinned
//! key. Signing fills in a signature template.

pub mod context;
mod reference;
pub mod sign;
pub mod verify;

pub use context::DsigContext;
pub use sign::sign;
pub use verify::{verify_enveloped, VerifyResult};
