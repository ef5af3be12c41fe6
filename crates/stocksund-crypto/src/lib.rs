#![forbid(unsafe_code)]

//! Cryptographic algorithm implementations for stocksund.
//!
//! Provides the digest and signature algorithms XML-DSig uses to protect
//! SAML assertions: SHA-1 and SHA-2 digests, RSA PKCS#1 v1.5 and ECDSA
//! over P-256 and P-384.

pub mod digest;
pub mod sign;

pub use digest::DigestMethod;
pub use sign::{SignatureAlgorithm, SigningKey};
