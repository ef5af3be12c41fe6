#![forbid(unsafe_code)]

//! Key management for stocksund.
//!
//! Loads RSA and EC keys from PEM and DER, parses X.509 certificates, and
//! resolves certificates by pinned thumbprint through [`CertificateSource`].

pub mod certificate;
pub mod key;
pub mod keyinfo;
pub mod loader;
pub mod store;
pub mod thumbprint;

pub use certificate::TrustedCertificate;
pub use key::{Key, KeyData};
pub use store::{CertificateSource, CertificateStore};
pub use thumbprint::Thumbprint;
