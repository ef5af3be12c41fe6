#![forbid(unsafe_code)]

//! Stocksund: SAML 2.0 bearer assertion validation over pinned-certificate
//! XML-DSig. Re-exports the workspace crates under one roof.

pub use stocksund_core as core;
pub use stocksund_xml as xml;
pub use stocksund_c14n as c14n;
pub use stocksund_crypto as crypto;
pub use stocksund_keys as keys;
pub use stocksund_transforms as transforms;
pub use stocksund_dsig as dsig;
pub use stocksund_saml as saml;

pub use stocksund_saml::{
    ErrorKind, Identity, IssuerPolicy, SamlValidator, TrustConfig, ValidationResult,
};
