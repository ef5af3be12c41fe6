#![forbid(unsafe_code)]

//! SAML 2.0 bearer assertion validation.
//!
//! A [`SamlValidator`] takes a base64-encoded assertion and decides, in a
//! fixed order, whether it is well formed, signed by the pinned
//! certificate, issued by an allowed issuer, addressed to this service and
//! inside its validity window. The verdict is a [`ValidationResult`];
//! nothing in the pipeline panics or returns an untyped error.
//!
//! ```no_run
//! use stocksund_keys::CertificateStore;
//! use stocksund_saml::{IssuerPolicy, SamlValidator, TrustConfig};
//!
//! let store = CertificateStore::load_dir("/etc/stocksund/certs")?;
//! let config = TrustConfig::new(
//!     "okta",
//!     "DD401A321D1B2150D9982A011D71055293620DDA",
//!     "https://sp.example.com/",
//!     IssuerPolicy::allow(["https://idp.example.org/saml"]),
//! );
//!
//! let validator = SamlValidator::new(config, store);
//! let verdict = validator.validate("PHNhbWw6QXNzZXJ0aW9uIC4uLg==");
//! println!("{verdict:?}");
//! # Ok::<(), stocksund_core::Error>(())
//! ```

pub mod assertion;
pub mod conditions;
pub mod config;
pub mod decoder;
pub mod error;
pub mod issuer;
pub mod signature;
pub mod subject;
pub mod validator;

pub use assertion::{Assertion, Attribute, Conditions};
pub use conditions::{Clock, FixedClock, SystemClock};
pub use config::{IssuerPolicy, TrustConfig};
pub use error::{ConfigError, ErrorKind, Rejection, ValidationResult};
pub use subject::Identity;
pub use validator::SamlValidator;
