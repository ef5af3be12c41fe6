#![forbid(unsafe_code)]

//! Issuer allow-list check.

use crate::assertion::Assertion;
use crate::error::{ErrorKind, Rejection};

/// Require the assertion's issuer to be one of `valid_issuers`.
///
/// Comparison is exact and case-sensitive. An empty list skips the check.
pub fn validate(assertion: &Assertion, valid_issuers: &[String]) -> Result<(), Rejection> {
    if valid_issuers.is_empty() {
        return Ok(());
    }
    let Some(issuer) = assertion.issuer.as_deref() else {
        return Err(Rejection::new(ErrorKind::IssuerMismatch, "assertion has no Issuer"));
    };
    if valid_issuers.iter().any(|valid| valid == issuer) {
        Ok(())
    } else {
        Err(Rejection::new(
            ErrorKind::IssuerMismatch,
            format!("issuer {issuer:?} is not in the configured list"),
        ))
    }
}
