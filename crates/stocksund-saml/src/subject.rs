#![forbid(unsafe_code)]

//! Subject extraction, run only after every check passed.

use crate::assertion::{Assertion, Attribute};
use crate::error::Rejection;
use serde::Serialize;

/// The authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Trimmed `NameID`.
    pub name: String,
    pub name_format: Option<String>,
    pub issuer: Option<String>,
    pub attributes: Vec<Attribute>,
}

impl Identity {
    /// Values of the first attribute called `name`.
    pub fn attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.values.as_slice())
    }
}

pub fn extract(assertion: &Assertion) -> Result<Identity, Rejection> {
    let name = assertion
        .subject_name_id
        .clone()
        .ok_or_else(|| Rejection::malformed("assertion has no Subject/NameID"))?;
    Ok(Identity {
        name,
        name_format: assertion.name_id_format.clone(),
        issuer: assertion.issuer.clone(),
        attributes: assertion.attributes.clone(),
    })
}
