#![forbid(unsafe_code)]

//! The parts of a SAML 2.0 assertion the validator looks at.
//!
//! `SubjectConfirmationData` (address, recipient, `InResponseTo`) has no
//! field here and is never read.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assertion {
    /// The `ID` attribute.
    pub id: Option<String>,
    pub issue_instant: Option<String>,
    /// `Issuer` text content, verbatim.
    pub issuer: Option<String>,
    /// Trimmed `Subject/NameID` text.
    pub subject_name_id: Option<String>,
    /// `Subject/NameID/@Format`.
    pub name_id_format: Option<String>,
    /// Whether a `ds:Signature` is a direct child of the assertion.
    pub has_signature: bool,
    pub conditions: Conditions,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    /// One entry per `AudienceRestriction`, holding its `Audience` values.
    pub audience_restrictions: Vec<Vec<String>>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
}

impl Conditions {
    /// Every audience across all restrictions.
    pub fn audiences(&self) -> impl Iterator<Item = &str> {
        self.audience_restrictions
            .iter()
            .flatten()
            .map(String::as_str)
    }
}

/// One `AttributeStatement/Attribute`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<String>,
}
