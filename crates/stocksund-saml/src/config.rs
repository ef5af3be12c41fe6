#![forbid(unsafe_code)]

//! Trust configuration for one identity provider.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a token must satisfy to be accepted from one IdP.
///
/// Field names serialize in camelCase:
///
/// ```json
/// {
///   "name": "okta",
///   "certificateThumbprint": "DD401A321D1B2150D9982A011D71055293620DDA",
///   "validIssuers": ["https://idp.example.org/saml"],
///   "audience": "https://sp.example.com/"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustConfig {
    /// IdP label, used in logs only.
    pub name: String,
    /// SHA-1 or SHA-256 thumbprint of the signing certificate.
    pub certificate_thumbprint: String,
    /// Accepted issuers. Must be present; an explicit `[]` skips the issuer check.
    pub valid_issuers: Vec<String>,
    /// Expected audience URI.
    pub audience: String,
}

/// How the issuer of a token is judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuerPolicy {
    /// The issuer must equal one of these strings exactly.
    AllowList(Vec<String>),
    /// Skip the issuer check; the pinned certificate is the only trust anchor.
    AnyIssuer,
}

impl IssuerPolicy {
    pub fn allow<I, S>(issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AllowList(issuers.into_iter().map(Into::into).collect())
    }
}

impl TrustConfig {
    pub fn new(
        name: impl Into<String>,
        certificate_thumbprint: impl Into<String>,
        audience: impl Into<String>,
        issuers: IssuerPolicy,
    ) -> Self {
        let valid_issuers = match issuers {
            IssuerPolicy::AllowList(list) => list,
            IssuerPolicy::AnyIssuer => Vec::new(),
        };
        Self {
            name: name.into(),
            certificate_thumbprint: certificate_thumbprint.into(),
            valid_issuers,
            audience: audience.into(),
        }
    }

    pub fn issuer_policy(&self) -> IssuerPolicy {
        if self.valid_issuers.is_empty() {
            IssuerPolicy::AnyIssuer
        } else {
            IssuerPolicy::AllowList(self.valid_issuers.clone())
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(
            idp = %config.name,
            path = %path.as_ref().display(),
            "trust configuration loaded"
        );
        Ok(config)
    }

    /// Fail fast on settings that would reject every token.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.audience.trim().is_empty() {
            return Err(ConfigError::Invalid("audience is empty".into()));
        }
        if self.valid_issuers.iter().any(|i| i.trim().is_empty()) {
            return Err(ConfigError::Invalid("validIssuers contains an empty entry".into()));
        }
        if self.certificate_thumbprint.trim().is_empty() {
            return Err(ConfigError::Invalid("certificateThumbprint is empty".into()));
        }
        stocksund_keys::Thumbprint::parse(&self.certificate_thumbprint)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        url::Url::parse(&self.audience)
            .map_err(|e| ConfigError::Invalid(format!("audience is not an absolute URI: {e}")))?;
        Ok(())
    }
}
