#![forbid(unsafe_code)]

//! Rejection kinds and the validation verdict.

use serde::Serialize;
use std::fmt;

/// Why a token was refused. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    MalformedToken,
    SignatureInvalid,
    UntrustedIssuer,
    IssuerMismatch,
    AudienceMismatch,
    TokenExpired,
    TokenNotYetValid,
    ConfigurationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedToken => "MalformedToken",
            Self::SignatureInvalid => "SignatureInvalid",
            Self::UntrustedIssuer => "UntrustedIssuer",
            Self::IssuerMismatch => "IssuerMismatch",
            Self::AudienceMismatch => "AudienceMismatch",
            Self::TokenExpired => "TokenExpired",
            Self::TokenNotYetValid => "TokenNotYetValid",
            Self::ConfigurationError => "ConfigurationError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage's refusal: the kind plus a human-readable detail.
///
/// The detail never carries the token, subject-confirmation data or
/// certificate material.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct Rejection {
    pub kind: ErrorKind,
    pub detail: String,
}

impl Rejection {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedToken, detail)
    }

    pub(crate) fn signature(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::SignatureInvalid, detail)
    }
}

/// Outcome of validating one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum ValidationResult {
    Valid { name: String },
    Invalid { reason: ErrorKind, detail: String },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// The subject name, when valid.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Valid { name } => Some(name),
            Self::Invalid { .. } => None,
        }
    }

    /// The rejection kind, when invalid.
    pub fn reason(&self) -> Option<ErrorKind> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid { reason, .. } => Some(*reason),
        }
    }
}

impl From<Rejection> for ValidationResult {
    fn from(r: Rejection) -> Self {
        Self::Invalid {
            reason: r.kind,
            detail: r.detail,
        }
    }
}

/// Errors loading or checking a [`TrustConfig`](crate::TrustConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_display() {
        let r = Rejection::new(ErrorKind::TokenExpired, "NotOnOrAfter passed");
        assert_eq!(r.to_string(), "TokenExpired: NotOnOrAfter passed");
    }

    #[test]
    fn rejection_folds_into_invalid() {
        let result: ValidationResult = Rejection::malformed("no Assertion").into();
        assert_eq!(result.reason(), Some(ErrorKind::MalformedToken));
        assert!(result.name().is_none());
    }

    #[test]
    fn result_serializes_with_tag() {
        let v = ValidationResult::Valid {
            name: "alice".into(),
        };
        assert_eq!(
            serde_json::to_string(&v).unwrap(),
            r#"{"result":"valid","name":"alice"}"#
        );
    }
}
