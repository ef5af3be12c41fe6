#![forbid(unsafe_code)]

//! DSig context: the key and options for one signature operation.

use stocksund_keys::{Key, Thumbprint};

/// Context for XML-DSig operations.
///
/// Verification uses `key` and nothing else. A key carried inside the
/// signature's `KeyInfo` is never consulted.
#[derive(Debug, Clone)]
pub struct DsigContext {
    /// Pinned verification key, or the signing key when signing.
    pub key: Key,
    /// Thumbprint that an embedded `X509Certificate` must match, if any.
    pub pinned_certificate: Option<Thumbprint>,
}

impl DsigContext {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            pinned_certificate: None,
        }
    }

    /// Require any embedded certificate to match `thumbprint`.
    pub fn with_pinned_certificate(mut self, thumbprint: Thumbprint) -> Self {
        self.pinned_certificate = Some(thumbprint);
        self
    }
}
