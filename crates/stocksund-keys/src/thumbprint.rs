#![forbid(unsafe_code)]

//! Certificate thumbprints.
//!
//! A thumbprint is a hash of the DER encoding of a certificate. Operators
//! copy them out of IdP consoles in every imaginable shape (`AB:CD:..`,
//! lowercase, space separated), so parsing ignores case, spaces and colons.

use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use stocksund_core::Error;

/// A SHA-1 or SHA-256 certificate thumbprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Thumbprint {
    Sha1([u8; 20]),
    Sha256([u8; 32]),
}

impl Thumbprint {
    /// Parse 40 (SHA-1) or 64 (SHA-256) hex digits.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let clean: String = text
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':')
            .collect();
        let bytes = hex::decode(&clean)
            .map_err(|e| Error::Certificate(format!("thumbprint is not hex: {e}")))?;
        match bytes.len() {
            20 => {
                let mut out = [0u8; 20];
                out.copy_from_slice(&bytes);
                Ok(Self::Sha1(out))
            }
            32 => {
                let mut out = [0u8; 32];
                out.copy_from_slice(&bytes);
                Ok(Self::Sha256(out))
            }
            n => Err(Error::Certificate(format!(
                "thumbprint must be 20 or 32 bytes, got {n}"
            ))),
        }
    }

    pub fn sha1_of(der: &[u8]) -> Self {
        Self::Sha1(Sha1::digest(der).into())
    }

    pub fn sha256_of(der: &[u8]) -> Self {
        Self::Sha256(Sha256::digest(der).into())
    }

    /// Compute the thumbprint of `der` with the same algorithm as `self`.
    pub fn same_kind_of(&self, der: &[u8]) -> Self {
        match self {
            Self::Sha1(_) => Self::sha1_of(der),
            Self::Sha256(_) => Self::sha256_of(der),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Sha1(b) => b,
            Self::Sha256(b) => b,
        }
    }

    pub fn algorithm_name(&self) -> &'static str {
        match self {
            Self::Sha1(_) => "SHA-1",
            Self::Sha256(_) => "SHA-256",
        }
    }
}

/// Uppercase hex without separators.
impl fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.as_bytes()))
    }
}

impl std::str::FromStr for Thumbprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
