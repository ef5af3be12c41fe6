#![forbid(unsafe_code)]

//! Certificates trusted by thumbprint.

use crate::key::Key;
use crate::loader;
use crate::thumbprint::Thumbprint;
use stocksund_core::Error;

/// A parsed certificate with its public key and both thumbprints.
///
/// Only the public key is used for verification. Validity dates, key
/// usage and the issuing chain are not consulted: trust is the pin.
#[derive(Debug, Clone)]
pub struct TrustedCertificate {
    der: Vec<u8>,
    sha1: Thumbprint,
    sha256: Thumbprint,
    subject: String,
    key: Key,
}

impl TrustedCertificate {
    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        use der::Decode;

        let cert = x509_cert::Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
        let key = loader::load_x509_cert_der(der)?;
        Ok(Self {
            der: der.to_vec(),
            sha1: Thumbprint::sha1_of(der),
            sha256: Thumbprint::sha256_of(der),
            subject: cert.tbs_certificate.subject.to_string(),
            key,
        })
    }

    pub fn from_pem(pem: &[u8]) -> Result<Self, Error> {
        Self::from_der(&loader::cert_pem_to_der(pem)?)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn sha1(&self) -> Thumbprint {
        self.sha1
    }

    pub fn sha256(&self) -> Thumbprint {
        self.sha256
    }

    /// Subject distinguished name, RFC 4514 form.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn key(&self) -> &Key {
        &self.key
    }
}
