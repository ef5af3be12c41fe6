#![forbid(unsafe_code)]

//! Thumbprint-indexed certificate lookup.

use crate::certificate::TrustedCertificate;
use crate::thumbprint::Thumbprint;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use stocksund_core::Error;

/// Resolves a pinned thumbprint to a trusted certificate.
///
/// Implementations are pure lookups; they must not fetch anything.
pub trait CertificateSource: Send + Sync {
    fn resolve(&self, thumbprint: &Thumbprint) -> Option<Arc<TrustedCertificate>>;
}

impl<T: CertificateSource + ?Sized> CertificateSource for Arc<T> {
    fn resolve(&self, thumbprint: &Thumbprint) -> Option<Arc<TrustedCertificate>> {
        (**self).resolve(thumbprint)
    }
}

/// In-memory certificate store, indexed by SHA-1 and SHA-256 thumbprint.
#[derive(Debug, Default, Clone)]
pub struct CertificateStore {
    by_thumbprint: HashMap<Thumbprint, Arc<TrustedCertificate>>,
    count: usize,
}

impl CertificateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parsed certificate.
    pub fn add(&mut self, cert: TrustedCertificate) -> Arc<TrustedCertificate> {
        let cert = Arc::new(cert);
        tracing::debug!(
            subject = cert.subject(),
            sha1 = %cert.sha1(),
            "certificate added to store"
        );
        if self.by_thumbprint.insert(cert.sha1(), cert.clone()).is_none() {
            self.count += 1;
        }
        self.by_thumbprint.insert(cert.sha256(), cert.clone());
        cert
    }

    pub fn add_der(&mut self, der: &[u8]) -> Result<Arc<TrustedCertificate>, Error> {
        Ok(self.add(TrustedCertificate::from_der(der)?))
    }

    /// Add every certificate in a PEM bundle. Returns how many were added.
    ///
    /// Blocks with another label, such as a private key kept in the same
    /// file, are skipped. Text between blocks is ignored.
    pub fn add_pem(&mut self, pem: &[u8]) -> Result<usize, Error> {
        let text = std::str::from_utf8(pem)
            .map_err(|e| Error::Certificate(format!("invalid PEM encoding: {e}")))?;
        let mut added = 0;
        for block in pem_blocks(text) {
            let (label, der) = pem_rfc7468::decode_vec(block.as_bytes())
                .map_err(|e| Error::Certificate(format!("invalid PEM block: {e}")))?;
            if label != "CERTIFICATE" {
                tracing::debug!(label, "skipping PEM block");
                continue;
            }
            self.add_der(&der)?;
            added += 1;
        }
        if added == 0 {
            return Err(Error::Certificate("no certificate found in PEM data".into()));
        }
        Ok(added)
    }

    /// Load `*.pem`, `*.crt`, `*.cer` and `*.der` files from a directory.
    ///
    /// Files with other extensions and PEM files without a certificate
    /// block (private keys kept alongside) are skipped. A certificate that
    /// fails to parse is an error.
    pub fn load_dir(path: impl AsRef<Path>) -> Result<Self, Error> {
        let mut store = Self::new();
        let mut entries: Vec<_> = std::fs::read_dir(path.as_ref())?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        for file in entries {
            let ext = file
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            if !matches!(ext.as_str(), "pem" | "crt" | "cer" | "der") {
                continue;
            }
            let data = std::fs::read(&file)?;
            let is_pem = data.starts_with(b"-----BEGIN") || ext == "pem";
            if is_pem && !data.windows(17).any(|w| w == b"BEGIN CERTIFICATE") {
                tracing::debug!(file = %file.display(), "skipping PEM without certificate");
                continue;
            }
            let result = if is_pem {
                store.add_pem(&data).map(|_| ())
            } else {
                store.add_der(&data).map(|_| ())
            };
            result.map_err(|e| Error::Certificate(format!("{}: {e}", file.display())))?;
        }
        tracing::debug!(certificates = store.len(), "certificate store loaded");
        Ok(store)
    }

    /// Number of distinct certificates.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Encapsulated blocks of a PEM file, boundaries included.
fn pem_blocks(text: &str) -> impl Iterator<Item = &str> {
    const BEGIN: &str = "-----BEGIN ";
    const END: &str = "-----END ";
    text.match_indices(BEGIN).filter_map(move |(start, _)| {
        let block = &text[start..];
        let end = block.find(END)? + END.len();
        let close = end + block[end..].find("-----")? + "-----".len();
        Some(&block[..close])
    })
}

impl CertificateSource for CertificateStore {
    fn resolve(&self, thumbprint: &Thumbprint) -> Option<Arc<TrustedCertificate>> {
        self.by_thumbprint.get(thumbprint).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSA_CERT: &[u8] = include_bytes!("../../stocksund-saml/tests/fixtures/idp-rsa-cert.pem");
    const EC_CERT: &[u8] = include_bytes!("../../stocksund-saml/tests/fixtures/idp-ec-cert.pem");
    const RSA_KEY: &[u8] = include_bytes!("../../stocksund-saml/tests/fixtures/idp-rsa-key.pem");

    #[test]
    fn resolves_by_either_thumbprint() {
        let mut store = CertificateStore::new();
        store.add_pem(RSA_CERT).unwrap();
        let sha1 = Thumbprint::parse("DD401A321D1B2150D9982A011D71055293620DDA").unwrap();
        let sha256 = Thumbprint::parse(
            "AE38A1B26895B021CBF2053EFD98C252546BFAB43D506CE80A8A276EF12B8B57",
        )
        .unwrap();
        assert!(store.resolve(&sha1).is_some());
        assert!(store.resolve(&sha256).is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_thumbprint_is_none() {
        let mut store = CertificateStore::new();
        store.add_pem(RSA_CERT).unwrap();
        let other = Thumbprint::parse("B5CFC172A3B8C53E1BEB3515019D1D8FA8DA288D").unwrap();
        assert!(store.resolve(&other).is_none());
    }

    #[test]
    fn pem_bundle() {
        let mut bundle = RSA_CERT.to_vec();
        bundle.extend_from_slice(EC_CERT);
        let mut store = CertificateStore::new();
        assert_eq!(store.add_pem(&bundle).unwrap(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn private_key_is_not_a_certificate() {
        assert!(CertificateStore::new().add_pem(RSA_KEY).is_err());
    }

    #[test]
    fn bundle_with_key_and_comments_keeps_certificates() {
        let mut bundle = b"subject=CN=idp.example.org\n".to_vec();
        bundle.extend_from_slice(RSA_CERT);
        bundle.extend_from_slice(b"\n# signing key\n");
        bundle.extend_from_slice(RSA_KEY);
        bundle.extend_from_slice(EC_CERT);
        let mut store = CertificateStore::new();
        assert_eq!(store.add_pem(&bundle).unwrap(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn corrupt_certificate_block_is_an_error() {
        let pem = b"-----BEGIN CERTIFICATE-----\n!!!!\n-----END CERTIFICATE-----\n";
        assert!(matches!(
            CertificateStore::new().add_pem(pem),
            Err(Error::Certificate(_))
        ));
    }

    #[test]
    fn load_fixture_directory() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../stocksund-saml/tests/fixtures");
        // idp-rsa, idp-ec and rogue; the private keys are skipped
        let store = CertificateStore::load_dir(dir).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn missing_directory_is_io_error() {
        assert!(matches!(
            CertificateStore::load_dir("/nonexistent/stocksund-certs"),
            Err(Error::Io(_))
        ));
    }
}
