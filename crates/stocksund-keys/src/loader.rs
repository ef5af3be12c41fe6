#![forbid(unsafe_code)]

//! Key loading from PEM and DER (PKCS#8, PKCS#1, SEC1, SPKI, X.509).

use crate::key::{Key, KeyData};
use stocksund_core::Error;

/// Load an RSA private key from PEM data (PKCS#8, then PKCS#1).
pub fn load_rsa_private_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs8::DecodePrivateKey;
    let pem_str = pem_text(pem_data)?;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_pem(pem_str) {
        return Ok(rsa_private(pk));
    }

    use pkcs1::DecodeRsaPrivateKey;
    let pk = rsa::RsaPrivateKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key PEM: {e}")))?;
    Ok(rsa_private(pk))
}

/// Load an EC private key (P-256 or P-384) from PKCS#8 or SEC1 PEM.
pub fn load_ec_private_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs8::DecodePrivateKey;
    let pem_str = pem_text(pem_data)?;

    if let Ok(sk) = p256::ecdsa::SigningKey::from_pkcs8_pem(pem_str) {
        return Ok(p256_private(sk));
    }
    if let Ok(sk) = p384::ecdsa::SigningKey::from_pkcs8_pem(pem_str) {
        return Ok(p384_private(sk));
    }
    if let Ok(secret) = p256::SecretKey::from_sec1_pem(pem_str) {
        return Ok(p256_private(secret.into()));
    }
    if let Ok(secret) = p384::SecretKey::from_sec1_pem(pem_str) {
        return Ok(p384_private(secret.into()));
    }
    Err(Error::Key("failed to parse EC private key PEM".into()))
}

/// Auto-detect a private key in PEM data.
pub fn load_private_pem(pem_data: &[u8]) -> Result<Key, Error> {
    if let Ok(key) = load_rsa_private_pem(pem_data) {
        return Ok(key);
    }
    if let Ok(key) = load_ec_private_pem(pem_data) {
        return Ok(key);
    }
    Err(Error::Key(
        "unable to auto-detect private key format from PEM data".into(),
    ))
}

/// Load a private key from PKCS#8 DER bytes.
///
/// Tries RSA, then EC P-256, P-384 in order.
pub fn load_private_key_pkcs8_der(der: &[u8]) -> Result<Key, Error> {
    use pkcs8::DecodePrivateKey;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(rsa_private(pk));
    }
    if let Ok(sk) = p256::ecdsa::SigningKey::from_pkcs8_der(der) {
        return Ok(p256_private(sk));
    }
    if let Ok(sk) = p384::ecdsa::SigningKey::from_pkcs8_der(der) {
        return Ok(p384_private(sk));
    }
    Err(Error::Key(
        "unable to parse PKCS#8 DER private key (tried RSA, P-256, P-384)".into(),
    ))
}

/// Load a key from raw SubjectPublicKeyInfo DER bytes.
pub fn load_spki_der(spki_der: &[u8]) -> Result<Key, Error> {
    use spki::DecodePublicKey;

    if let Ok(pk) = rsa::RsaPublicKey::from_public_key_der(spki_der) {
        return Ok(Key::new(KeyData::Rsa {
            private: None,
            public: pk,
        }));
    }
    if let Ok(vk) = p256::ecdsa::VerifyingKey::from_public_key_der(spki_der) {
        return Ok(Key::new(KeyData::EcP256 {
            private: None,
            public: vk,
        }));
    }
    if let Ok(vk) = p384::ecdsa::VerifyingKey::from_public_key_der(spki_der) {
        return Ok(Key::new(KeyData::EcP384 {
            private: None,
            public: vk,
        }));
    }
    Err(Error::Key(
        "unsupported public key algorithm in SPKI DER".into(),
    ))
}

/// Load the public key of a DER-encoded X.509 certificate.
pub fn load_x509_cert_der(data: &[u8]) -> Result<Key, Error> {
    use der::{Decode, Encode};
    use x509_cert::Certificate;

    let cert = Certificate::from_der(data)
        .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode SPKI: {e}")))?;

    let key = load_spki_der(&spki_der).map_err(|_| {
        Error::Certificate("unsupported public key algorithm in X.509 certificate".into())
    })?;
    Ok(key.with_certificate(data.to_vec()))
}

/// Decode a PEM-encoded certificate to DER.
pub fn cert_pem_to_der(pem_data: &[u8]) -> Result<Vec<u8>, Error> {
    // Some PEM files carry trailing blank lines.
    let trimmed = pem_text(pem_data)?.trim();
    let (label, der_bytes) = pem_rfc7468::decode_vec(trimmed.as_bytes())
        .map_err(|e| Error::Certificate(format!("failed to decode certificate PEM: {e}")))?;
    if label != "CERTIFICATE" {
        return Err(Error::Certificate(format!(
            "expected CERTIFICATE PEM label, got: {label}"
        )));
    }
    Ok(der_bytes)
}

/// Load the public key of a PEM-encoded X.509 certificate.
pub fn load_x509_cert_pem(pem_data: &[u8]) -> Result<Key, Error> {
    load_x509_cert_der(&cert_pem_to_der(pem_data)?)
}

/// Load a key from a file, auto-detecting format.
///
/// `.crt`/`.cer`/`.der` files and PEM with a `CERTIFICATE` label yield the
/// certificate's public key; anything else is tried as a private key.
pub fn load_key_file(path: &std::path::Path) -> Result<Key, Error> {
    let data = std::fs::read(path)?;
    let is_pem = data.starts_with(b"-----BEGIN");

    if is_pem {
        if contains(&data, b"BEGIN CERTIFICATE") {
            return load_x509_cert_pem(&data);
        }
        return load_private_pem(&data);
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if ["crt", "cer", "der"].iter().any(|x| ext.eq_ignore_ascii_case(x)) {
        if let Ok(key) = load_x509_cert_der(&data) {
            return Ok(key);
        }
    }

    if let Ok(key) = load_private_key_pkcs8_der(&data) {
        return Ok(key);
    }
    use pkcs1::DecodeRsaPrivateKey;
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs1_der(&data) {
        return Ok(rsa_private(pk));
    }
    if let Ok(key) = load_spki_der(&data) {
        return Ok(key);
    }

    Err(Error::Key(format!(
        "unable to auto-detect key format from file: {}",
        path.display()
    )))
}

fn pem_text(pem_data: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(pem_data).map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn rsa_private(pk: rsa::RsaPrivateKey) -> Key {
    let public = pk.to_public_key();
    Key::new(KeyData::Rsa {
        private: Some(pk),
        public,
    })
}

fn p256_private(sk: p256::ecdsa::SigningKey) -> Key {
    let public = *sk.verifying_key();
    Key::new(KeyData::EcP256 {
        private: Some(sk),
        public,
    })
}

fn p384_private(sk: p384::ecdsa::SigningKey) -> Key {
    let public = *sk.verifying_key();
    Key::new(KeyData::EcP384 {
        private: Some(sk),
        public,
    })
}
