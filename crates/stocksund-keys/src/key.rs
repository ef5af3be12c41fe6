#![forbid(unsafe_code)]

//! Key types and data structures.

use stocksund_crypto::SigningKey;

/// The underlying key data.
#[derive(Clone)]
pub enum KeyData {
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
    EcP256 {
        private: Option<p256::ecdsa::SigningKey>,
        public: p256::ecdsa::VerifyingKey,
    },
    EcP384 {
        private: Option<p384::ecdsa::SigningKey>,
        public: p384::ecdsa::VerifyingKey,
    },
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (alg, has_private) = match self {
            Self::Rsa { private, .. } => ("RSA", private.is_some()),
            Self::EcP256 { private, .. } => ("EC P-256", private.is_some()),
            Self::EcP384 { private, .. } => ("EC P-384", private.is_some()),
        };
        if has_private {
            write!(f, "{alg} private+public key")
        } else {
            write!(f, "{alg} public key")
        }
    }
}

impl KeyData {
    /// Short algorithm label used in logs.
    pub fn algorithm_name(&self) -> &'static str {
        match self {
            Self::Rsa { .. } => "RSA",
            Self::EcP256 { .. } => "EC P-256",
            Self::EcP384 { .. } => "EC P-384",
        }
    }

    pub fn has_private(&self) -> bool {
        match self {
            Self::Rsa { private, .. } => private.is_some(),
            Self::EcP256 { private, .. } => private.is_some(),
            Self::EcP384 { private, .. } => private.is_some(),
        }
    }

    /// Drop any private half.
    pub fn public_only(&self) -> KeyData {
        match self {
            Self::Rsa { public, .. } => Self::Rsa {
                private: None,
                public: public.clone(),
            },
            Self::EcP256 { public, .. } => Self::EcP256 {
                private: None,
                public: *public,
            },
            Self::EcP384 { public, .. } => Self::EcP384 {
                private: None,
                public: *public,
            },
        }
    }
}

/// Key material with an optional certificate.
#[derive(Debug, Clone)]
pub struct Key {
    pub data: KeyData,
    /// DER-encoded X.509 certificate the key was taken from or paired with.
    pub certificate: Option<Vec<u8>>,
}

impl Key {
    pub fn new(data: KeyData) -> Self {
        Self {
            data,
            certificate: None,
        }
    }

    /// Attach a DER certificate.
    pub fn with_certificate(mut self, der: Vec<u8>) -> Self {
        self.certificate = Some(der);
        self
    }

    /// Convert to a `SigningKey` for use with crypto algorithms.
    ///
    /// A key holding a private half converts to the private variant so it
    /// can both sign and verify.
    pub fn to_signing_key(&self) -> SigningKey {
        match &self.data {
            KeyData::Rsa { private: Some(pk), .. } => SigningKey::Rsa(pk.clone()),
            KeyData::Rsa { public, .. } => SigningKey::RsaPublic(public.clone()),
            KeyData::EcP256 { private: Some(sk), .. } => SigningKey::EcP256(sk.clone()),
            KeyData::EcP256 { public, .. } => SigningKey::EcP256Public(*public),
            KeyData::EcP384 { private: Some(sk), .. } => SigningKey::EcP384(sk.clone()),
            KeyData::EcP384 { public, .. } => SigningKey::EcP384Public(*public),
        }
    }

    /// Convert to a verification-only `SigningKey`.
    pub fn to_verifying_key(&self) -> SigningKey {
        Key::new(self.data.public_only()).to_signing_key()
    }
}
