#![forbid(unsafe_code)]

//! The validation pipeline.
//!
//! decode → signature → issuer → audience → time window → subject.
//! The first failing stage decides the verdict; later stages never run.

use crate::conditions::{self, Clock, SystemClock};
use crate::config::TrustConfig;
use crate::decoder;
use crate::error::{Rejection, ValidationResult};
use crate::issuer;
use crate::signature;
use crate::subject::{self, Identity};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use stocksund_keys::CertificateSource;

/// Validates bearer assertions from one IdP.
///
/// Holds no mutable state, so one validator can serve any number of
/// threads.
#[derive(Clone)]
pub struct SamlValidator {
    config: TrustConfig,
    certificates: Arc<dyn CertificateSource>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SamlValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamlValidator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SamlValidator {
    pub fn new(config: TrustConfig, certificates: impl CertificateSource + 'static) -> Self {
        Self {
            config,
            certificates: Arc::new(certificates),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used by [`validate`](Self::validate).
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    pub fn validate(&self, raw_token: &str) -> ValidationResult {
        self.validate_at(raw_token, self.clock.now())
    }

    /// Like [`validate`](Self::validate), with an explicit "now".
    pub fn validate_at(&self, raw_token: &str, now: DateTime<Utc>) -> ValidationResult {
        match self.run(raw_token, now) {
            Ok(identity) => ValidationResult::Valid {
                name: identity.name,
            },
            Err(rejection) => rejection.into(),
        }
    }

    /// Full identity including issuer and attributes.
    pub fn validate_identity(&self, raw_token: &str) -> Result<Identity, Rejection> {
        self.run(raw_token, self.clock.now())
    }

    pub fn validate_identity_at(
        &self,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Identity, Rejection> {
        self.run(raw_token, now)
    }

    fn run(&self, raw_token: &str, now: DateTime<Utc>) -> Result<Identity, Rejection> {
        let idp = self.config.name.as_str();
        let result = self.stages(raw_token, now);
        match &result {
            Ok(identity) => tracing::debug!(idp, name = %identity.name, "assertion accepted"),
            Err(r) => tracing::warn!(idp, kind = %r.kind, detail = %r.detail, "assertion rejected"),
        }
        result
    }

    fn stages(&self, raw_token: &str, now: DateTime<Utc>) -> Result<Identity, Rejection> {
        let idp = self.config.name.as_str();

        let token = decoder::decode(raw_token)?;
        tracing::debug!(idp, stage = "decode", id = ?token.assertion.id, "ok");

        let certificate = signature::resolve_certificate(
            self.certificates.as_ref(),
            &self.config.certificate_thumbprint,
        )?;
        signature::verify(&token, &certificate)?;
        tracing::debug!(idp, stage = "signature", subject = certificate.subject(), "ok");

        issuer::validate(&token.assertion, &self.config.valid_issuers)?;
        tracing::debug!(idp, stage = "issuer", "ok");

        conditions::validate_audience(&token.assertion, &self.config.audience)?;
        tracing::debug!(idp, stage = "audience", "ok");

        conditions::validate_window(&token.assertion, now)?;
        tracing::debug!(idp, stage = "window", "ok");

        subject::extract(&token.assertion)
    }
}
