#![forbid(unsafe_code)]

//! Signature stage: pinned-certificate resolution and enveloped signature
//! verification of the assertion.

use crate::decoder::ParsedToken;
use crate::error::{ErrorKind, Rejection};
use std::sync::Arc;
use stocksund_core::Error;
use stocksund_dsig::{verify_enveloped, DsigContext, VerifyResult};
use stocksund_keys::{CertificateSource, Thumbprint, TrustedCertificate};

/// Look up the pinned certificate.
///
/// An unparseable thumbprint and an unknown one are both `UntrustedIssuer`:
/// either way there is no key this validator may trust.
pub fn resolve_certificate(
    source: &dyn CertificateSource,
    thumbprint: &str,
) -> Result<Arc<TrustedCertificate>, Rejection> {
    let thumbprint = Thumbprint::parse(thumbprint).map_err(|e| {
        Rejection::new(
            ErrorKind::UntrustedIssuer,
            format!("configured thumbprint is unusable: {e}"),
        )
    })?;
    source.resolve(&thumbprint).ok_or_else(|| {
        Rejection::new(
            ErrorKind::UntrustedIssuer,
            format!("no trusted certificate with thumbprint {thumbprint}"),
        )
    })
}

/// Verify the assertion's enveloped signature with `certificate`'s key.
///
/// Only the pinned key is used. A certificate embedded in `KeyInfo` must be
/// the pinned one or the signature is refused.
pub fn verify(token: &ParsedToken, certificate: &TrustedCertificate) -> Result<(), Rejection> {
    if !token.assertion.has_signature {
        return Err(Rejection::signature("assertion is not signed"));
    }

    let doc = token.document()?;
    let assertion = token.assertion_node(&doc)?;
    let ctx = DsigContext::new(certificate.key().clone()).with_pinned_certificate(certificate.sha256());

    match verify_enveloped(&ctx, &doc, assertion) {
        Ok(VerifyResult::Valid) => Ok(()),
        Ok(VerifyResult::Invalid { reason }) => Err(Rejection::signature(reason)),
        Err(e) => Err(Rejection::signature(describe(&e))),
    }
}

fn describe(e: &Error) -> String {
    match e {
        Error::XmlStructure(msg) => format!("ambiguous document: {msg}"),
        Error::UnsupportedAlgorithm(uri) => format!("unsupported algorithm {uri}"),
        other => other.to_string(),
    }
}
