#![forbid(unsafe_code)]

//! Enveloped XML-DSig verification against a pinned key.
//!
//! Processing order:
//! 1. Register ID attributes, refusing duplicates
//! 2. Locate the single `<Signature>` child of the signed element
//! 3. Check the single `<Reference>` points back at that element
//! 4. Run transforms, compute the digest, compare
//! 5. Compare any embedded certificate against the pin
//! 6. Canonicalize `<SignedInfo>` and verify `<SignatureValue>`
//!
//! Steps 2 and 3 tie the signature to the element being verified.

use crate::context::DsigContext;
use crate::reference;
use stocksund_core::{ns, Error};
use stocksund_keys::keyinfo;
use stocksund_xml::document::{
    build_id_map, find_child_element, find_child_elements, DEFAULT_ID_ATTRS,
};

/// Result of signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// Signature is valid.
    Valid,
    /// Signature is invalid.
    Invalid {
        reason: String,
    },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid)
    }

    fn invalid(reason: impl Into<String>) -> Self {
        VerifyResult::Invalid {
            reason: reason.into(),
        }
    }
}

/// Verify the enveloped signature of `signed`.
///
/// `Err` means the signature could not be processed (missing elements,
/// unsupported algorithms, bad base64); `Ok(Invalid)` means it was
/// processed and does not hold. Callers that only care about trust should
/// treat both as failure.
pub fn verify_enveloped(
    ctx: &DsigContext,
    doc: &roxmltree::Document<'_>,
    signed: roxmltree::Node<'_, '_>,
) -> Result<VerifyResult, Error> {
    let id_map = build_id_map(doc, &DEFAULT_ID_ATTRS)?;

    let signatures = find_child_elements(signed, ns::DSIG, ns::node::SIGNATURE);
    let sig_node = match signatures.as_slice() {
        [] => return Ok(VerifyResult::invalid("element is not signed")),
        [one] => *one,
        _ => return Ok(VerifyResult::invalid("element carries more than one Signature")),
    };

    let signed_info = find_child_element(sig_node, ns::DSIG, ns::node::SIGNED_INFO)
        .ok_or_else(|| Error::MissingElement("SignedInfo".into()))?;
    let sig_method_uri = reference::read_signature_method(signed_info)?;
    let sig_alg = stocksund_crypto::sign::from_uri(sig_method_uri)?;
    tracing::debug!(signature_method = sig_method_uri, "verifying enveloped signature");

    // Exactly one reference, and it must name the signed element.
    let references = find_child_elements(signed_info, ns::DSIG, ns::node::REFERENCE);
    let [reference] = references.as_slice() else {
        return Ok(VerifyResult::invalid(format!(
            "expected exactly one Reference, found {}",
            references.len()
        )));
    };
    let uri = reference.attribute(ns::attr::URI).unwrap_or("");
    let target = match reference::resolve_target(doc, &id_map, uri) {
        Ok(target) => target,
        Err(e) => return Ok(VerifyResult::invalid(format!("Reference URI: {e}"))),
    };
    if target.id() != signed.id() {
        return Ok(VerifyResult::invalid(
            "Reference does not point at the signed element",
        ));
    }

    let expected_digest = find_child_element(*reference, ns::DSIG, ns::node::DIGEST_VALUE)
        .ok_or_else(|| Error::MissingElement("DigestValue".into()))
        .and_then(|n| base64_text(n, "DigestValue"))?;
    let (digest_uri, computed) = reference::compute_digest(doc, *reference, target, sig_node)?;
    if !stocksund_crypto::digest::digests_match(&computed, &expected_digest) {
        tracing::debug!(digest = %digest_uri, "reference digest mismatch");
        return Ok(VerifyResult::invalid("reference digest does not match"));
    }

    if let Some(pinned) = &ctx.pinned_certificate {
        if let Some(key_info) = find_child_element(sig_node, ns::DSIG, ns::node::KEY_INFO) {
            for der in keyinfo::x509_certificates(key_info)? {
                if pinned.same_kind_of(&der) != *pinned {
                    return Ok(VerifyResult::invalid(
                        "embedded certificate does not match the pinned certificate",
                    ));
                }
            }
        }
    }

    let canonical = reference::canonical_signed_info(doc, signed_info)?;
    let sig_value = find_child_element(sig_node, ns::DSIG, ns::node::SIGNATURE_VALUE)
        .ok_or_else(|| Error::MissingElement("SignatureValue".into()))
        .and_then(|n| base64_text(n, "SignatureValue"))?;

    let key = ctx.key.to_verifying_key();
    if sig_alg.verify(&key, &canonical, &sig_value)? {
        tracing::debug!(
            key = ctx.key.data.algorithm_name(),
            "signature value verified"
        );
        Ok(VerifyResult::Valid)
    } else {
        Ok(VerifyResult::invalid("signature value verification failed"))
    }
}

fn base64_text(node: roxmltree::Node<'_, '_>, what: &str) -> Result<Vec<u8>, Error> {
    let text: String = node
        .children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect();
    keyinfo::decode_base64_text(&text).map_err(|e| Error::Base64(format!("{what}: {e}")))
}
