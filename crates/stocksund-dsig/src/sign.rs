#![forbid(unsafe_code)]

//! XML-DSig signature creation.
//!
//! Signs an XML document using a template with empty DigestValue and
//! SignatureValue elements. Used to mint test tokens; validation never
//! signs anything.

use crate::context::DsigContext;
use crate::reference;
use base64::Engine;
use stocksund_core::{ns, Error};
use stocksund_xml::document::{
    build_id_map, find_child_element, find_element, DEFAULT_ID_ATTRS,
};
use stocksund_xml::qname;

/// Sign an XML template document.
///
/// The template must contain a `<Signature>` element with a single
/// `<Reference>` and empty `<DigestValue>` and `<SignatureValue>` elements.
/// An empty `<X509Certificate>` is filled from the context key's
/// certificate when one is attached.
///
/// Returns the signed XML document as a string.
pub fn sign(ctx: &DsigContext, template_xml: &str) -> Result<String, Error> {
    if !ctx.key.data.has_private() {
        return Err(Error::Key("signing requires a private key".into()));
    }
    let engine = base64::engine::general_purpose::STANDARD;

    // Pass 1: reference digest.
    let with_digest = {
        let doc = stocksund_xml::parse(template_xml)?;
        let id_map = build_id_map(&doc, &DEFAULT_ID_ATTRS)?;
        let sig_node = signature_node(&doc)?;
        let signed_info = child(sig_node, ns::node::SIGNED_INFO)?;
        let reference_node = child(signed_info, ns::node::REFERENCE)?;
        let uri = reference_node.attribute(ns::attr::URI).unwrap_or("");
        let target = reference::resolve_target(&doc, &id_map, uri)?;
        let (_, digest) = reference::compute_digest(&doc, reference_node, target, sig_node)?;
        let digest_value = child(reference_node, ns::node::DIGEST_VALUE)?;
        replace_content(template_xml, digest_value, &engine.encode(digest))
    };

    // Pass 2: signature over the canonical SignedInfo.
    let mut signed = {
        let doc = stocksund_xml::parse(&with_digest)?;
        let sig_node = signature_node(&doc)?;
        let signed_info = child(sig_node, ns::node::SIGNED_INFO)?;
        let sig_alg = stocksund_crypto::sign::from_uri(reference::read_signature_method(signed_info)?)?;
        let canonical = reference::canonical_signed_info(&doc, signed_info)?;
        let signature = sig_alg.sign(&ctx.key.to_signing_key(), &canonical)?;
        let sig_value = child(sig_node, ns::node::SIGNATURE_VALUE)?;
        replace_content(&with_digest, sig_value, &engine.encode(signature))
    };

    // Pass 3: embedded certificate, outside the signed content.
    if let Some(cert) = &ctx.key.certificate {
        let doc = stocksund_xml::parse(&signed)?;
        let sig_node = signature_node(&doc)?;
        let empty_cert = find_element(sig_node, ns::DSIG, ns::node::X509_CERTIFICATE)
            .filter(|n| stocksund_xml::document::trimmed_text(*n).is_none());
        if let Some(node) = empty_cert {
            signed = replace_content(&signed, node, &engine.encode(cert));
        }
    }

    tracing::debug!(key = ctx.key.data.algorithm_name(), "template signed");
    Ok(signed)
}

fn signature_node<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
) -> Result<roxmltree::Node<'a, 'input>, Error> {
    find_element(doc.root(), ns::DSIG, ns::node::SIGNATURE)
        .ok_or_else(|| Error::MissingElement("Signature".into()))
}

fn child<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    local_name: &str,
) -> Result<roxmltree::Node<'a, 'input>, Error> {
    find_child_element(parent, ns::DSIG, local_name)
        .ok_or_else(|| Error::MissingElement(local_name.into()))
}

/// Replace an element in the source text with the same element holding
/// `content`. Works for both `<x></x>` and `<x/>` templates.
fn replace_content(xml: &str, node: roxmltree::Node<'_, '_>, content: &str) -> String {
    let range = node.range();
    let name = qname::element_qname(node);
    let start_tag_end = xml[range.start..range.end]
        .find('>')
        .map_or(range.end, |i| range.start + i + 1);
    let self_closing = xml[..start_tag_end].ends_with("/>");

    let mut out = String::with_capacity(xml.len() + content.len() + name.len() + 3);
    if self_closing {
        out.push_str(&xml[..start_tag_end - 2]);
        out.push('>');
    } else {
        out.push_str(&xml[..start_tag_end]);
    }
    out.push_str(content);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
    out.push_str(&xml[range.end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::{verify_enveloped, VerifyResult};
    use stocksund_keys::loader;

    const RSA_KEY: &[u8] = include_bytes!("../../stocksund-saml/tests/fixtures/idp-rsa-key.pem");
    const RSA_CERT: &[u8] = include_bytes!("../../stocksund-saml/tests/fixtures/idp-rsa-cert.pem");
    const EC_KEY: &[u8] = include_bytes!("../../stocksund-saml/tests/fixtures/idp-ec-key.pem");
    const EC_CERT: &[u8] = include_bytes!("../../stocksund-saml/tests/fixtures/idp-ec-cert.pem");

    fn template(sig_alg: &str) -> String {
        format!(
            r##"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_t1" Version="2.0">
  <saml:Issuer>https://idp.example.org/saml</saml:Issuer>
  <ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
    <ds:SignedInfo>
      <ds:CanonicalizationMethod Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/>
      <ds:SignatureMethod Algorithm="{sig_alg}"/>
      <ds:Reference URI="#_t1">
        <ds:Transforms>
          <ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/>
          <ds:Transform Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/>
        </ds:Transforms>
        <ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>
        <ds:DigestValue/>
      </ds:Reference>
    </ds:SignedInfo>
    <ds:SignatureValue></ds:SignatureValue>
    <ds:KeyInfo><ds:X509Data><ds:X509Certificate/></ds:X509Data></ds:KeyInfo>
  </ds:Signature>
  <saml:Subject><saml:NameID>bob</saml:NameID></saml:Subject>
</saml:Assertion>"##
        )
    }

    fn round_trip(key: &[u8], cert: &[u8], sig_alg: &str) -> VerifyResult {
        let signing_key = loader::load_private_pem(key)
            .unwrap()
            .with_certificate(loader::cert_pem_to_der(cert).unwrap());
        let signed = sign(&DsigContext::new(signing_key), &template(sig_alg)).unwrap();
        assert!(!signed.contains("<ds:DigestValue/>"));
        assert!(!signed.contains("<ds:X509Certificate/>"));

        let doc = stocksund_xml::parse(&signed).unwrap();
        let verifier = DsigContext::new(loader::load_x509_cert_pem(cert).unwrap());
        verify_enveloped(&verifier, &doc, doc.root_element()).unwrap()
    }

    #[test]
    fn rsa_sign_then_verify() {
        let alg = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
        assert_eq!(round_trip(RSA_KEY, RSA_CERT, alg), VerifyResult::Valid);
    }

    #[test]
    fn ecdsa_sign_then_verify() {
        let alg = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256";
        assert_eq!(round_trip(EC_KEY, EC_CERT, alg), VerifyResult::Valid);
    }

    #[test]
    fn public_key_cannot_sign() {
        let ctx = DsigContext::new(loader::load_x509_cert_pem(RSA_CERT).unwrap());
        let alg = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
        assert!(matches!(sign(&ctx, &template(alg)), Err(Error::Key(_))));
    }

    #[test]
    fn replace_handles_both_empty_forms() {
        let xml = "<r><a/><b></b></r>";
        let doc = roxmltree::Document::parse(xml).unwrap();
        let a = doc.root_element().first_element_child().unwrap();
        let once = replace_content(xml, a, "1");
        assert_eq!(once, "<r><a>1</a><b></b></r>");
        let doc = roxmltree::Document::parse(&once).unwrap();
        let b = doc.root_element().last_element_child().unwrap();
        assert_eq!(replace_content(&once, b, "2"), "<r><a>1</a><b>2</b></r>");
    }
}
