#![forbid(unsafe_code)]

//! `<Reference>` processing shared by signing and verification.

use std::collections::HashMap;
use stocksund_c14n::C14nMode;
use stocksund_core::{algorithm, ns, Error};
use stocksund_transforms::{C14nTransform, EnvelopedSignatureTransform, TransformData, TransformPipeline};
use stocksund_xml::document::find_child_element;
use stocksund_xml::{xpath, NodeSet};

/// Resolve the element a reference URI points at.
///
/// Only same-document references are supported: `#id`, or the empty URI
/// which selects the document element.
pub(crate) fn resolve_target<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    id_map: &HashMap<String, roxmltree::NodeId>,
    uri: &str,
) -> Result<roxmltree::Node<'a, 'input>, Error> {
    if uri.is_empty() {
        Ok(doc.root_element())
    } else if let Some(id) = xpath::parse_same_document_ref(uri) {
        xpath::resolve_id(doc, id_map, id)
    } else {
        Err(Error::InvalidUri(format!("unsupported reference URI: {uri}")))
    }
}

/// Build the transform pipeline declared by a `<Reference>`.
pub(crate) fn read_transforms(
    reference: roxmltree::Node<'_, '_>,
    sig_node: roxmltree::Node<'_, '_>,
) -> Result<TransformPipeline, Error> {
    let mut pipeline = TransformPipeline::new();
    let Some(transforms) = find_child_element(reference, ns::DSIG, ns::node::TRANSFORMS) else {
        return Ok(pipeline);
    };
    for t_node in transforms.children().filter(|n| n.is_element()) {
        if !t_node.has_tag_name((ns::DSIG, ns::node::TRANSFORM)) {
            return Err(Error::XmlStructure(format!(
                "unexpected element in Transforms: {}",
                t_node.tag_name().name()
            )));
        }
        let uri = t_node
            .attribute(ns::attr::ALGORITHM)
            .ok_or_else(|| Error::MissingAttribute("Algorithm on Transform".into()))?;
        match uri {
            algorithm::ENVELOPED_SIGNATURE => {
                pipeline.push(Box::new(EnvelopedSignatureTransform::new(sig_node.id())));
            }
            _ => {
                let mode = C14nMode::from_uri(uri)
                    .ok_or_else(|| Error::UnsupportedAlgorithm(format!("transform: {uri}")))?;
                pipeline.push(Box::new(C14nTransform::new(mode, read_inclusive_prefixes(t_node))));
            }
        }
    }
    Ok(pipeline)
}

/// Run a reference's transforms over `target` and digest the result.
///
/// Returns the digest algorithm URI and the computed value.
pub(crate) fn compute_digest<'input>(
    doc: &roxmltree::Document<'input>,
    reference: roxmltree::Node<'_, 'input>,
    target: roxmltree::Node<'_, 'input>,
    sig_node: roxmltree::Node<'_, 'input>,
) -> Result<(String, Vec<u8>), Error> {
    let digest_method = find_child_element(reference, ns::DSIG, ns::node::DIGEST_METHOD)
        .ok_or_else(|| Error::MissingElement("DigestMethod".into()))?;
    let digest_uri = digest_method
        .attribute(ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute("Algorithm on DigestMethod".into()))?;

    let pipeline = read_transforms(reference, sig_node)?;
    tracing::debug!(transforms = ?pipeline.uris(), digest = digest_uri, "processing reference");

    let data = TransformData::Xml {
        doc,
        node_set: NodeSet::tree_without_comments(target),
    };
    let bytes = pipeline.execute(data)?.into_binary()?;
    tracing::trace!(len = bytes.len(), "reference canonicalized");

    let computed = stocksund_crypto::digest::digest(digest_uri, &bytes)?;
    Ok((digest_uri.to_owned(), computed))
}

/// Read the SignedInfo canonicalization method and its PrefixList.
pub(crate) fn read_c14n_method(
    signed_info: roxmltree::Node<'_, '_>,
) -> Result<(C14nMode, Vec<String>), Error> {
    let method = find_child_element(signed_info, ns::DSIG, ns::node::CANONICALIZATION_METHOD)
        .ok_or_else(|| Error::MissingElement("CanonicalizationMethod".into()))?;
    let uri = method
        .attribute(ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute("Algorithm on CanonicalizationMethod".into()))?;
    let mode = C14nMode::from_uri(uri)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {uri}")))?;
    Ok((mode, read_inclusive_prefixes(method)))
}

/// Read the SignatureMethod algorithm URI.
pub(crate) fn read_signature_method<'a>(
    signed_info: roxmltree::Node<'a, '_>,
) -> Result<&'a str, Error> {
    find_child_element(signed_info, ns::DSIG, ns::node::SIGNATURE_METHOD)
        .ok_or_else(|| Error::MissingElement("SignatureMethod".into()))?
        .attribute(ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute("Algorithm on SignatureMethod".into()))
}

/// Canonicalize `<SignedInfo>` as a document subset.
pub(crate) fn canonical_signed_info(
    doc: &roxmltree::Document<'_>,
    signed_info: roxmltree::Node<'_, '_>,
) -> Result<Vec<u8>, Error> {
    let (mode, prefixes) = read_c14n_method(signed_info)?;
    let set = NodeSet::tree_without_comments(signed_info);
    let bytes = stocksund_c14n::canonicalize_doc(doc, mode, Some(&set), &prefixes)?;
    tracing::trace!(len = bytes.len(), c14n = mode.uri(), "SignedInfo canonicalized");
    Ok(bytes)
}

fn read_inclusive_prefixes(node: roxmltree::Node<'_, '_>) -> Vec<String> {
    find_child_element(node, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|n| n.attribute(ns::attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}
