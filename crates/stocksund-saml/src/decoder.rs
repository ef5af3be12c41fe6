#![forbid(unsafe_code)]

//! Base64 envelope and XML extraction.

use crate::assertion::{Assertion, Attribute, Conditions};
use crate::error::Rejection;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, Utc};
use roxmltree::{Document, Node, NodeId};
use stocksund_core::ns;
use stocksund_xml::document::{find_child_element, find_child_elements, find_elements, trimmed_text};

/// Largest accepted token, in bytes of base64 text.
pub const MAX_TOKEN_BYTES: usize = 512 * 1024;

/// A decoded token: the XML text and the assertion read out of it.
///
/// The XML is kept so the signature stage can work on the exact bytes
/// that were signed.
#[derive(Debug, Clone)]
pub struct ParsedToken {
    xml: String,
    assertion_node: NodeId,
    pub assertion: Assertion,
}

impl ParsedToken {
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Re-parse the XML. Parsing is deterministic, so node ids recorded at
    /// decode time stay valid.
    pub fn document(&self) -> Result<Document<'_>, Rejection> {
        stocksund_xml::parse(&self.xml).map_err(|e| Rejection::malformed(e.to_string()))
    }

    /// The assertion element within a document returned by [`document`](Self::document).
    pub fn assertion_node<'a, 'input>(
        &self,
        doc: &'a Document<'input>,
    ) -> Result<Node<'a, 'input>, Rejection> {
        doc.get_node(self.assertion_node)
            .filter(|n| n.has_tag_name((ns::SAML2_ASSERTION, ns::node::ASSERTION)))
            .ok_or_else(|| Rejection::malformed("assertion element not found"))
    }
}

/// Decode a base64 bearer token and extract its single `Assertion`.
pub fn decode(raw_token: &str) -> Result<ParsedToken, Rejection> {
    if raw_token.len() > MAX_TOKEN_BYTES {
        return Err(Rejection::malformed(format!(
            "token exceeds {MAX_TOKEN_BYTES} bytes"
        )));
    }
    let compact: String = raw_token
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(Rejection::malformed("token is empty"));
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| Rejection::malformed("token is not valid base64"))?;
    let xml = String::from_utf8(bytes)
        .map_err(|_| Rejection::malformed("decoded token is not UTF-8"))?;

    let (assertion_node, assertion) = {
        let doc = stocksund_xml::parse(&xml)
            .map_err(|e| Rejection::malformed(e.to_string()))?;
        let node = locate_assertion(&doc)?;
        (node.id(), read_assertion(node)?)
    };
    tracing::trace!(xml_len = xml.len(), "token decoded");

    Ok(ParsedToken {
        xml,
        assertion_node,
        assertion,
    })
}

fn locate_assertion<'a, 'input>(doc: &'a Document<'input>) -> Result<Node<'a, 'input>, Rejection> {
    let assertions = find_elements(doc.root(), ns::SAML2_ASSERTION, ns::node::ASSERTION);
    match assertions.as_slice() {
        [one] => Ok(*one),
        [] => {
            let encrypted =
                find_elements(doc.root(), ns::SAML2_ASSERTION, ns::node::ENCRYPTED_ASSERTION);
            if encrypted.is_empty() {
                Err(Rejection::malformed("no SAML 2.0 Assertion element"))
            } else {
                Err(Rejection::malformed("encrypted assertions are not supported"))
            }
        }
        many => Err(Rejection::malformed(format!(
            "expected one Assertion, found {}",
            many.len()
        ))),
    }
}

fn saml_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    find_child_element(node, ns::SAML2_ASSERTION, name)
}

fn read_assertion(node: Node<'_, '_>) -> Result<Assertion, Rejection> {
    let issuer = saml_child(node, ns::node::ISSUER).map(text_content);

    let name_id = saml_child(node, ns::node::SUBJECT).and_then(|s| saml_child(s, ns::node::NAME_ID));

    let has_signature = !find_child_elements(node, ns::DSIG, ns::node::SIGNATURE).is_empty();

    let conditions = match saml_child(node, ns::node::CONDITIONS) {
        Some(c) => read_conditions(c)?,
        None => Conditions::default(),
    };

    let attributes = saml_child(node, ns::node::ATTRIBUTE_STATEMENT)
        .map(read_attributes)
        .unwrap_or_default();

    Ok(Assertion {
        id: node.attribute(ns::attr::ID).map(str::to_owned),
        issue_instant: node.attribute(ns::attr::ISSUE_INSTANT).map(str::to_owned),
        issuer,
        subject_name_id: name_id.and_then(trimmed_text),
        name_id_format: name_id
            .and_then(|n| n.attribute(ns::attr::FORMAT))
            .map(str::to_owned),
        has_signature,
        conditions,
        attributes,
    })
}

fn read_conditions(node: Node<'_, '_>) -> Result<Conditions, Rejection> {
    let audience_restrictions = find_child_elements(node, ns::SAML2_ASSERTION, ns::node::AUDIENCE_RESTRICTION)
        .into_iter()
        .map(|restriction| {
            find_child_elements(restriction, ns::SAML2_ASSERTION, ns::node::AUDIENCE)
                .into_iter()
                .filter_map(trimmed_text)
                .collect()
        })
        .collect();

    Ok(Conditions {
        audience_restrictions,
        not_before: date_attr(node, ns::attr::NOT_BEFORE)?,
        not_on_or_after: date_attr(node, ns::attr::NOT_ON_OR_AFTER)?,
    })
}

fn read_attributes(statement: Node<'_, '_>) -> Vec<Attribute> {
    find_child_elements(statement, ns::SAML2_ASSERTION, ns::node::ATTRIBUTE)
        .into_iter()
        .filter_map(|attr| {
            let name = attr.attribute(ns::attr::NAME)?.to_owned();
            let values = find_child_elements(attr, ns::SAML2_ASSERTION, ns::node::ATTRIBUTE_VALUE)
                .into_iter()
                .map(|v| trimmed_text(v).unwrap_or_default())
                .collect();
            Some(Attribute { name, values })
        })
        .collect()
}

/// Concatenated text children, untouched.
fn text_content(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect()
}

fn date_attr(node: Node<'_, '_>, name: &str) -> Result<Option<DateTime<Utc>>, Rejection> {
    node.attribute(name)
        .map(|value| {
            parse_date_time(value)
                .ok_or_else(|| Rejection::malformed(format!("{name} is not a valid xs:dateTime")))
        })
        .transpose()
}

/// Parse an `xs:dateTime`. A value without a zone offset is taken as UTC.
pub fn parse_date_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
