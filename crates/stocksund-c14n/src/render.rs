#![forbid(unsafe_code)]

//! Shared rendering utilities for C14N output.

use crate::escape::{self, Context};
use std::collections::BTreeMap;
use stocksund_core::ns;
use stocksund_xml::qname;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    /// The namespace URI.
    pub uri: String,
}

impl NsDecl {
    pub fn new(prefix: &str, uri: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
        }
    }

    /// Render this namespace declaration into `out`.
    pub fn render(&self, out: &mut Vec<u8>) {
        if self.prefix.is_empty() {
            out.extend_from_slice(b" xmlns=\"");
        } else {
            out.extend_from_slice(b" xmlns:");
            out.extend_from_slice(self.prefix.as_bytes());
            out.extend_from_slice(b"=\"");
        }
        escape::write_escaped(out, &self.uri, Context::Attribute);
        out.push(b'"');
    }
}

impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Default namespace (empty prefix) sorts first, then by prefix.
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// The namespace URI of the attribute ("" for no namespace).
    pub ns_uri: String,
    pub local_name: String,
    /// The qualified name exactly as written in the source.
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    pub fn from_node(input: &str, attr: &roxmltree::Attribute<'_, '_>) -> Self {
        Self {
            ns_uri: attr.namespace().unwrap_or("").to_owned(),
            local_name: attr.name().to_owned(),
            qualified_name: qname::attribute_qname(input, attr).to_owned(),
            value: attr.value().to_owned(),
        }
    }

    /// Render this attribute into `out`.
    pub fn render(&self, out: &mut Vec<u8>) {
        out.push(b' ');
        out.extend_from_slice(self.qualified_name.as_bytes());
        out.extend_from_slice(b"=\"");
        escape::write_escaped(out, &self.value, Context::Attribute);
        out.push(b'"');
    }
}

impl Ord for Attr {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Unqualified attributes first, then by (namespace URI, local name).
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then(self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Collect the sorted attribute axis of an element.
pub fn element_attrs(node: roxmltree::Node<'_, '_>) -> Vec<Attr> {
    let input = node.document().input_text();
    let mut attrs: Vec<Attr> = node
        .attributes()
        .map(|a| Attr::from_node(input, &a))
        .collect();
    attrs.sort();
    attrs
}

/// In-scope namespace bindings of an element, keyed by prefix.
///
/// The `xml` binding and default-namespace undeclarations are omitted.
pub fn in_scope_namespaces(node: roxmltree::Node<'_, '_>) -> BTreeMap<String, String> {
    node.namespaces()
        .filter(|n| !n.uri().is_empty() && n.uri() != ns::XML)
        .map(|n| (n.name().unwrap_or("").to_owned(), n.uri().to_owned()))
        .collect()
}

/// Write an element start tag.
pub fn start_tag(out: &mut Vec<u8>, name: &str, ns_decls: &[NsDecl], attrs: &[Attr]) {
    out.push(b'<');
    out.extend_from_slice(name.as_bytes());
    for decl in ns_decls {
        decl.render(out);
    }
    for attr in attrs {
        attr.render(out);
    }
    out.push(b'>');
}

pub fn end_tag(out: &mut Vec<u8>, name: &str) {
    out.extend_from_slice(b"</");
    out.extend_from_slice(name.as_bytes());
    out.push(b'>');
}

pub fn text(out: &mut Vec<u8>, node: roxmltree::Node<'_, '_>) {
    escape::write_escaped(out, node.text().unwrap_or(""), Context::Text);
}

/// Write a comment, with the line breaks C14N requires at document level.
pub fn comment(out: &mut Vec<u8>, node: roxmltree::Node<'_, '_>) {
    around_document_level(out, node, |out| {
        out.extend_from_slice(b"<!--");
        out.extend_from_slice(node.text().unwrap_or("").as_bytes());
        out.extend_from_slice(b"-->");
    });
}

/// Write a processing instruction.
pub fn processing_instruction(out: &mut Vec<u8>, node: roxmltree::Node<'_, '_>) {
    let Some(pi) = node.pi() else { return };
    around_document_level(out, node, |out| {
        out.extend_from_slice(b"<?");
        out.extend_from_slice(pi.target.as_bytes());
        if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
            out.push(b' ');
            escape::write_escaped(out, value, Context::ProcessingInstruction);
        }
        out.extend_from_slice(b"?>");
    });
}

fn around_document_level(
    out: &mut Vec<u8>,
    node: roxmltree::Node<'_, '_>,
    body: impl FnOnce(&mut Vec<u8>),
) {
    let top_level = node
        .parent()
        .is_some_and(|p| p.node_type() == roxmltree::NodeType::Root);
    if top_level && node.prev_siblings().any(|s| s.is_element()) {
        out.push(b'\n');
    }
    body(out);
    if top_level && node.next_siblings().any(|s| s.is_element()) {
        out.push(b'\n');
    }
}
