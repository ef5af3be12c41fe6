#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0 (C14N 1.0).
//!
//! Algorithm URI: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315`
//! With comments: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments`
//!
//! The canonical form:
//! - Outputs namespace declarations sorted by prefix (default first)
//! - Outputs attributes sorted by (namespace-URI, local-name)
//! - Escapes text and attribute values per C14N rules
//! - Optionally preserves or strips comments
//! - Supports document-subset canonicalization via NodeSet

use crate::render::{self, Attr, NsDecl};
use std::collections::BTreeMap;
use stocksund_core::{ns, Error};
use stocksund_xml::{qname, NodeSet};

/// Canonicalize a document using Inclusive C14N 1.0.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    let ctx = C14nContext {
        with_comments,
        node_set,
    };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}

struct C14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
}

impl C14nContext<'_> {
    fn is_visible(&self, node: &roxmltree::Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(node))
    }

    fn process_node(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        inherited_ns: &BTreeMap<String, String>,
    ) {
        match node.node_type() {
            roxmltree::NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, inherited_ns);
                }
            }
            roxmltree::NodeType::Element => self.process_element(node, output, inherited_ns),
            roxmltree::NodeType::Text => {
                if self.is_visible(&node) {
                    render::text(output, node);
                }
            }
            roxmltree::NodeType::Comment => {
                if self.with_comments && self.is_visible(&node) {
                    render::comment(output, node);
                }
            }
            roxmltree::NodeType::PI => {
                if self.is_visible(&node) {
                    render::processing_instruction(output, node);
                }
            }
        }
    }

    fn process_element(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        inherited_ns: &BTreeMap<String, String>,
    ) {
        if !self.is_visible(&node) {
            // Invisible elements contribute nothing; their visible
            // descendants still measure against the nearest visible ancestor.
            for child in node.children() {
                self.process_node(child, output, inherited_ns);
            }
            return;
        }

        // Every in-scope binding that differs from the nearest rendered
        // ancestor is output.
        let current_ns = render::in_scope_namespaces(node);
        let mut ns_decls: Vec<NsDecl> = current_ns
            .iter()
            .filter(|(prefix, uri)| inherited_ns.get(*prefix) != Some(*uri))
            .map(|(prefix, uri)| NsDecl::new(prefix, uri))
            .collect();

        // A default namespace rendered above but not in scope here is
        // undeclared with xmlns="".
        if inherited_ns.get("").is_some_and(|d| !d.is_empty()) && !current_ns.contains_key("") {
            ns_decls.push(NsDecl::new("", ""));
        }
        ns_decls.sort();

        let mut attrs = render::element_attrs(node);

        // Document subsets: xml:* attributes of omitted ancestors are
        // inherited when the immediate parent is not rendered.
        if self.node_set.is_some() {
            let parent_not_visible = node
                .parent()
                .map_or(true, |p| !p.is_element() || !self.is_visible(&p));
            if parent_not_visible {
                let extra = inherited_xml_attrs(node, &attrs);
                attrs.extend(extra);
                attrs.sort();
            }
        }

        let elem_name = qname::element_qname(node);
        render::start_tag(output, elem_name, &ns_decls, &attrs);

        let mut child_ns = current_ns;
        if !child_ns.contains_key("") && inherited_ns.contains_key("") {
            child_ns.insert(String::new(), String::new());
        }
        for child in node.children() {
            self.process_node(child, output, &child_ns);
        }

        render::end_tag(output, elem_name);
    }
}

/// Collect xml:* attributes inherited from ancestors that are not already
/// on the element's own attribute axis. The nearest ancestor wins.
fn inherited_xml_attrs(node: roxmltree::Node<'_, '_>, existing: &[Attr]) -> Vec<Attr> {
    let mut inherited: BTreeMap<String, String> = BTreeMap::new();
    for ancestor in node.ancestors().skip(1).filter(|n| n.is_element()) {
        for attr in ancestor.attributes() {
            if attr.namespace() == Some(ns::XML) {
                inherited
                    .entry(attr.name().to_owned())
                    .or_insert_with(|| attr.value().to_owned());
            }
        }
    }

    inherited
        .into_iter()
        .filter(|(name, _)| {
            !existing
                .iter()
                .any(|a| a.ns_uri == ns::XML && a.local_name == *name)
        })
        .map(|(name, value)| Attr {
            ns_uri: ns::XML.to_owned(),
            qualified_name: format!("xml:{name}"),
            local_name: name,
            value,
        })
        .collect()
}
