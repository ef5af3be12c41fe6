#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! The key difference from inclusive C14N: only "visibly utilized" namespace
//! declarations are output.  A namespace is visibly utilized if:
//! 1. Its prefix is used by the element's tag name, OR
//! 2. Its prefix is used by one of the element's attributes, OR
//! 3. The prefix appears in the InclusiveNamespaces PrefixList, OR
//! 4. It's the default namespace and the element is in that namespace.
//!
//! This is the form SAML assertions are signed over, which is what lets an
//! assertion be lifted out of its enclosing `<samlp:Response>` and still
//! verify.

use crate::render::{self, NsDecl};
use std::collections::{BTreeMap, BTreeSet};
use stocksund_core::Error;
use stocksund_xml::{qname, NodeSet};

/// Canonicalize using Exclusive C14N 1.0.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let inclusive_prefixes = inclusive_prefixes
        .iter()
        .map(|p| {
            if p == "#default" {
                String::new()
            } else {
                p.clone()
            }
        })
        .collect();
    let ctx = ExcC14nContext {
        with_comments,
        node_set,
        inclusive_prefixes,
    };
    let mut output = Vec::new();
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}

struct ExcC14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    /// PrefixList entries, with `#default` mapped to "".
    inclusive_prefixes: BTreeSet<String>,
}

impl ExcC14nContext<'_> {
    fn is_visible(&self, node: &roxmltree::Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(node))
    }

    fn process_node(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) {
        match node.node_type() {
            roxmltree::NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, rendered_ns);
                }
            }
            roxmltree::NodeType::Element => self.process_element(node, output, rendered_ns),
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
        rendered_ns: &BTreeMap<String, String>,
    ) {
        if !self.is_visible(&node) {
            // Namespace declarations only ever land on visible start tags.
            for child in node.children() {
                self.process_node(child, output, rendered_ns);
            }
            return;
        }

        let input = node.document().input_text();
        let mut utilized: BTreeSet<&str> = BTreeSet::new();
        utilized.insert(qname::element_prefix(node));
        for attr in node.attributes() {
            let prefix = qname::attribute_prefix(input, &attr);
            if !prefix.is_empty() {
                utilized.insert(prefix);
            }
        }
        utilized.extend(self.inclusive_prefixes.iter().map(String::as_str));
        utilized.remove("xml");

        let in_scope = render::in_scope_namespaces(node);
        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in utilized {
            match in_scope.get(prefix) {
                Some(uri) => {
                    if rendered_ns.get(prefix) != Some(uri) {
                        ns_decls.push(NsDecl::new(prefix, uri));
                    }
                }
                None if prefix.is_empty() => {
                    // Unqualified element under a rendered default namespace.
                    if rendered_ns.get("").is_some_and(|d| !d.is_empty()) {
                        ns_decls.push(NsDecl::new("", ""));
                    }
                }
                None => {}
            }
        }
        ns_decls.sort();

        let attrs = render::element_attrs(node);
        let elem_name = qname::element_qname(node);
        render::start_tag(output, elem_name, &ns_decls, &attrs);

        let mut child_rendered = rendered_ns.clone();
        for decl in ns_decls {
            child_rendered.insert(decl.prefix, decl.uri);
        }
        for child in node.children() {
            self.process_node(child, output, &child_rendered);
        }

        render::end_tag(output, elem_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exc(xml: &str, prefixes: &[&str]) -> String {
        let doc = stocksund_xml::parse(xml).unwrap();
        let prefixes: Vec<String> = prefixes.iter().map(|p| p.to_string()).collect();
        String::from_utf8(canonicalize(&doc, false, None, &prefixes).unwrap()).unwrap()
    }

    #[test]
    fn unused_namespaces_are_dropped() {
        assert_eq!(
            exc(r#"<a:r xmlns:a="urn:a" xmlns:b="urn:b"><c/></a:r>"#, &[]),
            r#"<a:r xmlns:a="urn:a"><c></c></a:r>"#
        );
    }

    #[test]
    fn prefix_list_forces_declaration() {
        assert_eq!(
            exc(r#"<a:r xmlns:a="urn:a" xmlns:b="urn:b"/>"#, &["b"]),
            r#"<a:r xmlns:a="urn:a" xmlns:b="urn:b"></a:r>"#
        );
    }

    #[test]
    fn declarations_move_to_first_use() {
        assert_eq!(
            exc(r#"<r xmlns:x="urn:x"><k x:v="1"><x:e/></k></r>"#, &[]),
            r#"<r><k xmlns:x="urn:x" x:v="1"><x:e></x:e></k></r>"#
        );
    }

    #[test]
    fn subtree_is_independent_of_enclosing_context() {
        let wrapped = r#"<w:o xmlns:w="urn:w" xmlns:s="urn:s"><s:a ID="1"><s:b>t</s:b></s:a></w:o>"#;
        let doc = stocksund_xml::parse(wrapped).unwrap();
        let a = doc.root_element().first_element_child().unwrap();
        let set = NodeSet::tree_without_comments(a);
        let out = canonicalize(&doc, false, Some(&set), &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            exc(r#"<s:a xmlns:s="urn:s" ID="1"><s:b>t</s:b></s:a>"#, &[])
        );
    }
}
