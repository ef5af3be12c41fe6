#![forbid(unsafe_code)]

//! Element lookup and ID registration over a parsed `roxmltree` document.

use stocksund_core::Error;
use std::collections::HashMap;

/// ID attribute names registered by default.
///
/// SAML uses `ID`; the other spellings show up in hand-rolled IdPs and are
/// registered so a duplicate under any spelling is caught.
pub const DEFAULT_ID_ATTRS: [&str; 3] = ["ID", "Id", "id"];

fn is_named(node: &roxmltree::Node<'_, '_>, ns_uri: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && node.tag_name().namespace().unwrap_or("") == ns_uri
}

/// Find the first descendant-or-self element with the given namespace and local name.
pub fn find_element<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    ns_uri: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.descendants().find(|n| is_named(n, ns_uri, local_name))
}

/// Find all descendant-or-self elements with the given namespace and local name.
pub fn find_elements<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    ns_uri: &str,
    local_name: &str,
) -> Vec<roxmltree::Node<'a, 'input>> {
    node.descendants()
        .filter(|n| is_named(n, ns_uri, local_name))
        .collect()
}

/// Find the first child element with the given namespace and local name.
pub fn find_child_element<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns_uri: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    parent.children().find(|n| is_named(n, ns_uri, local_name))
}

/// Find all child elements with the given namespace and local name.
pub fn find_child_elements<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns_uri: &str,
    local_name: &str,
) -> Vec<roxmltree::Node<'a, 'input>> {
    parent
        .children()
        .filter(|n| is_named(n, ns_uri, local_name))
        .collect()
}

/// Text content of an element with surrounding whitespace removed.
///
/// Returns `None` for a missing or whitespace-only element. Only the
/// element's own text nodes are considered.
pub fn trimmed_text(node: roxmltree::Node<'_, '_>) -> Option<String> {
    let text: String = node
        .children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Build the ID → NodeId mapping for a parsed document.
///
/// Fails when two elements carry the same ID value.
pub fn build_id_map(
    doc: &roxmltree::Document<'_>,
    attr_names: &[&str],
) -> Result<HashMap<String, roxmltree::NodeId>, Error> {
    let mut map = HashMap::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        for attr_name in attr_names {
            if let Some(val) = node.attribute(*attr_name) {
                if map.insert(val.to_owned(), node.id()).is_some() {
                    return Err(Error::XmlStructure(format!(
                        "duplicate ID value on <{}>",
                        node.tag_name().name()
                    )));
                }
            }
        }
    }
    Ok(map)
}
