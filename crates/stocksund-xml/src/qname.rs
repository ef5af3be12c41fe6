#![forbid(unsafe_code)]

//! Qualified-name recovery.
//!
//! `roxmltree` resolves prefixes to namespace URIs and then forgets them,
//! but canonical XML must reproduce the prefixes exactly as written. The
//! parser keeps byte ranges into the source text, so the lexical qualified
//! name is sliced back out of the input.

/// Lexical qualified name of an element (`prefix:local` or `local`).
pub fn element_qname<'input>(node: roxmltree::Node<'_, 'input>) -> &'input str {
    let input = node.document().input_text();
    let start = node.range().start + 1;
    let rest = input.get(start..).unwrap_or("");
    let end = rest
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(rest.len());
    let qname = &rest[..end];
    if qname.is_empty() {
        node.tag_name().name()
    } else {
        qname
    }
}

/// Prefix of an element's qualified name, `""` when unprefixed.
pub fn element_prefix<'input>(node: roxmltree::Node<'_, 'input>) -> &'input str {
    prefix_of(element_qname(node))
}

/// Lexical qualified name of an attribute.
pub fn attribute_qname<'input>(
    input: &'input str,
    attr: &roxmltree::Attribute<'_, 'input>,
) -> &'input str {
    match input.get(attr.range_qname()) {
        Some(q) if !q.is_empty() => q,
        _ => attr.name(),
    }
}

/// Prefix of an attribute's qualified name, `""` when unprefixed.
pub fn attribute_prefix<'input>(
    input: &'input str,
    attr: &roxmltree::Attribute<'_, 'input>,
) -> &'input str {
    prefix_of(attribute_qname(input, attr))
}

fn prefix_of(qname: &str) -> &str {
    match qname.split_once(':') {
        Some((prefix, _)) => prefix,
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_names_keep_prefix() {
        let xml = r#"<saml:Assertion xmlns:saml="urn:s"><saml:Issuer>x</saml:Issuer><plain/></saml:Assertion>"#;
        let doc = crate::parse(xml).unwrap();
        let root = doc.root_element();
        assert_eq!(element_qname(root), "saml:Assertion");
        assert_eq!(element_prefix(root), "saml");
        let issuer = root.first_element_child().unwrap();
        assert_eq!(element_qname(issuer), "saml:Issuer");
        let plain = root.last_element_child().unwrap();
        assert_eq!(element_qname(plain), "plain");
        assert_eq!(element_prefix(plain), "");
    }

    #[test]
    fn element_name_followed_by_newline() {
        let doc = crate::parse("<a\n  b=\"1\"/>").unwrap();
        assert_eq!(element_qname(doc.root_element()), "a");
    }

    #[test]
    fn attribute_names_keep_prefix() {
        let xml = r#"<a xmlns:x="urn:x" x:k="1" plain="2" xml:lang="en"/>"#;
        let doc = crate::parse(xml).unwrap();
        let input = doc.input_text();
        let names: Vec<&str> = doc
            .root_element()
            .attributes()
            .map(|a| attribute_qname(input, &a))
            .collect();
        assert_eq!(names, vec!["x:k", "plain", "xml:lang"]);
        let first = doc.root_element().attributes().next().unwrap();
        assert_eq!(attribute_prefix(input, &first), "x");
    }
}
