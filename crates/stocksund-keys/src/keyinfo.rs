#![forbid(unsafe_code)]

//! KeyInfo XML processing.
//!
//! Verification never takes a key from `<ds:KeyInfo>`. The embedded
//! certificates are read only so they can be compared against the pin.

use base64::Engine;
use stocksund_core::{ns, Error};

/// Decode a base64 `CryptoBinary`/`base64Binary` value, ignoring whitespace.
pub fn decode_base64_text(text: &str) -> Result<Vec<u8>, Error> {
    let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if clean.is_empty() {
        return Err(Error::Base64("empty value".into()));
    }
    base64::engine::general_purpose::STANDARD
        .decode(clean.as_bytes())
        .map_err(|e| Error::Base64(e.to_string()))
}

/// DER certificates from every `X509Data/X509Certificate` under `key_info`.
pub fn x509_certificates(key_info: roxmltree::Node<'_, '_>) -> Result<Vec<Vec<u8>>, Error> {
    let mut certs = Vec::new();
    for data in key_info
        .children()
        .filter(|n| n.has_tag_name((ns::DSIG, ns::node::X509_DATA)))
    {
        for cert in data
            .children()
            .filter(|n| n.has_tag_name((ns::DSIG, ns::node::X509_CERTIFICATE)))
        {
            let text: String = cert
                .children()
                .filter(|c| c.is_text())
                .filter_map(|c| c.text())
                .collect();
            certs.push(decode_base64_text(&text)?);
        }
    }
    Ok(certs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_certificates() {
        let xml = r#"<ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
            <ds:X509Data>
                <ds:X509Certificate>
                    AQID
                    BA==
                </ds:X509Certificate>
            </ds:X509Data>
            <ds:KeyName>ignored</ds:KeyName>
        </ds:KeyInfo>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let certs = x509_certificates(doc.root_element()).unwrap();
        assert_eq!(certs, vec![vec![1u8, 2, 3, 4]]);
    }

    #[test]
    fn bad_base64() {
        assert!(matches!(decode_base64_text("@@@"), Err(Error::Base64(_))));
        assert!(matches!(decode_base64_text("  "), Err(Error::Base64(_))));
    }
}
