#![forbid(unsafe_code)]

//! XML document helpers for stocksund.
//!
//! Thin layer over `roxmltree`: hardened parsing options, element lookup,
//! ID registration, qualified-name recovery from source positions, and the
//! `NodeSet` used by canonicalization and signature transforms.

pub mod document;
pub mod nodeset;
pub mod qname;
pub mod xpath;

pub use nodeset::NodeSet;

use stocksund_core::Error;

/// Upper bound on the number of nodes in a parsed document.
pub const MAX_NODES: u32 = 50_000;

/// Return roxmltree parsing options for untrusted security tokens.
///
/// DTDs are refused, so no entity is ever declared or expanded.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: false,
        nodes_limit: MAX_NODES,
    }
}

/// Parse untrusted XML text with [`parsing_options`].
///
/// The error keeps only the position of the defect. roxmltree messages quote
/// names and entity text from the input, and the input is a bearer token.
pub fn parse(xml: &str) -> Result<roxmltree::Document<'_>, Error> {
    roxmltree::Document::parse_with_options(xml, parsing_options()).map_err(|e| {
        let pos = e.pos();
        Error::XmlParse(format!("malformed document at {}:{}", pos.row, pos.col))
    })
}
