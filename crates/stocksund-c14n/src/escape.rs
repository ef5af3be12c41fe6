#![forbid(unsafe_code)]

//! Character references in canonical output.
//!
//! Everything escaped here is ASCII, so the input is scanned byte-wise and
//! runs of untouched bytes are copied in one go.

/// Where the character data sits; attribute values escape more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Text,
    Attribute,
    ProcessingInstruction,
}

fn replacement(context: Context, b: u8) -> Option<&'static [u8]> {
    match (context, b) {
        (_, b'\r') => Some(b"&#xD;"),
        (Context::ProcessingInstruction, _) => None,
        (_, b'&') => Some(b"&amp;"),
        (_, b'<') => Some(b"&lt;"),
        (Context::Text, b'>') => Some(b"&gt;"),
        (Context::Attribute, b'"') => Some(b"&quot;"),
        (Context::Attribute, b'\t') => Some(b"&#x9;"),
        (Context::Attribute, b'\n') => Some(b"&#xA;"),
        _ => None,
    }
}

/// Append `s` to `out`, escaped for `context`.
pub fn write_escaped(out: &mut Vec<u8>, s: &str, context: Context) {
    let bytes = s.as_bytes();
    let mut copied = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if let Some(rep) = replacement(context, b) {
            out.extend_from_slice(&bytes[copied..i]);
            out.extend_from_slice(rep);
            copied = i + 1;
        }
    }
    out.extend_from_slice(&bytes[copied..]);
}
