#![forbid(unsafe_code)]

//! Enveloped signature transform.
//!
//! Removes the `<Signature>` element being verified from the node set.

use crate::pipeline::{Transform, TransformData};
use stocksund_core::{algorithm, Error};

/// Removes one `<Signature>` subtree from the node set.
pub struct EnvelopedSignatureTransform {
    signature: roxmltree::NodeId,
}

impl EnvelopedSignatureTransform {
    /// Create with the node id of the Signature element to remove.
    pub fn new(signature: roxmltree::NodeId) -> Self {
        Self { signature }
    }
}

impl Transform for EnvelopedSignatureTransform {
    fn uri(&self) -> &str {
        algorithm::ENVELOPED_SIGNATURE
    }

    fn execute<'a, 'input>(
        &self,
        input: TransformData<'a, 'input>,
    ) -> Result<TransformData<'a, 'input>, Error> {
        match input {
            TransformData::Xml { doc, mut node_set } => {
                let sig = doc.get_node(self.signature).ok_or_else(|| {
                    Error::Transform("signature node not in document".into())
                })?;
                node_set.remove_subtree(sig);
                Ok(TransformData::Xml { doc, node_set })
            }
            TransformData::Binary(_) => Err(Error::Transform(
                "enveloped-signature transform requires XML input".into(),
            )),
        }
    }
}
