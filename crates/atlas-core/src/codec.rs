//! Resource (de)serialization.
//!
//! The identifier's type suffix selects the typed model; anything else is
//! kept as a raw markup tree so its references can still be rewritten.

use crate::error::{Error, Result};
use crate::markup::MarkupDocument;
use crate::model::{ResourceKind, TypedResource};
use crate::resource_id;
use crate::rewrite::ResourceGraphNode;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Decode stored bytes into a resource graph, picking the representation
/// from the identifier's type suffix.
pub fn decode(id: &str, bytes: &[u8]) -> Result<ResourceGraphNode> {
    let kind = resource_id::type_name(id).and_then(ResourceKind::from_type_name);
    let Some(kind) = kind else {
        return Ok(ResourceGraphNode::Markup(MarkupDocument::parse(bytes)?));
    };

    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::Markup("document is not valid UTF-8".to_string()))?;
    let codec_error = |source| Error::Codec {
        id: id.to_string(),
        source,
    };

    let resource = match kind {
        ResourceKind::FeatureSource => {
            TypedResource::FeatureSource(quick_xml::de::from_str(text).map_err(codec_error)?)
        }
        ResourceKind::LayerDefinition => {
            TypedResource::LayerDefinition(quick_xml::de::from_str(text).map_err(codec_error)?)
        }
        ResourceKind::MapDefinition => {
            TypedResource::MapDefinition(quick_xml::de::from_str(text).map_err(codec_error)?)
        }
        ResourceKind::WebLayout => {
            TypedResource::WebLayout(quick_xml::de::from_str(text).map_err(codec_error)?)
        }
    };
    Ok(ResourceGraphNode::Typed(resource))
}

/// Encode a resource graph back into XML bytes with a UTF-8 declaration.
pub fn encode(node: &ResourceGraphNode) -> Result<Vec<u8>> {
    match node {
        ResourceGraphNode::Markup(document) => document.to_bytes(),
        ResourceGraphNode::Typed(resource) => {
            let root = resource.kind().type_name();
            let body = match resource {
                TypedResource::FeatureSource(r) => quick_xml::se::to_string_with_root(root, r),
                TypedResource::LayerDefinition(r) => quick_xml::se::to_string_with_root(root, r),
                TypedResource::MapDefinition(r) => quick_xml::se::to_string_with_root(root, r),
                TypedResource::WebLayout(r) => quick_xml::se::to_string_with_root(root, r),
            }
            .map_err(|source| Error::Codec {
                id: root.to_string(),
                source,
            })?;
            Ok(format!("{XML_DECL}\n{body}").into_bytes())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
