//! Domain types shared by every retrieval stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provenance fields carried alongside a passage: source URL, title,
/// classification tags (school/major/department), content type. Ordered so
/// two documents with the same fields compare equal regardless of how the
/// map was populated.
pub type Meta = BTreeMap<String, String>;

/// An immutable unit of retrievable content.
///
/// There is no separate key at this layer: identity is content + metadata
/// together, and the derived `Eq`/`Hash` is what fusion uses to merge hits
/// found by more than one retriever. Metadata passes through every stage
/// unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: Meta,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), metadata: Meta::new() }
    }

    pub fn with_metadata(content: impl Into<String>, metadata: Meta) -> Self {
        Self { content: content.into(), metadata }
    }
}
