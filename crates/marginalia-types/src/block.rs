//! Block metadata
//!
//! A block is one unit of rendered document content (paragraph, figure,
//! table). The rendering layer owns the HTML; this side only needs stable
//! identifiers and ordering.

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading,
    Figure,
    Table,
    Other,
}

impl Default for BlockKind {
    fn default() -> Self {
        BlockKind::Paragraph
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(default)]
    pub kind: BlockKind,
    /// Position in the document's block order.
    pub order: usize,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: BlockKind, order: usize) -> Self {
        Self {
            id: id.into(),
            kind,
            order,
        }
    }
}
