//! Content trees
//!
//! A minimal model of a rendered block: element nodes with nested inline
//! markup, text leaves, and decoration leaves. Decorations stand in for
//! markup injected by an earlier overlay pass: a naive leaf walk counts
//! their characters, but they contribute nothing to the block's logical
//! text. That mismatch is exactly the hazard the locator's length-anchored
//! boundary resolution exists to survive.

/// One node of a rendered block's content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentNode {
    /// Container with nested children (inline bold/italic spans, links).
    Element {
        tag: String,
        children: Vec<ContentNode>,
    },
    /// Text leaf contributing to the block's logical text.
    Text(String),
    /// Injected overlay markup: walks like a text leaf, contributes nothing
    /// to the logical text.
    Decoration(String),
}

impl ContentNode {
    pub fn element(tag: impl Into<String>, children: Vec<ContentNode>) -> Self {
        ContentNode::Element {
            tag: tag.into(),
            children,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        ContentNode::Text(content.into())
    }

    /// Depth-first, document-order walk of all text-bearing leaves.
    pub fn leaves(&self) -> Vec<Leaf<'_>> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<Leaf<'a>>) {
        match self {
            ContentNode::Element { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            ContentNode::Text(content) => out.push(Leaf {
                text: content,
                decorative: false,
            }),
            ContentNode::Decoration(content) => out.push(Leaf {
                text: content,
                decorative: true,
            }),
        }
    }

    /// The block's logical text: concatenation of text leaves, document
    /// order, decorations excluded.
    pub fn logical_text(&self) -> String {
        self.leaves()
            .iter()
            .filter(|leaf| !leaf.decorative)
            .map(|leaf| leaf.text)
            .collect()
    }

    /// Logical text length in characters.
    pub fn text_len(&self) -> usize {
        self.leaves()
            .iter()
            .filter(|leaf| !leaf.decorative)
            .map(|leaf| leaf.char_len())
            .sum()
    }
}

/// A text-bearing leaf as seen by the document-order walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leaf<'a> {
    pub text: &'a str,
    pub decorative: bool,
}

impl Leaf<'_> {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
