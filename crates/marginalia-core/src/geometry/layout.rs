//! Headless layout over a content tree
//!
//! `LaidOutBlock` renders a block's logical text with a fixed-pitch,
//! character-wrapping line model: every glyph advances `char_width`, lines
//! break every `wrap_cols` characters, each line is `line_height` tall.
//! Word-aware breaking is the embedding renderer's concern; the fixed model
//! keeps measurement exact, which is all the locator needs.

use super::tree::ContentNode;
use super::{GeometryProvider, LeafPoint, Rect};

/// Layout parameters for a rendered block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutStyle {
    /// Characters per line before wrapping.
    pub wrap_cols: usize,
    /// Horizontal advance per character.
    pub char_width: f64,
    /// Vertical advance per line.
    pub line_height: f64,
    /// Client-space origin of the block's bounding box.
    pub origin: (f64, f64),
}

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            wrap_cols: 80,
            char_width: 8.0,
            line_height: 18.0,
            origin: (0.0, 0.0),
        }
    }
}

impl LayoutStyle {
    pub fn with_wrap(wrap_cols: usize) -> Self {
        Self {
            wrap_cols,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct CachedLeaf {
    char_len: usize,
    decorative: bool,
    /// Logical characters before this leaf.
    logical_start: usize,
}

/// A content tree paired with its layout, implementing `GeometryProvider`.
#[derive(Debug, Clone)]
pub struct LaidOutBlock {
    style: LayoutStyle,
    logical_text: String,
    leaves: Vec<CachedLeaf>,
}

impl LaidOutBlock {
    pub fn new(root: &ContentNode, style: LayoutStyle) -> Self {
        let mut leaves = Vec::new();
        let mut logical = 0usize;
        for leaf in root.leaves() {
            let char_len = leaf.char_len();
            leaves.push(CachedLeaf {
                char_len,
                decorative: leaf.decorative,
                logical_start: logical,
            });
            if !leaf.decorative {
                logical += char_len;
            }
        }
        Self {
            style,
            logical_text: root.logical_text(),
            leaves,
        }
    }

    pub fn style(&self) -> &LayoutStyle {
        &self.style
    }

    fn wrap(&self) -> usize {
        self.style.wrap_cols.max(1)
    }

    /// Rect covering logical characters `[from, to)` on a single line.
    fn line_segment_rect(&self, line: usize, col_start: usize, cols: usize) -> Rect {
        let (ox, oy) = self.style.origin;
        Rect::new(
            ox + col_start as f64 * self.style.char_width,
            oy + line as f64 * self.style.line_height,
            cols as f64 * self.style.char_width,
            self.style.line_height,
        )
    }
}

impl GeometryProvider for LaidOutBlock {
    fn leaf_lengths(&self) -> Vec<usize> {
        self.leaves.iter().map(|leaf| leaf.char_len).collect()
    }

    fn measure_to(&self, point: LeafPoint) -> Option<usize> {
        let leaf = self.leaves.get(point.leaf)?;
        if point.offset > leaf.char_len {
            return None;
        }
        if leaf.decorative {
            // Characters inside injected markup have no logical extent.
            Some(leaf.logical_start)
        } else {
            Some(leaf.logical_start + point.offset)
        }
    }

    fn text_len(&self) -> usize {
        self.logical_text.chars().count()
    }

    fn range_rects(&self, start: LeafPoint, end: LeafPoint) -> Vec<Rect> {
        let (Some(from), Some(to)) = (self.measure_to(start), self.measure_to(end)) else {
            return Vec::new();
        };
        if from >= to {
            return Vec::new();
        }

        let wrap = self.wrap();
        let mut rects = Vec::new();
        let mut pos = from;
        while pos < to {
            let line = pos / wrap;
            let line_end = ((line + 1) * wrap).min(to);
            rects.push(self.line_segment_rect(line, pos % wrap, line_end - pos));
            pos = line_end;
        }
        rects
    }

    fn origin(&self) -> (f64, f64) {
        self.style.origin
    }

    fn range_text(&self, start: LeafPoint, end: LeafPoint) -> String {
        let (Some(from), Some(to)) = (self.measure_to(start), self.measure_to(end)) else {
            return String::new();
        };
        if from >= to {
            return String::new();
        }
        self.logical_text
            .chars()
            .skip(from)
            .take(to - from)
            .collect()
    }
}
