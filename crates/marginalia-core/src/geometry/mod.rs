//! Content geometry
//!
//! The browser owns the real render tree; this module captures exactly the
//! slice of it the locator needs behind the `GeometryProvider` trait. The
//! in-crate `LaidOutBlock` implementation pairs a content tree with a
//! fixed-pitch wrapping layout so the whole pipeline runs (and is tested)
//! headless.

pub mod layout;
pub mod locate;
pub mod tree;

pub use layout::{LaidOutBlock, LayoutStyle};
pub use locate::locate;
pub use tree::{ContentNode, Leaf};

/// Axis-aligned rectangle. Produced in client space by providers and
/// converted to container-relative coordinates by the locator.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect {
            left: self.left + dx,
            top: self.top + dy,
            ..*self
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.left + self.width && y >= self.top && y < self.top + self.height
    }
}

/// A boundary position inside a provider's leaf walk: character `offset`
/// within the `leaf`-th text-bearing leaf, document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafPoint {
    pub leaf: usize,
    pub offset: usize,
}

/// The slice of a live render tree the offset locator depends on.
///
/// `leaf_lengths` reports what a naive depth-first walk sees, including any
/// injected overlay markup; `measure_to` is the authoritative measurement
/// ("how long is the content from its very start to this point"), which is
/// what makes boundary resolution robust when the two disagree.
pub trait GeometryProvider {
    /// Lengths of all text-bearing leaves in document order, as a naive
    /// walk counts them.
    fn leaf_lengths(&self) -> Vec<usize>;

    /// Authoritative character count from the start of the content to
    /// `point`, or `None` when the point does not exist.
    fn measure_to(&self, point: LeafPoint) -> Option<usize>;

    /// Total logical text length of the content.
    fn text_len(&self) -> usize;

    /// Client-space rectangles covering the range, one per visually
    /// wrapped line segment. Empty when the range is degenerate.
    fn range_rects(&self, start: LeafPoint, end: LeafPoint) -> Vec<Rect>;

    /// Client-space origin of the content root's bounding box.
    fn origin(&self) -> (f64, f64);

    /// Rendered substring between the two points, for cross-checks.
    fn range_text(&self, start: LeafPoint, end: LeafPoint) -> String;
}
