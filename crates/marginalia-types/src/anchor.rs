//! Text ranges and anchors
//!
//! A `TextRange` is a pair of logical character offsets into a block's
//! concatenated rendered text. An `Anchor` says where an enhancement lives:
//! inline at a range, or out of band (system-generated notes that are
//! surfaced through a badge rather than a positioned highlight).

/// Half-open `[start, end)` character range over a block's rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TextRange {
    pub start_offset: usize,
    pub end_offset: usize,
}

impl TextRange {
    pub fn new(start_offset: usize, end_offset: usize) -> Self {
        Self {
            start_offset,
            end_offset,
        }
    }

    /// Number of characters covered by the range.
    pub fn len(&self) -> usize {
        self.end_offset.saturating_sub(self.start_offset)
    }

    pub fn is_empty(&self) -> bool {
        self.end_offset <= self.start_offset
    }

    /// A range is well-formed when it is non-empty and fits in `total_len`.
    pub fn is_valid_for(&self, total_len: usize) -> bool {
        self.start_offset < self.end_offset && self.end_offset <= total_len
    }

    /// True when the two half-open ranges share at least one character.
    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start_offset < other.end_offset && other.start_offset < self.end_offset
    }
}

/// Where an enhancement is attached.
///
/// The upstream API historically used `start_offset == -1` as a sentinel for
/// generated notes with no inline position. That convention is kept on the
/// wire (see `WireAnchor`) but promoted to an explicit variant in memory so
/// ordinary offsets stay unsigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "WireAnchor", into = "WireAnchor")]
pub enum Anchor {
    /// Positioned at a text range; projected as a highlight overlay.
    Inline(TextRange),
    /// No inline position; surfaced via the block's badge/list affordance.
    OutOfBand,
}

impl Anchor {
    pub fn inline(start_offset: usize, end_offset: usize) -> Self {
        Anchor::Inline(TextRange::new(start_offset, end_offset))
    }

    pub fn range(&self) -> Option<TextRange> {
        match self {
            Anchor::Inline(range) => Some(*range),
            Anchor::OutOfBand => None,
        }
    }

    pub fn is_out_of_band(&self) -> bool {
        matches!(self, Anchor::OutOfBand)
    }

    /// Sort key for per-block enhancement lists: out-of-band anchors order
    /// before every inline anchor, inline anchors by start offset.
    pub fn sort_key(&self) -> i64 {
        match self {
            Anchor::OutOfBand => -1,
            Anchor::Inline(range) => range.start_offset as i64,
        }
    }
}

/// Wire shape of an anchor: signed offsets, negative start meaning
/// out of band.
#[derive(serde::Serialize, serde::Deserialize)]
struct WireAnchor {
    start_offset: i64,
    end_offset: i64,
}

impl From<WireAnchor> for Anchor {
    fn from(wire: WireAnchor) -> Self {
        if wire.start_offset < 0 {
            Anchor::OutOfBand
        } else {
            Anchor::Inline(TextRange::new(
                wire.start_offset as usize,
                wire.end_offset.max(0) as usize,
            ))
        }
    }
}

impl From<Anchor> for WireAnchor {
    fn from(anchor: Anchor) -> Self {
        match anchor {
            Anchor::Inline(range) => WireAnchor {
                start_offset: range.start_offset as i64,
                end_offset: range.end_offset as i64,
            },
            Anchor::OutOfBand => WireAnchor {
                start_offset: -1,
                end_offset: -1,
            },
        }
    }
}
