//! Offset locator
//!
//! Resolves a `[start, end)` logical character range to the minimal set of
//! container-relative rectangles covering it as currently rendered. Every
//! failure mode is `None`, never a panic or an error: the caller skips that
//! highlight for one pass and retries on the next recompute.

use tracing::trace;

use super::{GeometryProvider, LeafPoint, Rect};

/// Resolve `[start_offset, end_offset)` over `provider`'s content to
/// container-relative rectangles, one per visually wrapped line segment.
///
/// Returns `None` when the content is empty, the range is out of bounds or
/// degenerate, or a boundary cannot be resolved (content not yet rendered).
pub fn locate(
    provider: &dyn GeometryProvider,
    start_offset: usize,
    end_offset: usize,
) -> Option<Vec<Rect>> {
    let total = provider.text_len();
    if total == 0 || start_offset >= end_offset || end_offset > total {
        return None;
    }

    let lengths = provider.leaf_lengths();
    let start = resolve_boundary(provider, &lengths, start_offset)?;
    let end = resolve_boundary(provider, &lengths, end_offset)?;

    let rects = provider.range_rects(start, end);
    if rects.is_empty() {
        trace!(start_offset, end_offset, "range resolved but has no extent");
        return None;
    }

    let (ox, oy) = provider.origin();
    Some(rects.iter().map(|r| r.translate(-ox, -oy)).collect())
}

/// Resolve a logical offset to a concrete `(leaf, intra-offset)` point.
///
/// The naive candidate comes from cumulative per-leaf bookkeeping, but that
/// count is not trusted: markup injected by an earlier overlay pass walks
/// like text without being part of the logical content. Every candidate is
/// anchored by re-measuring the distance from the content start; the naive
/// guess is tried first, then all candidates in document order. Quadratic in
/// the worst case, over block-sized text.
fn resolve_boundary(
    provider: &dyn GeometryProvider,
    leaf_lengths: &[usize],
    target: usize,
) -> Option<LeafPoint> {
    // Fast path: the naive cumulative position, verified by measurement.
    let mut cumulative = 0usize;
    for (leaf, &len) in leaf_lengths.iter().enumerate() {
        if target <= cumulative + len {
            let candidate = LeafPoint {
                leaf,
                offset: target - cumulative,
            };
            if provider.measure_to(candidate) == Some(target) {
                return Some(candidate);
            }
            break;
        }
        cumulative += len;
    }

    trace!(target, "naive boundary candidate rejected, rescanning");

    // Slow path: trial every position, accept the first whose measured
    // length equals the target.
    for (leaf, &len) in leaf_lengths.iter().enumerate() {
        for offset in 0..=len {
            let candidate = LeafPoint { leaf, offset };
            if provider.measure_to(candidate) == Some(target) {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ContentNode, LaidOutBlock, LayoutStyle};

    fn plain(text: &str) -> LaidOutBlock {
        LaidOutBlock::new(&ContentNode::text(text), LayoutStyle::default())
    }

    #[test]
    fn test_locate_quick_in_unwrapped_line() {
        let block = plain("The quick brown fox");
        let rects = locate(&block, 4, 9).expect("range should resolve");
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0], Rect::new(32.0, 0.0, 40.0, 18.0));

        // Cross-check: the resolved boundary points span exactly "quick".
        let lengths = block.leaf_lengths();
        let start = resolve_boundary(&block, &lengths, 4).unwrap();
        let end = resolve_boundary(&block, &lengths, 9).unwrap();
        assert_eq!(block.range_text(start, end), "quick");
    }

    #[test]
    fn test_locate_invalid_ranges_return_none() {
        let block = plain("The quick brown fox");
        assert!(locate(&block, 9, 9).is_none());
        assert!(locate(&block, 9, 4).is_none());
        assert!(locate(&block, 0, 20).is_none());
    }

    #[test]
    fn test_locate_empty_content_returns_none() {
        let block = plain("");
        assert!(locate(&block, 0, 1).is_none());
    }

    #[test]
    fn test_locate_spans_nested_markup() {
        let root = ContentNode::element(
            "p",
            vec![
                ContentNode::text("The "),
                ContentNode::element("b", vec![ContentNode::text("quick")]),
                ContentNode::text(" brown fox"),
            ],
        );
        let block = LaidOutBlock::new(&root, LayoutStyle::default());
        // "quick brown" crosses the bold span boundary.
        let rects = locate(&block, 4, 15).expect("range should resolve");
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0], Rect::new(32.0, 0.0, 88.0, 18.0));
    }

    #[test]
    fn test_locate_unaffected_by_injected_decoration() {
        let bare = LaidOutBlock::new(
            &ContentNode::element(
                "p",
                vec![ContentNode::text("The "), ContentNode::text("quick brown fox")],
            ),
            LayoutStyle::default(),
        );
        // Same logical text, but an earlier overlay injected markup that
        // shifts naive per-leaf counting.
        let decorated = LaidOutBlock::new(
            &ContentNode::element(
                "p",
                vec![
                    ContentNode::text("The "),
                    ContentNode::Decoration("\u{200b}\u{200b}".to_string()),
                    ContentNode::text("quick brown fox"),
                ],
            ),
            LayoutStyle::default(),
        );
        assert_eq!(locate(&bare, 4, 9), locate(&decorated, 4, 9));
        assert_eq!(locate(&bare, 10, 15), locate(&decorated, 10, 15));
    }

    #[test]
    fn test_locate_wrapped_range_is_container_relative() {
        let style = LayoutStyle {
            wrap_cols: 10,
            origin: (100.0, 50.0),
            ..LayoutStyle::default()
        };
        let block = LaidOutBlock::new(&ContentNode::text("The quick brown fox"), style);
        let rects = locate(&block, 4, 15).expect("range should resolve");
        assert_eq!(rects.len(), 2);
        // Origin subtracted: rects are relative to the content container.
        assert_eq!(rects[0], Rect::new(32.0, 0.0, 48.0, 18.0));
        assert_eq!(rects[1], Rect::new(0.0, 18.0, 40.0, 18.0));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: every valid range over unwrapped text resolves to
            /// exactly one rect whose width matches the substring extent.
            #[test]
            fn valid_ranges_resolve(
                text in "[a-z ]{1,60}",
                start in 0usize..60,
                len in 1usize..60,
            ) {
                let total = text.chars().count();
                prop_assume!(start < total);
                let end = (start + len).min(total);
                prop_assume!(start < end);

                let block = plain(&text);
                let rects = locate(&block, start, end);
                prop_assert!(rects.is_some());
                let rects = rects.unwrap();
                prop_assert_eq!(rects.len(), 1);
                let expected_width = (end - start) as f64 * block.style().char_width;
                prop_assert!((rects[0].width - expected_width).abs() < f64::EPSILON);
            }

            /// Property: invalid ranges always return None.
            #[test]
            fn invalid_ranges_return_none(
                text in "[a-z ]{0,40}",
                start in 0usize..80,
                end in 0usize..80,
            ) {
                let total = text.chars().count();
                prop_assume!(start >= end || end > total);
                let block = plain(&text);
                prop_assert!(locate(&block, start, end).is_none());
            }
        }
    }
}
