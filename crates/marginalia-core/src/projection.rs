//! Highlight projection
//!
//! Turns a block's enhancement list into positioned overlay geometry. Each
//! inline enhancement becomes a `RenderedOverlay`: full-height visual rects
//! that must never intercept pointer events (text selection has to keep
//! working over a highlight), plus thin underline strips that stay
//! clickable. Out-of-band enhancements produce no geometry and are exposed
//! separately for the badge affordance.

use tracing::debug;

use marginalia_types::{Enhancement, EnhancementKind, TextRange};

use crate::geometry::{locate, GeometryProvider, Rect};

/// Visual knobs for projected overlays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectorConfig {
    /// Height of the clickable underline strip at each rect's baseline.
    pub hit_strip_height: f64,
    /// Strip height used when the range overlaps another enhancement,
    /// hinting at the stack without any merging logic.
    pub overlap_strip_height: f64,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            hit_strip_height: 4.0,
            overlap_strip_height: 6.0,
        }
    }
}

/// One enhancement's projected geometry for a single render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOverlay {
    pub enhancement_id: String,
    pub kind: EnhancementKind,
    pub range: TextRange,
    /// Stacking band; higher paints (and hit-tests) above lower.
    pub z_band: u8,
    /// Non-interactive colored/underlined highlight rects.
    pub visual: Vec<Rect>,
    /// Interactive underline strips, one per visual rect.
    pub hits: Vec<Rect>,
    /// True when another inline enhancement covers part of this range.
    pub overlapping: bool,
}

/// Result of projecting a block's enhancements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub overlays: Vec<RenderedOverlay>,
    /// Out-of-band enhancements (generated notes), for the badge/list.
    pub out_of_band: Vec<Enhancement>,
}

/// What a resolved click means: which enhancement, and where it anchors.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayActivation {
    pub enhancement_id: String,
    pub kind: EnhancementKind,
    pub range: TextRange,
}

fn z_band(kind: EnhancementKind) -> u8 {
    match kind {
        EnhancementKind::Annotation => 0,
        EnhancementKind::Definition => 1,
        EnhancementKind::Rabbithole => 2,
    }
}

/// Project `enhancements` against the block's current layout.
///
/// A locator miss for one enhancement renders nothing for it this pass and
/// never blocks the others; the caller re-projects on the next content or
/// layout change.
pub fn project(
    provider: &dyn GeometryProvider,
    enhancements: &[Enhancement],
    config: &ProjectorConfig,
) -> Projection {
    let mut projection = Projection::default();

    for enhancement in enhancements {
        let Some(range) = enhancement.anchor.range() else {
            projection.out_of_band.push(enhancement.clone());
            continue;
        };

        let Some(visual) = locate(provider, range.start_offset, range.end_offset) else {
            debug!(
                enhancement_id = %enhancement.id,
                start = range.start_offset,
                end = range.end_offset,
                "range did not resolve, skipping this pass"
            );
            continue;
        };

        let overlapping = enhancements.iter().any(|other| {
            other.id != enhancement.id
                && other
                    .anchor
                    .range()
                    .is_some_and(|r| r.overlaps(&range))
        });
        let strip = if overlapping {
            config.overlap_strip_height
        } else {
            config.hit_strip_height
        };

        let hits = visual
            .iter()
            .map(|rect| {
                let height = strip.min(rect.height);
                Rect::new(rect.left, rect.top + rect.height - height, rect.width, height)
            })
            .collect();

        projection.overlays.push(RenderedOverlay {
            enhancement_id: enhancement.id.clone(),
            kind: enhancement.kind(),
            range,
            z_band: z_band(enhancement.kind()),
            visual,
            hits,
            overlapping,
        });
    }

    projection
}

/// Resolve a pointer position against the overlays' interactive strips.
///
/// Only hit strips participate; visual rects are transparent to pointer
/// events by construction. A `Some` result means the caller must treat the
/// event as consumed so the container's own focus-block click does not also
/// fire. Ties go to the highest z-band (rabbithole over definition over
/// annotation).
pub fn hit_test(overlays: &[RenderedOverlay], x: f64, y: f64) -> Option<OverlayActivation> {
    overlays
        .iter()
        .filter(|overlay| overlay.hits.iter().any(|rect| rect.contains(x, y)))
        .max_by_key(|overlay| overlay.z_band)
        .map(|overlay| OverlayActivation {
            enhancement_id: overlay.enhancement_id.clone(),
            kind: overlay.kind,
            range: overlay.range,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ContentNode, LaidOutBlock, LayoutStyle};
    use marginalia_types::{Anchor, EnhancementData};

    fn annotation(id: &str, start: usize, end: usize) -> Enhancement {
        Enhancement::new(
            id,
            "b1",
            "",
            Anchor::inline(start, end),
            EnhancementData::Annotation {
                note: "n".to_string(),
            },
        )
    }

    fn rabbithole(id: &str, start: usize, end: usize) -> Enhancement {
        Enhancement::new(
            id,
            "b1",
            "",
            Anchor::inline(start, end),
            EnhancementData::Rabbithole {
                conversation_id: "c1".to_string(),
            },
        )
    }

    fn block() -> LaidOutBlock {
        LaidOutBlock::new(
            &ContentNode::text("The quick brown fox jumps over the lazy dog"),
            LayoutStyle::default(),
        )
    }

    #[test]
    fn test_project_emits_visual_and_hit_layers() {
        let projection = project(&block(), &[annotation("a1", 4, 9)], &ProjectorConfig::default());
        assert_eq!(projection.overlays.len(), 1);
        let overlay = &projection.overlays[0];
        assert_eq!(overlay.visual.len(), 1);
        assert_eq!(overlay.hits.len(), 1);
        // Hit strip sits at the baseline of the visual rect.
        let visual = overlay.visual[0];
        let hit = overlay.hits[0];
        assert_eq!(hit.left, visual.left);
        assert_eq!(hit.width, visual.width);
        assert_eq!(hit.height, 4.0);
        assert_eq!(hit.top, visual.top + visual.height - hit.height);
    }

    #[test]
    fn test_out_of_band_enhancement_emits_no_geometry() {
        let generated = Enhancement::new(
            "g1",
            "b1",
            "",
            Anchor::OutOfBand,
            EnhancementData::Annotation {
                note: "generated summary".to_string(),
            },
        );
        let projection = project(&block(), &[generated], &ProjectorConfig::default());
        assert!(projection.overlays.is_empty());
        assert_eq!(projection.out_of_band.len(), 1);
        assert_eq!(projection.out_of_band[0].id, "g1");
    }

    #[test]
    fn test_one_unresolvable_range_does_not_block_others() {
        let enhancements = vec![annotation("bad", 100, 200), annotation("good", 4, 9)];
        let projection = project(&block(), &enhancements, &ProjectorConfig::default());
        assert_eq!(projection.overlays.len(), 1);
        assert_eq!(projection.overlays[0].enhancement_id, "good");
    }

    #[test]
    fn test_overlapping_ranges_get_thicker_strips() {
        let enhancements = vec![annotation("a1", 4, 12), rabbithole("r1", 10, 15)];
        let projection = project(&block(), &enhancements, &ProjectorConfig::default());
        assert_eq!(projection.overlays.len(), 2);
        assert!(projection.overlays.iter().all(|o| o.overlapping));
        assert!(projection.overlays.iter().all(|o| o.hits[0].height == 6.0));
    }

    #[test]
    fn test_hit_test_resolves_topmost_band() {
        let enhancements = vec![annotation("a1", 4, 12), rabbithole("r1", 10, 15)];
        let projection = project(&block(), &enhancements, &ProjectorConfig::default());
        // x inside the overlap (chars 10..12), y on the underline strip.
        let activation = hit_test(&projection.overlays, 82.0, 16.0).expect("strip should hit");
        assert_eq!(activation.enhancement_id, "r1");
        assert_eq!(activation.kind, EnhancementKind::Rabbithole);
    }

    #[test]
    fn test_hit_test_misses_visual_body() {
        let projection = project(&block(), &[annotation("a1", 4, 9)], &ProjectorConfig::default());
        // y in the middle of the line is visual-only territory.
        assert!(hit_test(&projection.overlays, 40.0, 6.0).is_none());
    }
}
