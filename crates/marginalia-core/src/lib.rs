//! Geometry and state core for text-anchored enhancements
//!
//! This crate converts logical character offsets into on-screen highlight
//! geometry and owns the in-memory enhancement state:
//!
//! - `geometry`: content trees, the layout measurement seam, and the offset
//!   locator that resolves `[start, end)` ranges to per-line rectangles.
//! - `projection`: turns a block's enhancement list into layered overlay
//!   geometry (visual highlight + clickable underline strip) and hit-tests
//!   pointer positions against it.
//! - `store`: the observable per-document enhancement store.
//! - `sync`: the optimistic-write helper and the remote enhancement API seam.

pub mod geometry;
pub mod projection;
pub mod store;
pub mod sync;

pub use geometry::{
    locate, ContentNode, GeometryProvider, LaidOutBlock, LayoutStyle, LeafPoint, Rect,
};
pub use projection::{hit_test, project, OverlayActivation, Projection, ProjectorConfig, RenderedOverlay};
pub use store::{EnhancementStore, StoreState, Subscription, Watched};
pub use sync::{
    create_enhancement_optimistic, delete_enhancement_optimistic, tentative_write, ApiError,
    EnhancementApi, EnhancementDraft, RelevanceGuard,
};
