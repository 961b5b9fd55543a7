//! Shared types for the marginalia enhancement engine
//!
//! Data model for blocks, text-anchored enhancements (annotations,
//! definitions, rabbitholes) and asynchronous processing jobs. Everything
//! here is serde-serializable; wire compatibility notes live next to the
//! types they concern.

pub mod anchor;
pub mod block;
pub mod enhancement;
pub mod job;

pub use anchor::{Anchor, TextRange};
pub use block::{Block, BlockKind};
pub use enhancement::{Enhancement, EnhancementData, EnhancementKind};
pub use job::{ProcessingEvent, ProcessingJob, ProcessingStatus};
