//! Optimistic writes against the remote enhancement API
//!
//! The store applies a locally-tagged provisional record immediately, the
//! remote call runs, and the outcome either swaps the provisional record
//! for the authoritative one or rolls it back. Rollback is unconditional on
//! failure: the store is never left partially applied, and the error is
//! surfaced to the initiating caller so the UI can decide what to show.

use std::future::Future;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use marginalia_types::{Anchor, Enhancement, EnhancementData};

use crate::store::EnhancementStore;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("rejected by server: {0}")]
    Rejected(String),
}

/// Fields the client supplies when creating an enhancement; the server
/// issues the id and timestamps.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnhancementDraft {
    pub block_id: String,
    pub text: String,
    #[serde(rename = "text_range")]
    pub anchor: Anchor,
    #[serde(flatten)]
    pub data: EnhancementData,
}

impl EnhancementDraft {
    /// Materialize the draft as a provisional store entry under a local tag.
    fn provisional(&self, tag: &str) -> Enhancement {
        Enhancement::new(
            tag,
            self.block_id.clone(),
            self.text.clone(),
            self.anchor,
            self.data.clone(),
        )
    }
}

/// Consumed contract of the remote enhancement API.
#[async_trait]
pub trait EnhancementApi {
    /// Create an enhancement; returns the authoritative server record.
    async fn create_enhancement(&self, draft: EnhancementDraft) -> Result<Enhancement, ApiError>;

    /// Delete an enhancement; an annotation with an empty note travels
    /// through this same path.
    async fn delete_enhancement(&self, block_id: &str, id: &str) -> Result<(), ApiError>;
}

/// Generic tentative-write helper.
///
/// `apply` writes the provisional record and returns its local tag;
/// `commit` performs the authoritative operation; on success `swap`
/// replaces provisional with authoritative by tag, on failure `rollback`
/// removes the provisional record and the error propagates. The mutable
/// subject is threaded through the closures so nothing borrows it across
/// the await point.
pub async fn tentative_write<S, T, E, Fut>(
    subject: &mut S,
    apply: impl FnOnce(&mut S) -> String,
    commit: impl FnOnce() -> Fut,
    swap: impl FnOnce(&mut S, &str, &T),
    rollback: impl FnOnce(&mut S, &str),
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    let tag = apply(subject);
    match commit().await {
        Ok(authoritative) => {
            swap(subject, &tag, &authoritative);
            Ok(authoritative)
        }
        Err(err) => {
            rollback(subject, &tag);
            Err(err)
        }
    }
}

/// Optimistically create an enhancement: the highlight appears immediately
/// under a `local-` tag and is swapped for the server record on success, or
/// silently reverted on failure (the caller receives the error).
pub async fn create_enhancement_optimistic(
    store: &mut EnhancementStore,
    api: &dyn EnhancementApi,
    draft: EnhancementDraft,
) -> Result<Enhancement, ApiError> {
    let block_id = draft.block_id.clone();
    let provisional = draft.clone();

    tentative_write(
        store,
        |store| {
            let tag = format!("local-{}", Uuid::new_v4());
            store.add_enhancement(&block_id, provisional.provisional(&tag));
            debug!(block_id = %block_id, tag = %tag, "applied provisional enhancement");
            tag
        },
        || api.create_enhancement(draft),
        |store, tag, authoritative: &Enhancement| {
            store.replace_enhancement(&block_id, tag, authoritative.clone());
        },
        |store, tag| {
            warn!(block_id = %block_id, tag = %tag, "create failed, rolling back");
            store.remove_enhancement(&block_id, tag);
        },
    )
    .await
}

/// Optimistically delete an enhancement: it disappears immediately and is
/// restored at its sorted position if the remote call fails.
pub async fn delete_enhancement_optimistic(
    store: &mut EnhancementStore,
    api: &dyn EnhancementApi,
    block_id: &str,
    id: &str,
) -> Result<(), ApiError> {
    let Some(removed) = store.take_enhancement(block_id, id) else {
        return Ok(());
    };

    match api.delete_enhancement(block_id, id).await {
        Ok(()) => Ok(()),
        Err(err) => {
            warn!(block_id, id, "delete failed, restoring entry");
            store.add_enhancement(block_id, removed);
            Err(err)
        }
    }
}

/// Still-relevant guard for late-arriving responses.
///
/// Captured when a one-shot request is issued; the owning view retires it
/// on unmount or navigation, and the response handler checks `is_active`
/// before applying state. Pending requests themselves are not cancelled.
#[derive(Debug, Clone, Default)]
pub struct RelevanceGuard {
    retired: std::rc::Rc<std::cell::Cell<bool>>,
}

impl RelevanceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !self.retired.get()
    }

    pub fn retire(&self) {
        self.retired.set(true);
    }
}
