//! Observable enhancement store
//!
//! A deliberately small store, not a state-management framework: one
//! explicit instance per document view, synchronous single-threaded
//! mutation, a flat listener set notified on every state change. Consumers
//! treat everything they read as an immutable snapshot and narrow their
//! interest with `Watched` so unrelated writes do not trigger expensive
//! re-projection.

use std::collections::HashMap;

use tracing::debug;

use marginalia_types::{Block, Enhancement};

/// The store's full state. Listeners receive a shared reference to it on
/// every notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub blocks_by_id: HashMap<String, Block>,
    pub block_order: Vec<String>,
    pub current_block_id: Option<String>,
    pub enhancements_by_block: HashMap<String, Vec<Enhancement>>,
}

impl StoreState {
    /// Enhancements for a block, sorted by anchor start. Empty when the
    /// block has none.
    pub fn enhancements(&self, block_id: &str) -> &[Enhancement] {
        self.enhancements_by_block
            .get(block_id)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }
}

type Listener = Box<dyn FnMut(&StoreState)>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

/// Observable per-document enhancement store.
///
/// Mutations run synchronously on the owning (UI) thread; the discipline
/// that keeps concurrent reads consistent is replace-don't-mutate, not a
/// lock. Callers performing remote round-trips layer the optimistic
/// tentative-write pattern on top (see `sync`), never partial mutation.
pub struct EnhancementStore {
    state: StoreState,
    listeners: Vec<(u64, Listener)>,
    next_subscription: u64,
}

impl Default for EnhancementStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EnhancementStore {
    pub fn new() -> Self {
        Self {
            state: StoreState::default(),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn enhancements(&self, block_id: &str) -> &[Enhancement] {
        self.state.enhancements(block_id)
    }

    /// Replace block metadata and ordering wholesale. Called once per
    /// document load.
    pub fn initialize(&mut self, blocks: Vec<Block>, current_block_id: Option<String>) {
        debug!(blocks = blocks.len(), "initializing store");
        self.state.block_order = blocks.iter().map(|b| b.id.clone()).collect();
        self.state.blocks_by_id = blocks.into_iter().map(|b| (b.id.clone(), b)).collect();
        self.state.current_block_id = current_block_id;
        self.state.enhancements_by_block.clear();
        self.notify();
    }

    /// Update the focused block. No-op (and no notification) when the id
    /// is unchanged.
    pub fn set_current_block(&mut self, block_id: Option<String>) -> bool {
        if self.state.current_block_id == block_id {
            return false;
        }
        self.state.current_block_id = block_id;
        self.notify();
        true
    }

    /// Insert or replace an enhancement, keeping the block's list sorted by
    /// anchor start. Replacing with identical content is a no-op and does
    /// not notify. Returns true when the state changed.
    pub fn add_enhancement(&mut self, block_id: &str, enhancement: Enhancement) -> bool {
        let list = self
            .state
            .enhancements_by_block
            .entry(block_id.to_string())
            .or_default();

        if let Some(existing) = list.iter_mut().find(|e| e.id == enhancement.id) {
            if *existing == enhancement {
                return false;
            }
            *existing = enhancement;
            // The anchor may have moved; restore ordering.
            list.sort_by_key(|e| e.anchor.sort_key());
        } else {
            let key = enhancement.anchor.sort_key();
            let at = list.partition_point(|e| e.anchor.sort_key() <= key);
            list.insert(at, enhancement);
        }

        debug!(block_id, "enhancement added");
        self.notify();
        true
    }

    /// Remove an enhancement by id. No-op when absent. Returns true when
    /// the state changed.
    pub fn remove_enhancement(&mut self, block_id: &str, id: &str) -> bool {
        self.take_enhancement(block_id, id).is_some()
    }

    /// Remove and return an enhancement, for callers that may need to put
    /// it back (optimistic deletion).
    pub fn take_enhancement(&mut self, block_id: &str, id: &str) -> Option<Enhancement> {
        let list = self.state.enhancements_by_block.get_mut(block_id)?;
        let at = list.iter().position(|e| e.id == id)?;
        let removed = list.remove(at);
        if list.is_empty() {
            // Keep the map free of empty lists so a rollback restores the
            // exact prior state.
            self.state.enhancements_by_block.remove(block_id);
        }
        debug!(block_id, id, "enhancement removed");
        self.notify();
        Some(removed)
    }

    /// Swap a provisional (locally tagged) enhancement for the
    /// authoritative server record. Returns false when the tag is no
    /// longer present.
    pub fn replace_enhancement(
        &mut self,
        block_id: &str,
        local_id: &str,
        authoritative: Enhancement,
    ) -> bool {
        let Some(list) = self.state.enhancements_by_block.get_mut(block_id) else {
            return false;
        };
        let Some(at) = list.iter().position(|e| e.id == local_id) else {
            return false;
        };
        list.remove(at);
        let key = authoritative.anchor.sort_key();
        let insert_at = list.partition_point(|e| e.anchor.sort_key() <= key);
        list.insert(insert_at, authoritative);
        self.notify();
        true
    }

    /// Register a listener invoked after every state change.
    pub fn subscribe(&mut self, listener: Listener) -> Subscription {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        Subscription(id)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.listeners.retain(|(id, _)| *id != subscription.0);
    }

    /// Drop all listeners. The instance remains usable as plain state but
    /// will no longer notify anyone; call when the owning view unmounts.
    pub fn dispose(&mut self) {
        self.listeners.clear();
    }

    fn notify(&mut self) {
        // Listeners cannot re-enter the store (no aliasable handle exists
        // while &mut self is held), so moving the set out and back is safe.
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in listeners.iter_mut() {
            listener(&self.state);
        }
        self.listeners = listeners;
    }
}

/// Selector with an equality check: yields the selected slice only when it
/// changed since the last poll, by the caller-supplied equality function.
///
/// This is the mechanism that keeps highlight re-projection off writes that
/// do not touch the watched block.
pub struct Watched<T> {
    select: Box<dyn Fn(&StoreState) -> T>,
    eq: Box<dyn Fn(&T, &T) -> bool>,
    last: Option<T>,
}

impl<T: PartialEq + 'static> Watched<T> {
    /// Selector with the default equality (`PartialEq`).
    pub fn new(select: impl Fn(&StoreState) -> T + 'static) -> Self {
        Self {
            select: Box::new(select),
            eq: Box::new(|a, b| a == b),
            last: None,
        }
    }
}

impl<T> Watched<T> {
    /// Selector with a custom equality function.
    pub fn with_eq(
        select: impl Fn(&StoreState) -> T + 'static,
        eq: impl Fn(&T, &T) -> bool + 'static,
    ) -> Self {
        Self {
            select: Box::new(select),
            eq: Box::new(eq),
            last: None,
        }
    }

    /// Select against `state`; `Some` only when the slice changed (always
    /// on the first poll).
    pub fn poll(&mut self, state: &StoreState) -> Option<&T> {
        let next = (self.select)(state);
        let changed = match &self.last {
            Some(last) => !(self.eq)(last, &next),
            None => true,
        };
        if changed {
            self.last = Some(next);
            self.last.as_ref()
        } else {
            None
        }
    }

    /// The most recently selected slice, if any poll has run.
    pub fn current(&self) -> Option<&T> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_types::{Anchor, BlockKind, EnhancementData};
    use std::cell::Cell;
    use std::rc::Rc;

    fn annotation(id: &str, start: usize, end: usize, note: &str) -> Enhancement {
        Enhancement::new(
            id,
            "b1",
            "",
            Anchor::inline(start, end),
            EnhancementData::Annotation {
                note: note.to_string(),
            },
        )
    }

    fn counted_store() -> (EnhancementStore, Rc<Cell<usize>>) {
        let mut store = EnhancementStore::new();
        let count = Rc::new(Cell::new(0));
        let inner = count.clone();
        store.subscribe(Box::new(move |_| inner.set(inner.get() + 1)));
        (store, count)
    }

    #[test]
    fn test_add_then_remove_round_trips() {
        let mut store = EnhancementStore::new();
        let before = store.enhancements("b1").to_vec();
        store.add_enhancement("b1", annotation("a1", 10, 20, "x"));
        assert_eq!(store.enhancements("b1").len(), 1);
        store.remove_enhancement("b1", "a1");
        assert_eq!(store.enhancements("b1"), before.as_slice());
    }

    #[test]
    fn test_insertion_order_is_sorted_by_start_offset() {
        let mut store = EnhancementStore::new();
        store.add_enhancement("b1", annotation("c", 30, 35, "x"));
        store.add_enhancement("b1", annotation("a", 5, 9, "x"));
        store.add_enhancement("b1", annotation("b", 12, 20, "x"));
        let ids: Vec<&str> = store.enhancements("b1").iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_out_of_band_sorts_before_inline() {
        let mut store = EnhancementStore::new();
        store.add_enhancement("b1", annotation("a", 5, 9, "x"));
        let generated = Enhancement::new(
            "g1",
            "b1",
            "",
            Anchor::OutOfBand,
            EnhancementData::Annotation {
                note: "summary".to_string(),
            },
        );
        store.add_enhancement("b1", generated);
        assert_eq!(store.enhancements("b1")[0].id, "g1");
    }

    #[test]
    fn test_readd_identical_does_not_notify() {
        let (mut store, count) = counted_store();
        let e = annotation("a1", 10, 20, "x");
        store.add_enhancement("b1", e.clone());
        let after_first = count.get();
        let changed = store.add_enhancement("b1", e);
        assert!(!changed);
        assert_eq!(count.get(), after_first);
    }

    #[test]
    fn test_readd_with_changed_data_replaces_and_notifies() {
        let (mut store, count) = counted_store();
        let mut e = annotation("a1", 10, 20, "x");
        store.add_enhancement("b1", e.clone());
        let after_first = count.get();

        e.data = EnhancementData::Annotation {
            note: "y".to_string(),
        };
        let changed = store.add_enhancement("b1", e);
        assert!(changed);
        assert_eq!(count.get(), after_first + 1);
        assert_eq!(store.enhancements("b1").len(), 1);
        assert!(matches!(
            store.enhancements("b1")[0].data,
            EnhancementData::Annotation { ref note } if note == "y"
        ));
    }

    #[test]
    fn test_set_current_block_guards_redundant_updates() {
        let (mut store, count) = counted_store();
        assert!(store.set_current_block(Some("b1".to_string())));
        let after = count.get();
        assert!(!store.set_current_block(Some("b1".to_string())));
        assert_eq!(count.get(), after);
    }

    #[test]
    fn test_initialize_replaces_blocks_wholesale() {
        let mut store = EnhancementStore::new();
        store.add_enhancement("b1", annotation("a1", 0, 5, "x"));
        store.initialize(
            vec![
                Block::new("b1", BlockKind::Paragraph, 0),
                Block::new("b2", BlockKind::Figure, 1),
            ],
            Some("b1".to_string()),
        );
        assert_eq!(store.state().block_order, vec!["b1", "b2"]);
        assert!(store.enhancements("b1").is_empty());
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let mut store = EnhancementStore::new();
        let count = Rc::new(Cell::new(0));
        let inner = count.clone();
        let sub = store.subscribe(Box::new(move |_| inner.set(inner.get() + 1)));
        store.add_enhancement("b1", annotation("a1", 0, 5, "x"));
        assert_eq!(count.get(), 1);
        store.unsubscribe(sub);
        store.add_enhancement("b1", annotation("a2", 6, 9, "x"));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_watched_yields_only_on_selected_change() {
        let mut store = EnhancementStore::new();
        let mut watched: Watched<Vec<Enhancement>> =
            Watched::new(|state| state.enhancements("b1").to_vec());

        assert!(watched.poll(store.state()).is_some());

        // A write to an unrelated block does not disturb the slice.
        store.add_enhancement("b2", annotation("z1", 0, 3, "x"));
        assert!(watched.poll(store.state()).is_none());

        store.add_enhancement("b1", annotation("a1", 0, 3, "x"));
        let slice = watched.poll(store.state()).expect("watched block changed");
        assert_eq!(slice.len(), 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn enhancement_strategy() -> impl Strategy<Value = Enhancement> {
            ("[a-z0-9]{6}", 0usize..500, 1usize..40, "[a-z ]{1,20}").prop_map(
                |(id, start, len, note)| annotation(&id, start, start + len, &note),
            )
        }

        proptest! {
            /// Property: insertion in any order yields a list sorted by
            /// start offset.
            #[test]
            fn insertions_stay_sorted(
                entries in prop::collection::vec(enhancement_strategy(), 1..20),
            ) {
                let mut store = EnhancementStore::new();
                for e in entries {
                    store.add_enhancement("b1", e);
                }
                let keys: Vec<i64> = store
                    .enhancements("b1")
                    .iter()
                    .map(|e| e.anchor.sort_key())
                    .collect();
                let mut sorted = keys.clone();
                sorted.sort();
                prop_assert_eq!(keys, sorted);
            }

            /// Property: add followed by remove of the same id restores the
            /// prior list content.
            #[test]
            fn add_remove_round_trip(
                base in prop::collection::vec(enhancement_strategy(), 0..10),
                extra in enhancement_strategy(),
            ) {
                let mut store = EnhancementStore::new();
                for e in base {
                    store.add_enhancement("b1", e);
                }
                prop_assume!(!store.enhancements("b1").iter().any(|e| e.id == extra.id));
                let before = store.enhancements("b1").to_vec();
                let extra_id = extra.id.clone();
                store.add_enhancement("b1", extra);
                store.remove_enhancement("b1", &extra_id);
                prop_assert_eq!(store.enhancements("b1"), before.as_slice());
            }
        }
    }
}
