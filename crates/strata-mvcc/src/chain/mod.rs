//! Version chain storage and management.
//!
//! A version chain holds every retained version of one logical row, newest
//! first. Each version carries a half-open visibility interval:
//! - `begin` - the commit timestamp at which the version became visible
//!   (`None` while the write is still uncommitted)
//! - `end` - the commit timestamp of the version that superseded it
//!   (`None` while the version is still current)
//!
//! # Chain Structure
//!
//! ```text
//! Row 42
//! ┌──────────────────────────────────────────────┐
//! │ head: (7, "carol")                           │
//! │ begin: 150, end: None          ← current     │
//! │                 ↓ next                       │
//! │ (7, "bob")                                   │
//! │ begin: 100, end: 150                         │
//! │                 ↓ next                       │
//! │ last: (7, "alice")                           │
//! │ begin: 50,  end: 100           ← oldest      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Committed intervals are disjoint and strictly decreasing along `next`.
//! At most one version - always the head - may be owned by an in-flight
//! transaction (`txn_id` set, `begin`/`end` unset); the chain is "mid-write"
//! exactly while that slot is occupied.
//!
//! Nodes live in a small per-chain arena and are linked by index handles,
//! keeping splice and prune O(1) without self-referential pointers. The
//! chain length is capped: once a splice pushes the count past the cap the
//! oldest version is dropped. The current committed version is never
//! dropped.
//!
//! The chain itself performs no locking. The writer that owns the head slot
//! is the only legal mutator; the row-level lock acquired upstream is what
//! serializes writers, and ownership violations fail with
//! [`StrataError::IllegalChainState`].

use std::fmt;

use strata_common::error::{StrataError, StrataResult};
use strata_common::types::{ReadView, Timestamp, Tuple, TxnId};

/// Predicate applied to a resolved value; rejection resolves to nothing.
pub type VersionFilter = dyn Fn(&Tuple) -> bool + Send + Sync;

/// Handle of a node inside a chain's arena.
type NodeIdx = u32;

/// One version of a row.
#[derive(Debug, Clone)]
struct VersionNode {
    /// Commit timestamp; `None` while the write is uncommitted.
    begin: Option<Timestamp>,
    /// Commit timestamp of the superseding version; `None` while current.
    end: Option<Timestamp>,
    /// The row value, possibly [`Tuple::TOMBSTONE`].
    value: Tuple,
    /// Owner of the in-flight write; `None` once committed.
    txn_id: Option<TxnId>,
    /// Next (older) version.
    next: Option<NodeIdx>,
    /// Previous (newer) version.
    prev: Option<NodeIdx>,
}

/// The result of applying a write to a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// The value the write replaced.
    pub previous: Tuple,
    /// True when the write spliced a new head in; false when it rewrote an
    /// uncommitted head owned by the same transaction in place.
    pub spliced: bool,
}

/// A mutable chain of row versions ordered newest-first.
pub struct VersionChain {
    /// Node arena; handles in `free` are vacant.
    nodes: Vec<VersionNode>,
    /// Vacant arena slots available for reuse.
    free: Vec<NodeIdx>,
    /// The newest version.
    head: NodeIdx,
    /// The oldest retained version.
    last: NodeIdx,
    /// Number of live versions.
    len: usize,
    /// Retention cap; the oldest version is pruned past this.
    max_versions: usize,
}

impl VersionChain {
    /// Creates a chain from a fresh uncommitted insert.
    ///
    /// The head is owned by `txn_id` with no visibility interval yet; if the
    /// transaction aborts, the chain has no history to fall back to and must
    /// be removed by its owner store.
    #[must_use]
    pub fn begin_insert(value: Tuple, txn_id: TxnId, max_versions: usize) -> Self {
        let head = VersionNode {
            begin: None,
            end: None,
            value,
            txn_id: Some(txn_id),
            next: None,
            prev: None,
        };
        Self {
            nodes: vec![head],
            free: Vec::new(),
            head: 0,
            last: 0,
            len: 1,
            max_versions: max_versions.max(2),
        }
    }

    /// Returns the transaction currently mid-write on this chain, if any.
    #[inline]
    #[must_use]
    pub fn owner(&self) -> Option<TxnId> {
        self.node(self.head).txn_id
    }

    /// Returns true while an uncommitted write occupies the head.
    #[inline]
    #[must_use]
    pub fn is_mid_write(&self) -> bool {
        self.owner().is_some()
    }

    /// Returns the number of retained versions.
    #[inline]
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.len
    }

    /// Applies a write on behalf of `txn_id`.
    ///
    /// A repeated write by the transaction already owning the head rewrites
    /// the head in place - chained updates within one transaction do not
    /// grow the chain. Otherwise the current head state is spliced out into
    /// a history node and the head becomes the new uncommitted write.
    pub fn add_write(&mut self, value: Tuple, txn_id: TxnId) -> StrataResult<WriteOutcome> {
        match self.node(self.head).txn_id {
            Some(owner) if owner == txn_id => {
                let head = self.node_mut(self.head);
                let previous = std::mem::replace(&mut head.value, value);
                Ok(WriteOutcome {
                    previous,
                    spliced: false,
                })
            }
            Some(owner) => Err(StrataError::IllegalChainState {
                message: format!(
                    "transaction {txn_id} wrote a chain mid-write by transaction {owner}"
                ),
            }),
            None => {
                let previous = self.splice(value, txn_id);
                self.prune_to_cap();
                Ok(WriteOutcome {
                    previous,
                    spliced: true,
                })
            }
        }
    }

    /// Finalizes the in-flight write at `timestamp`.
    ///
    /// Sets the head's `begin`, clears its owner, and closes the superseded
    /// version's interval at exactly the same timestamp so committed
    /// intervals never overlap.
    pub fn commit_write(&mut self, timestamp: Timestamp, txn_id: TxnId) -> StrataResult<()> {
        self.check_owner(txn_id, "commit")?;

        let head = self.node_mut(self.head);
        head.begin = Some(timestamp);
        head.txn_id = None;
        if let Some(next) = head.next {
            self.node_mut(next).end = Some(timestamp);
        }
        Ok(())
    }

    /// Rolls back the in-flight write.
    ///
    /// The head collapses back into the state of the version it displaced.
    /// Returns `true` when the aborted write was a pure insert with no
    /// history: the chain is then empty and the caller must remove it from
    /// the owning store.
    pub fn abort_write(&mut self, txn_id: TxnId) -> StrataResult<bool> {
        self.check_owner(txn_id, "abort")?;

        let Some(next) = self.node(self.head).next else {
            return Ok(true);
        };

        let restored = self.node(next).clone();
        let head_idx = self.head;
        let head = self.node_mut(head_idx);
        head.begin = restored.begin;
        head.end = restored.end;
        head.value = restored.value;
        head.txn_id = None;
        head.next = restored.next;

        match restored.next {
            Some(older) => self.node_mut(older).prev = Some(head_idx),
            None => self.last = head_idx,
        }
        self.release_node(next);
        Ok(false)
    }

    /// Resolves the value visible through `view`.
    ///
    /// In transaction mode the head is returned when it is committed or when
    /// the reading transaction owns the in-flight write; the caller is
    /// assumed to hold the lock that excludes other writers. In snapshot
    /// mode the chain is walked for the unique version whose
    /// `[begin, end)` interval contains the timestamp.
    ///
    /// A tombstoned value, a filtered-out value, and a timestamp before the
    /// row existed (or past its pruned history) all resolve to `None`.
    #[must_use]
    pub fn resolve(&self, view: ReadView, filter: Option<&VersionFilter>) -> Option<Tuple> {
        let value = match view {
            ReadView::Transaction(txn_id) => {
                let head = self.node(self.head);
                match head.txn_id {
                    None => Some(&head.value),
                    Some(owner) if owner == txn_id => Some(&head.value),
                    Some(_) => None,
                }
            }
            ReadView::Snapshot(ts) => {
                let mut cursor = Some(self.head);
                let mut found = None;
                while let Some(idx) = cursor {
                    let node = self.node(idx);
                    if node.txn_id.is_none() {
                        let begin = node.begin?;
                        if begin <= ts && node.end.map_or(true, |end| ts < end) {
                            found = Some(&node.value);
                            break;
                        }
                    }
                    cursor = node.next;
                }
                found
            }
        }?;

        if value.is_tombstone() {
            return None;
        }
        if let Some(filter) = filter {
            if !filter(value) {
                return None;
            }
        }
        Some(value.clone())
    }

    fn check_owner(&self, txn_id: TxnId, action: &str) -> StrataResult<()> {
        match self.node(self.head).txn_id {
            Some(owner) if owner == txn_id => Ok(()),
            Some(owner) => Err(StrataError::IllegalChainState {
                message: format!(
                    "transaction {txn_id} tried to {action} a write owned by transaction {owner}"
                ),
            }),
            None => Err(StrataError::IllegalChainState {
                message: format!("transaction {txn_id} tried to {action} with no write in flight"),
            }),
        }
    }

    /// Moves the head's state into a new history node and installs the new
    /// uncommitted write at the head. Returns the superseded value.
    fn splice(&mut self, value: Tuple, txn_id: TxnId) -> Tuple {
        let head_idx = self.head;
        let head = self.node_mut(head_idx);
        let old_begin = head.begin;
        let old_end = head.end;
        let old_next = head.next;
        let previous = std::mem::replace(&mut head.value, value);
        head.begin = None;
        head.end = None;
        head.txn_id = Some(txn_id);

        let history = self.alloc_node(VersionNode {
            begin: old_begin,
            end: old_end,
            value: previous.clone(),
            txn_id: None,
            next: old_next,
            prev: Some(head_idx),
        });

        match old_next {
            Some(older) => self.node_mut(older).prev = Some(history),
            None => self.last = history,
        }
        self.node_mut(head_idx).next = Some(history);
        self.len += 1;
        previous
    }

    /// Drops oldest versions until the chain fits its cap again.
    ///
    /// The current committed version (the head's `next` while a write is in
    /// flight) is never dropped.
    fn prune_to_cap(&mut self) {
        while self.len > self.max_versions {
            let victim = self.last;
            if victim == self.head || Some(victim) == self.node(self.head).next {
                break;
            }
            let prev = self
                .node(victim)
                .prev
                .expect("chain longer than two has a linked tail");
            self.node_mut(prev).next = None;
            self.last = prev;
            self.release_node(victim);
        }
    }

    fn alloc_node(&mut self, node: VersionNode) -> NodeIdx {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx as usize] = node;
                idx
            }
            None => {
                let idx = self.nodes.len() as NodeIdx;
                self.nodes.push(node);
                idx
            }
        }
    }

    fn release_node(&mut self, idx: NodeIdx) {
        self.nodes[idx as usize].value = Tuple::TOMBSTONE;
        self.nodes[idx as usize].next = None;
        self.nodes[idx as usize].prev = None;
        self.free.push(idx);
        self.len -= 1;
    }

    #[inline]
    fn node(&self, idx: NodeIdx) -> &VersionNode {
        &self.nodes[idx as usize]
    }

    #[inline]
    fn node_mut(&mut self, idx: NodeIdx) -> &mut VersionNode {
        &mut self.nodes[idx as usize]
    }
}

impl fmt::Debug for VersionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionChain")
            .field("versions", &self.len)
            .field("owner", &self.owner())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::types::Datum;

    fn val(n: i64) -> Tuple {
        Tuple::new(vec![Datum::int(n)])
    }

    fn ts(n: u64) -> Timestamp {
        Timestamp::new(n)
    }

    fn txn(n: u128) -> TxnId {
        TxnId::new(n)
    }

    /// Builds a chain with committed versions val(i) at timestamps
    /// 10, 20, 30, ... for i in 1..=n.
    fn committed_chain(n: u64) -> VersionChain {
        let mut chain = VersionChain::begin_insert(val(1), txn(1), 10);
        chain.commit_write(ts(10), txn(1)).unwrap();
        for i in 2..=n {
            chain.add_write(val(i as i64), txn(i as u128)).unwrap();
            chain.commit_write(ts(i * 10), txn(i as u128)).unwrap();
        }
        chain
    }

    #[test]
    fn test_insert_commit_visibility() {
        let mut chain = VersionChain::begin_insert(val(7), txn(1), 10);

        // Uncommitted: visible to the owner, invisible to others and to
        // every snapshot.
        assert_eq!(
            chain.resolve(ReadView::Transaction(txn(1)), None),
            Some(val(7))
        );
        assert_eq!(chain.resolve(ReadView::Transaction(txn(2)), None), None);
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(100)), None), None);

        chain.commit_write(ts(50), txn(1)).unwrap();

        assert_eq!(chain.resolve(ReadView::Snapshot(ts(50)), None), Some(val(7)));
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(49)), None), None);
        assert_eq!(
            chain.resolve(ReadView::Transaction(txn(2)), None),
            Some(val(7))
        );
    }

    #[test]
    fn test_snapshot_resolution_unique_interval() {
        let chain = committed_chain(3);

        // Each timestamp sees exactly the version whose interval holds it.
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(9)), None), None);
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(10)), None), Some(val(1)));
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(19)), None), Some(val(1)));
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(20)), None), Some(val(2)));
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(29)), None), Some(val(2)));
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(30)), None), Some(val(3)));
        assert_eq!(
            chain.resolve(ReadView::Snapshot(ts(1000)), None),
            Some(val(3))
        );
    }

    #[test]
    fn test_same_txn_rewrite_in_place() {
        let mut chain = committed_chain(1);

        let first = chain.add_write(val(2), txn(5)).unwrap();
        assert!(first.spliced);
        assert_eq!(first.previous, val(1));
        assert_eq!(chain.version_count(), 2);

        // A second write by the same transaction replaces in place.
        let second = chain.add_write(val(3), txn(5)).unwrap();
        assert!(!second.spliced);
        assert_eq!(second.previous, val(2));
        assert_eq!(chain.version_count(), 2);

        chain.commit_write(ts(20), txn(5)).unwrap();
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(20)), None), Some(val(3)));
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(15)), None), Some(val(1)));
    }

    #[test]
    fn test_write_by_non_owner_rejected() {
        let mut chain = committed_chain(1);
        chain.add_write(val(2), txn(5)).unwrap();

        let err = chain.add_write(val(3), txn(6)).unwrap_err();
        assert!(matches!(err, StrataError::IllegalChainState { .. }));
    }

    #[test]
    fn test_commit_requires_matching_owner() {
        let mut chain = committed_chain(1);
        chain.add_write(val(2), txn(5)).unwrap();

        assert!(chain.commit_write(ts(20), txn(6)).is_err());
        assert!(chain.commit_write(ts(20), txn(5)).is_ok());
        // No write in flight any more.
        assert!(chain.commit_write(ts(30), txn(5)).is_err());
    }

    #[test]
    fn test_abort_collapses_to_prior_version() {
        let mut chain = committed_chain(1);
        chain.add_write(val(2), txn(5)).unwrap();

        let emptied = chain.abort_write(txn(5)).unwrap();
        assert!(!emptied);
        assert!(!chain.is_mid_write());
        assert_eq!(chain.version_count(), 1);
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(10)), None), Some(val(1)));
        assert_eq!(
            chain.resolve(ReadView::Transaction(txn(5)), None),
            Some(val(1))
        );
    }

    #[test]
    fn test_abort_of_pure_insert_empties_chain() {
        let mut chain = VersionChain::begin_insert(val(1), txn(1), 10);
        let emptied = chain.abort_write(txn(1)).unwrap();
        assert!(emptied);
    }

    #[test]
    fn test_tombstone_resolves_to_nothing() {
        let mut chain = committed_chain(1);
        chain.add_write(Tuple::TOMBSTONE, txn(5)).unwrap();
        chain.commit_write(ts(20), txn(5)).unwrap();

        assert_eq!(chain.resolve(ReadView::Snapshot(ts(25)), None), None);
        assert_eq!(chain.resolve(ReadView::Transaction(txn(9)), None), None);
        // The pre-delete version is still reachable.
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(15)), None), Some(val(1)));
    }

    #[test]
    fn test_filter_rejection() {
        let chain = committed_chain(1);
        let reject_all: &VersionFilter = &|_| false;
        let accept_all: &VersionFilter = &|_| true;

        assert_eq!(
            chain.resolve(ReadView::Snapshot(ts(10)), Some(reject_all)),
            None
        );
        assert_eq!(
            chain.resolve(ReadView::Snapshot(ts(10)), Some(accept_all)),
            Some(val(1))
        );
    }

    #[test]
    fn test_cap_prunes_oldest() {
        let mut chain = VersionChain::begin_insert(val(1), txn(1), 3);
        chain.commit_write(ts(10), txn(1)).unwrap();
        for i in 2..=6u64 {
            chain.add_write(val(i as i64), txn(i as u128)).unwrap();
            chain.commit_write(ts(i * 10), txn(i as u128)).unwrap();
        }

        assert_eq!(chain.version_count(), 3);
        // Newest three survive; older history is gone.
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(60)), None), Some(val(6)));
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(45)), None), Some(val(4)));
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(35)), None), None);
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(15)), None), None);
    }

    #[test]
    fn test_cap_never_prunes_current_committed() {
        // Cap of two: an in-flight write plus the committed version it
        // supersedes always fit.
        let mut chain = VersionChain::begin_insert(val(1), txn(1), 2);
        chain.commit_write(ts(10), txn(1)).unwrap();
        for i in 2..=5u64 {
            chain.add_write(val(i as i64), txn(i as u128)).unwrap();
            // Mid-write: the committed predecessor must still resolve.
            assert_eq!(
                chain.resolve(ReadView::Snapshot(ts((i - 1) * 10)), None),
                Some(val(i as i64 - 1))
            );
            chain.commit_write(ts(i * 10), txn(i as u128)).unwrap();
        }
        assert_eq!(chain.version_count(), 2);
    }

    #[test]
    fn test_arena_reuse_after_abort() {
        let mut chain = committed_chain(1);
        for attempt in 0..20u128 {
            chain.add_write(val(99), txn(100 + attempt)).unwrap();
            chain.abort_write(txn(100 + attempt)).unwrap();
        }
        // Aborted writes recycle arena slots instead of growing the chain.
        assert_eq!(chain.version_count(), 1);
        assert!(chain.nodes.len() <= 3);
        assert_eq!(chain.resolve(ReadView::Snapshot(ts(10)), None), Some(val(1)));
    }
}
