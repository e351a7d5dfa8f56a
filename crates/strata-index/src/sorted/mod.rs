//! Sorted secondary indexes with next-key locking.
//!
//! A sorted index keeps key bindings in an ordered map so that range
//! predicates can be answered. Phantom insertions into a scanned range are
//! prevented by next-key locking:
//!
//! - An insert of key `K` first locks the *successor* of `K` in sort order
//!   (or the [`Tuple::INF`] sentinel when `K` is the new maximum) in `IX`,
//!   then locks `K` itself (`X` for the unique variant, `IX` otherwise),
//!   performs the uniqueness check, binds, and finally sheds the successor
//!   lock: downgraded back to `IX` if the grant came back escalated by a
//!   prior hold, released outright if unused.
//! - A range scan `S`-locks every key it visits plus the first key past the
//!   range (or `INF`), so an insert into the scanned gap must wait for the
//!   scanner.
//!
//! Cursor advancement is optimistic: the next key is peeked from the map,
//! the `S` lock is acquired, and the key is then re-checked - it may have
//! been revoked between the peek and the grant, in which case the cursor
//! step retries. The peek and the lock acquisition are not atomic, so the
//! double check is load-bearing.
//!
//! As with hash indexes, `update`/`remove` never physically unbind
//! historical keys; only [`SortedIndex::revoke`] (abort of an uncommitted
//! insert) does.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use strata_common::error::{StrataError, StrataResult};
use strata_common::types::{ReadView, RowId, Tuple, TxnId};
use strata_mvcc::RowStore;
use strata_txn::{DeadlockPolicy, LockKey, LockMode, LockTable};

/// Ordered key-to-rows bindings shared between an index and its cursors.
type SortedEntries = RwLock<BTreeMap<Tuple, BTreeSet<RowId>>>;

/// A sorted index over projected key tuples.
pub struct SortedIndex {
    /// Index name, used in error reporting.
    name: String,
    /// Columns projected out of row tuples to form keys.
    columns: Vec<usize>,
    /// Whether keys must be unique among live rows.
    unique: bool,
    /// Per-key lock table, shared with open cursors.
    locks: Arc<LockTable>,
    /// Ordered bindings, shared with open cursors.
    entries: Arc<SortedEntries>,
    /// The shared row store, used to resolve rows during uniqueness checks.
    rows: Arc<RowStore>,
}

impl SortedIndex {
    /// Creates a sorted index.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<usize>,
        unique: bool,
        rows: Arc<RowStore>,
        policy: DeadlockPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            columns,
            unique,
            locks: Arc::new(LockTable::new(policy)),
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            rows,
        }
    }

    /// Returns the index name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the projected columns.
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Returns true if this index enforces uniqueness.
    #[inline]
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    /// Returns this index's lock table.
    #[must_use]
    pub fn lock_table(&self) -> &LockTable {
        &self.locks
    }

    /// Projects a row tuple into this index's key space.
    pub fn project(&self, tuple: &Tuple) -> StrataResult<Tuple> {
        tuple.select(&self.columns)
    }

    fn key_mode(&self) -> LockMode {
        if self.unique {
            LockMode::Exclusive
        } else {
            LockMode::IntentExclusive
        }
    }

    /// Returns the smallest indexed key strictly greater than `key`, or
    /// [`Tuple::INF`] when `key` is the maximum.
    #[must_use]
    pub fn successor(&self, key: &Tuple) -> Tuple {
        let entries = self.entries.read();
        entries
            .range::<Tuple, _>((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map_or(Tuple::INF, |(next, _)| next.clone())
    }

    /// Inserts a binding for `row_id` under the key projected from `tuple`.
    ///
    /// Locks the successor key before the key itself so a concurrent range
    /// scan holding (or waiting on) the gap serializes against this insert.
    pub async fn insert(&self, tuple: &Tuple, row_id: RowId, txn_id: TxnId) -> StrataResult<()> {
        let key = self.project(tuple)?;
        let next_key = self.successor(&key);

        let next_granted = self
            .locks
            .acquire(txn_id, LockKey::key(next_key.clone()), LockMode::IntentExclusive)
            .await?;
        self.locks
            .acquire(txn_id, LockKey::key(key.clone()), self.key_mode())
            .await?;

        if self.unique {
            self.check_unique(&key, row_id, txn_id)?;
        }

        self.entries.write().entry(key).or_default().insert(row_id);

        // Shed the successor lock: keep it as an intent if the grant was
        // escalated by a mode this transaction already held, drop it if the
        // plain intent lock was all we took.
        let next_lock = LockKey::key(next_key);
        if next_granted.rank() > LockMode::IntentExclusive.rank() {
            self.locks
                .downgrade(txn_id, &next_lock, LockMode::IntentExclusive)?;
        } else {
            self.locks.release(txn_id, &next_lock);
        }
        Ok(())
    }

    /// Updates bindings when a row's value changes.
    ///
    /// Returns true exactly when a new binding was added under a changed
    /// key, so the caller can register its undo.
    pub async fn update(
        &self,
        old: &Tuple,
        new: &Tuple,
        row_id: RowId,
        txn_id: TxnId,
    ) -> StrataResult<bool> {
        let old_key = self.project(old)?;
        let new_key = self.project(new)?;

        if old_key == new_key {
            self.locks
                .acquire(txn_id, LockKey::key(old_key), self.key_mode())
                .await?;
            return Ok(false);
        }

        self.locks
            .acquire(txn_id, LockKey::key(old_key), LockMode::IntentExclusive)
            .await?;
        self.insert(new, row_id, txn_id).await?;
        Ok(true)
    }

    /// Serializes a removal against readers and writers of the key.
    ///
    /// The binding stays; the chain-level tombstone hides the row.
    pub async fn remove(&self, tuple: &Tuple, _row_id: RowId, txn_id: TxnId) -> StrataResult<()> {
        let key = self.project(tuple)?;
        self.locks
            .acquire(txn_id, LockKey::key(key), self.key_mode())
            .await?;
        Ok(())
    }

    /// Returns the rows bound under `key`, visible through `view`.
    pub async fn search(&self, key: &Tuple, view: ReadView) -> StrataResult<Vec<RowId>> {
        if let ReadView::Transaction(txn_id) = view {
            self.locks
                .acquire(txn_id, LockKey::key(key.clone()), LockMode::Shared)
                .await?;
        }
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .map(|refs| refs.iter().copied().collect())
            .unwrap_or_default())
    }

    /// Opens a cursor over `[lower, upper]` (both inclusive, either open).
    ///
    /// Transaction-view cursors `S`-lock each visited key plus the first
    /// key past the range; snapshot-view cursors take no locks.
    #[must_use]
    pub fn range(&self, lower: Option<Tuple>, upper: Option<Tuple>, view: ReadView) -> RangeCursor {
        RangeCursor {
            entries: Arc::clone(&self.entries),
            locks: Arc::clone(&self.locks),
            view,
            lower,
            upper,
            position: None,
            pending: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Physically unbinds `row_id` from `key` (abort of an uncommitted
    /// insert only).
    pub fn revoke(&self, key: &Tuple, row_id: RowId) {
        let mut entries = self.entries.write();
        if let Some(refs) = entries.get_mut(key) {
            refs.remove(&row_id);
            if refs.is_empty() {
                entries.remove(key);
            }
        }
    }

    /// Releases every lock this index holds for a transaction.
    pub fn release_all(&self, txn_id: TxnId) -> usize {
        self.locks.release_all(txn_id)
    }

    /// Rejects the insert if another live row still carries `key`.
    fn check_unique(&self, key: &Tuple, row_id: RowId, txn_id: TxnId) -> StrataResult<()> {
        let siblings: Vec<RowId> = {
            let entries = self.entries.read();
            entries
                .get(key)
                .map(|refs| refs.iter().copied().collect())
                .unwrap_or_default()
        };

        for other in siblings {
            if other == row_id {
                continue;
            }
            let Some(current) = self
                .rows
                .resolve(other, ReadView::Transaction(txn_id), None)
            else {
                continue;
            };
            if current.select(&self.columns)? == *key {
                return Err(StrataError::UniqueViolation {
                    index: self.name.clone(),
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SortedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedIndex")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("unique", &self.unique)
            .field("keys", &self.entries.read().len())
            .finish()
    }
}

/// An asynchronous cursor over a sorted index range.
///
/// Yields row references key by key in ascending order. The `S` locks a
/// transaction-view cursor acquires are held until the transaction ends;
/// that is what keeps the scanned range free of phantoms.
pub struct RangeCursor {
    entries: Arc<SortedEntries>,
    locks: Arc<LockTable>,
    view: ReadView,
    lower: Option<Tuple>,
    upper: Option<Tuple>,
    /// The last key examined; the next peek starts strictly after it.
    position: Option<Tuple>,
    /// References under the current key, not yet yielded.
    pending: VecDeque<RowId>,
    exhausted: bool,
}

impl RangeCursor {
    /// Advances to the next row reference in the range.
    ///
    /// Each new key is acquired optimistically: peek the ordered map,
    /// `S`-lock the candidate, then confirm it is still bound - a revoked
    /// key retries the step. When the range is exhausted the upper bound
    /// (or `INF`) is `S`-locked so late inserts past the last key still
    /// serialize against this scan.
    pub async fn next(&mut self) -> StrataResult<Option<RowId>> {
        loop {
            if let Some(row_id) = self.pending.pop_front() {
                return Ok(Some(row_id));
            }
            if self.exhausted {
                return Ok(None);
            }

            let candidate = self.peek_next_key();
            let Some(key) = candidate else {
                if let ReadView::Transaction(txn_id) = self.view {
                    let bound = self.upper.clone().unwrap_or(Tuple::INF);
                    self.locks
                        .acquire(txn_id, LockKey::key(bound), LockMode::Shared)
                        .await?;
                }
                self.exhausted = true;
                return Ok(None);
            };

            if let ReadView::Transaction(txn_id) = self.view {
                self.locks
                    .acquire(txn_id, LockKey::key(key.clone()), LockMode::Shared)
                    .await?;
            }

            // The key may have been revoked between the peek and the lock
            // grant; if so, step again from the same position.
            let refs: Option<Vec<RowId>> = {
                let entries = self.entries.read();
                entries.get(&key).map(|refs| refs.iter().copied().collect())
            };
            match refs {
                Some(refs) => self.pending.extend(refs),
                None => trace!(%key, "scanned key vanished after lock grant, retrying"),
            }
            self.position = Some(key);
        }
    }

    /// Collects every remaining row reference in the range.
    pub async fn collect_rows(&mut self) -> StrataResult<Vec<RowId>> {
        let mut out = Vec::new();
        while let Some(row_id) = self.next().await? {
            out.push(row_id);
        }
        Ok(out)
    }

    /// Peeks the smallest in-range key past the current position.
    fn peek_next_key(&self) -> Option<Tuple> {
        let entries = self.entries.read();
        let lower_bound = match (&self.position, &self.lower) {
            (Some(pos), _) => Bound::Excluded(pos),
            (None, Some(lo)) => Bound::Included(lo),
            (None, None) => Bound::Unbounded,
        };
        let key = entries
            .range::<Tuple, _>((lower_bound, Bound::Unbounded))
            .next()
            .map(|(key, _)| key.clone())?;

        match &self.upper {
            Some(upper) if key > *upper => None,
            _ => Some(key),
        }
    }
}

impl fmt::Debug for RangeCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeCursor")
            .field("view", &self.view)
            .field("position", &self.position)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use strata_common::types::{Datum, Timestamp};
    use tokio::time::{sleep, timeout};

    fn row(id: i64, name: &str) -> Tuple {
        Tuple::new(vec![Datum::int(id), Datum::str(name)])
    }

    fn key_of(id: i64) -> Tuple {
        Tuple::new(vec![Datum::int(id)])
    }

    fn txn(n: u128) -> TxnId {
        TxnId::new(n)
    }

    fn setup(unique: bool) -> (Arc<RowStore>, Arc<SortedIndex>) {
        let rows = Arc::new(RowStore::new());
        let index = Arc::new(SortedIndex::new(
            "by_id",
            vec![0],
            unique,
            rows.clone(),
            DeadlockPolicy::None,
        ));
        (rows, index)
    }

    async fn seed(rows: &RowStore, index: &SortedIndex, value: Tuple, t: u128, ts: u64) -> RowId {
        let row_id = rows.insert(value.clone(), txn(t)).unwrap();
        index.insert(&value, row_id, txn(t)).await.unwrap();
        rows.commit_write(row_id, Timestamp::new(ts), txn(t)).unwrap();
        index.release_all(txn(t));
        row_id
    }

    #[tokio::test]
    async fn test_range_scan_in_order() {
        let (rows, index) = setup(false);
        let r3 = seed(&rows, &index, row(3, "c"), 1, 10).await;
        let r1 = seed(&rows, &index, row(1, "a"), 2, 20).await;
        let r7 = seed(&rows, &index, row(7, "g"), 3, 30).await;

        let mut cursor = index.range(None, None, ReadView::Transaction(txn(9)));
        assert_eq!(cursor.collect_rows().await.unwrap(), vec![r1, r3, r7]);
    }

    #[tokio::test]
    async fn test_range_bounds_inclusive() {
        let (rows, index) = setup(false);
        seed(&rows, &index, row(1, "a"), 1, 10).await;
        let r3 = seed(&rows, &index, row(3, "c"), 2, 20).await;
        let r5 = seed(&rows, &index, row(5, "e"), 3, 30).await;
        seed(&rows, &index, row(9, "i"), 4, 40).await;

        let mut cursor = index.range(
            Some(key_of(3)),
            Some(key_of(5)),
            ReadView::Transaction(txn(9)),
        );
        assert_eq!(cursor.collect_rows().await.unwrap(), vec![r3, r5]);
    }

    #[tokio::test]
    async fn test_successor_and_inf() {
        let (rows, index) = setup(false);
        seed(&rows, &index, row(1, "a"), 1, 10).await;
        seed(&rows, &index, row(5, "e"), 2, 20).await;

        assert_eq!(index.successor(&key_of(1)), key_of(5));
        assert_eq!(index.successor(&key_of(3)), key_of(5));
        assert_eq!(index.successor(&key_of(5)), Tuple::INF);
    }

    #[tokio::test]
    async fn test_insert_releases_unused_next_key_lock() {
        let (rows, index) = setup(true);
        seed(&rows, &index, row(5, "e"), 1, 10).await;

        let r1 = rows.insert(row(1, "a"), txn(2)).unwrap();
        index.insert(&row(1, "a"), r1, txn(2)).await.unwrap();

        // The key itself stays locked; the successor lock was shed.
        let locks = index.lock_table();
        assert_eq!(
            locks.held_mode(txn(2), &LockKey::key(key_of(1))),
            Some(LockMode::Exclusive)
        );
        assert_eq!(locks.held_mode(txn(2), &LockKey::key(key_of(5))), None);
    }

    #[tokio::test]
    async fn test_insert_downgrades_escalated_next_key_lock() {
        let (rows, index) = setup(true);
        let r5 = seed(&rows, &index, row(5, "e"), 1, 10).await;

        // txn 2 scanned key 5 earlier, so it holds S there; inserting key 1
        // escalates the successor acquisition and must shed back to IX, not
        // release the hold outright.
        let refs = index
            .search(&key_of(5), ReadView::Transaction(txn(2)))
            .await
            .unwrap();
        assert_eq!(refs, vec![r5]);

        let r1 = rows.insert(row(1, "a"), txn(2)).unwrap();
        index.insert(&row(1, "a"), r1, txn(2)).await.unwrap();

        assert_eq!(
            index
                .lock_table()
                .held_mode(txn(2), &LockKey::key(key_of(5))),
            Some(LockMode::IntentExclusive)
        );
    }

    #[tokio::test]
    async fn test_scan_blocks_insert_into_gap() {
        let (rows, index) = setup(false);
        let r1 = seed(&rows, &index, row(1, "a"), 1, 10).await;
        let r9 = seed(&rows, &index, row(9, "i"), 2, 20).await;

        // Scanner walks the whole range, S-locking 1, 9, and INF.
        let scanner = txn(3);
        let mut cursor = index.range(None, None, ReadView::Transaction(scanner));
        assert_eq!(cursor.collect_rows().await.unwrap(), vec![r1, r9]);

        // An insert of key 5 needs IX on its successor 9, held S by the
        // scanner: it must wait.
        let insert = tokio::spawn({
            let rows = rows.clone();
            let index = index.clone();
            async move {
                let r5 = rows.insert(row(5, "e"), txn(4)).unwrap();
                index.insert(&row(5, "e"), r5, txn(4)).await
            }
        });
        sleep(Duration::from_millis(50)).await;
        assert!(!insert.is_finished());

        // Scanner finishes; the insert proceeds.
        index.release_all(scanner);
        timeout(Duration::from_secs(1), insert)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_scan_blocks_insert_past_maximum() {
        let (rows, index) = setup(false);
        seed(&rows, &index, row(1, "a"), 1, 10).await;

        let scanner = txn(2);
        let mut cursor = index.range(None, None, ReadView::Transaction(scanner));
        cursor.collect_rows().await.unwrap();

        // Key 9 is a new maximum: its successor is INF, S-held by the
        // exhausted scanner.
        let insert = tokio::spawn({
            let rows = rows.clone();
            let index = index.clone();
            async move {
                let r9 = rows.insert(row(9, "i"), txn(3)).unwrap();
                index.insert(&row(9, "i"), r9, txn(3)).await
            }
        });
        sleep(Duration::from_millis(50)).await;
        assert!(!insert.is_finished());

        index.release_all(scanner);
        timeout(Duration::from_secs(1), insert)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_cursor_revalidates_after_lock_grant() {
        let (rows, index) = setup(false);
        let r1 = seed(&rows, &index, row(1, "a"), 1, 10).await;

        // txn 2 has an uncommitted insert of key 3, holding IX on it.
        let writer = txn(2);
        let r3 = rows.insert(row(3, "c"), writer).unwrap();
        index.insert(&row(3, "c"), r3, writer).await.unwrap();

        // The scanner yields key 1, then peeks key 3 and blocks on its S
        // lock behind the writer's IX.
        let scan = tokio::spawn({
            let index = index.clone();
            async move {
                let mut cursor = index.range(None, None, ReadView::Transaction(txn(5)));
                cursor.collect_rows().await
            }
        });
        sleep(Duration::from_millis(50)).await;
        assert!(!scan.is_finished());

        // The writer aborts: binding revoked, locks released. The scanner's
        // granted S lock now points at a vanished key and must retry rather
        // than yield it.
        rows.abort_write(r3, writer).unwrap();
        index.revoke(&key_of(3), r3);
        index.release_all(writer);

        let scanned = timeout(Duration::from_secs(1), scan)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(scanned, vec![r1]);
    }

    #[tokio::test]
    async fn test_unique_violation() {
        let (rows, index) = setup(true);
        seed(&rows, &index, row(1, "a"), 1, 10).await;

        let r2 = rows.insert(row(1, "b"), txn(2)).unwrap();
        let err = index.insert(&row(1, "b"), r2, txn(2)).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_snapshot_cursor_takes_no_locks() {
        let (rows, index) = setup(false);
        seed(&rows, &index, row(1, "a"), 1, 10).await;

        let mut cursor = index.range(None, None, ReadView::Snapshot(Timestamp::new(10)));
        cursor.collect_rows().await.unwrap();

        assert_eq!(index.lock_table().lock_count(), 0);
    }

    #[tokio::test]
    async fn test_update_moves_key() {
        let (rows, index) = setup(false);
        let r1 = seed(&rows, &index, row(1, "a"), 1, 10).await;

        rows.add_write(r1, row(4, "a"), txn(2)).unwrap();
        let added = index
            .update(&row(1, "a"), &row(4, "a"), r1, txn(2))
            .await
            .unwrap();
        assert!(added);
        rows.commit_write(r1, Timestamp::new(20), txn(2)).unwrap();
        index.release_all(txn(2));

        // Both the historical and the current binding are present.
        let mut cursor = index.range(None, None, ReadView::Snapshot(Timestamp::new(20)));
        assert_eq!(cursor.collect_rows().await.unwrap(), vec![r1, r1]);
    }
}
