//! Dedup index and the write gate in front of the sheet

use anyhow::Result;
use log::debug;
use std::collections::HashSet;

use super::traits::{Placement, SheetStore, Store};
use crate::models::{MessageId, NormalizedRecord};

/// Message IDs already materialized as rows
///
/// Loaded once per invocation and kept in step with the store by
/// [`SinkWriter`].
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    ids: HashSet<MessageId>,
}

impl DedupIndex {
    pub fn load(store: &dyn Store) -> Result<Self> {
        Ok(Self {
            ids: store.indexed_ids()?,
        })
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    /// Record IDs that are now durably written
    pub fn register<'a>(&mut self, ids: impl IntoIterator<Item = &'a MessageId>) {
        self.ids.extend(ids.into_iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Outcome of one gated write
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written: usize,
    pub skipped: usize,
}

/// Writes records at most once per message ID
pub struct SinkWriter<'a> {
    store: &'a dyn Store,
    index: DedupIndex,
}

impl<'a> SinkWriter<'a> {
    /// Create a writer over `store`, loading its dedup index
    pub fn open(store: &'a dyn Store) -> Result<Self> {
        Ok(Self {
            store,
            index: DedupIndex::load(store)?,
        })
    }

    pub fn index(&self) -> &DedupIndex {
        &self.index
    }

    pub fn is_indexed(&self, id: &MessageId) -> bool {
        self.index.contains(id)
    }

    /// Drop already-indexed and repeated records, then commit the rest
    ///
    /// Rows placed at the top are ordered newest first; rows placed at the
    /// bottom oldest first. IDs enter the in-memory index only after the
    /// store has committed them.
    pub fn write(&mut self, records: Vec<NormalizedRecord>, placement: Placement) -> Result<WriteOutcome> {
        let total = records.len();
        let mut batch_ids = HashSet::new();
        let mut fresh: Vec<NormalizedRecord> = records
            .into_iter()
            .filter(|r| !self.index.contains(&r.message_id) && batch_ids.insert(r.message_id.clone()))
            .collect();

        match placement {
            Placement::Top => fresh.sort_by_key(|r| std::cmp::Reverse(r.timestamp_millis())),
            Placement::Bottom => fresh.sort_by_key(|r| r.timestamp_millis()),
        }

        let outcome = WriteOutcome {
            written: fresh.len(),
            skipped: total - fresh.len(),
        };
        if fresh.is_empty() {
            return Ok(outcome);
        }

        self.store.commit_batch(&fresh, placement)?;
        self.index.register(fresh.iter().map(|r| &r.message_id));
        debug!(
            "Committed {} rows ({} skipped), index size {}",
            outcome.written,
            outcome.skipped,
            self.index.len()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::make_record;
    use crate::storage::{InMemorySheetStore, SheetStore};

    #[test]
    fn test_rejects_indexed_and_repeated_ids() {
        let store = InMemorySheetStore::new();
        store.commit_batch(&[make_record("old", 1)], Placement::Bottom).unwrap();

        let mut writer = SinkWriter::open(&store).unwrap();
        assert!(writer.is_indexed(&MessageId::new("old")));

        let outcome = writer
            .write(
                vec![make_record("old", 1), make_record("new", 2), make_record("new", 2)],
                Placement::Bottom,
            )
            .unwrap();

        assert_eq!(outcome, WriteOutcome { written: 1, skipped: 2 });
        assert_eq!(store.row_count().unwrap(), 2);
        assert_eq!(writer.index().len(), 2);

        let again = writer.write(vec![make_record("new", 2)], Placement::Top).unwrap();
        assert_eq!(again, WriteOutcome { written: 0, skipped: 1 });
        assert_eq!(store.row_count().unwrap(), 2);
    }

    #[test]
    fn test_batch_order_follows_placement() {
        let store = InMemorySheetStore::new();
        let mut writer = SinkWriter::open(&store).unwrap();

        writer
            .write(vec![make_record("b", 2), make_record("a", 1)], Placement::Bottom)
            .unwrap();
        writer
            .write(vec![make_record("c", 3), make_record("d", 4)], Placement::Top)
            .unwrap();

        let ids: Vec<String> = store
            .rows()
            .unwrap()
            .into_iter()
            .map(|r| r.message_id.to_string())
            .collect();
        assert_eq!(ids, vec!["d", "c", "a", "b"]);
    }

    #[test]
    fn test_index_matches_rows() {
        let store = InMemorySheetStore::new();
        let mut writer = SinkWriter::open(&store).unwrap();
        writer
            .write(vec![make_record("x", 1), make_record("y", 2)], Placement::Top)
            .unwrap();

        let row_ids: HashSet<MessageId> = store
            .rows()
            .unwrap()
            .into_iter()
            .map(|r| r.message_id)
            .collect();
        assert_eq!(row_ids, store.indexed_ids().unwrap());
    }
}
