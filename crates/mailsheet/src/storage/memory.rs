//! In-memory storage implementation
//!
//! Used by tests and dry runs; nothing survives the process.

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::traits::{CheckpointStore, Placement, SheetLayout, SheetStore, SortOrder};
use crate::models::{MessageId, NormalizedRecord, SyncCheckpoint};

/// In-memory implementation of [`SheetStore`] and [`CheckpointStore`]
///
/// Each piece of state sits behind its own RwLock.
#[derive(Default)]
pub struct InMemorySheetStore {
    layout: RwLock<Option<SheetLayout>>,
    rows: RwLock<Vec<NormalizedRecord>>,
    index: RwLock<HashSet<MessageId>>,
    properties: RwLock<HashMap<String, String>>,
    checkpoint: RwLock<SyncCheckpoint>,
}

impl InMemorySheetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SheetStore for InMemorySheetStore {
    fn ensure_layout(&self) -> Result<SheetLayout> {
        let mut layout = self.layout.write().unwrap();
        let fixed = SheetLayout::default();
        *layout = Some(fixed.clone());
        Ok(fixed)
    }

    fn layout(&self) -> Result<Option<SheetLayout>> {
        Ok(self.layout.read().unwrap().clone())
    }

    fn commit_batch(&self, records: &[NormalizedRecord], placement: Placement) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        // Lock order: rows, then index
        let mut rows = self.rows.write().unwrap();
        let mut index = self.index.write().unwrap();

        match placement {
            Placement::Top => {
                rows.splice(0..0, records.iter().cloned());
            }
            Placement::Bottom => rows.extend(records.iter().cloned()),
        }
        index.extend(records.iter().map(|r| r.message_id.clone()));
        Ok(())
    }

    fn indexed_ids(&self) -> Result<HashSet<MessageId>> {
        Ok(self.index.read().unwrap().clone())
    }

    fn rows(&self) -> Result<Vec<NormalizedRecord>> {
        Ok(self.rows.read().unwrap().clone())
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.rows.read().unwrap().len())
    }

    fn clear_rows(&self) -> Result<()> {
        self.rows.write().unwrap().clear();
        Ok(())
    }

    fn clear_index(&self) -> Result<()> {
        self.index.write().unwrap().clear();
        Ok(())
    }

    fn sort_rows(&self, order: SortOrder) -> Result<()> {
        let mut rows = self.rows.write().unwrap();
        match order {
            SortOrder::Ascending => rows.sort_by_key(|r| r.timestamp_millis()),
            SortOrder::Descending => rows.sort_by_key(|r| std::cmp::Reverse(r.timestamp_millis())),
        }
        Ok(())
    }
}

impl CheckpointStore for InMemorySheetStore {
    fn load_checkpoint(&self) -> Result<SyncCheckpoint> {
        Ok(self.checkpoint.read().unwrap().clone())
    }

    fn save_checkpoint(&self, checkpoint: &SyncCheckpoint) -> Result<()> {
        *self.checkpoint.write().unwrap() = checkpoint.clone();
        Ok(())
    }

    fn run_token(&self) -> Result<Option<String>> {
        Ok(self.properties.read().unwrap().get(RUN_TOKEN_KEY).cloned())
    }

    fn set_run_token(&self, token: &str) -> Result<()> {
        self.properties
            .write()
            .unwrap()
            .insert(RUN_TOKEN_KEY.to_string(), token.to_string());
        Ok(())
    }
}

const RUN_TOKEN_KEY: &str = "run_token";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::make_record;

    fn ids(rows: &[NormalizedRecord]) -> Vec<&str> {
        rows.iter().map(|r| r.message_id.as_str()).collect()
    }

    #[test]
    fn test_commit_batch_indexes_ids() {
        let store = InMemorySheetStore::new();
        store
            .commit_batch(&[make_record("m1", 10), make_record("m2", 20)], Placement::Bottom)
            .unwrap();

        assert_eq!(store.row_count().unwrap(), 2);
        let indexed = store.indexed_ids().unwrap();
        assert!(indexed.contains(&MessageId::new("m1")));
        assert!(indexed.contains(&MessageId::new("m2")));
    }

    #[test]
    fn test_placement() {
        let store = InMemorySheetStore::new();
        store
            .commit_batch(&[make_record("a", 1), make_record("b", 2)], Placement::Bottom)
            .unwrap();
        store
            .commit_batch(&[make_record("d", 4), make_record("c", 3)], Placement::Top)
            .unwrap();
        store.commit_batch(&[make_record("e", 5)], Placement::Bottom).unwrap();

        assert_eq!(ids(&store.rows().unwrap()), vec!["d", "c", "a", "b", "e"]);
    }

    #[test]
    fn test_sort_rows_is_stable() {
        let store = InMemorySheetStore::new();
        store
            .commit_batch(
                &[make_record("x", 5), make_record("y", 1), make_record("z", 5)],
                Placement::Bottom,
            )
            .unwrap();

        store.sort_rows(SortOrder::Ascending).unwrap();
        assert_eq!(ids(&store.rows().unwrap()), vec!["y", "x", "z"]);

        store.sort_rows(SortOrder::Descending).unwrap();
        assert_eq!(ids(&store.rows().unwrap()), vec!["x", "z", "y"]);
    }

    #[test]
    fn test_clear_rows_keeps_index() {
        let store = InMemorySheetStore::new();
        store.commit_batch(&[make_record("m1", 1)], Placement::Top).unwrap();

        store.clear_rows().unwrap();
        assert_eq!(store.row_count().unwrap(), 0);
        assert_eq!(store.indexed_ids().unwrap().len(), 1);

        store.clear_index().unwrap();
        assert!(store.indexed_ids().unwrap().is_empty());
    }

    #[test]
    fn test_checkpoint_and_token() {
        let store = InMemorySheetStore::new();
        assert_eq!(store.load_checkpoint().unwrap(), SyncCheckpoint::default());
        assert_eq!(store.run_token().unwrap(), None);

        let cp = SyncCheckpoint::default()
            .with_page_token(Some("p2".into()))
            .advance_last_seen(42);
        store.save_checkpoint(&cp).unwrap();
        store.set_run_token("secret").unwrap();

        assert_eq!(store.load_checkpoint().unwrap(), cp);
        assert_eq!(store.run_token().unwrap().as_deref(), Some("secret"));
    }

    #[test]
    fn test_layout() {
        let store = InMemorySheetStore::new();
        assert_eq!(store.layout().unwrap(), None);

        let layout = store.ensure_layout().unwrap();
        assert_eq!(layout.headers.len(), 19);
        assert_eq!(layout.headers[0], "FromName");
        assert_eq!(layout.frozen_rows, 1);
        assert!(layout.filter);
        assert_eq!(store.layout().unwrap(), Some(layout));
    }
}
