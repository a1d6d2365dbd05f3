//! Operator actions on cursors and row order

use anyhow::Result;
use log::info;

use crate::models::SyncCheckpoint;
use crate::storage::{CheckpointStore, SheetStore, SortOrder, Store};

/// Forget every cursor and the dedup index; rows stay in place
///
/// The next full scan starts from its first page and the next incremental
/// run records a fresh change-log baseline.
pub fn clear_history_and_index(store: &dyn Store) -> Result<SyncCheckpoint> {
    let checkpoint = SyncCheckpoint::cleared();
    store.clear_index()?;
    store.save_checkpoint(&checkpoint)?;
    info!("Cleared sync cursors and dedup index");
    Ok(checkpoint)
}

/// Reorder rows by timestamp
pub fn sort(store: &dyn Store, order: SortOrder) -> Result<()> {
    store.sort_rows(order)?;
    info!("Sorted {} rows {:?}", store.row_count()?, order);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::make_record;
    use crate::storage::{CheckpointStore, InMemorySheetStore, Placement, SheetStore};

    #[test]
    fn test_clear_history_and_index_keeps_rows() {
        let store = InMemorySheetStore::new();
        store.commit_batch(&[make_record("m1", 5)], Placement::Top).unwrap();
        store
            .save_checkpoint(
                &SyncCheckpoint::default()
                    .with_page_token(Some("p".into()))
                    .advance_history("9")
                    .advance_last_seen(5),
            )
            .unwrap();

        let cp = clear_history_and_index(&store).unwrap();
        assert_eq!(cp, SyncCheckpoint::default());
        assert_eq!(store.load_checkpoint().unwrap(), SyncCheckpoint::default());
        assert!(store.indexed_ids().unwrap().is_empty());
        assert_eq!(store.row_count().unwrap(), 1);
    }

    #[test]
    fn test_sort() {
        let store = InMemorySheetStore::new();
        store
            .commit_batch(&[make_record("a", 1), make_record("b", 3), make_record("c", 2)], Placement::Bottom)
            .unwrap();

        sort(&store, SortOrder::Descending).unwrap();
        let ids: Vec<String> = store.rows().unwrap().iter().map(|r| r.message_id.to_string()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }
}
