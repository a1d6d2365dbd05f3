//! Storage trait definitions

use anyhow::Result;
use std::collections::HashSet;

use crate::models::{MessageId, NormalizedRecord, SHEET_HEADERS, SyncCheckpoint};

/// Where a batch of rows lands relative to the existing rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Directly below the header row, above every existing row
    Top,
    /// After the last existing row
    Bottom,
}

/// Row order by record timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortOrder::Ascending),
            "desc" | "descending" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

/// Header row presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub headers: Vec<String>,
    /// Rows kept visible while scrolling (the header)
    pub frozen_rows: u32,
    /// A filter spans the whole data range
    pub filter: bool,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            headers: SHEET_HEADERS.iter().map(|h| h.to_string()).collect(),
            frozen_rows: 1,
            filter: true,
        }
    }
}

/// The tabular output store together with its dedup index
///
/// Rows and index entries are only ever added together through
/// [`SheetStore::commit_batch`], so a message ID is indexed exactly when a
/// row for it exists (until the index is cleared on purpose).
pub trait SheetStore: Send + Sync {
    /// Create or repair the header row, frozen header and filter
    fn ensure_layout(&self) -> Result<SheetLayout>;

    /// Current layout, if one was ever created
    fn layout(&self) -> Result<Option<SheetLayout>>;

    /// Write rows at `placement` (in slice order) and index their message IDs
    ///
    /// Both effects happen together or not at all.
    fn commit_batch(&self, records: &[NormalizedRecord], placement: Placement) -> Result<()>;

    /// Every message ID in the dedup index
    fn indexed_ids(&self) -> Result<HashSet<MessageId>>;

    /// All rows in display order
    fn rows(&self) -> Result<Vec<NormalizedRecord>>;

    fn row_count(&self) -> Result<usize>;

    /// Delete every row below the header
    fn clear_rows(&self) -> Result<()>;

    /// Forget every indexed message ID
    fn clear_index(&self) -> Result<()>;

    /// Reorder rows by timestamp; rows with equal timestamps keep their order
    fn sort_rows(&self, order: SortOrder) -> Result<()>;
}

/// Cursors and secrets that survive between invocations
pub trait CheckpointStore: Send + Sync {
    fn load_checkpoint(&self) -> Result<SyncCheckpoint>;

    fn save_checkpoint(&self, checkpoint: &SyncCheckpoint) -> Result<()>;

    /// Shared secret for triggered runs
    fn run_token(&self) -> Result<Option<String>>;

    fn set_run_token(&self, token: &str) -> Result<()>;
}

/// A backend providing both the sheet and its checkpoints
pub trait Store: SheetStore + CheckpointStore {}

impl<T: SheetStore + CheckpointStore> Store for T {}
