//! Sync engine: full scans, incremental diffs and maintenance
//!
//! Every operation takes the current [`SyncCheckpoint`] and returns the
//! updated one. Progress is also persisted through the store as it happens,
//! so an interrupted run resumes from the last completed page.

mod fullscan;
mod incremental;
mod maintenance;
mod pipeline;
mod timing;

pub use fullscan::{ScanMode, ScanOutcome, ScanStatus, full_scan};
pub use incremental::{DiffPath, IncrementalOutcome, incremental_sync};
pub use maintenance::{clear_history_and_index, sort};
pub use timing::ExecutionBudget;

use std::time::Duration;

use crate::config::Settings;
use crate::gmail::{MailboxApi, RowMapper};
use crate::storage::{Placement, SortOrder, Store};

/// Tunables for sync runs
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Messages listed per page
    pub page_size: usize,
    /// Wall-clock allowance per invocation
    pub budget: Duration,
    /// New rows go above older ones
    pub latest_on_top: bool,
    /// Window of the time-based fallback listing
    pub fallback_window_days: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: 500,
            budget: Duration::from_secs(330),
            latest_on_top: true,
            fallback_window_days: 7,
        }
    }
}

impl SyncOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            page_size: settings.page_size as usize,
            budget: Duration::from_secs(settings.exec_budget_secs),
            latest_on_top: settings.latest_on_top,
            fallback_window_days: settings.fallback_window_days,
        }
    }

    /// Placement for newly discovered rows
    pub fn placement(&self) -> Placement {
        if self.latest_on_top {
            Placement::Top
        } else {
            Placement::Bottom
        }
    }

    /// Order restored after a completed full scan
    pub fn sort_order(&self) -> SortOrder {
        if self.latest_on_top {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }
}

/// Everything a sync operation needs
pub struct SyncContext<'a> {
    pub mailbox: &'a dyn MailboxApi,
    pub store: &'a dyn Store,
    pub mapper: RowMapper,
    pub options: SyncOptions,
}

/// Statistics from a sync operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    /// Pages of message IDs processed
    pub pages: usize,
    /// Message IDs seen in listings or the change log
    pub messages_listed: usize,
    /// Messages fetched from Gmail
    pub messages_fetched: usize,
    /// New rows written
    pub messages_stored: usize,
    /// Messages skipped (already indexed, gone, or older than the cursor)
    pub messages_skipped: usize,
    /// Duration of the operation
    pub duration_ms: u64,
}
