//! Checkpointed full mailbox scan

use anyhow::{Context, Result};
use log::{info, warn};
use std::time::Instant;

use super::pipeline::fetch_records;
use super::{ExecutionBudget, SyncContext, SyncStats};
use crate::models::{MessageId, SyncCheckpoint};
use crate::storage::{CheckpointStore, Placement, SheetStore, SinkWriter};

/// Listing query for full scans (everything, spam and trash included)
const FULL_SCAN_QUERY: &str = "";

/// How a full scan treats existing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Start over from an empty sheet unless a scan is already in progress
    Rescan,
    /// Add missing messages to the existing sheet, newest on top
    ///
    /// Always starts at the first page and never stores a page cursor;
    /// indexed messages are skipped before fetching.
    Backfill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// The last page was processed; a rescan's page cursor is cleared
    Completed,
    /// The budget ran out; a rescan's page cursor points at the next page
    Paused,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub status: ScanStatus,
    pub checkpoint: SyncCheckpoint,
    pub stats: SyncStats,
}

/// Walk the whole mailbox page by page
///
/// A rescan resumes from the stored page cursor. Each page is fetched,
/// mapped and committed before its successor's token is persisted, and the
/// budget is checked after every page. A rescan that is not resuming first
/// clears rows, index and every cursor, then seeds the change-log position
/// so incremental sync picks up from the scan's start. Completion clears the
/// page cursor and sorts the sheet.
///
/// A backfill leaves the page cursor alone, so a paused backfill never turns
/// the next rescan into a resume.
pub fn full_scan(
    ctx: &SyncContext<'_>,
    checkpoint: SyncCheckpoint,
    mode: ScanMode,
) -> Result<ScanOutcome> {
    let start = Instant::now();
    let budget = ExecutionBudget::new(ctx.options.budget);
    let mut stats = SyncStats::default();
    let mut checkpoint = checkpoint;

    let fresh = mode == ScanMode::Backfill || !checkpoint.is_scan_in_progress();
    if mode == ScanMode::Rescan && fresh {
        info!("Starting full rescan from an empty sheet");
        ctx.store.clear_index()?;
        ctx.store.clear_rows()?;
        ctx.store.ensure_layout()?;
        checkpoint = SyncCheckpoint::cleared();
        ctx.store.save_checkpoint(&checkpoint)?;
    } else if !fresh {
        info!("Resuming full rescan");
    }

    if fresh && checkpoint.history_id.is_none() {
        match ctx.mailbox.get_profile() {
            Ok(profile) => {
                checkpoint = checkpoint.advance_history(profile.history_id);
                ctx.store.save_checkpoint(&checkpoint)?;
            }
            Err(e) => warn!("Could not seed change-log position: {:#}", e),
        }
    }

    let placement = match mode {
        ScanMode::Rescan => ctx.options.placement(),
        ScanMode::Backfill => Placement::Top,
    };
    let mut writer = SinkWriter::open(ctx.store)?;
    let mut page_token = match mode {
        ScanMode::Rescan => checkpoint.fullscan_page_token.clone(),
        ScanMode::Backfill => None,
    };

    let status = loop {
        let page = ctx
            .mailbox
            .list_messages(
                FULL_SCAN_QUERY,
                ctx.options.page_size,
                page_token.as_deref(),
            )
            .context("Failed to list messages")?;

        let ids = page.ids();
        let listed = ids.len();
        let unseen: Vec<String> = ids
            .into_iter()
            .filter(|id| !writer.is_indexed(&MessageId::new(id.as_str())))
            .collect();

        let fetched = fetch_records(ctx, &unseen)?;
        let outcome = writer.write(fetched.into_iter().map(|f| f.record).collect(), placement)?;

        stats.pages += 1;
        stats.messages_listed += listed;
        stats.messages_fetched += unseen.len();
        stats.messages_stored += outcome.written;
        stats.messages_skipped += listed - outcome.written;

        page_token = page.next_page_token.filter(|t| !t.is_empty());
        if mode == ScanMode::Rescan {
            checkpoint = checkpoint.with_page_token(page_token.clone());
            ctx.store.save_checkpoint(&checkpoint)?;
        }

        if page_token.is_none() {
            ctx.store.sort_rows(ctx.options.sort_order())?;
            break ScanStatus::Completed;
        }
        if budget.exceeded() {
            break ScanStatus::Paused;
        }
    };

    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Full scan {:?}: {} pages, {} listed, {} stored, {} skipped in {}ms",
        status,
        stats.pages,
        stats.messages_listed,
        stats.messages_stored,
        stats.messages_skipped,
        stats.duration_ms
    );

    Ok(ScanOutcome {
        status,
        checkpoint,
        stats,
    })
}
