//! Incremental diff: change log first, time window as fallback

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::time::Instant;

use super::pipeline::fetch_records;
use super::{ExecutionBudget, SyncContext, SyncStats};
use crate::gmail::HistoryExpiredError;
use crate::models::{MessageId, SyncCheckpoint};
use crate::storage::{CheckpointStore, SinkWriter};

/// Which path an incremental run took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffPath {
    /// No change-log position was known; the current one was stored
    Baseline,
    /// Changes were read from the change log
    ChangeLog,
    /// The change log failed; a time-windowed listing was used instead
    Fallback,
}

#[derive(Debug, Clone)]
pub struct IncrementalOutcome {
    pub path: DiffPath,
    /// The budget ran out before every change was applied
    pub paused: bool,
    pub checkpoint: SyncCheckpoint,
    pub stats: SyncStats,
}

/// Changes collected from the change log
struct ChangeSet {
    ids: Vec<String>,
    latest_history_id: Option<String>,
}

/// Bring the sheet up to date with changes since the last run
///
/// Reads the change log from the stored position. When the change log
/// cannot be read (expired position, transport error), lists the last
/// `fallback_window_days` of mail instead, skipping messages not newer than
/// the last-seen timestamp cursor. Either way every write goes through the
/// dedup gate, so re-observed messages never produce a second row.
///
/// The budget is checked after every page written. A paused change-log run
/// keeps its old position so the next run reads the same changes again.
pub fn incremental_sync(
    ctx: &SyncContext<'_>,
    checkpoint: SyncCheckpoint,
) -> Result<IncrementalOutcome> {
    let start = Instant::now();
    let budget = ExecutionBudget::new(ctx.options.budget);

    let Some(history_id) = checkpoint.history_id.clone() else {
        let profile = ctx.mailbox.get_profile().context("Failed to fetch profile")?;
        let checkpoint = checkpoint.advance_history(profile.history_id);
        ctx.store.save_checkpoint(&checkpoint)?;
        info!(
            "Stored change-log baseline {}",
            checkpoint.history_id.as_deref().unwrap_or_default()
        );
        return Ok(IncrementalOutcome {
            path: DiffPath::Baseline,
            paused: false,
            checkpoint,
            stats: SyncStats::default(),
        });
    };

    let mut outcome = match collect_changes(ctx, &history_id) {
        Ok(changes) => apply_changes(ctx, &budget, checkpoint, changes)?,
        Err(e) => {
            if e.is::<HistoryExpiredError>() {
                warn!("Change log position {} expired, using time window", history_id);
            } else {
                warn!("Change log unavailable ({:#}), using time window", e);
            }
            fallback(ctx, &budget, checkpoint)?
        }
    };

    outcome.stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Incremental sync via {:?}{}: {} listed, {} stored, {} skipped in {}ms",
        outcome.path,
        if outcome.paused { " (paused)" } else { "" },
        outcome.stats.messages_listed,
        outcome.stats.messages_stored,
        outcome.stats.messages_skipped,
        outcome.stats.duration_ms
    );
    Ok(outcome)
}

/// Page through the change log collecting added and relabelled messages
fn collect_changes(ctx: &SyncContext<'_>, start_history_id: &str) -> Result<ChangeSet> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let mut latest_history_id = None;
    let mut page_token: Option<String> = None;

    loop {
        let page = ctx
            .mailbox
            .list_history(start_history_id, page_token.as_deref())?;

        for record in page.history.iter().flatten() {
            for id in record.changed_message_ids() {
                if seen.insert(id.to_string()) {
                    ids.push(id.to_string());
                }
            }
        }
        if page.history_id.is_some() {
            latest_history_id = page.history_id;
        }

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    debug!("Change log lists {} changed messages", ids.len());
    Ok(ChangeSet {
        ids,
        latest_history_id,
    })
}

fn apply_changes(
    ctx: &SyncContext<'_>,
    budget: &ExecutionBudget,
    checkpoint: SyncCheckpoint,
    changes: ChangeSet,
) -> Result<IncrementalOutcome> {
    let mut stats = SyncStats {
        messages_listed: changes.ids.len(),
        ..SyncStats::default()
    };
    let mut writer = SinkWriter::open(ctx.store)?;

    let unseen: Vec<String> = changes
        .ids
        .into_iter()
        .filter(|id| !writer.is_indexed(&MessageId::new(id.as_str())))
        .collect();

    let mut paused = false;
    let mut batches = unseen.chunks(ctx.options.page_size.max(1)).peekable();
    while let Some(batch) = batches.next() {
        let fetched = fetch_records(ctx, batch)?;
        let written = writer.write(
            fetched.into_iter().map(|f| f.record).collect(),
            ctx.options.placement(),
        )?;
        stats.pages += 1;
        stats.messages_fetched += batch.len();
        stats.messages_stored += written.written;

        if batches.peek().is_some() && budget.exceeded() {
            paused = true;
            break;
        }
    }
    // Already indexed, or gone before they could be fetched
    stats.messages_skipped =
        stats.messages_listed - unseen.len() + stats.messages_fetched - stats.messages_stored;

    if paused {
        return Ok(IncrementalOutcome {
            path: DiffPath::ChangeLog,
            paused,
            checkpoint,
            stats,
        });
    }

    let position = match changes.latest_history_id {
        Some(id) => id,
        None => ctx.mailbox.get_profile().context("Failed to fetch profile")?.history_id,
    };
    let checkpoint = checkpoint.advance_history(position);
    ctx.store.save_checkpoint(&checkpoint)?;

    Ok(IncrementalOutcome {
        path: DiffPath::ChangeLog,
        paused,
        checkpoint,
        stats,
    })
}

/// List recent mail by time window and ingest what is new
fn fallback(
    ctx: &SyncContext<'_>,
    budget: &ExecutionBudget,
    checkpoint: SyncCheckpoint,
) -> Result<IncrementalOutcome> {
    let query = format!("in:anywhere newer_than:{}d", ctx.options.fallback_window_days);
    let last_seen = checkpoint.last_seen_ts;
    let mut newest = last_seen;
    let mut stats = SyncStats::default();
    let mut writer = SinkWriter::open(ctx.store)?;
    let mut page_token: Option<String> = None;
    let mut paused = false;

    loop {
        let page = ctx
            .mailbox
            .list_messages(&query, ctx.options.page_size, page_token.as_deref())
            .context("Failed to list recent messages")?;

        let ids = page.ids();
        let listed = ids.len();
        let unseen: Vec<String> = ids
            .into_iter()
            .filter(|id| !writer.is_indexed(&MessageId::new(id.as_str())))
            .collect();

        let mut records = Vec::new();
        for fetched in fetch_records(ctx, &unseen)? {
            if last_seen != 0 && fetched.internal_ms <= last_seen {
                continue;
            }
            newest = newest.max(fetched.internal_ms);
            records.push(fetched.record);
        }

        let written = writer.write(records, ctx.options.placement())?;
        stats.pages += 1;
        stats.messages_listed += listed;
        stats.messages_fetched += unseen.len();
        stats.messages_stored += written.written;
        stats.messages_skipped += listed - written.written;

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
        if budget.exceeded() {
            paused = true;
            break;
        }
    }

    let mut checkpoint = checkpoint.advance_last_seen(newest);

    // Re-seed the change log so the next run can take the primary path
    match ctx.mailbox.get_profile() {
        Ok(profile) => checkpoint = checkpoint.advance_history(profile.history_id),
        Err(e) => debug!("Could not refresh change-log position: {:#}", e),
    }
    ctx.store.save_checkpoint(&checkpoint)?;

    Ok(IncrementalOutcome {
        path: DiffPath::Fallback,
        paused,
        checkpoint,
        stats,
    })
}
