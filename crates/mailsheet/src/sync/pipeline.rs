//! Fetch → extract → map for one batch of message IDs

use anyhow::Result;
use log::warn;
use rayon::prelude::*;

use super::SyncContext;
use crate::extract::ContentExtractor;
use crate::gmail::MessageGoneError;
use crate::models::NormalizedRecord;

/// A mapped message with its raw internal timestamp (0 when unknown)
pub(crate) struct FetchedRecord {
    pub internal_ms: i64,
    pub record: NormalizedRecord,
}

/// Fetch and map messages, keeping the order of `ids`
///
/// Fetches run in parallel. Messages deleted since they were listed are
/// dropped; any other failure aborts the batch.
pub(crate) fn fetch_records(ctx: &SyncContext<'_>, ids: &[String]) -> Result<Vec<FetchedRecord>> {
    let fetched: Vec<Option<FetchedRecord>> = ids
        .par_iter()
        .map(|id| {
            let msg = match ctx.mailbox.get_message(id) {
                Ok(msg) => msg,
                Err(e) if e.is::<MessageGoneError>() => {
                    warn!("Skipping {}: {}", id, e);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            let content = ContentExtractor::new(ctx.mailbox).extract(&msg);
            Ok(Some(FetchedRecord {
                internal_ms: msg.internal_date_millis(),
                record: ctx.mapper.map(&msg, &content),
            }))
        })
        .collect::<Result<_>>()?;

    Ok(fetched.into_iter().flatten().collect())
}
