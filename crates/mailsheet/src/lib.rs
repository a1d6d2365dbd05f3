//! Mailsheet - Gmail to tabular ledger sync
//!
//! This crate turns a Gmail mailbox into one normalized row per message:
//! - Gmail API client and OAuth authentication
//! - Content extraction (MIME walk, HTML to text, attachments, links)
//! - Row mapping (direction, folder, read state)
//! - Sheet storage with a dedup index, in memory or in SQLite
//! - Resumable full scans and change-log based incremental sync
//! - Token-checked trigger handling
//!
//! Every ingestion path writes through the dedup index, so repeated or
//! overlapping runs never produce a second row for a message.

pub mod config;
pub mod error;
pub mod extract;
pub mod gmail;
pub mod models;
pub mod service;
pub mod storage;
pub mod sync;
pub mod trigger;

pub use config::{GmailCredentials, Settings};
pub use error::SyncError;
pub use extract::{ContentExtractor, ExtractedContent};
pub use gmail::{
    GmailAuth, GmailClient, HistoryExpiredError, MailboxApi, MessageGoneError, RenderedBody,
    RowMapper, api::ProfileResponse,
};
pub use models::{
    Direction, Folder, LabelId, MessageId, NormalizedRecord, ReadState, SHEET_HEADERS,
    SyncCheckpoint, ThreadId,
};
pub use service::MailsheetService;
pub use storage::{
    CheckpointStore, DedupIndex, InMemorySheetStore, Placement, SheetLayout, SheetStore,
    SinkWriter, SortOrder, SqliteSheetStore, Store,
};
pub use sync::{
    DiffPath, ExecutionBudget, IncrementalOutcome, ScanMode, ScanOutcome, ScanStatus,
    SyncContext, SyncOptions, SyncStats, clear_history_and_index, full_scan, incremental_sync,
    sort,
};
pub use trigger::{Action, ActionRunner, TriggerRequest, TriggerResponse};
