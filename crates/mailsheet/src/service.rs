//! High-level entry point tying mailbox, store and settings together
//!
//! Binaries and tests drive every operation through [`MailsheetService`].

use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::{Arc, OnceLock};

use crate::config::Settings;
use crate::gmail::api::ProfileResponse;
use crate::gmail::{MailboxApi, RowMapper};
use crate::models::SyncCheckpoint;
use crate::storage::{CheckpointStore, SheetStore, SortOrder, Store};
use crate::sync::{
    self, IncrementalOutcome, ScanMode, ScanOutcome, SyncContext, SyncOptions,
};
use crate::trigger::{self, Action, ActionRunner, TriggerRequest, TriggerResponse};

/// Sync operations over one mailbox and one store
pub struct MailsheetService {
    mailbox: Arc<dyn MailboxApi>,
    store: Arc<dyn Store>,
    settings: Settings,
    owner: OnceLock<String>,
}

impl MailsheetService {
    pub fn new(mailbox: Arc<dyn MailboxApi>, store: Arc<dyn Store>, settings: Settings) -> Self {
        Self {
            mailbox,
            store,
            settings,
            owner: OnceLock::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// The configured owner address, or the profile's address
    pub fn owner_address(&self) -> Result<String> {
        if let Some(owner) = self.owner.get() {
            return Ok(owner.clone());
        }
        let owner = match self.settings.owner_address.as_deref() {
            Some(owner) if !owner.is_empty() => owner.to_string(),
            _ => {
                self.mailbox
                    .get_profile()
                    .context("Failed to fetch profile for owner address")?
                    .email_address
            }
        };
        Ok(self.owner.get_or_init(|| owner).clone())
    }

    fn context(&self) -> Result<SyncContext<'_>> {
        Ok(SyncContext {
            mailbox: self.mailbox.as_ref(),
            store: self.store.as_ref(),
            mapper: RowMapper::new(self.owner_address()?, self.settings.max_cell_chars),
            options: SyncOptions::from_settings(&self.settings),
        })
    }

    fn checkpoint(&self) -> Result<SyncCheckpoint> {
        self.store.load_checkpoint().context("Failed to load checkpoint")
    }

    /// Rebuild the sheet from scratch, resuming a paused rescan if one exists
    pub fn full_rescan(&self) -> Result<ScanOutcome> {
        let ctx = self.context()?;
        sync::full_scan(&ctx, self.checkpoint()?, ScanMode::Rescan)
    }

    /// Add missing messages without clearing anything
    pub fn backfill(&self) -> Result<ScanOutcome> {
        let ctx = self.context()?;
        sync::full_scan(&ctx, self.checkpoint()?, ScanMode::Backfill)
    }

    pub fn incremental(&self) -> Result<IncrementalOutcome> {
        let ctx = self.context()?;
        sync::incremental_sync(&ctx, self.checkpoint()?)
    }

    pub fn clear_history_and_index(&self) -> Result<SyncCheckpoint> {
        sync::clear_history_and_index(self.store.as_ref())
    }

    pub fn sort(&self, order: SortOrder) -> Result<()> {
        sync::sort(self.store.as_ref(), order)
    }

    /// Prepare the sheet, store the run token and start a backfill
    pub fn setup(&self) -> Result<ScanOutcome> {
        self.store.ensure_layout()?;
        match self.settings.run_token.as_deref() {
            Some(token) if !token.is_empty() => self.store.set_run_token(token)?,
            _ => warn!("No run token configured; triggers will be refused"),
        }
        self.backfill()
    }

    /// Confirm mailbox access and report where the change log stands
    pub fn authorize(&self) -> Result<ProfileResponse> {
        let profile = self.mailbox.get_profile().context("Failed to fetch profile")?;
        info!(
            "Authorized as {} (change log at {}, {} messages)",
            profile.email_address,
            profile.history_id,
            profile.messages_total.unwrap_or(0)
        );
        Ok(profile)
    }

    /// Secret that triggers must present (stored token first, then settings)
    pub fn run_token(&self) -> Result<Option<String>> {
        let stored = self.store.run_token()?.filter(|t| !t.is_empty());
        Ok(stored.or_else(|| self.settings.run_token.clone()))
    }

    pub fn handle_trigger(&self, request: &TriggerRequest) -> TriggerResponse {
        let secret = match self.run_token() {
            Ok(secret) => secret,
            Err(e) => {
                warn!("Could not read run token: {:#}", e);
                None
            }
        };
        trigger::handle(request, secret.as_deref(), self)
    }
}

impl ActionRunner for MailsheetService {
    fn run(&self, action: Action) -> Result<()> {
        match action {
            Action::FullRescan => self.full_rescan().map(|_| ()),
            Action::Backfill => self.backfill().map(|_| ()),
            Action::Incremental => self.incremental().map(|_| ()),
            Action::Ping => Ok(()),
        }
    }
}
