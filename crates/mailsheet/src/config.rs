//! Configuration loading
//!
//! Two kinds of configuration live in the mailsheet config directory:
//! - OAuth client credentials for the Gmail API ([`GmailCredentials`])
//! - runtime settings for the sync engine and relay ([`Settings`])

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SyncError;

/// Credentials filename in the mailsheet config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Settings filename in the mailsheet config directory
const SETTINGS_FILE: &str = "settings.json";

/// Largest page the Gmail list endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 500;

/// OAuth credentials for Gmail API access
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format (installed app)
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials using the following priority:
    /// 1. Compile-time embedded credentials
    /// 2. JSON file (~/.config/mailsheet/google-credentials.json)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Credentials embedded at build time via GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID")?;
        let client_secret = option_env!("GOOGLE_CLIENT_SECRET")?;

        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Desktop ("installed") and "web" client types share a layout
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    /// Load credentials from GMAIL_CLIENT_ID / GMAIL_CLIENT_SECRET
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}

/// Runtime settings for sync runs and the trigger listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite database holding records, index and checkpoints
    pub database_path: PathBuf,
    /// Messages listed per page (capped at [`MAX_PAGE_SIZE`])
    pub page_size: u32,
    /// Wall-clock budget for one invocation
    pub exec_budget_secs: u64,
    /// New rows go above older ones
    pub latest_on_top: bool,
    /// Window of the time-based fallback listing
    pub fallback_window_days: u32,
    /// Body cells are cut to this many characters
    pub max_cell_chars: usize,
    /// Overrides the address reported by the Gmail profile
    pub owner_address: Option<String>,
    /// Shared secret for externally triggered runs
    pub run_token: Option<String>,
    /// Address the trigger listener binds to
    pub listen_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: config::config_path("mailsheet.db")
                .unwrap_or_else(|| PathBuf::from("mailsheet.db")),
            page_size: MAX_PAGE_SIZE,
            exec_budget_secs: 330,
            latest_on_top: true,
            fallback_window_days: 7,
            max_cell_chars: 45_000,
            owner_address: None,
            run_token: None,
            listen_addr: "127.0.0.1:8787".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the config directory, then apply environment overrides
    ///
    /// A missing settings file yields the defaults.
    pub fn load() -> Result<Self> {
        let settings = if config::config_exists(SETTINGS_FILE) {
            config::load_json(SETTINGS_FILE)?
        } else {
            Self::default()
        };
        settings
            .with_overrides(|key| std::env::var(key).ok())
            .validated()
    }

    /// Apply `MAILSHEET_*` overrides from a variable lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup("MAILSHEET_DB") {
            self.database_path = PathBuf::from(db);
        }
        if let Some(token) = lookup("MAILSHEET_RUN_TOKEN") {
            self.run_token = Some(token);
        }
        if let Some(owner) = lookup("MAILSHEET_OWNER") {
            self.owner_address = Some(owner);
        }
        if let Some(addr) = lookup("MAILSHEET_LISTEN") {
            self.listen_addr = addr;
        }
        self
    }

    /// Reject unusable settings and clamp the page size
    pub fn validated(mut self) -> Result<Self> {
        if self.database_path.as_os_str().is_empty() {
            return Err(SyncError::Misconfigured("database_path is empty".into()).into());
        }
        if self.page_size == 0 {
            return Err(SyncError::Misconfigured("page_size must be positive".into()).into());
        }
        self.page_size = self.page_size.min(MAX_PAGE_SIZE);
        Ok(self)
    }

    /// Persist settings to the config directory
    pub fn save(&self) -> Result<()> {
        config::save_json(SETTINGS_FILE, self)
    }
}
