//! Gmail API HTTP client
//!
//! Implements [`MailboxApi`] against the Gmail REST API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use base64::prelude::*;
use log::debug;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::api::{
    AttachmentResponse, GmailMessage, HistoryResponse, ListMessagesResponse, ProfileResponse,
    RawMessageResponse,
};
use super::mailbox::{MailboxApi, RenderedBody};
use super::raw::parse_rendered_body;
use super::GmailAuth;

/// Error indicating the history ID has expired
#[derive(Debug, thiserror::Error)]
#[error("History ID expired or invalid")]
pub struct HistoryExpiredError;

/// Error indicating a listed message no longer exists
#[derive(Debug, thiserror::Error)]
#[error("Message {0} not found")]
pub struct MessageGoneError(pub String);

/// Gmail API client
pub struct GmailClient {
    auth: GmailAuth,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Largest page the list endpoints accept
    pub const MAX_PAGE_SIZE: usize = 500;

    /// Change-log event types collected by incremental sync
    const HISTORY_TYPES: [&'static str; 4] =
        ["messageAdded", "labelAdded", "messageDeleted", "labelRemoved"];

    /// Create a new Gmail client
    pub fn new(auth: GmailAuth) -> Self {
        Self { auth }
    }

    /// Trigger authentication flow
    pub fn authenticate(&self) -> Result<()> {
        self.auth.get_access_token()?;
        Ok(())
    }

    /// Check if the client is authenticated
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// GET a Gmail endpoint and decode the JSON response
    fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let access_token = self.auth.get_access_token()?;

        let mut response = ureq::get(url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .with_context(|| format!("Failed to send {} request", what))?;

        response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse {} response", what))
    }

    /// Get a message with exponential backoff retry
    fn get_message_with_retry(&self, id: &str, max_retries: u32) -> Result<GmailMessage> {
        let url = format!("{}/users/me/messages/{}?format=full", Self::BASE_URL, id);
        let mut delay = Duration::from_millis(100);
        let mut attempt = 0;

        loop {
            match self.get_json(&url, "get message") {
                Ok(msg) => return Ok(msg),
                Err(e) if is_not_found(&e) => return Err(MessageGoneError(id.to_string()).into()),
                Err(e) if attempt + 1 >= max_retries => return Err(e),
                Err(e) => {
                    debug!("get message {} failed (attempt {}): {:#}", id, attempt + 1, e);
                    let jitter = Duration::from_millis(rand_jitter());
                    std::thread::sleep(delay + jitter);
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }
}

impl MailboxApi for GmailClient {
    fn list_messages(
        &self,
        query: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let mut url = format!(
            "{}/users/me/messages?q={}&includeSpamTrash=true&maxResults={}&fields={}",
            Self::BASE_URL,
            urlencoding::encode(query),
            page_size.clamp(1, Self::MAX_PAGE_SIZE),
            urlencoding::encode("nextPageToken,resultSizeEstimate,messages/id"),
        );

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        self.get_json(&url, "list messages")
    }

    fn get_message(&self, id: &str) -> Result<GmailMessage> {
        self.get_message_with_retry(id, 3)
    }

    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<String> {
        let url = format!(
            "{}/users/me/messages/{}/attachments/{}",
            Self::BASE_URL,
            message_id,
            attachment_id
        );

        let attachment: AttachmentResponse = self.get_json(&url, "get attachment")?;
        Ok(attachment.data.unwrap_or_default())
    }

    /// List history since a given historyId
    ///
    /// # Errors
    /// Returns `HistoryExpiredError` if the history ID is too old (404 from Gmail)
    fn list_history(
        &self,
        start_history_id: &str,
        page_token: Option<&str>,
    ) -> Result<HistoryResponse> {
        let access_token = self.auth.get_access_token()?;

        let mut url = format!(
            "{}/users/me/history?startHistoryId={}&maxResults={}",
            Self::BASE_URL,
            urlencoding::encode(start_history_id),
            Self::MAX_PAGE_SIZE
        );
        for history_type in Self::HISTORY_TYPES {
            url.push_str(&format!("&historyTypes={}", history_type));
        }

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call();

        match response {
            Ok(mut resp) => {
                let history: HistoryResponse = resp
                    .body_mut()
                    .read_json()
                    .context("Failed to parse history response")?;
                Ok(history)
            }
            Err(ureq::Error::StatusCode(404)) => Err(HistoryExpiredError.into()),
            Err(e) => Err(anyhow::anyhow!("Failed to fetch history: {}", e)),
        }
    }

    fn get_profile(&self) -> Result<ProfileResponse> {
        let url = format!("{}/users/me/profile", Self::BASE_URL);
        self.get_json(&url, "get profile")
    }

    fn rendered_body(&self, id: &str) -> Result<RenderedBody> {
        let url = format!("{}/users/me/messages/{}?format=raw", Self::BASE_URL, id);
        let raw: RawMessageResponse = self.get_json(&url, "get raw message")?;

        let Some(encoded) = raw.raw else {
            return Ok(RenderedBody::default());
        };

        let bytes = BASE64_URL_SAFE_NO_PAD
            .decode(encoded.trim_end_matches('='))
            .context("Failed to decode raw message")?;
        parse_rendered_body(&bytes)
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<ureq::Error>(), Some(ureq::Error::StatusCode(404)))
}

/// Generate a random jitter value (0-100ms)
fn rand_jitter() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    hasher.finish() % 100
}
