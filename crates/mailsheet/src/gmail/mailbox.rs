//! Remote mailbox seam
//!
//! The sync engine talks to the mailbox only through [`MailboxApi`], so it
//! can run against Gmail or a scripted mailbox in tests.

use anyhow::Result;

use super::api::{GmailMessage, HistoryResponse, ListMessagesResponse, ProfileResponse};

/// Pre-rendered bodies of a message, used when the content tree walk finds none
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedBody {
    pub html: String,
    pub plain: String,
}

/// Operations the sync engine needs from the remote mailbox
pub trait MailboxApi: Send + Sync {
    /// List one page of message IDs matching `query` (spam and trash included)
    fn list_messages(
        &self,
        query: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse>;

    /// Fetch a message in `full` format
    fn get_message(&self, id: &str) -> Result<GmailMessage>;

    /// Fetch attachment data; returns the URL-safe base64 payload
    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<String>;

    /// List one page of the change log since `start_history_id`
    ///
    /// Fails with [`super::HistoryExpiredError`] when the position is too old.
    fn list_history(
        &self,
        start_history_id: &str,
        page_token: Option<&str>,
    ) -> Result<HistoryResponse>;

    /// Fetch the mailbox profile (address and current change-log position)
    fn get_profile(&self) -> Result<ProfileResponse>;

    /// Fetch a pre-rendered HTML and plain body for a message
    fn rendered_body(&self, id: &str) -> Result<RenderedBody>;
}
