//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 authentication flow
//! - The [`MailboxApi`] seam used by the sync engine, and its Gmail client
//! - Response normalization to output records

mod auth;
mod client;
mod mailbox;
mod normalize;
mod raw;

pub use auth::GmailAuth;
pub use client::{GmailClient, HistoryExpiredError, MessageGoneError};
pub use mailbox::{MailboxApi, RenderedBody};
pub use normalize::{RowMapper, header_value};
pub use raw::parse_rendered_body;

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Default, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    impl ListMessagesResponse {
        /// IDs of the listed messages, in listing order
        pub fn ids(&self) -> Vec<String> {
            self.messages
                .iter()
                .flatten()
                .map(|m| m.id.clone())
                .collect()
        }
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        #[serde(default)]
        pub thread_id: String,
    }

    /// Full message from Gmail API
    #[derive(Debug, Clone, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        #[serde(default)]
        pub thread_id: String,
        pub label_ids: Option<Vec<String>>,
        #[serde(default)]
        pub snippet: String,
        /// Epoch milliseconds, encoded as a string by the API
        #[serde(default)]
        pub internal_date: String,
        pub history_id: Option<String>,
        pub payload: Option<MessagePart>,
    }

    impl GmailMessage {
        /// Internal date in epoch milliseconds (0 when missing or malformed)
        pub fn internal_date_millis(&self) -> i64 {
            self.internal_date.parse().unwrap_or(0)
        }

        pub fn labels(&self) -> &[String] {
            self.label_ids.as_deref().unwrap_or_default()
        }
    }

    /// Email header (name-value pair)
    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        #[serde(default)]
        pub value: String,
    }

    /// Body of a part: inline data, or a reference to attachment storage
    #[derive(Debug, Clone, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PartBody {
        pub size: Option<u64>,
        pub data: Option<String>,
        pub attachment_id: Option<String>,
    }

    /// A node of the message content tree (the payload is the root part)
    #[derive(Debug, Clone, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub part_id: Option<String>,
        pub mime_type: Option<String>,
        pub filename: Option<String>,
        pub headers: Option<Vec<Header>>,
        pub body: Option<PartBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    impl MessagePart {
        pub fn children(&self) -> &[MessagePart] {
            self.parts.as_deref().unwrap_or_default()
        }
    }

    /// Attachment bytes returned by `messages.attachments.get`
    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct AttachmentResponse {
        pub size: Option<u64>,
        pub data: Option<String>,
    }

    /// Raw RFC 822 message returned by `messages.get?format=raw`
    #[derive(Debug, Deserialize)]
    pub struct RawMessageResponse {
        pub raw: Option<String>,
    }

    /// Response from `users.getProfile`
    #[derive(Debug, Clone, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProfileResponse {
        pub email_address: String,
        pub messages_total: Option<u64>,
        pub threads_total: Option<u64>,
        pub history_id: String,
    }

    /// Response from `users.history.list`
    #[derive(Debug, Clone, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryResponse {
        pub history: Option<Vec<HistoryRecord>>,
        pub next_page_token: Option<String>,
        pub history_id: Option<String>,
    }

    /// One change-log entry
    #[derive(Debug, Clone, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryRecord {
        pub id: String,
        pub messages_added: Option<Vec<HistoryMessage>>,
        pub labels_added: Option<Vec<HistoryMessage>>,
        pub messages_deleted: Option<Vec<HistoryMessage>>,
        pub labels_removed: Option<Vec<HistoryMessage>>,
    }

    impl HistoryRecord {
        /// IDs of messages that were added or gained a label
        pub fn changed_message_ids(&self) -> impl Iterator<Item = &str> {
            self.messages_added
                .iter()
                .flatten()
                .chain(self.labels_added.iter().flatten())
                .map(|e| e.message.id.as_str())
        }
    }

    /// Message wrapper used by history events
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryMessage {
        pub message: MessageRef,
        pub label_ids: Option<Vec<String>>,
    }
}
