//! Gmail message → sheet row normalization
//!
//! Converts a fetched Gmail message plus its extracted content into one
//! [`NormalizedRecord`].

use chrono::{TimeZone, Utc};

use super::api::{GmailMessage, MessagePart};
use crate::extract::{ExtractedContent, extract_links, truncate_chars};
use crate::models::{
    Direction, Folder, LabelId, MessageId, NormalizedRecord, ReadState, Sender, ThreadId,
};

/// Maps messages to records on behalf of one mailbox owner
#[derive(Debug, Clone)]
pub struct RowMapper {
    owner_address: String,
    max_cell_chars: usize,
}

impl RowMapper {
    /// Create a mapper
    ///
    /// # Arguments
    /// * `owner_address` - The mailbox owner's address, used to classify direction
    /// * `max_cell_chars` - Body fields are cut to this many characters
    pub fn new(owner_address: impl Into<String>, max_cell_chars: usize) -> Self {
        Self {
            owner_address: owner_address.into(),
            max_cell_chars,
        }
    }

    pub fn owner_address(&self) -> &str {
        &self.owner_address
    }

    /// Build the output record for a message
    pub fn map(&self, msg: &GmailMessage, content: &ExtractedContent) -> NormalizedRecord {
        let payload = msg.payload.as_ref();
        let header = |name: &str| payload.and_then(|p| header_value(p, name)).unwrap_or_default();

        let from_raw = header("From");
        let sender = Sender::parse(&from_raw);
        let labels = msg.labels();

        let ts = msg.internal_date_millis();
        let date = if ts > 0 {
            Utc.timestamp_millis_opt(ts).single().unwrap_or_else(Utc::now)
        } else {
            Utc::now()
        };

        let html_body = truncate_chars(&content.html, self.max_cell_chars);
        let plain_text = truncate_chars(&content.plain, self.max_cell_chars);
        let links = extract_links(&html_body, &plain_text).join("\n\n");

        let attachments =
            serde_json::to_string(&content.attachments).unwrap_or_else(|_| "[]".to_string());

        NormalizedRecord {
            direction: self.direction(&sender, &from_raw),
            from_name: sender.name,
            from_email: sender.email,
            to: header("To"),
            cc: header("Cc"),
            bcc: header("Bcc"),
            subject: header("Subject"),
            snippet: plain_text.clone(),
            links: links.clone(),
            date,
            folder: Folder::from_labels(labels),
            read_state: read_state(labels),
            labels: labels.join(","),
            plain_text,
            html_body,
            links_full: links,
            attachments,
            thread_id: ThreadId::new(&msg.thread_id),
            message_id: MessageId::new(&msg.id),
        }
    }

    /// "Sent" when the sender address contains the owner's address
    ///
    /// This is a substring test, so `bob@example.com.evil` also counts as
    /// sent by `bob@example.com`.
    fn direction(&self, sender: &Sender, from_raw: &str) -> Direction {
        if self.owner_address.is_empty() {
            return Direction::Received;
        }
        let haystack = if sender.email.is_empty() {
            from_raw
        } else {
            sender.email.as_str()
        };
        if haystack.contains(&self.owner_address) {
            Direction::Sent
        } else {
            Direction::Received
        }
    }
}

fn read_state(labels: &[String]) -> ReadState {
    if labels.iter().any(|l| l == LabelId::UNREAD) {
        ReadState::Unread
    } else {
        ReadState::Read
    }
}

/// Extract a header value by name (case-insensitive, last occurrence wins)
pub fn header_value(part: &MessagePart, name: &str) -> Option<String> {
    part.headers
        .as_ref()?
        .iter()
        .rev()
        .find(|h| h.name.trim().eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
}
