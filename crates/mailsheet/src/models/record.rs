//! Normalized output record (one sheet row per message)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Folder, MessageId, ThreadId};

/// Column headers of the output sheet, in row order
pub const SHEET_HEADERS: [&str; 19] = [
    "FromName",
    "FromEmail",
    "To",
    "Cc",
    "Bcc",
    "Subject",
    "Message",
    "Links",
    "Date",
    "Direction",
    "Folder",
    "Read",
    "Labels",
    "PlainText",
    "HtmlBody",
    "URLs",
    "Attachments",
    "ThreadId",
    "MessageId",
];

/// Index of the `Date` column in [`SHEET_HEADERS`]
pub const DATE_COLUMN: usize = 8;

/// Whether the mailbox owner sent or received a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Sent,
    Received,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Sent => "Sent",
            Direction::Received => "Received",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Sent" => Some(Direction::Sent),
            "Received" => Some(Direction::Received),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadState {
    Read,
    Unread,
}

impl ReadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadState::Read => "Read",
            ReadState::Unread => "Unread",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Read" => Some(ReadState::Read),
            "Unread" => Some(ReadState::Unread),
            _ => None,
        }
    }
}

/// Metadata for one attachment, serialized into the `Attachments` column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMeta {
    pub filename: String,
    pub mime_type: String,
    /// Declared size in bytes; `null` when Gmail reports none
    pub size: Option<u64>,
    /// Opaque reference needed to fetch the attachment bytes later
    pub attachment_id: String,
}

/// One row of output
///
/// Created once per message and never updated afterwards. A later
/// observation of the same message is rejected by the dedup index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub from_name: String,
    pub from_email: String,
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    /// Display snippet (the extracted plain text)
    pub snippet: String,
    /// Extracted links, separated by blank lines
    pub links: String,
    pub date: DateTime<Utc>,
    pub direction: Direction,
    pub folder: Folder,
    pub read_state: ReadState,
    /// Comma-joined label IDs
    pub labels: String,
    pub plain_text: String,
    pub html_body: String,
    pub links_full: String,
    /// JSON array of [`AttachmentMeta`]
    pub attachments: String,
    pub thread_id: ThreadId,
    pub message_id: MessageId,
}

impl NormalizedRecord {
    /// Epoch milliseconds of the record's date, used as the sort key
    pub fn timestamp_millis(&self) -> i64 {
        self.date.timestamp_millis()
    }

    /// Render the record as sheet cells in [`SHEET_HEADERS`] order
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.from_name.clone(),
            self.from_email.clone(),
            self.to.clone(),
            self.cc.clone(),
            self.bcc.clone(),
            self.subject.clone(),
            self.snippet.clone(),
            self.links.clone(),
            self.date.to_rfc3339(),
            self.direction.as_str().to_string(),
            self.folder.as_str().to_string(),
            self.read_state.as_str().to_string(),
            self.labels.clone(),
            self.plain_text.clone(),
            self.html_body.clone(),
            self.links_full.clone(),
            self.attachments.clone(),
            self.thread_id.as_str().to_string(),
            self.message_id.as_str().to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cells_follow_headers() {
        let record = NormalizedRecord {
            from_name: "Ann".into(),
            from_email: "ann@example.com".into(),
            to: "me@example.com".into(),
            cc: String::new(),
            bcc: String::new(),
            subject: "Hi".into(),
            snippet: "Hello".into(),
            links: String::new(),
            date: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            direction: Direction::Received,
            folder: Folder::Inbox,
            read_state: ReadState::Unread,
            labels: "INBOX,UNREAD".into(),
            plain_text: "Hello".into(),
            html_body: String::new(),
            links_full: String::new(),
            attachments: "[]".into(),
            thread_id: ThreadId::new("t1"),
            message_id: MessageId::new("m1"),
        };

        let cells = record.to_cells();
        assert_eq!(cells.len(), SHEET_HEADERS.len());
        assert_eq!(SHEET_HEADERS[DATE_COLUMN], "Date");
        assert_eq!(cells[DATE_COLUMN], record.date.to_rfc3339());
        assert_eq!(cells[18], "m1");
        assert_eq!(cells[11], "Unread");
    }

    #[test]
    fn test_attachment_meta_json_shape() {
        let meta = AttachmentMeta {
            filename: "a.pdf".into(),
            mime_type: "application/pdf".into(),
            size: None,
            attachment_id: "att-1".into(),
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(
            json,
            r#"{"filename":"a.pdf","mimeType":"application/pdf","size":null,"attachmentId":"att-1"}"#
        );
    }
}
