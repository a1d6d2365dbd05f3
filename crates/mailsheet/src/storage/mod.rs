//! Storage traits and implementations
//!
//! The sheet (rows, header layout, dedup index) and the checkpoint store are
//! separate traits so sync code states which one it touches. Both backends
//! implement both.

mod dedup;
mod memory;
mod sqlite;
mod traits;

pub use dedup::{DedupIndex, SinkWriter, WriteOutcome};
pub use memory::InMemorySheetStore;
pub use sqlite::SqliteSheetStore;
pub use traits::{CheckpointStore, Placement, SheetLayout, SheetStore, SortOrder, Store};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{TimeZone, Utc};

    use crate::models::{Direction, Folder, MessageId, NormalizedRecord, ReadState, ThreadId};

    pub fn make_record(id: &str, ts: i64) -> NormalizedRecord {
        NormalizedRecord {
            from_name: "Ann".into(),
            from_email: "ann@example.com".into(),
            to: "me@example.com".into(),
            cc: String::new(),
            bcc: String::new(),
            subject: format!("Subject {}", id),
            snippet: format!("Body of {}", id),
            links: String::new(),
            date: Utc.timestamp_millis_opt(ts).unwrap(),
            direction: Direction::Received,
            folder: Folder::Inbox,
            read_state: ReadState::Unread,
            labels: "INBOX,UNREAD".into(),
            plain_text: format!("Body of {}", id),
            html_body: String::new(),
            links_full: String::new(),
            attachments: "[]".into(),
            thread_id: ThreadId::new(format!("t-{}", id)),
            message_id: MessageId::new(id),
        }
    }
}
