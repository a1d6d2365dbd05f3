//! Domain models for mailbox ledger entities

mod label;
mod message;
mod record;
mod sync_state;

pub use label::{Folder, LabelId};
pub use message::{MessageId, Sender, ThreadId};
pub use record::{
    AttachmentMeta, DATE_COLUMN, Direction, NormalizedRecord, ReadState, SHEET_HEADERS,
};
pub use sync_state::SyncCheckpoint;
