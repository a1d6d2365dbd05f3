//! Gmail label IDs and folder classification

use serde::{Deserialize, Serialize};

/// Well-known Gmail system label IDs
pub struct LabelId;

impl LabelId {
    pub const INBOX: &'static str = "INBOX";
    pub const SENT: &'static str = "SENT";
    pub const DRAFT: &'static str = "DRAFT";
    pub const TRASH: &'static str = "TRASH";
    pub const SPAM: &'static str = "SPAM";
    pub const UNREAD: &'static str = "UNREAD";
    pub const CATEGORY_PROMOTIONS: &'static str = "CATEGORY_PROMOTIONS";
    pub const CATEGORY_SOCIAL: &'static str = "CATEGORY_SOCIAL";
    pub const CATEGORY_FORUMS: &'static str = "CATEGORY_FORUMS";
    pub const CATEGORY_UPDATES: &'static str = "CATEGORY_UPDATES";
}

/// Folder a message is filed under in the output sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Folder {
    Spam,
    Trash,
    Sent,
    Draft,
    Promotions,
    Social,
    Forums,
    Inbox,
    Other,
}

/// Classification order: the first folder whose labels are present wins
const FOLDER_PRIORITY: &[(Folder, &[&str])] = &[
    (Folder::Spam, &[LabelId::SPAM]),
    (Folder::Trash, &[LabelId::TRASH]),
    (Folder::Sent, &[LabelId::SENT]),
    (Folder::Draft, &[LabelId::DRAFT]),
    (Folder::Promotions, &[LabelId::CATEGORY_PROMOTIONS]),
    (Folder::Social, &[LabelId::CATEGORY_SOCIAL]),
    (Folder::Forums, &[LabelId::CATEGORY_FORUMS]),
    // Updates is shown as part of the inbox
    (Folder::Inbox, &[LabelId::INBOX, LabelId::CATEGORY_UPDATES]),
];

impl Folder {
    /// Classify a message by its label IDs
    pub fn from_labels(label_ids: &[String]) -> Self {
        FOLDER_PRIORITY
            .iter()
            .find(|(_, wanted)| label_ids.iter().any(|l| wanted.contains(&l.as_str())))
            .map(|(folder, _)| *folder)
            .unwrap_or(Folder::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Folder::Spam => "Spam",
            Folder::Trash => "Trash",
            Folder::Sent => "Sent",
            Folder::Draft => "Draft",
            Folder::Promotions => "Promotions",
            Folder::Social => "Social",
            Folder::Forums => "Forums",
            Folder::Inbox => "Inbox",
            Folder::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        FOLDER_PRIORITY
            .iter()
            .map(|(folder, _)| *folder)
            .chain(std::iter::once(Folder::Other))
            .find(|f| f.as_str() == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_spam_beats_inbox() {
        assert_eq!(Folder::from_labels(&labels(&["INBOX", "SPAM"])), Folder::Spam);
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(Folder::from_labels(&labels(&["SENT", "TRASH"])), Folder::Trash);
        assert_eq!(Folder::from_labels(&labels(&["DRAFT", "SENT"])), Folder::Sent);
        assert_eq!(
            Folder::from_labels(&labels(&["INBOX", "CATEGORY_SOCIAL", "CATEGORY_PROMOTIONS"])),
            Folder::Promotions
        );
        assert_eq!(
            Folder::from_labels(&labels(&["INBOX", "CATEGORY_FORUMS"])),
            Folder::Forums
        );
    }

    #[test]
    fn test_updates_is_inbox() {
        assert_eq!(
            Folder::from_labels(&labels(&["CATEGORY_UPDATES"])),
            Folder::Inbox
        );
    }

    #[test]
    fn test_other() {
        assert_eq!(Folder::from_labels(&[]), Folder::Other);
        assert_eq!(Folder::from_labels(&labels(&["Label_42", "UNREAD"])), Folder::Other);
    }

    #[test]
    fn test_parse_roundtrips_names() {
        assert_eq!(Folder::parse("Spam"), Some(Folder::Spam));
        assert_eq!(Folder::parse("Other"), Some(Folder::Other));
        assert_eq!(Folder::parse("Updates"), None);
    }
}
