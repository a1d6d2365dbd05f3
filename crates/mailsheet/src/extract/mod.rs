//! Message content extraction
//!
//! Recovers readable bodies from a Gmail content tree:
//! - plain-text and HTML bodies (inline or stored as attachments)
//! - a synthetic plain-text view when only HTML is usable
//! - attachment metadata
//! - outbound links, with redirect wrappers unwrapped

mod attachments;
mod body;
mod html;
mod links;

pub use attachments::collect_attachments;
pub use body::{decode_base64url, find_text_part};
pub use html::{decode_html_entities, html_to_text};
pub use links::{extract_links, unwrap_redirect};

use log::debug;

use crate::gmail::MailboxApi;
use crate::gmail::api::GmailMessage;
use crate::models::AttachmentMeta;

/// Parts nested deeper than this are not visited
pub const MAX_PART_DEPTH: usize = 64;

/// Plain text shorter than this is replaced by the HTML rendering
pub const MIN_PLAIN_CHARS: usize = 120;

/// Best-effort bodies and attachments of one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub plain: String,
    pub html: String,
    pub attachments: Vec<AttachmentMeta>,
}

/// Extracts content, fetching out-of-band data through the mailbox
pub struct ContentExtractor<'a> {
    api: &'a dyn MailboxApi,
}

impl<'a> ContentExtractor<'a> {
    pub fn new(api: &'a dyn MailboxApi) -> Self {
        Self { api }
    }

    /// Extract bodies and attachment metadata from a fetched message
    ///
    /// Never fails: unreadable parts degrade to empty strings.
    pub fn extract(&self, msg: &GmailMessage) -> ExtractedContent {
        let Some(payload) = msg.payload.as_ref() else {
            return ExtractedContent::default();
        };

        let fetch = |attachment_id: &str| match self.api.get_attachment(&msg.id, attachment_id) {
            Ok(data) => decode_base64url(&data),
            Err(e) => {
                debug!("Attachment body {} of {} unavailable: {:#}", attachment_id, msg.id, e);
                String::new()
            }
        };

        let mut html = find_text_part(payload, "text/html", &fetch);
        let mut plain = find_text_part(payload, "text/plain", &fetch);

        if html.is_empty() || plain.is_empty() {
            match self.api.rendered_body(&msg.id) {
                Ok(rendered) => {
                    if html.is_empty() {
                        html = rendered.html;
                    }
                    if plain.is_empty() {
                        plain = rendered.plain;
                    }
                }
                Err(e) => debug!("Rendered body of {} unavailable: {:#}", msg.id, e),
            }
        }

        if !html.is_empty() && plain.chars().count() < MIN_PLAIN_CHARS {
            plain = html_to_text(&html);
        }

        ExtractedContent {
            plain,
            html,
            attachments: collect_attachments(payload),
        }
    }
}

/// Cut a string to at most `limit` characters
pub fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use base64::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::gmail::RenderedBody;
    use crate::gmail::api::{
        HistoryResponse, ListMessagesResponse, MessagePart, PartBody, ProfileResponse,
    };

    /// Mailbox whose attachment storage is offline
    #[derive(Default)]
    struct StubMailbox {
        rendered: Option<RenderedBody>,
        rendered_calls: AtomicUsize,
    }

    impl MailboxApi for StubMailbox {
        fn list_messages(&self, _: &str, _: usize, _: Option<&str>) -> Result<ListMessagesResponse> {
            anyhow::bail!("not listed")
        }

        fn get_message(&self, id: &str) -> Result<GmailMessage> {
            anyhow::bail!("{} not stored", id)
        }

        fn get_attachment(&self, _: &str, attachment_id: &str) -> Result<String> {
            anyhow::bail!("attachment {} unavailable", attachment_id)
        }

        fn list_history(&self, _: &str, _: Option<&str>) -> Result<HistoryResponse> {
            anyhow::bail!("no change log")
        }

        fn get_profile(&self) -> Result<ProfileResponse> {
            anyhow::bail!("no profile")
        }

        fn rendered_body(&self, id: &str) -> Result<RenderedBody> {
            self.rendered_calls.fetch_add(1, Ordering::SeqCst);
            self.rendered
                .clone()
                .ok_or_else(|| anyhow::anyhow!("{} has no rendered body", id))
        }
    }

    fn leaf(mime: &str, text: &str) -> MessagePart {
        MessagePart {
            mime_type: Some(mime.into()),
            body: Some(PartBody {
                size: Some(text.len() as u64),
                data: Some(BASE64_URL_SAFE_NO_PAD.encode(text.as_bytes())),
                attachment_id: None,
            }),
            ..Default::default()
        }
    }

    fn message(payload: MessagePart) -> GmailMessage {
        GmailMessage {
            id: "m1".into(),
            payload: Some(payload),
            ..Default::default()
        }
    }

    fn alternative(parts: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            mime_type: Some("multipart/alternative".into()),
            parts: Some(parts),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_payload_is_empty() {
        let api = StubMailbox::default();
        let content = ContentExtractor::new(&api).extract(&GmailMessage::default());
        assert_eq!(content, ExtractedContent::default());
        assert_eq!(api.rendered_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rendered_body_when_tree_has_no_text() {
        let api = StubMailbox {
            rendered: Some(RenderedBody {
                html: "<p>Rendered</p><p>body</p>".into(),
                plain: String::new(),
            }),
            ..Default::default()
        };
        let payload = MessagePart {
            mime_type: Some("multipart/mixed".into()),
            parts: Some(vec![MessagePart {
                mime_type: Some("image/png".into()),
                filename: Some("logo.png".into()),
                body: Some(PartBody {
                    size: Some(2048),
                    data: None,
                    attachment_id: Some("att-1".into()),
                }),
                ..Default::default()
            }]),
            ..Default::default()
        };

        let content = ContentExtractor::new(&api).extract(&message(payload));
        assert_eq!(content.html, "<p>Rendered</p><p>body</p>");
        assert_eq!(content.plain, "Rendered\n\nbody");
        assert_eq!(content.attachments.len(), 1);
        assert_eq!(content.attachments[0].filename, "logo.png");
        assert_eq!(api.rendered_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_html_only_gets_text_rendering() {
        let api = StubMailbox::default();
        let content =
            ContentExtractor::new(&api).extract(&message(leaf("text/html", "<p>A</p><p>B</p>")));
        assert_eq!(content.html, "<p>A</p><p>B</p>");
        assert_eq!(content.plain, "A\n\nB");
    }

    #[test]
    fn test_short_plain_replaced_by_html() {
        let api = StubMailbox::default();
        let html = leaf("text/html", "<div>From html</div>");

        let short = "x".repeat(MIN_PLAIN_CHARS - 1);
        let payload = alternative(vec![leaf("text/plain", &short), html.clone()]);
        let content = ContentExtractor::new(&api).extract(&message(payload));
        assert_eq!(content.plain, "From html");

        let long = "x".repeat(MIN_PLAIN_CHARS);
        let payload = alternative(vec![leaf("text/plain", &long), html]);
        let content = ContentExtractor::new(&api).extract(&message(payload));
        assert_eq!(content.plain, long);

        // Both bodies were found in the tree
        assert_eq!(api.rendered_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_attachment_fetch_degrades_to_empty() {
        let api = StubMailbox::default();
        let plain = "p".repeat(150);
        let payload = alternative(vec![
            leaf("text/plain", &plain),
            MessagePart {
                mime_type: Some("text/html".into()),
                body: Some(PartBody {
                    size: Some(90_000),
                    data: None,
                    attachment_id: Some("att-html".into()),
                }),
                ..Default::default()
            },
        ]);

        let content = ContentExtractor::new(&api).extract(&message(payload));
        assert_eq!(content.html, "");
        assert_eq!(content.plain, plain);
        assert!(content.attachments.is_empty());
        assert_eq!(api.rendered_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("ñandú", 2), "ña");
        assert_eq!(truncate_chars("", 10), "");
    }
}
