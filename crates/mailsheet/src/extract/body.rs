//! Content tree walk and body decoding

use base64::prelude::*;

use super::MAX_PART_DEPTH;
use crate::gmail::api::MessagePart;

/// Depth-first search for the first part of type `wanted_mime` with content
///
/// Inline data is decoded directly; a part that only references attachment
/// storage is resolved through `fetch_attachment`, which receives the
/// attachment ID and returns the decoded text. Returns an empty string when
/// no matching part yields text.
pub fn find_text_part<F>(root: &MessagePart, wanted_mime: &str, fetch_attachment: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut stack: Vec<(&MessagePart, usize)> = vec![(root, 0)];

    while let Some((part, depth)) = stack.pop() {
        if part
            .mime_type
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case(wanted_mime))
            && let Some(body) = &part.body
        {
            let text = match (&body.data, &body.attachment_id) {
                (Some(data), _) if !data.is_empty() => decode_base64url(data),
                (_, Some(attachment_id)) if !attachment_id.is_empty() => {
                    fetch_attachment(attachment_id)
                }
                _ => String::new(),
            };
            if !text.is_empty() {
                return text;
            }
        }

        if depth < MAX_PART_DEPTH {
            // Reversed so children are visited in document order
            stack.extend(part.children().iter().rev().map(|p| (p, depth + 1)));
        }
    }

    String::new()
}

/// Decode Gmail's URL-safe base64 (padding optional) into UTF-8 text
///
/// Invalid base64 yields an empty string; invalid UTF-8 is replaced lossily.
pub fn decode_base64url(data: &str) -> String {
    let mut s: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let trimmed = s.trim_end_matches('=').len();
    s.truncate(trimmed);
    let pad = s.len() % 4;
    if pad != 0 {
        s.push_str(&"=".repeat(4 - pad));
    }

    match BASE64_URL_SAFE.decode(s.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::PartBody;

    fn encode(s: &str) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(s.as_bytes())
    }

    fn leaf(mime: &str, text: &str) -> MessagePart {
        MessagePart {
            mime_type: Some(mime.into()),
            body: Some(PartBody {
                size: Some(text.len() as u64),
                data: Some(encode(text)),
                attachment_id: None,
            }),
            ..Default::default()
        }
    }

    fn multipart(mime: &str, parts: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            mime_type: Some(mime.into()),
            parts: Some(parts),
            ..Default::default()
        }
    }

    fn no_fetch(_: &str) -> String {
        panic!("attachment fetch not expected")
    }

    #[test]
    fn test_decode_base64url() {
        // "Hello, World!" without padding
        assert_eq!(decode_base64url("SGVsbG8sIFdvcmxkIQ"), "Hello, World!");
        // With padding
        assert_eq!(decode_base64url("SGVsbG8sIFdvcmxkIQ=="), "Hello, World!");
        // "ü?" encodes to "w7w_", which needs the URL-safe alphabet
        assert_eq!(decode_base64url(&encode("ü?")), "ü?");
        assert_eq!(decode_base64url("!!!"), "");
    }

    #[test]
    fn test_find_nested_parts() {
        let root = multipart(
            "multipart/mixed",
            vec![
                multipart(
                    "multipart/alternative",
                    vec![leaf("text/plain", "plain body"), leaf("text/html", "<p>html</p>")],
                ),
                leaf("text/plain", "second plain"),
            ],
        );

        assert_eq!(find_text_part(&root, "text/plain", no_fetch), "plain body");
        assert_eq!(find_text_part(&root, "text/html", no_fetch), "<p>html</p>");
        assert_eq!(find_text_part(&root, "text/calendar", no_fetch), "");
    }

    #[test]
    fn test_first_match_in_document_order() {
        let root = multipart(
            "multipart/mixed",
            vec![
                multipart("multipart/related", vec![leaf("text/html", "first")]),
                leaf("text/html", "second"),
            ],
        );
        assert_eq!(find_text_part(&root, "text/html", no_fetch), "first");
    }

    #[test]
    fn test_single_part_root() {
        let root = leaf("text/plain", "only");
        assert_eq!(find_text_part(&root, "text/plain", no_fetch), "only");
    }

    #[test]
    fn test_attachment_backed_body() {
        let root = multipart(
            "multipart/alternative",
            vec![MessagePart {
                mime_type: Some("text/html".into()),
                body: Some(PartBody {
                    size: Some(90_000),
                    data: None,
                    attachment_id: Some("att-9".into()),
                }),
                ..Default::default()
            }],
        );

        let text = find_text_part(&root, "text/html", |id| {
            assert_eq!(id, "att-9");
            "<p>big</p>".to_string()
        });
        assert_eq!(text, "<p>big</p>");
    }

    #[test]
    fn test_depth_guard() {
        let mut node = leaf("text/plain", "deep");
        for _ in 0..(MAX_PART_DEPTH + 5) {
            node = multipart("multipart/mixed", vec![node]);
        }
        assert_eq!(find_text_part(&node, "text/plain", no_fetch), "");

        let mut node = leaf("text/plain", "shallow");
        for _ in 0..10 {
            node = multipart("multipart/mixed", vec![node]);
        }
        assert_eq!(find_text_part(&node, "text/plain", no_fetch), "shallow");
    }
}
