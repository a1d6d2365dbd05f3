//! Rendered-body fallback from the raw RFC 822 source

use anyhow::{Context, Result};
use mailparse::ParsedMail;

use super::mailbox::RenderedBody;
use crate::extract::MAX_PART_DEPTH;

/// Extract the first HTML and first plain-text body from a raw message
pub fn parse_rendered_body(raw: &[u8]) -> Result<RenderedBody> {
    let parsed = mailparse::parse_mail(raw).context("Failed to parse raw message")?;

    let mut rendered = RenderedBody::default();
    let mut stack: Vec<(&ParsedMail, usize)> = vec![(&parsed, 0)];

    while let Some((part, depth)) = stack.pop() {
        let mime = part.ctype.mimetype.to_ascii_lowercase();
        if mime == "text/html" && rendered.html.is_empty() {
            rendered.html = part.get_body().unwrap_or_default();
        } else if mime == "text/plain" && rendered.plain.is_empty() {
            rendered.plain = part.get_body().unwrap_or_default();
        }

        if !rendered.html.is_empty() && !rendered.plain.is_empty() {
            break;
        }

        if depth < MAX_PART_DEPTH {
            stack.extend(part.subparts.iter().rev().map(|p| (p, depth + 1)));
        }
    }

    Ok(rendered)
}
