use super::MAX_PART_DEPTH;
use crate::gmail::api::MessagePart;
use crate::models::AttachmentMeta;

/// Collect metadata for every part that is a stored attachment, in document order
///
/// A part qualifies when it has both a filename and an attachment ID.
pub fn collect_attachments(root: &MessagePart) -> Vec<AttachmentMeta> {
    let mut out = Vec::new();
    let mut stack: Vec<(&MessagePart, usize)> = vec![(root, 0)];

    while let Some((part, depth)) = stack.pop() {
        let filename = part.filename.as_deref().unwrap_or_default();
        if !filename.is_empty()
            && let Some(body) = &part.body
            && let Some(attachment_id) = body.attachment_id.as_deref().filter(|id| !id.is_empty())
        {
            out.push(AttachmentMeta {
                filename: filename.to_string(),
                mime_type: part.mime_type.clone().unwrap_or_default(),
                size: body.size.filter(|&s| s > 0),
                attachment_id: attachment_id.to_string(),
            });
        }

        if depth < MAX_PART_DEPTH {
            stack.extend(part.children().iter().rev().map(|p| (p, depth + 1)));
        }
    }

    out
}
