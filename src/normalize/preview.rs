//! Plaintext body preview extraction.

use mail_parser::{MessageParser, MimeHeaders, PartType};

/// Extract a plaintext preview from a raw message, truncated to `limit`
/// characters.
///
/// For multipart messages, parts are scanned in document order for the first
/// `text/plain` part whose disposition is not `attachment`. Single-part
/// messages have their body decoded directly. Charset defaults to UTF-8 and
/// decode errors are replaced; any failure yields an empty string.
pub fn extract_preview(raw_message: &[u8], limit: usize) -> String {
    let parser = MessageParser::default();
    let Some(msg) = parser.parse(raw_message) else {
        // Unparseable as MIME: best effort on the bytes after the headers
        return truncate_chars(&raw_body_fallback(raw_message), limit);
    };

    // Single-part: decode the body directly, whatever its type
    if msg.parts.len() == 1 {
        let text = match &msg.parts[0].body {
            PartType::Text(t) | PartType::Html(t) => t.to_string(),
            PartType::Binary(b) | PartType::InlineBinary(b) => {
                String::from_utf8_lossy(b).into_owned()
            }
            _ => String::new(),
        };
        return truncate_chars(&text, limit);
    }

    for part in &msg.parts {
        let PartType::Text(text) = &part.body else {
            continue;
        };
        // Missing content type defaults to text/plain
        let is_plain = part
            .content_type()
            .map(|ct| {
                ct.ctype().eq_ignore_ascii_case("text")
                    && ct.subtype().map_or(true, |s| s.eq_ignore_ascii_case("plain"))
            })
            .unwrap_or(true);
        let is_attachment = part
            .content_disposition()
            .map(|d| d.ctype().eq_ignore_ascii_case("attachment"))
            .unwrap_or(false);

        if is_plain && !is_attachment {
            return truncate_chars(text, limit);
        }
    }

    String::new()
}

/// Everything after the first blank line, lossily decoded.
fn raw_body_fallback(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    if let Some(pos) = text.find("\n\n") {
        text[pos + 2..].to_string()
    } else if let Some(pos) = text.find("\r\n\r\n") {
        text[pos + 4..].to_string()
    } else {
        String::new()
    }
}

/// Truncate to at most `limit` characters (not bytes).
fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
