//! Message normalization: one raw MBOX message in, one [`EmailRecord`] out.
//!
//! Every function here is total: malformed headers, broken charsets, and
//! unparseable dates degrade to empty or substituted values. A bulk ingest
//! must survive arbitrarily malformed historical messages, so nothing in this
//! module performs I/O or returns an error.

pub mod date;
pub mod header;
pub mod preview;

pub use date::normalize_date;
pub use header::decode_header_text;
pub use preview::extract_preview;

/// A normalized email record, ready for insertion into the `emails` table.
///
/// Pure value type; produced fresh per message with no identity beyond its
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailRecord {
    /// Natural key when non-empty. Many messages lack a reliable Message-ID,
    /// so empty is a legitimate state, exempt from deduplication.
    pub message_id: String,
    /// ISO-8601 timestamp in UTC, or empty if the date was missing/unparseable.
    pub date_iso: String,
    /// `YYYY-MM-DD` prefix of `date_iso`; empty iff `date_iso` is empty.
    pub date_day: String,
    /// Decoded `From:` header.
    pub from_addr: String,
    /// Decoded `To:` header.
    pub to_addr: String,
    /// Decoded `Cc:` header.
    pub cc_addr: String,
    /// Decoded `Subject:` header.
    pub subject: String,
    /// Truncated plaintext body, attachments excluded. Empty when preview
    /// extraction is disabled.
    pub body_preview: String,
}

/// Normalize one raw MBOX message (including its `From ` separator line).
///
/// `preview_limit` controls body handling: `Some(n)` extracts a plaintext
/// preview of at most `n` characters, `None` skips body parsing entirely.
pub fn normalize_message(raw: &[u8], preview_limit: Option<usize>) -> EmailRecord {
    let message = skip_from_line(raw);

    let headers_text = header::decode_header_bytes(raw_header_section(message));
    let headers = header::unfold_headers(&headers_text);

    let message_id = header::get_header(&headers, "message-id")
        .map(|s| header::extract_angle_bracket(&s))
        .unwrap_or_default();

    let date_raw = header::get_header(&headers, "date").unwrap_or_default();
    let (date_iso, date_day) = normalize_date(&date_raw);

    let from_addr = decoded_header(&headers, "from");
    let to_addr = decoded_header(&headers, "to");
    let cc_addr = decoded_header(&headers, "cc");
    let subject = decoded_header(&headers, "subject");

    let body_preview = match preview_limit {
        Some(limit) => extract_preview(message, limit),
        None => String::new(),
    };

    EmailRecord {
        message_id,
        date_iso,
        date_day,
        from_addr,
        to_addr,
        cc_addr,
        subject,
        body_preview,
    }
}

fn decoded_header(headers: &[(String, String)], name: &str) -> String {
    header::get_header(headers, name)
        .map(|v| decode_header_text(&v))
        .unwrap_or_default()
}

/// Skip the `From ` separator line at the start of MBOX messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    };

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// The header section: everything before the first blank line.
fn raw_header_section(data: &[u8]) -> &[u8] {
    let mut i = 0;
    while i < data.len() {
        let line_end = data[i..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(data.len(), |p| i + p + 1);
        let line = &data[i..line_end];
        if line.iter().all(|&b| b == b'\n' || b == b'\r') {
            return &data[..i];
        }
        i = line_end;
    }
    data
}
