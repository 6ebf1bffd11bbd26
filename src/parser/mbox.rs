//! Streaming MBOX parser.
//!
//! Reads the archive line-by-line through a buffered reader and hands each
//! complete message to a callback. Never loads the whole file into memory.
//! Tolerant of malformed input.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{IngestError, Result};

/// Size of the internal read buffer.
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Default maximum message size in bytes (256 MB). Larger messages have
/// their tail dropped rather than aborting the run.
const MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// Streaming MBOX parser.
///
/// Scans the file sequentially, invoking a caller-supplied callback for each
/// message found. Tolerant of:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - Truncated messages at EOF
/// - NUL bytes and other binary content in the body
/// - UTF-8 BOM at the start of the file
#[derive(Debug)]
pub struct MboxParser {
    path: PathBuf,
    file_size: u64,
    max_message_size: usize,
}

impl MboxParser {
    /// Create a parser for the given MBOX file.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IngestError::FileNotFound(path.clone())
            } else {
                IngestError::io(&path, e)
            }
        })?;
        Ok(Self {
            path,
            file_size: metadata.len(),
            max_message_size: MAX_MESSAGE_SIZE,
        })
    }

    /// Total size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Path to the MBOX file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream the MBOX, calling `message_callback` with the raw bytes of each
    /// message (including its `From ` separator line). The callback returns
    /// `true` to continue or `false` to abort early.
    ///
    /// Returns the number of messages delivered.
    pub fn parse(&self, message_callback: &mut dyn FnMut(&[u8]) -> bool) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path).map_err(|e| IngestError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut count: u64 = 0;
        let mut offset: u64 = 0;
        let mut message_buf: Vec<u8> = Vec::with_capacity(64 * 1024);
        let mut prev_line_was_empty = true;
        let mut first_line = true;
        let mut truncating = false;

        // Reusable line buffer
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);

        loop {
            line_buf.clear();
            let line_len = {
                let buf = reader
                    .fill_buf()
                    .map_err(|e| IngestError::io(&self.path, e))?;
                if buf.is_empty() {
                    break; // EOF
                }
                let consume_len = match buf.iter().position(|&b| b == b'\n') {
                    Some(pos) => pos + 1,
                    None => buf.len(),
                };
                line_buf.extend_from_slice(&buf[..consume_len]);
                reader.consume(consume_len);
                consume_len as u64
            };

            if is_mbox_separator(&line_buf) {
                if !first_line && !prev_line_was_empty {
                    warn!(offset, "Found 'From ' separator without preceding blank line");
                }
                if !message_buf.is_empty() {
                    if !message_callback(&message_buf) {
                        return Ok(count);
                    }
                    count += 1;
                }
                message_buf.clear();
                message_buf.extend_from_slice(&line_buf);
                truncating = false;
            } else if message_buf.len() + line_buf.len() <= self.max_message_size {
                message_buf.extend_from_slice(&line_buf);
            } else if !truncating {
                warn!(
                    max_size = self.max_message_size,
                    "Message exceeds maximum size, truncating body"
                );
                truncating = true;
            }

            prev_line_was_empty = is_blank_line(&line_buf);
            first_line = false;
            offset += line_len;
        }

        // Flush last message
        if !message_buf.is_empty() && message_callback(&message_buf) {
            count += 1;
        }

        Ok(count)
    }
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    // Skip BOM if present at very start
    let line = if line.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &line[3..]
    } else {
        line
    };
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_mbox_separator() {
        assert!(is_mbox_separator(
            b"From user@example.com Thu Jan 01 00:00:00 2024\n"
        ));
        assert!(!is_mbox_separator(b"from user@example.com\n")); // lowercase
        assert!(!is_mbox_separator(b">From user@example.com\n")); // escaped
        assert!(!is_mbox_separator(b"Subject: From here\n"));
    }

    #[test]
    fn test_is_mbox_separator_with_bom() {
        let mut line = vec![0xEF, 0xBB, 0xBF];
        line.extend_from_slice(b"From user@example.com Thu Jan 01 00:00:00 2024\n");
        assert!(is_mbox_separator(&line));
    }

    #[test]
    fn test_is_blank_line() {
        assert!(is_blank_line(b"\n"));
        assert!(is_blank_line(b"\r\n"));
        assert!(is_blank_line(b"  \n"));
        assert!(!is_blank_line(b"hello\n"));
    }

    #[test]
    fn test_parse_two_messages() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            "From a@x Thu Jan 01 00:00:00 2024\nSubject: One\n\nbody one\n\n\
             From b@x Thu Jan 01 00:00:00 2024\nSubject: Two\n\nbody two\n"
        )
        .unwrap();

        let parser = MboxParser::new(f.path()).unwrap();
        let mut subjects = Vec::new();
        let count = parser
            .parse(&mut |raw| {
                let text = String::from_utf8_lossy(raw).to_string();
                subjects.push(text);
                true
            })
            .unwrap();

        assert_eq!(count, 2);
        assert!(subjects[0].contains("Subject: One"));
        assert!(subjects[1].contains("Subject: Two"));
    }

    #[test]
    fn test_parse_escaped_from_not_a_separator() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            "From a@x Thu Jan 01 00:00:00 2024\nSubject: One\n\n>From the body\nstill body\n"
        )
        .unwrap();

        let parser = MboxParser::new(f.path()).unwrap();
        let mut count = 0u64;
        parser
            .parse(&mut |_| {
                count += 1;
                true
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_parse_empty_file() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let parser = MboxParser::new(f.path()).unwrap();
        let count = parser.parse(&mut |_| true).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_missing_file() {
        let err = MboxParser::new("/no/such/file.mbox").unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound(_)));
    }
}
