//! Ingestion pipeline: stream, normalize, batch, flush, report.

use std::path::Path;

use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::normalize::{normalize_message, EmailRecord};
use crate::parser::mbox::MboxParser;
use crate::store::EmailStore;

/// Tunables for one ingestion run, passed explicitly (no ambient constants).
///
/// `batch_size` and `progress_interval` trade memory and chatter for write
/// amplification; any positive values produce the same database.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Records accumulated before a transactional flush.
    pub batch_size: usize,
    /// Maximum characters kept from the plaintext body.
    pub preview_limit: usize,
    /// Whether to extract body previews at all.
    pub keep_preview: bool,
    /// Notify the observer every N processed messages (0 = only at the end).
    pub progress_interval: u64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

impl From<&IngestConfig> for IngestOptions {
    fn from(cfg: &IngestConfig) -> Self {
        Self {
            batch_size: cfg.batch_size.max(1),
            preview_limit: cfg.preview_limit,
            keep_preview: true,
            progress_interval: cfg.progress_interval,
        }
    }
}

/// Counters reported to the progress observer during a run.
#[derive(Debug, Clone, Copy)]
pub struct IngestProgress {
    /// Messages read from the archive so far.
    pub processed: u64,
    /// Rows inserted by committed flushes so far.
    pub inserted: u64,
    /// Rows skipped (duplicates or row-level failures) so far.
    pub skipped: u64,
}

/// Final totals for a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub processed: u64,
    pub inserted: u64,
    pub skipped: u64,
}

/// Ingest an MBOX archive into the store.
///
/// Messages are streamed in file order, normalized, accumulated into batches
/// of `options.batch_size`, and flushed transactionally. The schema is
/// ensured first, so a fresh database path works. `observer` (if any) is
/// invoked every `options.progress_interval` messages and once after the
/// final flush.
///
/// A malformed message never aborts the run; only resource faults (archive
/// unreadable, store unavailable) are fatal.
pub fn run(
    mbox_path: &Path,
    store: &mut EmailStore,
    options: &IngestOptions,
    observer: Option<&dyn Fn(&IngestProgress)>,
) -> Result<IngestSummary> {
    store.ensure_schema()?;

    let parser = MboxParser::new(mbox_path)?;
    info!(
        path = %mbox_path.display(),
        size = parser.file_size(),
        "Starting ingest"
    );

    let preview_limit = options.keep_preview.then_some(options.preview_limit);

    let mut batch: Vec<EmailRecord> = Vec::with_capacity(options.batch_size);
    let mut processed: u64 = 0;
    let mut inserted: u64 = 0;
    let mut skipped: u64 = 0;
    let mut flush_error: Option<IngestError> = None;

    parser.parse(&mut |raw| {
        batch.push(normalize_message(raw, preview_limit));
        processed += 1;

        if batch.len() >= options.batch_size {
            match store.insert_batch(&batch) {
                Ok((i, s)) => {
                    inserted += i;
                    skipped += s;
                    batch.clear();
                }
                Err(e) => {
                    flush_error = Some(e);
                    return false;
                }
            }
        }

        if options.progress_interval > 0 && processed % options.progress_interval == 0 {
            info!(processed, inserted, skipped, "Ingest progress");
            if let Some(obs) = observer {
                obs(&IngestProgress {
                    processed,
                    inserted,
                    skipped,
                });
            }
        }

        true
    })?;

    if let Some(e) = flush_error {
        return Err(e);
    }

    // Flush the remaining partial batch
    if !batch.is_empty() {
        let (i, s) = store.insert_batch(&batch)?;
        inserted += i;
        skipped += s;
    }

    if skipped > 0 {
        warn!(skipped, "Some rows were skipped during ingest");
    }

    if let Some(obs) = observer {
        obs(&IngestProgress {
            processed,
            inserted,
            skipped,
        });
    }

    info!(processed, inserted, skipped, "Ingest complete");

    Ok(IngestSummary {
        processed,
        inserted,
        skipped,
    })
}
