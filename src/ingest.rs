//! Ingestion Pipeline / Spider — walks the dump directory, extracts and
//! tokenizes each file, flushes it into the Persistent Index Store, and
//! deletes the consumed file (§4.3).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;
use crate::extractor;
use crate::staging::StagingMatrix;
use crate::store::IndexStore;
use crate::tfidf;

const PLACEHOLDER_NAMES: &[&str] = &[".gitkeep"];

/// Summary of one `reindex_batch` call, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub documents_ingested: usize,
    pub documents_skipped: usize,
}

/// Walks a dump directory exactly once per call, tracking which paths it
/// has already consumed in this process's lifetime so a retained (failed
/// delete) file is not reprocessed on the next call.
pub struct Spider {
    dump_dir: PathBuf,
    processed: HashSet<PathBuf>,
}

impl Spider {
    pub fn new(dump_dir: impl Into<PathBuf>) -> Self {
        Self { dump_dir: dump_dir.into(), processed: HashSet::new() }
    }

    /// Walk the dump directory, ingest every new file, then run the TF-IDF
    /// engine once over the whole store (§4.3's final step).
    pub fn reindex_batch(&mut self, store: &IndexStore) -> Result<IngestStats> {
        let mut stats = IngestStats::default();

        if !self.dump_dir.exists() {
            return Ok(stats);
        }

        let mut entries: Vec<PathBuf> = std::fs::read_dir(&self.dump_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        // Entries are processed in directory iteration order, which §5
        // explicitly leaves unspecified; sorting here only makes tests
        // deterministic, it is not a correctness requirement.
        entries.sort();

        for path in entries {
            match self.process_file(&path, store)? {
                true => stats.documents_ingested += 1,
                false => stats.documents_skipped += 1,
            }
        }

        tfidf::update_idf(store)?;
        Ok(stats)
    }

    /// Process a single file. Returns `Ok(true)` if a document was
    /// indexed, `Ok(false)` if it was skipped (placeholder, already seen,
    /// or corrupt).
    fn process_file(&mut self, path: &Path, store: &IndexStore) -> Result<bool> {
        if is_placeholder(path) {
            return Ok(false);
        }

        if self.processed.contains(path) {
            return Ok(false);
        }
        self.processed.insert(path.to_path_buf());

        let extracted = match extractor::extract_file(path) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(?path, %err, "skipping unreadable dump file");
                return Ok(false);
            }
        };

        if !extracted.well_formed {
            warn!(?path, "dump file missing ---URL--- delimiter, treating as corrupt");
            return Ok(false);
        }

        if extracted.tokens.is_empty() {
            debug!(?path, "document has no <body>, skipping");
            return Ok(false);
        }

        let matrix = StagingMatrix::from_tokens(&extracted.tokens);
        if let Err(err) = store.flush_document(&extracted.url, &matrix) {
            warn!(?path, %err, "store error flushing document, retaining file");
            return Ok(false);
        }

        store.set_total_documents(store.count_documents()?)?;

        if let Err(err) = std::fs::remove_file(path) {
            // Leave `path` in `processed`: per §4.3 step 7, a failed delete
            // is retained on disk but skipped by the dedup set on future
            // runs, matching the original's `indexed_documents.erase` only
            // running on the success branch.
            warn!(?path, %err, "failed to delete consumed dump file, retaining in dedup set");
        }

        Ok(true)
    }
}

fn is_placeholder(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| PLACEHOLDER_NAMES.contains(&name))
        .unwrap_or(false)
}
