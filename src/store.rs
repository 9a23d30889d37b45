//! Persistent Index Store — the single source of truth for ranking.
//!
//! Backed by a single SQLite file with four tables (`terms`, `documents`,
//! `postings`, `corpus_stats`) and two secondary indices, matching the
//! schema the original C++ prototype created directly with `sqlite3_exec`
//! (`examples/original_source/src/indexer.cpp::create_tables`). Every
//! public method here acquires the connection lock, prepares a statement,
//! runs it, and returns — no prepared statement outlives the call, so every
//! exit path releases it by ordinary scoping.

use parking_lot::Mutex;
use rusqlite::{backup, params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::staging::StagingMatrix;
use crate::types::{DocumentId, SearchHit, TermId};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS terms (
    term_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    term            TEXT UNIQUE NOT NULL,
    document_count  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS documents (
    document_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    document_name   TEXT UNIQUE NOT NULL,
    term_count      INTEGER NOT NULL DEFAULT 0,
    total_terms     INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS postings (
    term_id         INTEGER NOT NULL REFERENCES terms(term_id),
    document_id     INTEGER NOT NULL REFERENCES documents(document_id),
    frequency       INTEGER NOT NULL,
    tf_idf          REAL NOT NULL DEFAULT 0.0,
    PRIMARY KEY (term_id, document_id)
);

CREATE TABLE IF NOT EXISTS corpus_stats (
    total_documents INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_term ON terms(term);
CREATE INDEX IF NOT EXISTS idx_term_document ON postings(term_id, document_id);
"#;

/// The on-disk relational store described in spec §3/§4.2.
pub struct IndexStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl IndexStore {
    /// Open (creating if absent) the store at `path`, running the idempotent
    /// schema setup on every open.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;

        let has_stats_row: i64 =
            conn.query_row("SELECT COUNT(*) FROM corpus_stats", [], |row| row.get(0))?;
        if has_stats_row == 0 {
            conn.execute("INSERT INTO corpus_stats (total_documents) VALUES (0)", [])?;
        }

        Ok(Self { path, conn: Mutex::new(conn) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_or_insert_term(&self, term: &str) -> Result<TermId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO terms (term, document_count) VALUES (?1, 0)",
            params![term],
        )?;
        let term_id = conn.query_row(
            "SELECT term_id FROM terms WHERE term = ?1",
            params![term],
            |row| row.get(0),
        )?;
        Ok(term_id)
    }

    pub fn get_or_insert_document(&self, document_name: &str) -> Result<DocumentId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO documents (document_name) VALUES (?1)",
            params![document_name],
        )?;
        let document_id = conn.query_row(
            "SELECT document_id FROM documents WHERE document_name = ?1",
            params![document_name],
            |row| row.get(0),
        )?;
        Ok(document_id)
    }

    pub fn set_document_counts(
        &self,
        document_id: DocumentId,
        term_count: i64,
        total_terms: i64,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE documents SET term_count = ?1, total_terms = ?2 WHERE document_id = ?3",
            params![term_count, total_terms, document_id],
        )?;
        Ok(())
    }

    /// Insert-or-ignore a posting row. Returns `true` if the row was newly
    /// created (the caller should then call [`Self::increment_term_document_count`]).
    pub fn upsert_posting(
        &self,
        term_id: TermId,
        document_id: DocumentId,
        frequency: i64,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO postings (term_id, document_id, frequency, tf_idf) \
             VALUES (?1, ?2, ?3, 0.0)",
            params![term_id, document_id, frequency],
        )?;
        Ok(conn.changes() > 0)
    }

    pub fn increment_term_document_count(&self, term_id: TermId) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE terms SET document_count = document_count + 1 WHERE term_id = ?1",
            params![term_id],
        )?;
        Ok(())
    }

    /// Flush one document's staged term frequencies into the store. All
    /// writes run inside a single transaction, satisfying the "writes
    /// within one document flush are seen atomically" ordering guarantee
    /// (§5).
    pub fn flush_document(
        &self,
        document_name: &str,
        matrix: &StagingMatrix,
    ) -> Result<DocumentId> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO documents (document_name) VALUES (?1)",
            params![document_name],
        )?;
        let document_id: DocumentId = tx.query_row(
            "SELECT document_id FROM documents WHERE document_name = ?1",
            params![document_name],
            |row| row.get(0),
        )?;
        tx.execute(
            "UPDATE documents SET term_count = ?1, total_terms = ?2 WHERE document_id = ?3",
            params![matrix.unique_terms(), matrix.total_terms(), document_id],
        )?;

        for (term, frequency) in matrix.iter() {
            tx.execute(
                "INSERT OR IGNORE INTO terms (term, document_count) VALUES (?1, 0)",
                params![term],
            )?;
            let term_id: TermId = tx.query_row(
                "SELECT term_id FROM terms WHERE term = ?1",
                params![term],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT OR IGNORE INTO postings (term_id, document_id, frequency, tf_idf) \
                 VALUES (?1, ?2, ?3, 0.0)",
                params![term_id, document_id, frequency],
            )?;
            if tx.changes() > 0 {
                tx.execute(
                    "UPDATE terms SET document_count = document_count + 1 WHERE term_id = ?1",
                    params![term_id],
                )?;
            }
        }

        tx.commit()?;
        Ok(document_id)
    }

    pub fn get_document_total_terms(&self, document_id: DocumentId) -> Result<i64> {
        let conn = self.conn.lock();
        let total = conn.query_row(
            "SELECT total_terms FROM documents WHERE document_id = ?1",
            params![document_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    pub fn get_term_document_count(&self, term_id: TermId) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            "SELECT document_count FROM terms WHERE term_id = ?1",
            params![term_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn update_posting_tf_idf(
        &self,
        term_id: TermId,
        document_id: DocumentId,
        value: f64,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE postings SET tf_idf = ?1 WHERE term_id = ?2 AND document_id = ?3",
            params![value, term_id, document_id],
        )?;
        Ok(())
    }

    /// Full scan of every posting, for the TF-IDF engine's batch pass.
    pub fn scan_postings(&self) -> Result<Vec<(TermId, DocumentId, i64)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT term_id, document_id, frequency FROM postings")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_documents(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn set_total_documents(&self, n: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("UPDATE corpus_stats SET total_documents = ?1", params![n])?;
        Ok(())
    }

    pub fn total_documents(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let total = conn.query_row("SELECT total_documents FROM corpus_stats", [], |row| row.get(0))?;
        Ok(total)
    }

    /// Postings for a single literal term, ordered by `tf_idf` descending,
    /// ties broken by document name ascending.
    pub fn postings_for_term(&self, term: &str) -> Result<Vec<SearchHit>> {
        let conn = self.conn.lock();
        let term_id: Option<TermId> = conn
            .query_row("SELECT term_id FROM terms WHERE term = ?1", params![term], |row| row.get(0))
            .optional()?;

        let Some(term_id) = term_id else {
            return Ok(Vec::new());
        };

        let mut stmt = conn.prepare(
            "SELECT d.document_name, p.tf_idf \
             FROM postings p JOIN documents d ON p.document_id = d.document_id \
             WHERE p.term_id = ?1 \
             ORDER BY p.tf_idf DESC, d.document_name ASC",
        )?;
        let rows = stmt
            .query_map(params![term_id], |row| {
                Ok(SearchHit { document_name: row.get(0)?, score: row.get(1)? })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Byte-for-byte copy of the live database to `dest`, using SQLite's
    /// online backup API so an in-progress write on the source does not
    /// tear the copy (step 1 of the shadow-swap protocol, §4.7).
    pub fn backup_to(&self, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut dest_conn = Connection::open(dest)?;
        let src_conn = self.conn.lock();
        let backup = backup::Backup::new(&src_conn, &mut dest_conn)?;
        backup.run_to_completion(64, std::time::Duration::from_millis(0), None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_temp() -> (tempfile::TempDir, IndexStore) {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path().join("store.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn term_and_document_ids_are_idempotent() {
        let (_dir, store) = open_temp();
        let t1 = store.get_or_insert_term("hello").unwrap();
        let t2 = store.get_or_insert_term("hello").unwrap();
        assert_eq!(t1, t2);

        let d1 = store.get_or_insert_document("http://a").unwrap();
        let d2 = store.get_or_insert_document("http://a").unwrap();
        assert_eq!(d1, d2);
    }

    #[test]
    fn flush_document_updates_counts_and_document_frequency() {
        let (_dir, store) = open_temp();
        let tokens = vec!["hello".to_string(), "hello".to_string(), "world".to_string()];
        let matrix = StagingMatrix::from_tokens(&tokens);

        let doc_id = store.flush_document("http://a", &matrix).unwrap();
        assert_eq!(store.get_document_total_terms(doc_id).unwrap(), 3);

        let hello_id = store.get_or_insert_term("hello").unwrap();
        assert_eq!(store.get_term_document_count(hello_id).unwrap(), 1);
    }

    #[test]
    fn upsert_posting_is_insert_or_ignore() {
        let (_dir, store) = open_temp();
        let term_id = store.get_or_insert_term("hello").unwrap();
        let doc_id = store.get_or_insert_document("http://a").unwrap();

        assert!(store.upsert_posting(term_id, doc_id, 5).unwrap());
        assert!(!store.upsert_posting(term_id, doc_id, 99).unwrap());
    }

    #[test]
    fn postings_for_unknown_term_is_empty() {
        let (_dir, store) = open_temp();
        assert!(store.postings_for_term("nope").unwrap().is_empty());
    }

    #[test]
    fn backup_to_produces_a_usable_copy() {
        let (_dir, store) = open_temp();
        let tokens = vec!["hello".to_string()];
        let matrix = StagingMatrix::from_tokens(&tokens);
        store.flush_document("http://a", &matrix).unwrap();

        let shadow_dir = tempdir().unwrap();
        let shadow_path = shadow_dir.path().join("shadow.db");
        store.backup_to(&shadow_path).unwrap();

        let shadow = IndexStore::open(&shadow_path).unwrap();
        assert_eq!(shadow.count_documents().unwrap(), 1);
    }
}
