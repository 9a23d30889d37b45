//! Core identifiers and value types shared across modules.

use serde::Serialize;

/// Primary key of the `terms` table.
pub type TermId = i64;

/// Primary key of the `documents` table.
pub type DocumentId = i64;

/// One row of `documents`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub document_id: DocumentId,
    pub document_name: String,
    pub term_count: i64,
    pub total_terms: i64,
}

/// One row of `terms`.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub term_id: TermId,
    pub term: String,
    pub document_count: i64,
}

/// One row of `postings`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posting {
    pub term_id: TermId,
    pub document_id: DocumentId,
    pub frequency: i64,
    pub tf_idf: f64,
}

/// A single ranked result from the query evaluator. Serialized directly as
/// one element of the `GET /search` JSON array (§6).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub document_name: String,
    pub score: f64,
}
