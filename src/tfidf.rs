//! TF-IDF Engine — single-pass batch recomputation of every posting's
//! `tf_idf` column (§4.4).

use std::collections::HashMap;

use tracing::debug;

use crate::error::Result;
use crate::store::IndexStore;
use crate::types::TermId;

/// Recompute `tf_idf` for every posting currently in `store`.
///
/// `idf` is cached per `term_id` for the duration of this single pass only
/// (many postings share a term) — it must not be cached across separate
/// calls, since `document_count` changes between passes as new documents
/// are ingested.
pub fn update_idf(store: &IndexStore) -> Result<()> {
    let total_documents = store.total_documents()?;
    if total_documents == 0 {
        // No documents means no postings worth scoring; a no-op per §4.4.
        return Ok(());
    }

    let postings = store.scan_postings()?;
    let mut idf_cache: HashMap<TermId, f64> = HashMap::new();

    for (term_id, document_id, frequency) in postings {
        let total_terms = store.get_document_total_terms(document_id)?;
        let tf = frequency as f64 / total_terms as f64;

        let idf = *idf_cache.entry(term_id).or_insert_with(|| {
            // `get_term_document_count` is assumed infallible here because
            // the term row is guaranteed to exist (it was read from this
            // same posting row); a failure would be a store corruption bug.
            let document_count = store.get_term_document_count(term_id).unwrap_or(0);
            (total_documents as f64 / (document_count as f64 + 1.0)).ln()
        });

        let tf_idf = tf * idf;
        store.update_posting_tf_idf(term_id, document_id, tf_idf)?;
    }

    debug!(terms_cached = idf_cache.len(), "tf-idf pass complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::StagingMatrix;
    use tempfile::tempdir;

    #[test]
    fn scores_match_the_closed_form() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path().join("s.db")).unwrap();

        let doc_a = StagingMatrix::from_tokens(&[
            "hello".to_string(),
            "hello".to_string(),
            "world".to_string(),
        ]);
        store.flush_document("http://a", &doc_a).unwrap();
        store.set_total_documents(store.count_documents().unwrap()).unwrap();

        update_idf(&store).unwrap();

        let hello_hits = store.postings_for_term("hello").unwrap();
        let expected = (2.0 / 3.0) * (1.0f64 / 2.0).ln();
        assert!((hello_hits[0].score - expected).abs() < 1e-9);

        let world_hits = store.postings_for_term("world").unwrap();
        let expected_world = (1.0 / 3.0) * (1.0f64 / 2.0).ln();
        assert!((world_hits[0].score - expected_world).abs() < 1e-9);
    }

    #[test]
    fn empty_store_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path().join("s.db")).unwrap();
        update_idf(&store).unwrap();
    }

    #[test]
    fn ranking_respects_document_frequency() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path().join("s.db")).unwrap();

        let d1 = StagingMatrix::from_tokens(&[
            "cat".to_string(),
            "cat".to_string(),
            "dog".to_string(),
        ]);
        let d2 = StagingMatrix::from_tokens(&[
            "cat".to_string(),
            "dog".to_string(),
            "dog".to_string(),
        ]);
        store.flush_document("d1", &d1).unwrap();
        store.flush_document("d2", &d2).unwrap();
        store.set_total_documents(store.count_documents().unwrap()).unwrap();

        update_idf(&store).unwrap();

        // "cat" appears in both documents, so idf = ln(2/3) is negative;
        // tf_idf = tf * idf is then *less* negative (closer to zero, i.e.
        // higher) for the document with the lower term frequency. d2's
        // tf("cat") = 1/3 beats d1's tf("cat") = 2/3 under sort-descending.
        let cat_hits = store.postings_for_term("cat").unwrap();
        assert_eq!(cat_hits[0].document_name, "d2");
    }
}
