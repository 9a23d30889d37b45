//! Query Evaluator — tokenizes a query, looks up postings per term, sums
//! TF-IDF per document, and returns results ranked descending (§4.5).

use std::collections::HashMap;

use crate::error::Result;
use crate::store::IndexStore;
use crate::types::SearchHit;

/// Evaluate `query_text` against `store`. Tokenization here is whitespace
/// splitting only — no punctuation stripping — since the surface contract
/// is literal term match; callers wanting lenient matching normalize their
/// query text before calling this.
pub fn search(store: &IndexStore, query_text: &str) -> Result<Vec<SearchHit>> {
    let mut scores: HashMap<String, f64> = HashMap::new();

    for token in query_text.split_whitespace() {
        for hit in store.postings_for_term(token)? {
            *scores.entry(hit.document_name).or_insert(0.0) += hit.score;
        }
    }

    let mut hits: Vec<SearchHit> = scores
        .into_iter()
        .map(|(document_name, score)| SearchHit { document_name, score })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document_name.cmp(&b.document_name))
    });

    Ok(hits)
}
