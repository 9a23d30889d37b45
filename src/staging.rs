//! Staging Matrix — in-memory per-document term→frequency accumulator,
//! created fresh for each document and discarded after it is flushed to the
//! Persistent Index Store (§4.3 step 4).

use std::collections::HashMap;

/// Per-document term frequency table, plus the two document-level totals
/// the spider needs to persist alongside it.
#[derive(Debug, Default)]
pub struct StagingMatrix {
    frequencies: HashMap<String, i64>,
    total_terms: i64,
}

impl StagingMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a staging matrix from one document's token stream.
    pub fn from_tokens(tokens: &[String]) -> Self {
        let mut matrix = Self::new();
        for token in tokens {
            matrix.observe(token);
        }
        matrix
    }

    pub fn observe(&mut self, term: &str) {
        *self.frequencies.entry(term.to_string()).or_insert(0) += 1;
        self.total_terms += 1;
    }

    /// Number of distinct terms observed.
    pub fn unique_terms(&self) -> i64 {
        self.frequencies.len() as i64
    }

    /// Total number of term occurrences observed.
    pub fn total_terms(&self) -> i64 {
        self.total_terms
    }

    /// Iterate the accumulated (term, frequency) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.frequencies.iter().map(|(term, &freq)| (term.as_str(), freq))
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_frequencies_and_totals() {
        let tokens = vec!["hello".to_string(), "hello".to_string(), "world".to_string()];
        let matrix = StagingMatrix::from_tokens(&tokens);

        assert_eq!(matrix.unique_terms(), 2);
        assert_eq!(matrix.total_terms(), 3);

        let freqs: HashMap<_, _> = matrix.iter().collect();
        assert_eq!(freqs.get("hello"), Some(&2));
        assert_eq!(freqs.get("world"), Some(&1));
    }

    #[test]
    fn empty_token_stream_is_empty() {
        let matrix = StagingMatrix::from_tokens(&[]);
        assert!(matrix.is_empty());
        assert_eq!(matrix.total_terms(), 0);
    }
}
