use crate::tokenizer::tokenize;
use crate::types::TermVector;
use std::collections::HashMap;

/// Term-frequency store plus the corpus-wide DF/IDF tables.
///
/// TF-IDF vectors are never stored. They are derived on read from the stored TF
/// vector and the IDF table as of the last [`TfIdfIndex::rebuild_idf`].
#[derive(Debug, Default)]
pub struct TfIdfIndex {
    tf: HashMap<String, TermVector>,
    df: HashMap<String, u32>,
    idf: HashMap<String, f64>,
    num_docs: usize,
}

impl TfIdfIndex {
    pub fn new() -> Self { Self::default() }

    /// Tokenize `content` and store its length-normalized TF vector under `id`,
    /// replacing any previous vector for the same id.
    pub fn record(&mut self, id: &str, content: &str) {
        let tokens = tokenize(content);
        self.tf.insert(id.to_string(), term_frequencies(&tokens));
    }

    /// Recompute DF and IDF from scratch over every stored TF vector.
    pub fn rebuild_idf(&mut self, num_docs: usize) {
        self.num_docs = num_docs;
        self.df.clear();
        for vector in self.tf.values() {
            for term in vector.keys() {
                *self.df.entry(term.clone()).or_insert(0) += 1;
            }
        }
        let n = num_docs as f64;
        self.idf = self
            .df
            .iter()
            .map(|(term, &df_t)| (term.clone(), (n / df_t as f64).ln()))
            .collect();
        tracing::debug!(num_docs, vocabulary = self.idf.len(), "rebuilt idf table");
    }

    pub fn tf(&self, id: &str) -> Option<&TermVector> { self.tf.get(id) }

    pub fn tfidf_for(&self, id: &str) -> Option<TermVector> {
        self.tf.get(id).map(|tf| apply_idf(tf, &self.idf, self.num_docs))
    }

    /// Query path: same TF normalization and IDF lookup as stored documents, never stored.
    pub fn tfidf_for_text(&self, text: &str) -> TermVector {
        apply_idf(&term_frequencies(&tokenize(text)), &self.idf, self.num_docs)
    }

    pub fn document_frequency(&self, term: &str) -> u32 {
        self.df.get(term).copied().unwrap_or(0)
    }

    pub fn idf(&self, term: &str) -> Option<f64> { self.idf.get(term).copied() }

    pub fn vocabulary_len(&self) -> usize { self.idf.len() }

    pub fn clear(&mut self) {
        self.tf.clear();
        self.df.clear();
        self.idf.clear();
        self.num_docs = 0;
    }
}

/// Occurrence counts divided by the document's total token count.
pub fn term_frequencies(tokens: &[String]) -> TermVector {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for t in tokens {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }
    let total = tokens.len() as f64;
    counts
        .into_iter()
        .map(|(term, c)| (term.to_string(), c as f64 / total))
        .collect()
}

/// Weight for a token absent from the IDF table, or whose IDF collapsed to zero:
/// `ln(num_docs)`, or 1.0 when that is zero too (corpus of at most one document).
pub fn fallback_idf(num_docs: usize) -> f64 {
    let w = (num_docs as f64).ln();
    if w > 0.0 { w } else { 1.0 }
}

pub fn apply_idf(tf: &TermVector, idf: &HashMap<String, f64>, num_docs: usize) -> TermVector {
    let fallback = fallback_idf(num_docs);
    tf.iter()
        .map(|(term, w)| {
            let weight = match idf.get(term) {
                Some(&v) if v != 0.0 => v,
                _ => fallback,
            };
            (term.clone(), w * weight)
        })
        .collect()
}
