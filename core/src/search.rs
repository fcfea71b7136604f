use crate::index::TfIdfIndex;
use crate::types::{IndexedDocument, ScoredDocument, TermVector};

pub const DEFAULT_THRESHOLD: f64 = 0.1;
pub const DEFAULT_LIMIT: usize = 10;

/// Cosine similarity over the union of both vectors' tokens. 0 when either norm is 0.
pub fn cosine_similarity(a: &TermVector, b: &TermVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|v| w * v))
        .sum();
    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn norm(v: &TermVector) -> f64 {
    v.values().map(|w| w * w).sum::<f64>().sqrt()
}

/// Score `target` against every document in `docs` (insertion order), keep scores
/// at or above `threshold`, sort descending and truncate to `limit`.
///
/// The sort is stable, so equal scores keep insertion order.
pub fn rank<'a, I>(
    index: &TfIdfIndex,
    docs: I,
    target: &TermVector,
    limit: usize,
    threshold: Option<f64>,
    exclude: Option<&str>,
) -> Vec<ScoredDocument>
where
    I: IntoIterator<Item = &'a IndexedDocument>,
{
    let mut scored: Vec<ScoredDocument> = Vec::new();
    for doc in docs {
        if exclude == Some(doc.id.as_str()) {
            continue;
        }
        let Some(vector) = index.tfidf_for(&doc.id) else { continue };
        let score = cosine_similarity(target, &vector);
        if threshold.map_or(true, |t| score >= t) {
            scored.push(ScoredDocument { document: doc.clone(), score });
        }
    }
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}
