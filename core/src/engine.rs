use crate::extract::extract;
use crate::index::TfIdfIndex;
use crate::search::rank;
use crate::tokenizer::tokenize;
use crate::types::{DocKind, IndexStats, IndexedDocument, ScoredDocument};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Owns the document store and the TF-IDF index built over it.
///
/// Documents keep their first insertion slot when overwritten by id, which is
/// what search uses as the tie-break order.
#[derive(Debug, Default)]
pub struct Engine {
    docs: Vec<IndexedDocument>,
    slots: HashMap<String, usize>,
    index: TfIdfIndex,
}

impl Engine {
    pub fn new() -> Self { Self::default() }

    /// Extract every endpoint and schema of `spec` and index them as one batch.
    /// Returns the number of documents extracted.
    pub fn index_batch(&mut self, spec: &Value, service: &str) -> usize {
        let docs = extract(spec, service);
        self.index_documents(service, docs)
    }

    /// Record every document, then rebuild IDF once for the whole batch.
    pub fn index_documents(&mut self, service: &str, docs: Vec<IndexedDocument>) -> usize {
        let count = docs.len();
        for doc in docs {
            self.record(doc);
        }
        self.index.rebuild_idf(self.docs.len());
        tracing::info!(
            service,
            documents = count,
            total_documents = self.docs.len(),
            vocabulary = self.index.vocabulary_len(),
            "indexed batch"
        );
        count
    }

    fn record(&mut self, doc: IndexedDocument) {
        self.index.record(&doc.id, &doc.content);
        match self.slots.get(&doc.id) {
            Some(&slot) => self.docs[slot] = doc,
            None => {
                self.slots.insert(doc.id.clone(), self.docs.len());
                self.docs.push(doc);
            }
        }
    }

    pub fn search(&self, query: &str, limit: usize, threshold: f64) -> Vec<ScoredDocument> {
        if self.docs.is_empty() {
            return Vec::new();
        }
        let target = self.index.tfidf_for_text(query);
        let hits = rank(&self.index, &self.docs, &target, limit, Some(threshold), None);
        tracing::debug!(query, query_terms = target.len(), hits = hits.len(), "search");
        hits
    }

    /// Rank every other document against `id`. Unknown ids yield an empty list.
    pub fn find_similar(&self, id: &str, limit: usize) -> Vec<ScoredDocument> {
        let Some(target) = self.index.tfidf_for(id) else {
            tracing::debug!(id, "find_similar on unknown document");
            return Vec::new();
        };
        rank(&self.index, &self.docs, &target, limit, None, Some(id))
    }

    /// Prefix completions for the tokens of `partial`, in corpus order, deduplicated.
    pub fn suggest(&self, partial: &str, limit: usize) -> Vec<String> {
        let prefixes = tokenize(partial);
        if prefixes.is_empty() || limit == 0 {
            return Vec::new();
        }
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        for doc in &self.docs {
            for token in tokenize(&doc.content) {
                if !prefixes.iter().any(|p| token.starts_with(p.as_str())) {
                    continue;
                }
                if seen.insert(token.clone()) {
                    out.push(token);
                    if out.len() >= limit {
                        return out;
                    }
                }
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.docs.clear();
        self.slots.clear();
        self.index.clear();
        tracing::info!("index cleared");
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            total_documents: self.docs.len(),
            total_terms: self.index.vocabulary_len(),
            services: BTreeSet::new(),
            ..Default::default()
        };
        for doc in &self.docs {
            stats.services.insert(doc.metadata.service.clone());
            match doc.kind() {
                DocKind::Endpoint => stats.endpoint_count += 1,
                DocKind::Schema => stats.schema_count += 1,
                DocKind::Description => stats.description_count += 1,
            }
        }
        stats
    }

    pub fn get(&self, id: &str) -> Option<&IndexedDocument> {
        self.slots.get(id).map(|&slot| &self.docs[slot])
    }

    pub fn documents_for_service(&self, service: &str) -> Vec<IndexedDocument> {
        self.docs.iter().filter(|d| d.service() == service).cloned().collect()
    }

    pub fn index(&self) -> &TfIdfIndex { &self.index }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }
}

/// Cloneable handle to one [`Engine`].
///
/// Writers hold the lock across the whole insert-then-rebuild sequence, so a
/// reader sees a batch either entirely or not at all.
#[derive(Clone, Default)]
pub struct SharedEngine {
    inner: Arc<RwLock<Engine>>,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        Self { inner: Arc::new(RwLock::new(engine)) }
    }

    pub fn index_batch(&self, spec: &Value, service: &str) -> usize {
        self.inner.write().index_batch(spec, service)
    }

    pub fn index_documents(&self, service: &str, docs: Vec<IndexedDocument>) -> usize {
        self.inner.write().index_documents(service, docs)
    }

    pub fn clear(&self) { self.inner.write().clear() }

    pub fn search(&self, query: &str, limit: usize, threshold: f64) -> Vec<ScoredDocument> {
        self.inner.read().search(query, limit, threshold)
    }

    pub fn find_similar(&self, id: &str, limit: usize) -> Vec<ScoredDocument> {
        self.inner.read().find_similar(id, limit)
    }

    pub fn suggest(&self, partial: &str, limit: usize) -> Vec<String> {
        self.inner.read().suggest(partial, limit)
    }

    pub fn stats(&self) -> IndexStats { self.inner.read().stats() }

    pub fn get(&self, id: &str) -> Option<IndexedDocument> { self.inner.read().get(id).cloned() }

    pub fn documents_for_service(&self, service: &str) -> Vec<IndexedDocument> {
        self.inner.read().documents_for_service(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(service: &str, path: &str, content: &str) -> IndexedDocument {
        IndexedDocument::endpoint(service, "get", path, None, content.to_string())
    }

    #[test]
    fn overwrite_by_id_keeps_slot_and_count() {
        let mut e = Engine::new();
        e.index_documents("s", vec![doc("s", "/a", "alpha things"), doc("s", "/b", "beta things")]);
        e.index_documents("s", vec![doc("s", "/a", "gamma things")]);
        assert_eq!(e.len(), 2);
        assert_eq!(e.get("s-get-/a").unwrap().content, "gamma things");
        assert_eq!(e.index().document_frequency("alpha"), 0);
        assert_eq!(e.stats().total_documents, 2);
    }

    #[test]
    fn suggest_completes_prefixes_without_duplicates() {
        let mut e = Engine::new();
        e.index_documents(
            "s",
            vec![doc("s", "/a", "payment payments payout"), doc("s", "/b", "payment pending")],
        );
        assert_eq!(e.suggest("pay", 10), vec!["payment", "payments", "payout"]);
        assert_eq!(e.suggest("pay pen", 10), vec!["payment", "payments", "payout", "pending"]);
        assert_eq!(e.suggest("pay", 2).len(), 2);
        assert!(e.suggest("pa", 10).is_empty());
    }

    #[test]
    fn stats_counts_kinds_and_services() {
        let mut e = Engine::new();
        let spec = json!({
            "paths": {"/pets": {"get": {"summary": "List pets"}, "post": {}}},
            "definitions": {"Pet": {}}
        });
        e.index_batch(&spec, "pets");
        e.index_documents("pets", vec![IndexedDocument::description("pets", "Pet store".into())]);
        let s = e.stats();
        assert_eq!(s.total_documents, 4);
        assert_eq!(s.endpoint_count, 2);
        assert_eq!(s.schema_count, 1);
        assert_eq!(s.description_count, 1);
        assert_eq!(s.services.into_iter().collect::<Vec<_>>(), vec!["pets"]);
    }

    #[test]
    fn shared_engine_sees_completed_batches() {
        let shared = SharedEngine::default();
        let reader = shared.clone();
        shared.index_batch(&json!({"paths": {"/users": {"get": {"summary": "List users"}}}}), "users");
        assert_eq!(reader.stats().total_documents, 1);
        assert_eq!(reader.search("users", 5, 0.0).len(), 1);
        reader.clear();
        assert_eq!(shared.stats().total_documents, 0);
    }
}
