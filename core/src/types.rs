use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Sparse token -> weight mapping. Used for both stored TF vectors and derived TF-IDF vectors.
///
/// Ordered so that norms and dot products sum in the same order on every call.
pub type TermVector = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Endpoint,
    Schema,
    Description,
}

impl DocKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "endpoint" => Some(DocKind::Endpoint),
            "schema" => Some(DocKind::Schema),
            "description" => Some(DocKind::Description),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocMeta {
    pub service: String,
    #[serde(rename = "type")]
    pub kind: DocKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Upper-cased HTTP method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub content: String,
    pub metadata: DocMeta,
}

impl IndexedDocument {
    /// Endpoint document keyed `{service}-{method}-{path}` with the method lower-cased.
    pub fn endpoint(service: &str, method: &str, path: &str, operation_id: Option<String>, content: String) -> Self {
        Self {
            id: format!("{}-{}-{}", service, method.to_lowercase(), path),
            content,
            metadata: DocMeta {
                service: service.to_string(),
                kind: DocKind::Endpoint,
                path: Some(path.to_string()),
                method: Some(method.to_uppercase()),
                operation_id,
            },
        }
    }

    pub fn schema(service: &str, name: &str, content: String) -> Self {
        Self {
            id: format!("{}-schema-{}", service, name),
            content,
            metadata: DocMeta {
                service: service.to_string(),
                kind: DocKind::Schema,
                path: None,
                method: None,
                operation_id: None,
            },
        }
    }

    /// Service-level summary document, one per service.
    pub fn description(service: &str, content: String) -> Self {
        Self {
            id: format!("{}-description", service),
            content,
            metadata: DocMeta {
                service: service.to_string(),
                kind: DocKind::Description,
                path: None,
                method: None,
                operation_id: None,
            },
        }
    }

    pub fn kind(&self) -> DocKind { self.metadata.kind }
    pub fn service(&self) -> &str { &self.metadata.service }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub document: IndexedDocument,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub total_documents: usize,
    /// Vocabulary size of the current IDF table.
    pub total_terms: usize,
    pub services: BTreeSet<String>,
    pub endpoint_count: usize,
    pub schema_count: usize,
    pub description_count: usize,
}
