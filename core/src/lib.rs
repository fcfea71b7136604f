pub mod engine;
pub mod extract;
pub mod index;
pub mod search;
pub mod tokenizer;
pub mod types;

pub use engine::{Engine, SharedEngine};
pub use types::{DocKind, DocMeta, IndexStats, IndexedDocument, ScoredDocument, TermVector};
