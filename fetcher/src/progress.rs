use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ServiceStatus {
    Pending,
    Indexed {
        documents: usize,
        fetched_at: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Failed { error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub current: usize,
    pub total: usize,
    pub complete: bool,
}

/// Tracks how far background population has got. The engine knows nothing of this;
/// callers use it to flag results served from a partial corpus.
#[derive(Debug, Default)]
pub struct IndexProgress {
    current: AtomicUsize,
    total: AtomicUsize,
    statuses: RwLock<HashMap<String, ServiceStatus>>,
}

impl IndexProgress {
    pub fn new() -> Self { Self::default() }

    /// Start a new run over `ids`, marking each pending.
    pub fn reset<'a, I: IntoIterator<Item = &'a str>>(&self, ids: I) {
        let mut statuses = self.statuses.write();
        statuses.clear();
        for id in ids {
            statuses.insert(id.to_string(), ServiceStatus::Pending);
        }
        self.total.store(statuses.len(), Ordering::SeqCst);
        self.current.store(0, Ordering::SeqCst);
    }

    pub fn mark_indexed(&self, id: &str, documents: usize, base_url: Option<String>, title: Option<String>) {
        let fetched_at = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        self.set(id, ServiceStatus::Indexed { documents, fetched_at, base_url, title });
    }

    pub fn mark_failed(&self, id: &str, error: String) {
        self.set(id, ServiceStatus::Failed { error });
    }

    fn set(&self, id: &str, status: ServiceStatus) {
        self.statuses.write().insert(id.to_string(), status);
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn status(&self, id: &str) -> Option<ServiceStatus> { self.statuses.read().get(id).cloned() }

    pub fn current(&self) -> usize { self.current.load(Ordering::SeqCst) }
    pub fn total(&self) -> usize { self.total.load(Ordering::SeqCst) }
    pub fn is_complete(&self) -> bool { self.current() >= self.total() }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let current = self.current();
        let total = self.total();
        ProgressSnapshot { current, total, complete: current >= total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_towards_completion() {
        let p = IndexProgress::new();
        p.reset(["a", "b"]);
        assert_eq!(p.snapshot(), ProgressSnapshot { current: 0, total: 2, complete: false });
        assert_eq!(p.status("a"), Some(ServiceStatus::Pending));

        p.mark_indexed("a", 3, None, None);
        p.mark_failed("b", "timeout".into());
        assert!(p.is_complete());
        assert!(matches!(p.status("a"), Some(ServiceStatus::Indexed { documents: 3, .. })));
        assert_eq!(p.status("b"), Some(ServiceStatus::Failed { error: "timeout".into() }));

        p.reset(["c"]);
        assert_eq!(p.current(), 0);
        assert_eq!(p.status("a"), None);
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let v = serde_json::to_value(ServiceStatus::Failed { error: "x".into() }).unwrap();
        assert_eq!(v["state"], "failed");
        assert_eq!(v["error"], "x");
    }
}
