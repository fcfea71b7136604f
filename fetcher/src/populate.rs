use crate::fetch::SpecFetcher;
use crate::progress::IndexProgress;
use crate::registry::ServiceEntry;
use serde::Serialize;
use specdex_core::extract::{base_url, extract_service, service_title};
use specdex_core::SharedEngine;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PopulateSummary {
    pub indexed: usize,
    pub failed: usize,
    pub documents: usize,
}

/// Fetch and index `services` one at a time, in order, sleeping `pause` between them.
///
/// Each service (endpoints, schemas and its description document) is indexed as
/// one batch; queries running meanwhile see the corpus
/// grow service by service. Failures are recorded in `progress` and skipped.
pub async fn populate(
    engine: &SharedEngine,
    fetcher: &SpecFetcher,
    services: &[ServiceEntry],
    progress: &IndexProgress,
    pause: Duration,
) -> PopulateSummary {
    progress.reset(services.iter().map(|s| s.id.as_str()));
    let mut summary = PopulateSummary::default();
    tracing::info!(services = services.len(), "starting index population");

    for (i, service) in services.iter().enumerate() {
        match fetcher.fetch(&service.url).await {
            Ok(spec) => {
                let documents = engine.index_documents(&service.id, extract_service(&spec, &service.id));
                progress.mark_indexed(&service.id, documents, base_url(&spec), service_title(&spec));
                summary.indexed += 1;
                summary.documents += documents;
            }
            Err(err) => {
                tracing::warn!(service = %service.id, url = %service.url, error = %format!("{err:#}"), "skipping service");
                progress.mark_failed(&service.id, format!("{err:#}"));
                summary.failed += 1;
            }
        }
        tracing::info!(current = progress.current(), total = progress.total(), service = %service.id, "population progress");
        if i + 1 < services.len() && !pause.is_zero() {
            sleep(pause).await;
        }
    }

    tracing::info!(indexed = summary.indexed, failed = summary.failed, documents = summary.documents, "index population complete");
    summary
}
