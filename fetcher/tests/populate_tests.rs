use specdex_fetcher::{populate, FetchConfig, IndexProgress, ServiceEntry, ServiceStatus, SpecFetcher};
use specdex_core::SharedEngine;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

fn write_spec(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    Url::from_file_path(&path).unwrap().to_string()
}

#[tokio::test]
async fn indexes_services_in_order_and_skips_failures() {
    let dir = tempfile::tempdir().unwrap();
    let pets = write_spec(
        dir.path(),
        "pets.json",
        r#"{"servers": [{"url": "https://pets.example"}], "info": {"title": "Pets"},
            "paths": {"/pets": {"get": {"summary": "List pets"}}},
            "components": {"schemas": {"Pet": {"properties": {"name": {}}}}}}"#,
    );
    let orders = write_spec(dir.path(), "orders.json", r#"{"paths": {"/orders": {"post": {"summary": "Place order"}}}}"#);
    let missing = Url::from_file_path(dir.path().join("missing.json")).unwrap().to_string();

    let services = vec![
        ServiceEntry { id: "pets".into(), url: pets },
        ServiceEntry { id: "broken".into(), url: missing },
        ServiceEntry { id: "orders".into(), url: orders },
    ];
    let engine = SharedEngine::default();
    let config = FetchConfig { max_retries: 0, ..Default::default() };
    let fetcher = SpecFetcher::new(config).unwrap();
    let progress = IndexProgress::new();

    let summary = populate(&engine, &fetcher, &services, &progress, Duration::from_millis(1)).await;
    assert_eq!(summary.indexed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.documents, 4);

    assert!(progress.is_complete());
    assert!(matches!(progress.status("broken"), Some(ServiceStatus::Failed { .. })));
    match progress.status("pets") {
        Some(ServiceStatus::Indexed { documents, base_url, title, .. }) => {
            assert_eq!(documents, 3);
            assert_eq!(base_url.as_deref(), Some("https://pets.example"));
            assert_eq!(title.as_deref(), Some("Pets"));
        }
        other => panic!("unexpected status {other:?}"),
    }

    let stats = engine.stats();
    assert_eq!(stats.total_documents, 4);
    assert_eq!(stats.description_count, 1);
    assert_eq!(engine.get("pets-description").unwrap().content, "Service: Pets | https://pets.example");
    assert_eq!(stats.services.into_iter().collect::<Vec<_>>(), vec!["orders", "pets"]);
    assert_eq!(engine.search("place order", 5, 0.1)[0].document.id, "orders-post-/orders");
}
