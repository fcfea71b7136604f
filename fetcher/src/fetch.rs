use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use reqwest::{header, Client};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use url::Url;

/// Documents larger than this are refused.
const MAX_SPEC_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub cache_ttl: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("specdex/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(15),
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Clone)]
struct CachedSpec {
    spec: Value,
    fetched_at: Instant,
}

/// Fetches specification documents over HTTP (or `file://`) with retry and a TTL cache.
pub struct SpecFetcher {
    client: Client,
    config: FetchConfig,
    cache: Mutex<HashMap<String, CachedSpec>>,
}

impl SpecFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config, cache: Mutex::new(HashMap::new()) })
    }

    pub async fn fetch(&self, url: &str) -> Result<Value> {
        if let Some(spec) = self.cached(url) {
            tracing::debug!(url, "spec cache hit");
            return Ok(spec);
        }
        let spec = self.fetch_with_retry(url).await?;
        self.cache.lock().insert(url.to_string(), CachedSpec { spec: spec.clone(), fetched_at: Instant::now() });
        Ok(spec)
    }

    /// Cached document for `url` if it is younger than the configured TTL.
    pub fn cached(&self, url: &str) -> Option<Value> {
        let cache = self.cache.lock();
        cache
            .get(url)
            .filter(|c| c.fetched_at.elapsed() < self.config.cache_ttl)
            .map(|c| c.spec.clone())
    }

    pub fn invalidate(&self) { self.cache.lock().clear(); }

    async fn fetch_with_retry(&self, url: &str) -> Result<Value> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_once(url).await {
                Ok(spec) => return Ok(spec),
                Err(err) if attempt < self.config.max_retries => {
                    let delay = self.config.base_delay * 2u32.pow(attempt);
                    tracing::warn!(url, attempt, ?delay, error = %err, "fetch failed, retrying");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.context(format!("fetching {url}"))),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Value> {
        let parsed = Url::parse(url).with_context(|| format!("invalid url {url}"))?;
        if parsed.scheme() == "file" {
            let path = parsed.to_file_path().map_err(|_| anyhow!("invalid file url {url}"))?;
            let bytes = tokio::fs::read(&path).await.with_context(|| format!("reading {}", path.display()))?;
            return parse_spec(&bytes);
        }

        let resp = self
            .client
            .get(parsed)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("{url} returned {status}"));
        }
        let bytes = resp.bytes().await?;
        parse_spec(&bytes)
    }
}

fn parse_spec(bytes: &[u8]) -> Result<Value> {
    if bytes.len() > MAX_SPEC_BYTES {
        return Err(anyhow!("specification too large ({} bytes)", bytes.len()));
    }
    let spec: Value = serde_json::from_slice(bytes).context("specification is not valid json")?;
    if !spec.is_object() {
        return Err(anyhow!("specification is not a json object"));
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn file_url(path: &std::path::Path) -> String {
        Url::from_file_path(path).unwrap().to_string()
    }

    #[tokio::test]
    async fn reads_file_urls_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.json");
        fs::write(&path, r#"{"paths": {"/a": {"get": {}}}}"#).unwrap();
        let url = file_url(&path);

        let fetcher = SpecFetcher::new(FetchConfig::default()).unwrap();
        let spec = fetcher.fetch(&url).await.unwrap();
        assert!(spec["paths"]["/a"].is_object());

        fs::remove_file(&path).unwrap();
        assert!(fetcher.fetch(&url).await.is_ok(), "second fetch should hit the cache");

        fetcher.invalidate();
        assert!(fetcher.cached(&url).is_none());
    }

    #[tokio::test]
    async fn invalid_json_fails_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        let config = FetchConfig { max_retries: 1, base_delay: Duration::from_millis(1), ..Default::default() };
        let fetcher = SpecFetcher::new(config).unwrap();
        assert!(fetcher.fetch(&file_url(&path)).await.is_err());
    }

    #[test]
    fn rejects_non_object() {
        assert!(parse_spec(b"[1, 2]").is_err());
        assert!(parse_spec(b"{}").is_ok());
    }
}
