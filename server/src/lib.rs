use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use specdex_core::search::{DEFAULT_LIMIT, DEFAULT_THRESHOLD};
use specdex_core::{DocKind, IndexStats, IndexedDocument, ScoredDocument, SharedEngine};
use specdex_fetcher::{populate, IndexProgress, ProgressSnapshot, ServiceEntry, ServiceStatus, SpecFetcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_LIMIT: usize = 100;
const PREVIEW_CHARS: usize = 200;
const ADMIN_HEADER: &str = "X-ADMIN-TOKEN";

type ApiError = (StatusCode, String);

#[derive(Clone)]
pub struct AppState {
    pub engine: SharedEngine,
    pub fetcher: Arc<SpecFetcher>,
    pub services: Arc<Vec<ServiceEntry>>,
    pub progress: Arc<IndexProgress>,
    /// Delay between services during population.
    pub pause: Duration,
    pub admin_token: Option<String>,
    population: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AppState {
    pub fn new(fetcher: SpecFetcher, services: Vec<ServiceEntry>, pause: Duration) -> Self {
        Self {
            engine: SharedEngine::default(),
            fetcher: Arc::new(fetcher),
            services: Arc::new(services),
            progress: Arc::new(IndexProgress::new()),
            pause,
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            population: Arc::new(Mutex::new(None)),
        }
    }

    /// Start background population of the engine. Must be called from within a
    /// tokio runtime. A run already in flight is aborted without waiting; use
    /// [`AppState::stop_population`] first when the engine is about to be mutated.
    pub fn spawn_population(&self) {
        self.progress.reset(self.services.iter().map(|s| s.id.as_str()));
        let state = self.clone();
        let handle = tokio::spawn(async move {
            populate(&state.engine, &state.fetcher, &state.services, &state.progress, state.pause).await;
        });
        if let Some(previous) = self.population.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Abort the running population and wait until it has actually stopped, so
    /// no batch from it can land after this returns.
    pub async fn stop_population(&self) {
        let running = self.population.lock().take();
        if let Some(handle) = running {
            handle.abort();
            let _ = handle.await;
        }
    }

    fn partial(&self) -> bool { !self.progress.is_complete() }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/similar/:id", get(similar_handler))
        .route("/suggest", get(suggest_handler))
        .route("/document", get(document_handler))
        .route("/stats", get(stats_handler))
        .route("/services", get(services_handler))
        .route("/services/:service_id/documents", get(service_documents_handler))
        .route("/index/refresh", post(index_refresh))
        .route("/index/clear", post(index_clear))
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Origins from comma-separated `CORS_ALLOW_ORIGIN`; any origin when unset or unparsable.
fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = std::env::var("CORS_ALLOW_ORIGIN")
        .map(|val| val.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub service: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
fn default_limit() -> usize { DEFAULT_LIMIT }
fn default_threshold() -> f64 { DEFAULT_THRESHOLD }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub partial: bool,
    pub progress: ProgressSnapshot,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub service: String,
    #[serde(rename = "type")]
    pub kind: DocKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    pub score: f64,
    /// First 200 characters of the document content.
    pub preview: String,
    /// Excerpt around the first query term with matches wrapped in `<em>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

impl SearchHit {
    fn from_scored(hit: ScoredDocument, raw_terms: &[String]) -> Self {
        let ScoredDocument { document, score } = hit;
        let preview = preview(&document.content);
        let highlight = (!raw_terms.is_empty()).then(|| snippet(&document.content, raw_terms));
        let meta = document.metadata;
        Self {
            id: document.id,
            service: meta.service,
            kind: meta.kind,
            path: meta.path,
            method: meta.method,
            operation_id: meta.operation_id,
            score,
            preview,
            highlight,
        }
    }
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    if params.q.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "query parameter q must not be empty".into()));
    }
    let kind = match params.kind.as_deref() {
        Some(k) => Some(DocKind::parse(k).ok_or_else(|| (StatusCode::BAD_REQUEST, format!("unknown document type '{k}'")))?),
        None => None,
    };
    let limit = params.limit.min(MAX_LIMIT);
    let filtered = kind.is_some() || params.service.is_some();

    // Filters apply after ranking, so rank everything when one is present.
    let ranked_limit = if filtered { usize::MAX } else { limit };
    let mut hits = state.engine.search(&params.q, ranked_limit, params.threshold);
    if filtered {
        hits.retain(|h| {
            kind.map_or(true, |k| h.document.metadata.kind == k)
                && params.service.as_deref().map_or(true, |s| h.document.metadata.service == s)
        });
    }
    let total_hits = hits.len();
    let raw_terms: Vec<String> = params.q.split_whitespace().map(|s| s.to_string()).collect();
    let results = hits
        .into_iter()
        .take(limit)
        .map(|h| SearchHit::from_scored(h, &raw_terms))
        .collect();

    Ok(Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        total_hits,
        partial: state.partial(),
        progress: state.progress.snapshot(),
        results,
    }))
}

#[derive(Deserialize)]
pub struct SimilarParams {
    #[serde(default = "default_similar_limit")]
    pub limit: usize,
}
fn default_similar_limit() -> usize { 5 }

#[derive(Serialize)]
pub struct SimilarResponse {
    pub id: String,
    pub partial: bool,
    pub results: Vec<SearchHit>,
}

pub async fn similar_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<SimilarParams>,
) -> Json<SimilarResponse> {
    let results = state
        .engine
        .find_similar(&id, params.limit.min(MAX_LIMIT))
        .into_iter()
        .map(|h| SearchHit::from_scored(h, &[]))
        .collect();
    Json(SimilarResponse { id, partial: state.partial(), results })
}

#[derive(Deserialize)]
pub struct SuggestParams {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

pub async fn suggest_handler(State(state): State<AppState>, Query(params): Query<SuggestParams>) -> Json<serde_json::Value> {
    let suggestions = state.engine.suggest(&params.q, params.limit.min(MAX_LIMIT));
    Json(serde_json::json!({ "query": params.q, "suggestions": suggestions }))
}

#[derive(Deserialize)]
pub struct DocumentParams {
    pub id: String,
}

pub async fn document_handler(State(state): State<AppState>, Query(params): Query<DocumentParams>) -> Result<Json<IndexedDocument>, ApiError> {
    state
        .engine
        .get(&params.id)
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no document '{}'", params.id)))
}

#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: IndexStats,
    pub partial: bool,
    pub progress: ProgressSnapshot,
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse { stats: state.engine.stats(), partial: state.partial(), progress: state.progress.snapshot() })
}

#[derive(Serialize)]
pub struct ServiceView {
    pub id: String,
    pub url: String,
    pub status: ServiceStatus,
}

pub async fn services_handler(State(state): State<AppState>) -> Json<Vec<ServiceView>> {
    let views = state
        .services
        .iter()
        .map(|s| ServiceView {
            id: s.id.clone(),
            url: s.url.clone(),
            status: state.progress.status(&s.id).unwrap_or(ServiceStatus::Pending),
        })
        .collect();
    Json(views)
}

pub async fn service_documents_handler(State(state): State<AppState>, Path(service_id): Path<String>) -> Result<Json<Vec<IndexedDocument>>, ApiError> {
    let docs = state.engine.documents_for_service(&service_id);
    if docs.is_empty() && !state.services.iter().any(|s| s.id == service_id) {
        return Err((StatusCode::NOT_FOUND, format!("unknown service '{service_id}'")));
    }
    Ok(Json(docs))
}

// --- Admin endpoints ---
async fn index_refresh(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    state.stop_population().await;
    state.engine.clear();
    state.fetcher.invalidate();
    state.spawn_population();
    tracing::info!(services = state.services.len(), "index refresh started");
    Ok(Json(serde_json::json!({ "status": "refreshing", "services": state.services.len() })))
}

async fn index_clear(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    state.stop_population().await;
    state.engine.clear();
    state.progress.reset(std::iter::empty::<&str>());
    Ok(Json(serde_json::json!({ "status": "cleared" })))
}

/// Admin routes are disabled unless `ADMIN_TOKEN` is configured.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err((StatusCode::UNAUTHORIZED, "admin routes disabled: ADMIN_TOKEN not set".into()));
    };
    match headers.get(ADMIN_HEADER).and_then(|v| v.to_str().ok()) {
        Some(token) if token == expected => Ok(()),
        _ => Err((StatusCode::UNAUTHORIZED, "invalid admin token".into())),
    }
}

pub fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}

/// Up to 200 characters around the first query term found in `text`, with matches wrapped in `<em>`.
pub fn snippet(text: &str, raw_terms: &[String]) -> String {
    if text.is_empty() { return String::new(); }
    let first_idx = raw_terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .find_map(|t| find_case_insensitive(text, t));
    let snippet: String = match first_idx {
        Some(idx) => {
            let start = char_boundary(text, idx.saturating_sub(PREVIEW_CHARS / 2));
            text[start..].chars().take(PREVIEW_CHARS).collect()
        }
        None => text.chars().take(PREVIEW_CHARS).collect(),
    };
    highlight_terms(&snippet, raw_terms)
}

fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.to_lowercase();
    let n = needle.to_lowercase();
    h.find(&n)
}

fn char_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Single pass over `snippet` so inserted tags are never matched again.
/// Longer terms come first in the alternation to win over their prefixes.
fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut escaped: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(regex::escape)
        .collect();
    if escaped.is_empty() {
        return snippet.to_string();
    }
    escaped.sort_by(|a, b| b.len().cmp(&a.len()));
    let Ok(pat) = regex::RegexBuilder::new(&escaped.join("|")).case_insensitive(true).build() else {
        return snippet.to_string();
    };
    pat.replace_all(snippet, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).into_owned()
}
