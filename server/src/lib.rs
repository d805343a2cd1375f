use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use cari_core::config::{validate_top_k, DEFAULT_EXTENSIONS, DEFAULT_MU, DEFAULT_TOP_K, MAX_TOP_K};
use cari_core::persist::{open_snapshot, save_snapshot, IndexPaths, Snapshot, SnapshotDir};
use cari_core::{
    BatchReport, DocId, IndexingPipeline, InvertedIndex, QueryProcessor, RetrievalEngine, ScoringModel, TfIdfModel,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const SNIPPET_BEFORE: usize = 50;
const SNIPPET_AFTER: usize = 150;
const SNIPPET_FALLBACK: usize = 200;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub k: Option<i64>,
    /// `lm` or `tfidf`; the server default when absent.
    pub model: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub terms: Vec<String>,
    pub model: ScoringModel,
    pub took_ms: u128,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub matched_term_weight: u32,
    pub filename: String,
    pub path: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Serialize)]
pub struct RebuildResponse {
    pub num_docs: usize,
    pub num_terms: usize,
    pub generation: String,
    pub report: BatchReport,
}

#[derive(Debug, Clone)]
pub struct AppOptions {
    pub index_dir: PathBuf,
    /// Directory re-ingested by `/index/rebuild` and when no snapshot exists yet.
    pub corpus_dir: Option<PathBuf>,
    pub mu: f64,
    pub default_k: usize,
    pub model: ScoringModel,
    /// Required in `X-ADMIN-TOKEN` for `/index/rebuild`; rebuilds are refused when unset.
    pub admin_token: Option<String>,
}

impl AppOptions {
    pub fn new<P: Into<PathBuf>>(index_dir: P) -> Self {
        Self {
            index_dir: index_dir.into(),
            corpus_dir: None,
            mu: DEFAULT_MU,
            default_k: DEFAULT_TOP_K,
            model: ScoringModel::default(),
            admin_token: None,
        }
    }
}

/// A loaded snapshot generation with everything a search needs from it.
/// Texts are read from the same generation the index came from.
#[derive(Debug)]
pub struct ServedIndex {
    pub index: InvertedIndex,
    pub tfidf: TfIdfModel,
    pub dir: SnapshotDir,
}

impl ServedIndex {
    pub fn new(index: InvertedIndex, dir: SnapshotDir) -> Self {
        let tfidf = TfIdfModel::build(&index);
        Self { index, tfidf, dir }
    }
}

impl From<Snapshot> for ServedIndex {
    fn from(snapshot: Snapshot) -> Self {
        Self::new(snapshot.index, snapshot.dir)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub index_root: PathBuf,
    pub corpus_dir: Option<PathBuf>,
    /// Swapped wholesale on rebuild; requests clone the inner `Arc` and never
    /// hold the lock while scoring.
    pub index: Arc<RwLock<Arc<ServedIndex>>>,
    /// Serializes rebuilds, which share the snapshot root.
    rebuild_lock: Arc<Mutex<()>>,
    pub query_processor: Arc<QueryProcessor>,
    pub engine: RetrievalEngine,
    pub default_k: usize,
    pub model: ScoringModel,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn current(&self) -> Arc<ServedIndex> {
        self.index.read().clone()
    }
}

/// Load the live snapshot generation, or build one from the corpus when
/// there is none yet.
pub fn build_state(opts: AppOptions) -> Result<AppState> {
    let engine = RetrievalEngine::new(opts.mu)?;
    let served = match open_snapshot(&IndexPaths::new(&opts.index_dir)) {
        Ok(snapshot) => ServedIndex::from(snapshot),
        Err(err) => match &opts.corpus_dir {
            Some(corpus) => {
                tracing::warn!(error = %err, "no usable snapshot, building from corpus");
                rebuild_snapshot(&opts.index_dir, corpus)?.0
            }
            None => return Err(err.into()),
        },
    };
    tracing::info!(
        num_docs = served.index.num_docs(),
        num_terms = served.index.num_terms(),
        generation = %served.dir.generation,
        "index loaded"
    );

    Ok(AppState {
        index_root: opts.index_dir,
        corpus_dir: opts.corpus_dir,
        index: Arc::new(RwLock::new(Arc::new(served))),
        rebuild_lock: Arc::new(Mutex::new(())),
        query_processor: Arc::new(QueryProcessor::default()),
        engine,
        default_k: opts.default_k,
        model: opts.model,
        admin_token: opts.admin_token,
    })
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/stats", get(stats_handler))
        .route("/index/rebuild", post(rebuild_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub fn build_app(opts: AppOptions) -> Result<Router> {
    Ok(router(build_state(opts)?))
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let k = match params.k {
        Some(k) => validate_top_k(k).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
        None => state.default_k,
    }
    .min(MAX_TOP_K);
    let model = match params.model.as_deref() {
        Some(m) => m.parse::<ScoringModel>().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
        None => state.model,
    };

    let query = state.query_processor.process(&params.q);
    let served = state.current();
    let results = match model {
        ScoringModel::QueryLikelihood => state.engine.search(&served.index, &query, k),
        ScoringModel::TfIdf => served.tfidf.search(&served.index, &query, k),
    };
    tracing::debug!(q = %params.q, %model, terms = query.terms.len(), hits = results.len(), "search");

    let hits = results
        .into_iter()
        .filter_map(|r| {
            let doc = served.index.document(r.doc_id)?;
            let snippet = served.dir.load_text(r.doc_id).ok().map(|text| snippet_for(&text, &query.tokens));
            Some(SearchHit {
                doc_id: r.doc_id,
                score: r.score,
                matched_term_weight: r.matched_term_weight,
                filename: doc.meta.filename.clone(),
                path: doc.meta.path.clone(),
                snippet,
            })
        })
        .collect::<Vec<_>>();

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse {
        query: params.q,
        terms: query.terms.keys().cloned().collect(),
        model,
        took_ms: elapsed.as_millis(),
        took_s: elapsed.as_secs_f64(),
        total_hits: hits.len(),
        results: hits,
    }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<DocId>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let served = state.current();
    let Some(doc) = served.index.document(doc_id) else {
        return Err((StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))));
    };
    let mut obj = serde_json::json!({
        "doc_id": doc_id,
        "filename": doc.meta.filename,
        "path": doc.meta.path,
        "token_count": doc.token_count,
    });
    if let Ok(text) = served.dir.load_text(doc_id) {
        obj["text"] = serde_json::Value::String(text);
    }
    Ok(Json(obj))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let served = state.current();
    Json(serde_json::json!({
        "num_docs": served.index.num_docs(),
        "num_terms": served.index.num_terms(),
        "collection_length": served.index.collection_length(),
        "generation": served.dir.generation,
    }))
}

async fn rebuild_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RebuildResponse>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let corpus = state
        .corpus_dir
        .clone()
        .ok_or((StatusCode::CONFLICT, "server was started without --corpus".to_string()))?;
    let index_root = state.index_root.clone();
    let rebuild_lock = state.rebuild_lock.clone();
    let live = state.index.clone();

    // Write and swap under one lock: the served index is the newest generation.
    let response = tokio::task::spawn_blocking(move || -> Result<RebuildResponse> {
        let _guard = rebuild_lock.lock();
        let (served, report) = rebuild_snapshot(&index_root, &corpus)?;
        let response = RebuildResponse {
            num_docs: served.index.num_docs(),
            num_terms: served.index.num_terms(),
            generation: served.dir.generation.clone(),
            report,
        };
        *live.write() = Arc::new(served);
        Ok(response)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    tracing::info!(num_docs = response.num_docs, generation = %response.generation, "index swapped");
    Ok(Json(response))
}

fn rebuild_snapshot(index_root: &std::path::Path, corpus: &std::path::Path) -> Result<(ServedIndex, BatchReport)> {
    let build = IndexingPipeline::plain_text().ingest(corpus, DEFAULT_EXTENSIONS)?;
    let paths = IndexPaths::new(index_root);
    let meta = save_snapshot(&paths, &build.index, &build.texts)?;
    Ok((ServedIndex::new(build.index, paths.generation(&meta.generation)), build.report))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

/// Window of text around the first stemmed query term found, with every
/// term occurrence wrapped in `<em>`. Falls back to the opening of the text.
pub fn snippet_for(text: &str, terms: &[String]) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let pattern = terms_pattern(terms);

    let window = match pattern.as_ref().and_then(|re| re.find(&text)) {
        Some(m) => (back_chars(&text, m.start(), SNIPPET_BEFORE), forward_chars(&text, m.end(), SNIPPET_AFTER)),
        None => (0, forward_chars(&text, 0, SNIPPET_FALLBACK)),
    };
    let (start, end) = window;
    let body = match &pattern {
        Some(re) => re.replace_all(&text[start..end], "<em>$0</em>").into_owned(),
        None => text[start..end].to_string(),
    };

    let mut snippet = String::with_capacity(body.len() + 6);
    if start > 0 {
        snippet.push_str("...");
    }
    snippet.push_str(&body);
    if end < text.len() {
        snippet.push_str("...");
    }
    snippet
}

/// Case-insensitive alternation of the terms, longest first so that a
/// shorter term never splits a longer match.
fn terms_pattern(terms: &[String]) -> Option<regex::Regex> {
    let mut terms: Vec<&str> = terms.iter().map(String::as_str).filter(|t| !t.is_empty()).collect();
    if terms.is_empty() {
        return None;
    }
    terms.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    terms.dedup();
    let alternation = terms.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
    regex::RegexBuilder::new(&alternation).case_insensitive(true).build().ok()
}

fn back_chars(text: &str, from: usize, n: usize) -> usize {
    text[..from].char_indices().rev().nth(n.saturating_sub(1)).map_or(0, |(i, _)| i)
}

fn forward_chars(text: &str, from: usize, n: usize) -> usize {
    text[from..].char_indices().nth(n).map_or(text.len(), |(i, _)| from + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_highlights_stemmed_terms() {
        let s = snippet_for("Anak-anak  bermain bola di lapangan.", &["main".to_string()]);
        assert_eq!(s, "Anak-anak ber<em>main</em> bola di lapangan.");
    }

    #[test]
    fn snippet_windows_long_text() {
        let text = format!("{} kucing {}", "a ".repeat(100), "b ".repeat(200));
        let s = snippet_for(&text, &["kucing".to_string()]);
        assert!(s.starts_with("..."));
        assert!(s.ends_with("..."));
        assert!(s.contains("<em>kucing</em>"));
    }

    #[test]
    fn snippet_falls_back_to_opening() {
        let s = snippet_for("tidak ada yang cocok", &["gajah".to_string()]);
        assert_eq!(s, "tidak ada yang cocok");
    }
}
