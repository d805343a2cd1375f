use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cari_core::persist::{load_meta, save_snapshot, IndexPaths};
use cari_core::{IndexingPipeline, QueryProcessor, RetrievalEngine};
use cari_server::{build_app, build_state, router, AppOptions};
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

fn write_corpus(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("1-kucing.txt"), "Kucing makan ikan.").unwrap();
    fs::write(dir.join("2-anjing.txt"), "Anjing makan tulang.").unwrap();
    fs::write(dir.join("3-main.txt"), "Kucing dan anjing bermain.").unwrap();
    fs::write(dir.join("4-kosong.txt"), "   ").unwrap();
}

fn build_tiny_index(corpus: &Path, index: &Path) {
    let build = IndexingPipeline::plain_text().ingest(corpus, &["txt"]).unwrap();
    assert_eq!(build.report.failures.len(), 1);
    save_snapshot(&IndexPaths::new(index), &build.index, &build.texts).unwrap();
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let (corpus, index) = (dir.path().join("corpus"), dir.path().join("index"));
    write_corpus(&corpus);
    build_tiny_index(&corpus, &index);
    let app = build_app(AppOptions::new(&index)).unwrap();

    let (status, json) = call(app, get("/search?q=kucing%20makan&k=5")).await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 3);
    assert_eq!(arr[0]["doc_id"].as_u64().unwrap(), 1);
    assert_eq!(arr[0]["matched_term_weight"].as_u64().unwrap(), 2);
    assert_eq!(arr[0]["filename"], "1-kucing.txt");
    let snippet = arr[0]["snippet"].as_str().unwrap();
    assert!(snippet.contains("<em>Kucing</em>"));
    assert_eq!(json["terms"], serde_json::json!(["kucing", "makan"]));
}

#[tokio::test]
async fn negative_k_is_rejected_and_zero_k_is_empty() {
    let dir = tempdir().unwrap();
    let (corpus, index) = (dir.path().join("corpus"), dir.path().join("index"));
    write_corpus(&corpus);
    build_tiny_index(&corpus, &index);
    let app = build_app(AppOptions::new(&index)).unwrap();

    let (status, _) = call(app.clone(), get("/search?q=kucing&k=-1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = call(app, get("/search?q=kucing&k=0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"].as_u64().unwrap(), 0);
}

#[tokio::test]
async fn doc_and_stats_endpoints() {
    let dir = tempdir().unwrap();
    let (corpus, index) = (dir.path().join("corpus"), dir.path().join("index"));
    write_corpus(&corpus);
    build_tiny_index(&corpus, &index);
    let app = build_app(AppOptions::new(&index)).unwrap();

    let (status, json) = call(app.clone(), get("/doc/3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["token_count"].as_u64().unwrap(), 3);
    assert_eq!(json["text"], "Kucing dan anjing bermain.");

    let (status, _) = call(app.clone(), get("/doc/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = call(app, get("/stats")).await;
    assert_eq!(json["num_docs"].as_u64().unwrap(), 3);
    assert_eq!(json["collection_length"].as_u64().unwrap(), 9);
}

#[tokio::test]
async fn builds_from_corpus_when_snapshot_missing() {
    let dir = tempdir().unwrap();
    let (corpus, index) = (dir.path().join("corpus"), dir.path().join("index"));
    write_corpus(&corpus);
    let mut opts = AppOptions::new(&index);
    opts.corpus_dir = Some(corpus);
    let app = build_app(opts).unwrap();

    assert_eq!(load_meta(&IndexPaths::new(&index)).unwrap().num_docs, 3);
    let (status, json) = call(app, get("/search?q=tulang")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["doc_id"].as_u64().unwrap(), 2);
}

#[tokio::test]
async fn rebuild_requires_admin_token() {
    let dir = tempdir().unwrap();
    let (corpus, index) = (dir.path().join("corpus"), dir.path().join("index"));
    write_corpus(&corpus);
    build_tiny_index(&corpus, &index);
    let app = build_app(AppOptions::new(&index)).unwrap();

    let req = Request::post("/index/rebuild").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

fn rebuild(token: &str) -> Request<Body> {
    Request::post("/index/rebuild").header("X-ADMIN-TOKEN", token).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn rebuild_swaps_in_new_corpus() {
    let dir = tempdir().unwrap();
    let (corpus, index) = (dir.path().join("corpus"), dir.path().join("index"));
    write_corpus(&corpus);
    build_tiny_index(&corpus, &index);
    let mut opts = AppOptions::new(&index);
    opts.corpus_dir = Some(corpus.clone());
    opts.admin_token = Some("rahasia".to_string());
    let state = build_state(opts).unwrap();
    let app = router(state.clone());
    let before = state.current();

    fs::remove_file(corpus.join("1-kucing.txt")).unwrap();
    fs::remove_file(corpus.join("3-main.txt")).unwrap();
    fs::write(corpus.join("5-burung.txt"), "Burung terbang tinggi.").unwrap();

    let (status, _) = call(app.clone(), rebuild("salah")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(state.current().index.num_docs(), 3);

    let (status, json) = call(app.clone(), rebuild("rahasia")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["num_docs"].as_u64().unwrap(), 2);
    assert_eq!(json["generation"], "gen-000002");
    assert_eq!(json["report"]["failures"].as_array().unwrap().len(), 1);

    let (_, json) = call(app.clone(), get("/stats")).await;
    assert_eq!(json["num_docs"].as_u64().unwrap(), 2);
    assert_eq!(json["generation"], "gen-000002");

    let (_, json) = call(app.clone(), get("/search?q=burung")).await;
    assert_eq!(json["results"][0]["filename"], "5-burung.txt");
    assert!(json["results"][0]["snippet"].as_str().unwrap().contains("<em>Burung</em>"));
    let (_, json) = call(app.clone(), get("/search?q=kucing")).await;
    assert_eq!(json["total_hits"].as_u64().unwrap(), 0);

    let (_, json) = call(app, get("/doc/2")).await;
    assert_eq!(json["filename"], "5-burung.txt");
    assert_eq!(json["text"], "Burung terbang tinggi.");

    // a handle taken before the rebuild still answers from the old corpus
    assert_eq!(before.dir.generation, "gen-000001");
    assert_eq!(before.index.num_docs(), 3);
    assert_eq!(before.index.document(1).unwrap().meta.filename, "1-kucing.txt");
    let query = QueryProcessor::default().process("kucing");
    let hits = RetrievalEngine::default().search(&before.index, &query, 10);
    let ids: Vec<u32> = hits.iter().map(|h| h.doc_id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(state.current().dir.generation, "gen-000002");
}

#[tokio::test]
async fn rebuild_without_corpus_conflicts() {
    let dir = tempdir().unwrap();
    let (corpus, index) = (dir.path().join("corpus"), dir.path().join("index"));
    write_corpus(&corpus);
    build_tiny_index(&corpus, &index);
    let mut opts = AppOptions::new(&index);
    opts.admin_token = Some("rahasia".to_string());
    let app = build_app(opts).unwrap();

    let (status, _) = call(app.clone(), rebuild("rahasia")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, json) = call(app, get("/stats")).await;
    assert_eq!(json["generation"], "gen-000001");
}

#[tokio::test]
async fn search_can_rank_with_tfidf() {
    let dir = tempdir().unwrap();
    let (corpus, index) = (dir.path().join("corpus"), dir.path().join("index"));
    write_corpus(&corpus);
    build_tiny_index(&corpus, &index);
    let app = build_app(AppOptions::new(&index)).unwrap();

    let (status, json) = call(app.clone(), get("/search?q=tulang&model=tfidf")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["model"], "tf_idf");
    assert_eq!(json["total_hits"].as_u64().unwrap(), 1);
    assert_eq!(json["results"][0]["doc_id"].as_u64().unwrap(), 2);
    let score = json["results"][0]["score"].as_f64().unwrap();
    assert!(score > 0.0 && score <= 1.0);

    let (_, json) = call(app.clone(), get("/search?q=tulang")).await;
    assert_eq!(json["model"], "query_likelihood");

    let (status, _) = call(app, get("/search?q=tulang&model=bm25")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
