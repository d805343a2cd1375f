use anyhow::Result;
use axum::Router;
use cari_core::config::{DEFAULT_MU, DEFAULT_TOP_K};
use cari_core::ScoringModel;
use cari_server::{build_app, AppOptions};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Document directory used for rebuilds and when no index exists yet
    #[arg(long)]
    corpus: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Dirichlet smoothing parameter
    #[arg(long, default_value_t = DEFAULT_MU)]
    mu: f64,
    /// Results returned when a request does not pass `k`
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    k: usize,
    /// Ranking used when a request does not pass `model`: `lm` or `tfidf`
    #[arg(long, default_value_t = ScoringModel::QueryLikelihood)]
    model: ScoringModel,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let opts = AppOptions {
        index_dir: args.index,
        corpus_dir: args.corpus,
        mu: args.mu,
        default_k: args.k,
        model: args.model,
        admin_token: std::env::var("ADMIN_TOKEN").ok(),
    };
    let app: Router = build_app(opts)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
