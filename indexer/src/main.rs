use anyhow::{Context, Result};
use cari_core::config::{DEFAULT_EXTENSIONS, DEFAULT_MU, DEFAULT_TOP_K};
use cari_core::persist::{load_index, save_snapshot, IndexPaths};
use cari_core::{
    IndexingPipeline, QueryProcessor, RetrievalEngine, ScoringModel, SearchConfig, TalaStemmer, TfIdfModel,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use std::path::Path;

#[derive(Parser)]
#[command(name = "cari-indexer")]
#[command(about = "Build and query an Indonesian query-likelihood search index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a document file or directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// File extensions to pick up when walking a directory
        #[arg(long = "ext")]
        extensions: Vec<String>,
    },
    /// Rank documents in a built index against a query
    Search {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Query text
        #[arg(long)]
        query: String,
        /// Number of results
        #[arg(long, default_value_t = DEFAULT_TOP_K as i64, allow_negative_numbers = true)]
        k: i64,
        /// Dirichlet smoothing parameter
        #[arg(long, default_value_t = DEFAULT_MU)]
        mu: f64,
        /// Ranking function: `lm` (query likelihood) or `tfidf` (cosine)
        #[arg(long, default_value_t = ScoringModel::QueryLikelihood)]
        model: ScoringModel,
    },
    /// Show how words are stemmed
    Stem {
        words: Vec<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, extensions } => build_index(&input, &output, &extensions),
        Commands::Search { index, query, k, mu, model } => search(&index, &query, k, mu, model),
        Commands::Stem { words } => {
            stem_words(&words);
            Ok(())
        }
    }
}

fn build_index(input: &str, output: &str, extensions: &[String]) -> Result<()> {
    let extensions: Vec<String> = if extensions.is_empty() {
        DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
    } else {
        extensions.to_vec()
    };
    let build = IndexingPipeline::plain_text().ingest(Path::new(input), &extensions)?;
    if build.report.indexed.is_empty() {
        anyhow::bail!("no documents indexed from {input}");
    }
    for failure in &build.report.failures {
        tracing::warn!(path = %failure.path.display(), reason = %failure.reason, "document skipped");
    }
    for doc in &build.report.indexed {
        tracing::debug!(
            doc_id = doc.doc_id,
            filename = %doc.filename,
            tokens = doc.stats.tokens,
            after_stopword = doc.stats.after_stopword,
            after_stem = doc.stats.after_stem,
            unique_stems = doc.stats.unique_stems,
            unstemmed = doc.unstemmed.len(),
            "indexed document"
        );
    }

    let paths = IndexPaths::new(output);
    let meta = save_snapshot(&paths, &build.index, &build.texts)
        .with_context(|| format!("writing snapshot to {output}"))?;
    tracing::info!(
        output,
        num_docs = meta.num_docs,
        num_terms = meta.num_terms,
        skipped = build.report.failures.len(),
        "index build complete"
    );
    Ok(())
}

fn search(index_dir: &str, query: &str, k: i64, mu: f64, model: ScoringModel) -> Result<()> {
    let config = SearchConfig::new(mu, k)?;
    let index = load_index(&IndexPaths::new(index_dir)).with_context(|| format!("loading index from {index_dir}"))?;
    let engine = RetrievalEngine::from_config(&config)?;

    let query = QueryProcessor::default().process(query);
    tracing::debug!(terms = ?query.terms, %model, "processed query");
    let results = match model {
        ScoringModel::QueryLikelihood => engine.search(&index, &query, config.top_k),
        ScoringModel::TfIdf => TfIdfModel::build(&index).search(&index, &query, config.top_k),
    };
    if results.is_empty() {
        println!("no matching documents");
        return Ok(());
    }
    for (rank, r) in results.iter().enumerate() {
        let filename = index.document(r.doc_id).map(|d| d.meta.filename.as_str()).unwrap_or("?");
        println!("{:>3}. [{}] {:.4} (matched {}) {}", rank + 1, r.doc_id, r.score, r.matched_term_weight, filename);
    }
    Ok(())
}

fn stem_words(words: &[String]) {
    let stemmer = TalaStemmer::default();
    for word in words {
        let word = word.to_lowercase();
        let out = stemmer.stem_detailed(&word);
        let prefixes: Vec<String> = out.prefixes.iter().map(|p| p.to_string()).collect();
        println!(
            "{word} -> {} (prefixes: [{}], suffix: {}, possessive: {}, particle: {})",
            out.root,
            prefixes.join(", "),
            out.suffix.as_deref().unwrap_or("-"),
            out.possessive.as_deref().unwrap_or("-"),
            out.particle.as_deref().unwrap_or("-"),
        );
    }
}
