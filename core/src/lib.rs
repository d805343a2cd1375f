//! Lexical search over Indonesian documents: Tala stemming, an inverted
//! index with collection statistics, and Dirichlet-smoothed query-likelihood
//! ranking, with TF-IDF cosine ranking as an alternative.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod index;
pub mod normalizer;
pub mod persist;
pub mod pipeline;
pub mod query;
pub mod retrieval;
pub mod stemmer;
pub mod stopwords;
pub mod tfidf;
pub mod tokenizer;

pub use analyzer::{Analysis, Analyzer, TokenStats};
pub use config::SearchConfig;
pub use error::{Error, Result};
pub use index::{DocId, DocMeta, Document, IndexEntry, IndexInput, InvertedIndex, PostingEntry};
pub use pipeline::{BatchReport, CorpusBuild, Discovery, DocumentReader, IndexingPipeline, PlainTextReader};
pub use query::{Query, QueryProcessor};
pub use retrieval::{RetrievalEngine, ScoredResult, ScoringModel};
pub use stemmer::{AffixRules, TalaStemmer};
pub use stopwords::StopwordFilter;
pub use tfidf::TfIdfModel;
