//! Query-likelihood ranking with Dirichlet-prior smoothing.
//!
//! For a query term `t` and document `d`:
//!
//! ```text
//! P(t|C)   = cf(t) / |C|              (1 / |C| when cf(t) = 0, 0 when |C| = 0)
//! p(t|d)   = (tf(t,d) + mu * P(t|C)) / (|d| + mu)
//! score(d) = sum over t of qtf(t) * ln p(t|d)
//! ```
//!
//! Only documents containing at least one query term are ranked.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::config::{validate_mu, SearchConfig, DEFAULT_MU};
use crate::error::{Error, Result};
use crate::index::{DocId, InvertedIndex};
use crate::query::Query;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub doc_id: DocId,
    /// Log-probability under query likelihood (usually negative); cosine
    /// similarity in (0, 1] under TF-IDF.
    pub score: f64,
    /// Sum of query term frequencies over terms present in the document.
    pub matched_term_weight: u32,
}

/// Which ranking function answers a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringModel {
    /// Dirichlet-smoothed query likelihood ([`RetrievalEngine`]).
    #[default]
    QueryLikelihood,
    /// TF-IDF vectors with cosine similarity ([`crate::tfidf::TfIdfModel`]).
    TfIdf,
}

impl fmt::Display for ScoringModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScoringModel::QueryLikelihood => "lm",
            ScoringModel::TfIdf => "tfidf",
        })
    }
}

impl FromStr for ScoringModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lm" | "dirichlet" | "query_likelihood" => Ok(ScoringModel::QueryLikelihood),
            "tfidf" | "tf-idf" | "cosine" => Ok(ScoringModel::TfIdf),
            other => Err(Error::InvalidConfiguration(format!("unknown scoring model {other:?}, expected lm or tfidf"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalEngine {
    mu: f64,
}

impl Default for RetrievalEngine {
    fn default() -> Self {
        Self { mu: DEFAULT_MU }
    }
}

impl RetrievalEngine {
    pub fn new(mu: f64) -> Result<Self> {
        Ok(Self { mu: validate_mu(mu)? })
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        Self::new(config.mu)
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Rank documents for `query`, best first, at most `top_k` of them.
    /// Equal scores are ordered by ascending document id.
    pub fn search(&self, index: &InvertedIndex, query: &Query, top_k: usize) -> Vec<ScoredResult> {
        if top_k == 0 || query.is_empty() || index.is_empty() {
            return Vec::new();
        }

        let collection_length = index.collection_length() as f64;
        let mut terms: Vec<(u32, f64, HashMap<DocId, u32>)> = Vec::with_capacity(query.terms.len());
        let mut candidates: BTreeMap<DocId, u32> = BTreeMap::new();
        for (term, &qtf) in &query.terms {
            let postings = index.postings(term);
            for p in postings {
                *candidates.entry(p.doc_id).or_insert(0) += qtf;
            }
            let tf_by_doc: HashMap<DocId, u32> = postings.iter().map(|p| (p.doc_id, p.term_frequency)).collect();
            terms.push((qtf, collection_probability(index.collection_frequency(term), collection_length), tf_by_doc));
        }

        let mut results: Vec<ScoredResult> = Vec::with_capacity(candidates.len());
        for (doc_id, matched_term_weight) in candidates {
            let Some(doc) = index.document(doc_id) else { continue };
            let doc_len = f64::from(doc.token_count);
            let mut score = 0.0;
            for (qtf, p_collection, tf_by_doc) in &terms {
                let tf = tf_by_doc.get(&doc_id).copied().unwrap_or(0);
                let smoothed = (f64::from(tf) + self.mu * p_collection) / (doc_len + self.mu);
                if smoothed > 0.0 {
                    score += f64::from(*qtf) * smoothed.ln();
                }
            }
            results.push(ScoredResult { doc_id, score, matched_term_weight });
        }

        let results = rank(results, top_k);
        tracing::debug!(terms = query.terms.len(), hits = results.len(), "query likelihood search");
        results
    }
}

/// Best first; equal scores by ascending document id.
pub(crate) fn rank(mut results: Vec<ScoredResult>, top_k: usize) -> Vec<ScoredResult> {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    results.truncate(top_k);
    results
}

fn collection_probability(collection_frequency: u64, collection_length: f64) -> f64 {
    if collection_length <= 0.0 {
        0.0
    } else if collection_frequency > 0 {
        collection_frequency as f64 / collection_length
    } else {
        1.0 / collection_length
    }
}
