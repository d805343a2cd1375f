//! TF-IDF weighting with cosine ranking, the alternative to query likelihood.
//!
//! ```text
//! idf(t)    = log10(N / df(t))
//! w(t,d)    = tf(t,d) / |d| * idf(t)
//! w(t,q)    = qtf(t) / |q| * idf(t)
//! score(d)  = sum over t of w(t,q) * w(t,d) / (|q|_2 * |d|_2)
//! ```
//!
//! Document norms run over every term of the document, so they are computed
//! once per index. Only documents with a positive score are returned.

use std::collections::{BTreeMap, HashMap};

use crate::index::{DocId, InvertedIndex};
use crate::query::Query;
use crate::retrieval::{rank, ScoredResult};

#[derive(Debug, Clone, Default)]
pub struct TfIdfModel {
    idf: HashMap<String, f64>,
    norms: HashMap<DocId, f64>,
}

impl TfIdfModel {
    pub fn build(index: &InvertedIndex) -> Self {
        let num_docs = index.num_docs() as f64;
        let mut idf = HashMap::with_capacity(index.num_terms());
        let mut squares: HashMap<DocId, f64> = HashMap::with_capacity(index.num_docs());
        for (term, entry) in index.terms() {
            if entry.postings.is_empty() {
                continue;
            }
            let term_idf = (num_docs / entry.postings.len() as f64).log10();
            for p in &entry.postings {
                let token_count = index.document(p.doc_id).map_or(0, |d| d.token_count);
                let w = length_normalized(p.term_frequency, token_count) * term_idf;
                *squares.entry(p.doc_id).or_insert(0.0) += w * w;
            }
            idf.insert(term.to_string(), term_idf);
        }
        let norms = squares.into_iter().map(|(doc_id, sum)| (doc_id, sum.sqrt())).collect();
        Self { idf, norms }
    }

    /// Zero for terms outside the collection.
    pub fn idf(&self, term: &str) -> f64 {
        self.idf.get(term).copied().unwrap_or(0.0)
    }

    /// Euclidean length of the document's weight vector.
    pub fn norm(&self, doc_id: DocId) -> f64 {
        self.norms.get(&doc_id).copied().unwrap_or(0.0)
    }

    /// Rank documents by cosine similarity to `query`. `index` must be the
    /// one this model was built from.
    pub fn search(&self, index: &InvertedIndex, query: &Query, top_k: usize) -> Vec<ScoredResult> {
        if top_k == 0 || query.is_empty() || index.is_empty() {
            return Vec::new();
        }

        let query_length: u32 = query.terms.values().sum();
        let mut query_norm = 0.0;
        let mut dots: BTreeMap<DocId, (f64, u32)> = BTreeMap::new();
        for (term, &qtf) in &query.terms {
            let idf = self.idf(term);
            let q_weight = length_normalized(qtf, query_length) * idf;
            query_norm += q_weight * q_weight;
            for p in index.postings(term) {
                let token_count = index.document(p.doc_id).map_or(0, |d| d.token_count);
                let d_weight = length_normalized(p.term_frequency, token_count) * idf;
                let slot = dots.entry(p.doc_id).or_insert((0.0, 0));
                slot.0 += q_weight * d_weight;
                slot.1 += qtf;
            }
        }
        let query_norm = query_norm.sqrt();
        if query_norm == 0.0 {
            return Vec::new();
        }

        let results = dots
            .into_iter()
            .filter_map(|(doc_id, (dot, matched_term_weight))| {
                let doc_norm = self.norm(doc_id);
                if doc_norm == 0.0 {
                    return None;
                }
                let score = dot / (query_norm * doc_norm);
                (score > 0.0).then_some(ScoredResult { doc_id, score, matched_term_weight })
            })
            .collect();
        let results = rank(results, top_k);
        tracing::debug!(terms = query.terms.len(), hits = results.len(), "tf-idf cosine search");
        results
    }
}

fn length_normalized(count: u32, length: u32) -> f64 {
    if length == 0 {
        0.0
    } else {
        f64::from(count) / f64::from(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{DocMeta, IndexInput};

    fn index_of(docs: &[&str]) -> InvertedIndex {
        InvertedIndex::build(docs.iter().enumerate().map(|(i, text)| IndexInput {
            doc_id: i as DocId + 1,
            tokens: text.split_whitespace().map(str::to_string).collect(),
            meta: DocMeta::default(),
        }))
        .unwrap()
    }

    fn query(terms: &[&str]) -> Query {
        Query::from_tokens(terms.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn idf_and_norms() {
        let index = index_of(&["a a b", "b c", "c d"]);
        let model = TfIdfModel::build(&index);
        assert!((model.idf("a") - 3f64.log10()).abs() < 1e-12);
        assert!((model.idf("b") - 1.5f64.log10()).abs() < 1e-12);
        assert_eq!(model.idf("zzz"), 0.0);

        let (ia, ib) = (model.idf("a"), model.idf("b"));
        let expected = ((2.0 / 3.0 * ia).powi(2) + (1.0 / 3.0 * ib).powi(2)).sqrt();
        assert!((model.norm(1) - expected).abs() < 1e-12);
    }

    #[test]
    fn cosine_scores_match_hand_computation() {
        let index = index_of(&["a a b", "b c", "c d"]);
        let model = TfIdfModel::build(&index);
        let results = model.search(&index, &query(&["a", "b"]), 10);
        let ids: Vec<DocId> = results.iter().map(|r| r.doc_id).collect();
        assert_eq!(ids, vec![1, 2]);

        let (ia, ib) = (model.idf("a"), model.idf("b"));
        let (qa, qb) = (0.5 * ia, 0.5 * ib);
        let q_norm = (qa * qa + qb * qb).sqrt();
        let dot1 = qa * (2.0 / 3.0 * ia) + qb * (1.0 / 3.0 * ib);
        assert!((results[0].score - dot1 / (q_norm * model.norm(1))).abs() < 1e-12);
        assert_eq!(results[0].matched_term_weight, 2);
        let dot2 = qb * (0.5 * ib);
        assert!((results[1].score - dot2 / (q_norm * model.norm(2))).abs() < 1e-12);
        assert_eq!(results[1].matched_term_weight, 1);
    }

    #[test]
    fn terms_in_every_document_score_nothing() {
        let index = index_of(&["x y", "x z"]);
        let model = TfIdfModel::build(&index);
        assert!(model.search(&index, &query(&["x"]), 10).is_empty());

        let single = index_of(&["kucing makan ikan"]);
        let model = TfIdfModel::build(&single);
        assert!(model.search(&single, &query(&["kucing"]), 10).is_empty());
    }

    #[test]
    fn ties_break_on_doc_id_and_truncate() {
        let index = index_of(&["x y", "x z", "w v", "x u"]);
        let model = TfIdfModel::build(&index);
        let results = model.search(&index, &query(&["x"]), 10);
        let ids: Vec<DocId> = results.iter().map(|r| r.doc_id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(model.search(&index, &query(&["x"]), 2).len(), 2);
        assert!(model.search(&index, &query(&["x"]), 0).is_empty());
        assert!(model.search(&index, &query(&["zzz"]), 5).is_empty());
    }
}
