use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};

pub type DocId = u32;

/// Caller-owned description of where a document came from. The engine
/// carries it through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub filename: String,
    pub path: Option<String>,
    /// Relative path to the stored full text for snippet extraction, e.g., texts/{doc_id}.txt
    pub text_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    /// Number of stemmed tokens.
    pub token_count: u32,
    pub meta: DocMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingEntry {
    pub doc_id: DocId,
    pub term_frequency: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Sum of `term_frequency` over `postings`.
    pub collection_frequency: u64,
    /// In document insertion order.
    pub postings: Vec<PostingEntry>,
}

/// One document's stemmed tokens ready to be indexed.
#[derive(Debug, Clone)]
pub struct IndexInput {
    pub doc_id: DocId,
    pub tokens: Vec<String>,
    pub meta: DocMeta,
}

/// Term statistics for a fixed corpus snapshot.
///
/// Fields are private: the only way to obtain a populated index is
/// [`InvertedIndex::build`], which keeps collection frequencies and the
/// collection length consistent with the postings. Rebuilding produces a new
/// value; there is no incremental mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    terms: HashMap<String, IndexEntry>,
    documents: BTreeMap<DocId, Document>,
    collection_length: u64,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build<I>(inputs: I) -> Result<Self>
    where
        I: IntoIterator<Item = IndexInput>,
    {
        let mut index = Self::new();
        for input in inputs {
            if index.documents.contains_key(&input.doc_id) {
                return Err(Error::DuplicateDocument(input.doc_id));
            }

            let token_count = token_count(input.doc_id, input.tokens.len())?;
            let mut tf_counts: HashMap<&str, u32> = HashMap::new();
            let mut first_seen: Vec<&str> = Vec::new();
            for term in &input.tokens {
                let count = tf_counts.entry(term.as_str()).or_insert(0);
                if *count == 0 {
                    first_seen.push(term.as_str());
                }
                *count += 1;
            }

            for term in first_seen {
                let term_frequency = tf_counts[term];
                let entry = index.terms.entry(term.to_string()).or_default();
                entry.collection_frequency += u64::from(term_frequency);
                entry.postings.push(PostingEntry { doc_id: input.doc_id, term_frequency });
            }

            index.collection_length += u64::from(token_count);
            index.documents.insert(input.doc_id, Document { id: input.doc_id, token_count, meta: input.meta });
        }
        tracing::debug!(
            num_docs = index.documents.len(),
            num_terms = index.terms.len(),
            collection_length = index.collection_length,
            "built inverted index"
        );
        Ok(index)
    }

    pub fn entry(&self, term: &str) -> Option<&IndexEntry> {
        self.terms.get(term)
    }

    pub fn postings(&self, term: &str) -> &[PostingEntry] {
        self.terms.get(term).map(|e| e.postings.as_slice()).unwrap_or(&[])
    }

    pub fn collection_frequency(&self, term: &str) -> u64 {
        self.terms.get(term).map_or(0, |e| e.collection_frequency)
    }

    pub fn term_frequency(&self, term: &str, doc_id: DocId) -> u32 {
        self.postings(term)
            .iter()
            .find(|p| p.doc_id == doc_id)
            .map_or(0, |p| p.term_frequency)
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.terms.iter().map(|(t, e)| (t.as_str(), e))
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.documents.get(&doc_id)
    }

    /// Documents in ascending id order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn num_docs(&self) -> usize {
        self.documents.len()
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn collection_length(&self) -> u64 {
        self.collection_length
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn token_count(doc_id: DocId, len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| Error::CapacityExceeded(format!("document {doc_id} has {len} tokens, more than {}", u32::MAX)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(doc_id: DocId, text: &str) -> IndexInput {
        IndexInput {
            doc_id,
            tokens: text.split_whitespace().map(str::to_string).collect(),
            meta: DocMeta { filename: format!("{doc_id}.txt"), ..DocMeta::default() },
        }
    }

    #[test]
    fn counts_frequencies_and_lengths() {
        let index = InvertedIndex::build(vec![input(1, "a b a"), input(2, "b c")]).unwrap();
        assert_eq!(index.num_docs(), 2);
        assert_eq!(index.collection_length(), 5);
        assert_eq!(index.collection_frequency("a"), 2);
        assert_eq!(index.collection_frequency("b"), 2);
        assert_eq!(index.collection_frequency("zzz"), 0);
        assert_eq!(index.term_frequency("a", 1), 2);
        assert_eq!(index.term_frequency("a", 2), 0);
        assert_eq!(
            index.postings("b"),
            &[PostingEntry { doc_id: 1, term_frequency: 1 }, PostingEntry { doc_id: 2, term_frequency: 1 }]
        );
    }

    #[test]
    fn empty_document_still_registered() {
        let index = InvertedIndex::build(vec![input(7, "")]).unwrap();
        let doc = index.document(7).unwrap();
        assert_eq!(doc.token_count, 0);
        assert_eq!(index.num_terms(), 0);
        assert_eq!(index.collection_length(), 0);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = InvertedIndex::build(vec![input(1, "a"), input(1, "b")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateDocument(1)));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn oversized_token_count_is_an_error() {
        assert_eq!(token_count(1, u32::MAX as usize).unwrap(), u32::MAX);
        let err = token_count(3, u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded(_)));
        assert!(err.to_string().contains("document 3"));
    }
}
