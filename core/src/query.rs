use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analyzer::Analyzer;

/// Stemmed query terms with their occurrence counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub terms: BTreeMap<String, u32>,
    /// Stemmed tokens in query order, kept for highlighting.
    pub tokens: Vec<String>,
}

impl Query {
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        let mut terms = BTreeMap::new();
        for token in &tokens {
            *terms.entry(token.clone()).or_insert(0) += 1;
        }
        Self { terms, tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Turns raw query text into a [`Query`] with the same preprocessing used at
/// index time. Independent of any index, so results can be cached by text.
#[derive(Debug, Clone, Default)]
pub struct QueryProcessor {
    analyzer: Analyzer,
}

impl QueryProcessor {
    pub fn new(analyzer: Analyzer) -> Self {
        Self { analyzer }
    }

    pub fn process(&self, raw_query: &str) -> Query {
        Query::from_tokens(self.analyzer.analyze(raw_query))
    }
}
