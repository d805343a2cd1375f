use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::normalizer::normalize;
use crate::stemmer::TalaStemmer;
use crate::stopwords::StopwordFilter;
use crate::tokenizer::tokenize;

/// Unchanged words shorter than this are not reported as unstemmed.
const UNSTEMMED_MIN_CHARS: usize = 4;

/// Token counts after each preprocessing step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStats {
    pub tokens: usize,
    pub after_stopword: usize,
    pub after_stem: usize,
    pub unique_stems: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub stems: Vec<String>,
    pub stats: TokenStats,
    /// Distinct tokens the stemmer left untouched, sorted.
    pub unstemmed: Vec<String>,
}

/// Normalizer, tokenizer, stopword filter and stemmer run in that order.
#[derive(Debug, Clone)]
pub struct Analyzer {
    stopwords: StopwordFilter,
    stemmer: TalaStemmer,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(StopwordFilter::indonesian(), TalaStemmer::default())
    }
}

impl Analyzer {
    pub fn new(stopwords: StopwordFilter, stemmer: TalaStemmer) -> Self {
        Self { stopwords, stemmer }
    }

    pub fn stemmer(&self) -> &TalaStemmer {
        &self.stemmer
    }

    pub fn stopwords(&self) -> &StopwordFilter {
        &self.stopwords
    }

    /// Raw text to the sequence of stemmed terms.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let tokens = self.stopwords.filter(tokenize(&normalize(text)));
        self.stemmer.stem_all(&tokens)
    }

    pub fn analyze_with_stats(&self, text: &str) -> Analysis {
        let tokens = tokenize(&normalize(text));
        let token_count = tokens.len();
        let kept = self.stopwords.filter(tokens);
        let stems = self.stemmer.stem_all(&kept);

        let unique_stems = stems.iter().collect::<HashSet<_>>().len();
        let unstemmed: BTreeSet<&String> = kept
            .iter()
            .zip(stems.iter())
            .filter(|(orig, stem)| orig == stem && orig.chars().count() >= UNSTEMMED_MIN_CHARS)
            .map(|(orig, _)| orig)
            .collect();

        Analysis {
            stats: TokenStats {
                tokens: token_count,
                after_stopword: kept.len(),
                after_stem: stems.len(),
                unique_stems,
            },
            unstemmed: unstemmed.into_iter().cloned().collect(),
            stems,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_pipeline() {
        let analyzer = Analyzer::default();
        let stems = analyzer.analyze("Kucing dan anjing BERMAIN, lalu dimakan!");
        assert_eq!(stems, vec!["kucing", "anjing", "main", "lalu", "makan"]);
    }

    #[test]
    fn stats_track_each_stage() {
        let analysis = Analyzer::default().analyze_with_stats("kucing dan kucing bermain di rumah");
        assert_eq!(
            analysis.stats,
            TokenStats { tokens: 6, after_stopword: 4, after_stem: 4, unique_stems: 3 }
        );
        assert_eq!(analysis.unstemmed, vec!["kucing", "rumah"]);
    }

    #[test]
    fn stopword_only_text_yields_nothing() {
        let analysis = Analyzer::default().analyze_with_stats("dan yang di ke");
        assert!(analysis.stems.is_empty());
        assert_eq!(analysis.stats.tokens, 4);
        assert_eq!(analysis.stats.unique_stems, 0);
    }
}
