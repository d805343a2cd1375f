//! Corpus ingestion: read documents, analyze them in parallel, then build
//! the index in a single sequential pass.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::analyzer::{Analyzer, TokenStats};
use crate::error::{Error, Result};
use crate::index::{DocId, DocMeta, IndexInput, InvertedIndex};
use crate::persist::text_rel_path;

/// Source of raw document text. Implementations must be callable from
/// several threads at once.
pub trait DocumentReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<String>;
}

/// Reads UTF-8 `.txt` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextReader;

impl DocumentReader for PlainTextReader {
    fn read(&self, path: &Path) -> Result<String> {
        read_document(path)
    }
}

pub fn read_document(path: &Path) -> Result<String> {
    let ext = path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase);
    if ext.as_deref() != Some("txt") {
        return Err(Error::UnsupportedFormat(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|e| Error::DocumentRead { path: path.to_path_buf(), reason: e.to_string() })?;
    String::from_utf8(bytes)
        .map_err(|e| Error::DocumentRead { path: path.to_path_buf(), reason: format!("invalid UTF-8: {e}") })
}

/// Files found under a corpus root, plus the entries that could not be
/// walked.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    pub failures: Vec<DocumentFailure>,
}

/// Collect files under `input` whose extension is in `extensions`, sorted by
/// path. A file given directly is returned as-is regardless of extension.
/// Symlinks are followed; broken links, loops and unreadable directories are
/// reported as failures.
pub fn discover_documents<S: AsRef<str>>(input: &Path, extensions: &[S]) -> Discovery {
    let mut discovery = Discovery::default();
    if input.is_dir() {
        for entry in WalkDir::new(input).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(input).to_path_buf();
                    tracing::warn!(path = %path.display(), error = %err, "cannot walk corpus entry");
                    discovery.failures.push(DocumentFailure { path, reason: err.to_string() });
                    continue;
                }
            };
            let p = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                if extensions.iter().any(|e| e.as_ref().eq_ignore_ascii_case(ext)) {
                    discovery.files.push(p.to_path_buf());
                }
            }
        }
    } else if input.is_file() {
        discovery.files.push(input.to_path_buf());
    } else {
        tracing::warn!(path = %input.display(), "corpus input does not exist");
        discovery
            .failures
            .push(DocumentFailure { path: input.to_path_buf(), reason: "no such file or directory".into() });
    }
    discovery.files.sort();
    discovery
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub doc_id: DocId,
    pub filename: String,
    pub stats: TokenStats,
    pub unstemmed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Per-document outcome of one ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub indexed: Vec<IndexedDocument>,
    pub failures: Vec<DocumentFailure>,
}

#[derive(Debug, Clone)]
pub struct CorpusBuild {
    pub index: InvertedIndex,
    pub report: BatchReport,
    /// Raw text per document, for snippet storage.
    pub texts: BTreeMap<DocId, String>,
}

struct Processed {
    path: PathBuf,
    text: String,
    stems: Vec<String>,
    stats: TokenStats,
    unstemmed: Vec<String>,
}

pub struct IndexingPipeline<R = PlainTextReader> {
    analyzer: Analyzer,
    reader: R,
}

impl IndexingPipeline<PlainTextReader> {
    /// Default analyzer over plain-text files.
    pub fn plain_text() -> Self {
        Self::new(Analyzer::default(), PlainTextReader)
    }
}

impl Default for IndexingPipeline<PlainTextReader> {
    fn default() -> Self {
        Self::plain_text()
    }
}

impl<R: DocumentReader> IndexingPipeline<R> {
    pub fn new(analyzer: Analyzer, reader: R) -> Self {
        Self { analyzer, reader }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Ingest `paths` in order. Documents that cannot be read or are empty
    /// are reported and skipped; ids are assigned from 1 to the rest.
    pub fn run(&self, paths: &[PathBuf]) -> Result<CorpusBuild> {
        let outcomes: Vec<Result<Processed>> = paths.par_iter().map(|p| self.process(p)).collect();

        let mut report = BatchReport::default();
        let mut texts = BTreeMap::new();
        let mut inputs: Vec<IndexInput> = Vec::with_capacity(outcomes.len());
        for (path, outcome) in paths.iter().zip(outcomes) {
            match outcome {
                Ok(doc) => {
                    let doc_id = DocId::try_from(inputs.len() + 1)
                        .map_err(|_| Error::CapacityExceeded(format!("more than {} documents", DocId::MAX)))?;
                    let filename = doc
                        .path
                        .file_name()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    report.indexed.push(IndexedDocument {
                        doc_id,
                        filename: filename.clone(),
                        stats: doc.stats,
                        unstemmed: doc.unstemmed,
                    });
                    inputs.push(IndexInput {
                        doc_id,
                        tokens: doc.stems,
                        meta: DocMeta {
                            filename,
                            path: Some(doc.path.to_string_lossy().into_owned()),
                            text_path: Some(text_rel_path(doc_id)),
                        },
                    });
                    texts.insert(doc_id, doc.text);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping document");
                    report.failures.push(DocumentFailure { path: path.clone(), reason: err.to_string() });
                }
            }
        }

        let index = InvertedIndex::build(inputs)?;
        tracing::info!(
            num_docs = index.num_docs(),
            num_terms = index.num_terms(),
            failures = report.failures.len(),
            "ingested documents"
        );
        Ok(CorpusBuild { index, report, texts })
    }

    /// Discover documents under `input` and ingest them. Entries that could
    /// not be walked lead the report's failures.
    pub fn ingest<S: AsRef<str>>(&self, input: &Path, extensions: &[S]) -> Result<CorpusBuild> {
        let discovery = discover_documents(input, extensions);
        tracing::info!(files = discovery.files.len(), input = %input.display(), "discovered documents");
        let mut build = self.run(&discovery.files)?;
        let mut failures = discovery.failures;
        failures.append(&mut build.report.failures);
        build.report.failures = failures;
        Ok(build)
    }

    fn process(&self, path: &Path) -> Result<Processed> {
        let text = self.reader.read(path)?;
        if text.trim().is_empty() {
            return Err(Error::EmptyDocument(path.to_path_buf()));
        }
        let analysis = self.analyzer.analyze_with_stats(&text);
        Ok(Processed {
            path: path.to_path_buf(),
            text,
            stems: analysis.stems,
            stats: analysis.stats,
            unstemmed: analysis.unstemmed,
        })
    }
}
