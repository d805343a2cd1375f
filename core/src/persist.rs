//! On-disk snapshots.
//!
//! A snapshot root holds numbered generation directories and a `CURRENT`
//! file naming the live one:
//!
//! ```text
//! index/
//!   CURRENT              "gen-000002"
//!   gen-000002/
//!     index.bin          bincode InvertedIndex
//!     meta.json          MetaFile
//!     texts/{doc_id}.txt raw document text
//! ```
//!
//! A save fills a fresh generation, then renames a new `CURRENT` into place,
//! then deletes every other generation. Readers resolve `CURRENT` once and
//! read index and texts from the same directory.

use crate::config::SNAPSHOT_VERSION;
use crate::error::{Error, Result};
use crate::{DocId, InvertedIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const CURRENT: &str = "CURRENT";
const GENERATION_PREFIX: &str = "gen-";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: usize,
    pub num_terms: usize,
    pub collection_length: u64,
    pub created_at: String,
    pub version: u32,
    pub generation: String,
}

impl MetaFile {
    pub fn describe(index: &InvertedIndex, generation: &str) -> Self {
        Self {
            num_docs: index.num_docs(),
            num_terms: index.num_terms(),
            collection_length: index.collection_length(),
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
            version: SNAPSHOT_VERSION,
            generation: generation.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn current_pointer(&self) -> PathBuf {
        self.root.join(CURRENT)
    }

    pub fn generation(&self, name: &str) -> SnapshotDir {
        SnapshotDir { dir: self.root.join(name), generation: name.to_string() }
    }

    /// The generation `CURRENT` points at.
    pub fn current(&self) -> Result<SnapshotDir> {
        let pointer = self.current_pointer();
        let name = fs::read_to_string(&pointer)?;
        let name = name.trim();
        if generation_number(name).is_none() {
            return Err(Error::CorruptSnapshot { path: pointer, reason: format!("bad generation name {name:?}") });
        }
        Ok(self.generation(name))
    }

    /// Generation directories present under the root, lowest first.
    fn generations(&self) -> Result<Vec<(u64, String)>> {
        let mut found = Vec::new();
        if !self.root.is_dir() {
            return Ok(found);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(n) = generation_number(&name) {
                if entry.file_type()?.is_dir() {
                    found.push((n, name));
                }
            }
        }
        found.sort();
        Ok(found)
    }
}

fn generation_number(name: &str) -> Option<u64> {
    name.strip_prefix(GENERATION_PREFIX)?.parse().ok()
}

fn generation_name(n: u64) -> String {
    format!("{GENERATION_PREFIX}{n:06}")
}

/// One generation of a snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotDir {
    pub dir: PathBuf,
    pub generation: String,
}

impl SnapshotDir {
    fn index(&self) -> PathBuf { self.dir.join("index.bin") }
    fn meta(&self) -> PathBuf { self.dir.join("meta.json") }
    fn texts_dir(&self) -> PathBuf { self.dir.join("texts") }
    pub fn text(&self, doc_id: DocId) -> PathBuf { self.dir.join(text_rel_path(doc_id)) }

    pub fn load_index(&self) -> Result<InvertedIndex> {
        let mut f = File::open(self.index())?;
        let mut buf = Vec::new();
        f.read_to_end(&mut buf)?;
        let index = bincode::deserialize(&buf)?;
        Ok(index)
    }

    pub fn load_meta(&self) -> Result<MetaFile> {
        let mut f = File::open(self.meta())?;
        let mut buf = String::new();
        f.read_to_string(&mut buf)?;
        let meta: MetaFile = serde_json::from_str(&buf)?;
        Ok(meta)
    }

    pub fn load_text(&self, doc_id: DocId) -> Result<String> {
        Ok(fs::read_to_string(self.text(doc_id))?)
    }

    fn write(&self, index: &InvertedIndex, texts: &BTreeMap<DocId, String>, meta: &MetaFile) -> Result<()> {
        create_dir_all(self.texts_dir())?;
        for (doc_id, text) in texts {
            write_atomic(&self.text(*doc_id), text.as_bytes())?;
        }
        write_atomic(&self.index(), &bincode::serialize(index)?)?;
        write_atomic(&self.meta(), serde_json::to_string_pretty(meta)?.as_bytes())
    }
}

/// Location of a document's stored text relative to its generation directory.
pub fn text_rel_path(doc_id: DocId) -> String {
    format!("texts/{doc_id}.txt")
}

/// Write `bytes` next to `dest` and rename over it, so readers see either
/// the previous file or the complete new one.
fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = dest.with_extension("tmp");
    {
        let mut f = File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, dest)?;
    Ok(())
}

/// Index and directory of the live generation, resolved together.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub index: InvertedIndex,
    pub dir: SnapshotDir,
}

pub fn open_snapshot(paths: &IndexPaths) -> Result<Snapshot> {
    let dir = paths.current()?;
    let index = dir.load_index()?;
    Ok(Snapshot { index, dir })
}

pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    paths.current()?.load_index()
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    paths.current()?.load_meta()
}

pub fn load_text(paths: &IndexPaths, doc_id: DocId) -> Result<String> {
    paths.current()?.load_text(doc_id)
}

/// Write `index` and `texts` as a new generation and make it current. On
/// failure the previous generation stays current and the partial one is
/// removed. Callers must not save to the same root concurrently.
pub fn save_snapshot(paths: &IndexPaths, index: &InvertedIndex, texts: &BTreeMap<DocId, String>) -> Result<MetaFile> {
    create_dir_all(&paths.root)?;
    let next = paths.generations()?.last().map_or(1, |(n, _)| n + 1);
    let dir = paths.generation(&generation_name(next));
    let meta = MetaFile::describe(index, &dir.generation);

    let committed = dir
        .write(index, texts, &meta)
        .and_then(|()| write_atomic(&paths.current_pointer(), dir.generation.as_bytes()));
    if let Err(err) = committed {
        if let Err(cleanup) = fs::remove_dir_all(&dir.dir) {
            tracing::warn!(dir = %dir.dir.display(), error = %cleanup, "cannot remove abandoned generation");
        }
        return Err(err);
    }

    prune_generations(paths, &dir.generation)?;
    tracing::info!(root = %paths.root.display(), generation = %dir.generation, num_docs = meta.num_docs, "snapshot saved");
    Ok(meta)
}

fn prune_generations(paths: &IndexPaths, keep: &str) -> Result<()> {
    for (_, name) in paths.generations()? {
        if name == keep {
            continue;
        }
        let stale = paths.root.join(&name);
        match fs::remove_dir_all(&stale) {
            Ok(()) => tracing::debug!(dir = %stale.display(), "pruned generation"),
            Err(err) => tracing::warn!(dir = %stale.display(), error = %err, "cannot prune generation"),
        }
    }
    Ok(())
}
