//! Lemma -> POS index from positional annotation files
//!
//! Walks a directory tree of tab-separated, one-token-per-line annotation
//! files (VRT style, optionally gzip-compressed). Structural lines start
//! with `<` and are skipped. Token lines need at least four fields: the
//! lemma is field 3 and the UPOS tag field 4 (1-based).
//!
//! The first tag observed for a lemma wins; there is no disambiguation.

use crate::error::{CollocError, Result};
use bstr::ByteSlice;
use flate2::read::MultiGzDecoder;
use memchr::memchr_iter;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub const DEFAULT_EXTENSIONS: &[&str] = &["vrt"];
const PROGRESS_EVERY: u64 = 1_000_000;
/// Compound-boundary marker stripped from lemmas
const LEMMA_MASK: char = '#';

/// Mapping lemma -> single POS tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosIndex {
    tags: FxHashMap<String, String>,
}

impl PosIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, lemma: &str) -> Option<&str> {
        self.tags.get(lemma).map(String::as_str)
    }

    /// Record `tag` for `lemma` unless the lemma already has one.
    /// Returns true if the tag was stored.
    pub fn insert_first(&mut self, lemma: &str, tag: &str) -> bool {
        if lemma.is_empty() || self.tags.contains_key(lemma) {
            return false;
        }
        self.tags.insert(lemma.to_owned(), tag.to_owned());
        true
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Build the index from every annotation file under `root`
    pub fn build_from_tree(root: &Path) -> Result<Self> {
        PosIndexBuilder::default().build(root)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PosBuildStats {
    files: u64,
    lines: u64,
    skipped_files: u64,
}

#[derive(Debug, Clone)]
pub struct PosIndexBuilder {
    extensions: Vec<String>,
    index: PosIndex,
    stats: PosBuildStats,
}

impl Default for PosIndexBuilder {
    fn default() -> Self {
        Self::with_extensions(DEFAULT_EXTENSIONS)
    }
}

impl PosIndexBuilder {
    /// Accept files ending in any of `extensions`, with or without `.gz`
    pub fn with_extensions(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            index: PosIndex::new(),
            stats: PosBuildStats::default(),
        }
    }

    /// Annotation files under `root` in file-name order, with whether each
    /// is gzipped. A missing root is an error.
    pub fn matching_files(&self, root: &Path) -> Result<Vec<(PathBuf, bool)>> {
        if !root.is_dir() {
            return Err(CollocError::FileOpen {
                path: root.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "POS annotation root is not a directory",
                ),
            });
        }

        Ok(WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let gzipped = self.matches(e.path())?;
                Some((e.into_path(), gzipped))
            })
            .collect())
    }

    /// Index every matching file under `root`. Unreadable files inside the
    /// tree are logged and skipped.
    pub fn build(mut self, root: &Path) -> Result<PosIndex> {
        for (path, gzipped) in self.matching_files(root)? {
            if let Err(e) = self.add_file(&path, gzipped) {
                warn!("skipping {}: {}", path.display(), e);
                self.stats.skipped_files += 1;
            }
        }

        info!(
            "POS index built: {} files, {} lines, {} lemmas with POS, {} files skipped",
            self.stats.files,
            self.stats.lines,
            self.index.len(),
            self.stats.skipped_files
        );
        Ok(self.index)
    }

    /// `Some(is_gzipped)` if the file name carries an accepted extension
    fn matches(&self, path: &Path) -> Option<bool> {
        let name = path.file_name()?.to_str()?.to_lowercase();
        let (stem, gzipped) = match name.strip_suffix(".gz") {
            Some(stem) => (stem, true),
            None => (name.as_str(), false),
        };
        self.extensions
            .iter()
            .any(|ext| stem.ends_with(&format!(".{ext}")))
            .then_some(gzipped)
    }

    fn add_file(&mut self, path: &Path, gzipped: bool) -> std::io::Result<()> {
        info!("reading {}", path.display());
        let file = File::open(path)?;
        self.stats.files += 1;
        if gzipped {
            self.add_reader(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            self.add_reader(BufReader::new(file))
        }
    }

    /// Index every record line from `reader`
    pub fn add_reader<R: Read>(&mut self, mut reader: BufReader<R>) -> std::io::Result<()> {
        let mut buf = Vec::with_capacity(256);
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }
            self.stats.lines += 1;
            if self.stats.lines % PROGRESS_EVERY == 0 {
                info!("[POS] {} lines processed", self.stats.lines);
            }
            if let Some((lemma, tag)) = parse_record(&buf) {
                self.index.insert_first(&lemma, &tag);
            }
        }
    }

    pub fn finish(self) -> PosIndex {
        self.index
    }
}

/// Extract (normalized lemma, tag) from one annotation line
fn parse_record(line: &[u8]) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(b"<") {
        return None;
    }

    // Field boundaries: we need the 3rd and 4th tab-separated fields.
    let mut tabs = memchr_iter(b'\t', line);
    let _first = tabs.next()?;
    let second = tabs.next()?;
    let third = tabs.next()?;
    let fourth_end = tabs.next().unwrap_or(line.len());

    let lemma: String = line[second + 1..third]
        .to_str_lossy()
        .to_lowercase()
        .chars()
        .filter(|&c| c != LEMMA_MASK)
        .collect();
    let tag = line[third + 1..fourth_end].to_str_lossy().into_owned();

    if lemma.is_empty() {
        return None;
    }
    Some((lemma, tag))
}
