//! Aligned corpus reading
//!
//! Reads a lemmatized corpus and its surface-form twin line by line in
//! lockstep. Both files hold one whitespace-tokenized sentence per line,
//! and token `i` of a lemma line corresponds to token `i` of the surface
//! line with the same number.
//!
//! Recovery policy:
//! - a line pair with different token counts is truncated to the shorter
//!   length (counted in [`ReadStats::truncated`] and logged);
//! - if one file ends first, reading stops there and the trailing lines
//!   of the longer file are dropped (reported once at the end).

use crate::error::{CollocError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Lines};
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_PROGRESS_EVERY: u64 = 500_000;

/// One aligned corpus line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub lemmas: Vec<String>,
    pub surfaces: Vec<String>,
    /// Surface tokens joined by single spaces
    pub text: String,
}

impl Sentence {
    /// Align a lemma line with its surface line, truncating to the shorter
    /// token count. Returns the sentence and whether truncation happened.
    pub fn align(lemma_line: &str, surface_line: &str) -> (Self, bool) {
        let mut lemmas: Vec<String> = lemma_line.split_whitespace().map(str::to_owned).collect();
        let mut surfaces: Vec<String> =
            surface_line.split_whitespace().map(str::to_owned).collect();

        let truncated = lemmas.len() != surfaces.len();
        if truncated {
            let len = lemmas.len().min(surfaces.len());
            lemmas.truncate(len);
            surfaces.truncate(len);
        }

        let text = surfaces.join(" ");
        (
            Self {
                lemmas,
                surfaces,
                text,
            },
            truncated,
        )
    }

    pub fn len(&self) -> usize {
        self.lemmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
    }
}

/// Which side of the corpus ran out first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhausted {
    Lemmas,
    Surfaces,
}

/// Counters describing a (possibly partial) pass over the corpus
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Line pairs consumed, including empty and skipped ones
    pub lines: u64,
    /// Line pairs whose token counts differed
    pub truncated: u64,
    /// Line pairs with no lemma tokens
    pub empty: u64,
    /// Set when one file had trailing lines the other lacked
    pub length_mismatch: Option<Exhausted>,
}

/// Lockstep reader over a lemma stream and a surface stream
pub struct AlignedCorpus<R: BufRead> {
    lemmas: Lines<R>,
    surfaces: Lines<R>,
    stats: ReadStats,
    progress_every: u64,
    finished: bool,
}

impl AlignedCorpus<BufReader<File>> {
    /// Open both corpus files. A missing or unreadable file is fatal.
    pub fn open(lemma_path: &Path, surface_path: &Path) -> Result<Self> {
        let lemmas = open_file(lemma_path)?;
        let surfaces = open_file(surface_path)?;
        Ok(Self::from_readers(lemmas, surfaces))
    }
}

impl AlignedCorpus<BufReader<Cursor<String>>> {
    /// Create a reader from in-memory text
    pub fn from_strs(lemmas: &str, surfaces: &str) -> Self {
        Self::from_readers(
            BufReader::new(Cursor::new(lemmas.to_string())),
            BufReader::new(Cursor::new(surfaces.to_string())),
        )
    }
}

impl<R: BufRead> AlignedCorpus<R> {
    pub fn from_readers(lemmas: R, surfaces: R) -> Self {
        Self {
            lemmas: lemmas.lines(),
            surfaces: surfaces.lines(),
            stats: ReadStats::default(),
            progress_every: DEFAULT_PROGRESS_EVERY,
            finished: false,
        }
    }

    /// Log progress every `every` line pairs (0 disables progress logging)
    pub fn with_progress_every(mut self, every: u64) -> Self {
        self.progress_every = every;
        self
    }

    pub fn stats(&self) -> &ReadStats {
        &self.stats
    }

    /// Skip `count` line pairs without tokenizing them (used to resume a
    /// checkpointed scan). Returns the number actually skipped.
    pub fn skip_lines(&mut self, count: u64) -> Result<u64> {
        let mut skipped = 0;
        while skipped < count {
            match (self.lemmas.next(), self.surfaces.next()) {
                (Some(l), Some(s)) => {
                    l?;
                    s?;
                    skipped += 1;
                    self.stats.lines += 1;
                }
                _ => {
                    self.finished = true;
                    break;
                }
            }
        }
        Ok(skipped)
    }

    fn note_exhausted(&mut self, side: Exhausted) {
        self.stats.length_mismatch = Some(side);
        let longer = match side {
            Exhausted::Lemmas => "surface",
            Exhausted::Surfaces => "lemma",
        };
        warn!(
            "corpus files differ in length: stopped after {} lines, trailing {} lines dropped",
            self.stats.lines, longer
        );
    }

    fn finish(&mut self) {
        self.finished = true;
        if self.stats.truncated > 0 {
            warn!(
                "{} of {} line pairs had mismatched token counts and were truncated",
                self.stats.truncated, self.stats.lines
            );
        }
        info!("corpus scan finished after {} lines", self.stats.lines);
    }
}

impl<R: BufRead> Iterator for AlignedCorpus<R> {
    type Item = Result<Sentence>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let (lemma_line, surface_line) = match (self.lemmas.next(), self.surfaces.next()) {
                (Some(Ok(l)), Some(Ok(s))) => (l, s),
                (Some(Err(e)), _) | (_, Some(Err(e))) => {
                    self.finished = true;
                    return Some(Err(CollocError::Io(e)));
                }
                (None, None) => {
                    self.finish();
                    return None;
                }
                (None, Some(_)) => {
                    self.note_exhausted(Exhausted::Lemmas);
                    self.finish();
                    return None;
                }
                (Some(_), None) => {
                    self.note_exhausted(Exhausted::Surfaces);
                    self.finish();
                    return None;
                }
            };

            self.stats.lines += 1;
            if self.progress_every > 0 && self.stats.lines % self.progress_every == 0 {
                info!("processed {} lines", self.stats.lines);
            }

            let (sentence, truncated) = Sentence::align(&lemma_line, &surface_line);
            if truncated {
                self.stats.truncated += 1;
                debug!(
                    "line {}: token count mismatch, truncated to {}",
                    self.stats.lines,
                    sentence.len()
                );
            }
            if sentence.is_empty() {
                self.stats.empty += 1;
                continue;
            }
            return Some(Ok(sentence));
        }
    }
}

fn open_file(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| CollocError::FileOpen {
            path: path.to_path_buf(),
            source,
        })
}
