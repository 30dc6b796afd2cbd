//! The pipeline object: corpus tables, POS index and function-word filter
//!
//! `CollocationIndex` owns everything a query needs and hands it to the
//! query engine by shared reference. It is built from the corpus, or
//! restored from the cache when a complete, compatible artifact set for
//! the same input snapshot exists.

use crate::cache::{ArtifactKind, CacheDir, Fingerprint};
use crate::corpus::{AlignedCorpus, DEFAULT_PROGRESS_EVERY};
use crate::counts::{AggregateConfig, Aggregator, BigramTable, FrequencyTables, UnigramTable};
use crate::error::{CacheError, Result};
use crate::export::{ExportOptions, ExportOutcome, export_collocates};
use crate::filter::FunctionWordFilter;
use crate::pmi::Totals;
use crate::pos::{DEFAULT_EXTENSIONS, PosIndex, PosIndexBuilder};
use crate::query::{
    CollocateLookup, CollocateParams, Collocation, GlobalParams, TableView, collocates_for,
    top_global,
};
use crate::variants::SurfaceVariantIndex;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_CHECKPOINT_EVERY: u64 = 5_000_000;

/// Input locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sources {
    pub lemmas: PathBuf,
    pub surfaces: PathBuf,
    /// Root of the POS annotation tree; no POS information without it
    pub pos_root: Option<PathBuf>,
}

impl Sources {
    fn corpus_fingerprint(&self) -> Result<Fingerprint> {
        Fingerprint::of_paths(&[&self.lemmas, &self.surfaces])
    }

    /// Every annotation file the POS builder would read, plus the
    /// extension list; a missing root is an error
    fn pos_fingerprint(&self, options: &BuildOptions) -> Result<Fingerprint> {
        let Some(root) = &self.pos_root else {
            return Ok(Fingerprint::default());
        };
        let files: Vec<PathBuf> = pos_builder(options)
            .matching_files(root)?
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        Ok(Fingerprint::of_paths(&files)?.with(&options.pos_extensions))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub aggregate: AggregateConfig,
    pub progress_every: u64,
    /// Save a scan checkpoint every this many lines (0 disables)
    pub checkpoint_every: u64,
    pub pos_extensions: Vec<String>,
    /// Extra lemmas for the function-word stoplist
    pub extra_stopwords: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            aggregate: AggregateConfig::default(),
            progress_every: DEFAULT_PROGRESS_EVERY,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            pos_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            extra_stopwords: Vec::new(),
        }
    }
}

impl BuildOptions {
    fn filter(&self) -> FunctionWordFilter {
        let mut filter = FunctionWordFilter::default();
        filter.add_lemmas(&self.extra_stopwords);
        filter
    }
}

#[derive(Debug, Clone)]
pub struct CollocationIndex {
    tables: FrequencyTables,
    pos: PosIndex,
    filter: FunctionWordFilter,
    totals: Totals,
}

impl CollocationIndex {
    pub fn new(tables: FrequencyTables, pos: PosIndex, filter: FunctionWordFilter) -> Self {
        let totals = tables.totals();
        Self {
            tables,
            pos,
            filter,
            totals,
        }
    }

    /// Aggregate an already opened corpus
    pub fn from_corpus<R: BufRead>(
        corpus: AlignedCorpus<R>,
        pos: PosIndex,
        filter: FunctionWordFilter,
        config: AggregateConfig,
    ) -> Result<Self> {
        let mut aggregator = Aggregator::new(config);
        aggregator.add_all(corpus)?;
        Ok(Self::new(aggregator.finish(), pos, filter))
    }

    /// Restore from the cache when possible, otherwise build and persist
    pub fn load_or_build(sources: &Sources, options: &BuildOptions, cache: &CacheDir) -> Result<Self> {
        let corpus_fp = sources.corpus_fingerprint()?;
        let tables_fp = corpus_fp.with(&options.aggregate);
        let pos_fp = sources.pos_fingerprint(options)?;

        let tables = match load_tables(cache, tables_fp) {
            Ok(tables) => {
                info!("loaded corpus tables from {}", cache.root().display());
                Some(tables)
            }
            Err(err) => {
                report_cache_miss(&err);
                None
            }
        };
        let pos = match cache.load::<PosIndex>(ArtifactKind::Pos, pos_fp) {
            Ok(pos) => {
                info!("loaded POS index ({} lemmas) from cache", pos.len());
                Some(pos)
            }
            Err(err) => {
                report_cache_miss(&err);
                None
            }
        };

        let pos = match pos {
            Some(pos) => pos,
            None => {
                let pos = build_pos(sources, options)?;
                save_or_warn(cache.save(ArtifactKind::Pos, pos_fp, &pos));
                pos
            }
        };
        let tables = match tables {
            Some(tables) => tables,
            None => {
                let tables = scan_corpus(sources, options, Some((cache, corpus_fp)))?;
                save_or_warn(save_tables(cache, tables_fp, &tables));
                save_or_warn(cache.remove_checkpoint());
                tables
            }
        };

        let index = Self::new(tables, pos, options.filter());
        index.log_summary();
        Ok(index)
    }

    /// Build from scratch, ignoring any cache
    pub fn build(sources: &Sources, options: &BuildOptions) -> Result<Self> {
        let pos = build_pos(sources, options)?;
        let tables = scan_corpus(sources, options, None)?;
        let index = Self::new(tables, pos, options.filter());
        index.log_summary();
        Ok(index)
    }

    pub fn view(&self) -> TableView<'_> {
        TableView {
            tables: &self.tables,
            pos: &self.pos,
            filter: &self.filter,
            totals: self.totals,
        }
    }

    pub fn tables(&self) -> &FrequencyTables {
        &self.tables
    }

    pub fn pos(&self) -> &PosIndex {
        &self.pos
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn top_global(&self, params: &GlobalParams) -> Vec<Collocation> {
        top_global(self.view(), params)
    }

    pub fn collocates(&self, target: &str, params: &CollocateParams) -> CollocateLookup {
        collocates_for(self.view(), target, params)
    }

    pub fn export(&self, target: &str, dir: &Path, options: &ExportOptions) -> Result<ExportOutcome> {
        export_collocates(self.view(), target, dir, options)
    }

    fn log_summary(&self) {
        info!(
            "{} tokens, {} unique lemmas, {} unique bigrams, {} lemmas with POS",
            self.totals.tokens,
            self.tables.unigrams.len(),
            self.tables.bigrams.len(),
            self.pos.len()
        );
    }
}

fn report_cache_miss(err: &CacheError) {
    match err {
        CacheError::Missing(path) => info!("no cache artifact at {}", path.display()),
        other => warn!("rejecting cache: {other}; recomputing"),
    }
}

fn save_or_warn(result: std::result::Result<(), CacheError>) {
    if let Err(err) = result {
        warn!("failed to update cache: {err}");
    }
}

fn load_tables(cache: &CacheDir, fp: Fingerprint) -> std::result::Result<FrequencyTables, CacheError> {
    Ok(FrequencyTables {
        unigrams: cache.load::<UnigramTable>(ArtifactKind::Unigrams, fp)?,
        bigrams: cache.load::<BigramTable>(ArtifactKind::Bigrams, fp)?,
        surfaces: cache.load::<SurfaceVariantIndex>(ArtifactKind::Surfaces, fp)?,
    })
}

fn save_tables(
    cache: &CacheDir,
    fp: Fingerprint,
    tables: &FrequencyTables,
) -> std::result::Result<(), CacheError> {
    cache.save(ArtifactKind::Unigrams, fp, &tables.unigrams)?;
    cache.save(ArtifactKind::Bigrams, fp, &tables.bigrams)?;
    cache.save(ArtifactKind::Surfaces, fp, &tables.surfaces)?;
    info!("saved corpus tables to {}", cache.root().display());
    Ok(())
}

fn build_pos(sources: &Sources, options: &BuildOptions) -> Result<PosIndex> {
    let Some(root) = &sources.pos_root else {
        info!("no POS annotation root given; POS filters will match nothing");
        return Ok(PosIndex::new());
    };
    pos_builder(options).build(root)
}

fn pos_builder(options: &BuildOptions) -> PosIndexBuilder {
    let extensions: Vec<&str> = options.pos_extensions.iter().map(String::as_str).collect();
    PosIndexBuilder::with_extensions(&extensions)
}

/// Aggregate the corpus, resuming from and writing checkpoints when a
/// cache is given
fn scan_corpus(
    sources: &Sources,
    options: &BuildOptions,
    cache: Option<(&CacheDir, Fingerprint)>,
) -> Result<FrequencyTables> {
    let mut corpus = AlignedCorpus::open(&sources.lemmas, &sources.surfaces)?
        .with_progress_every(options.progress_every);
    let mut aggregator = Aggregator::new(options.aggregate);

    if let Some((cache, fp)) = cache {
        match cache.load_checkpoint(fp) {
            Ok(checkpoint) if checkpoint.aggregator.config() == options.aggregate => {
                let skipped = corpus.skip_lines(checkpoint.lines)?;
                info!("resuming scan after {skipped} lines from checkpoint");
                aggregator = checkpoint.aggregator;
            }
            Ok(_) => warn!("ignoring checkpoint built with different aggregation settings"),
            Err(CacheError::Missing(_)) => {}
            Err(err) => warn!("ignoring checkpoint: {err}"),
        }
    }

    let every = options.checkpoint_every;
    let mut next_checkpoint = corpus.stats().lines.saturating_add(every);
    while let Some(sentence) = corpus.next() {
        aggregator.add_sentence(&sentence?);

        let lines = corpus.stats().lines;
        if let Some((cache, fp)) = cache.filter(|_| every > 0 && lines >= next_checkpoint) {
            save_or_warn(cache.save_checkpoint(fp, lines, &aggregator));
            next_checkpoint = lines.saturating_add(every);
        }
    }

    Ok(aggregator.finish())
}
