//! Command-line and environment configuration
//!
//! Paths fall back to `COLLOC_*` environment variables; thresholds default
//! to the interactive values of the query engine.

use crate::cache::CacheDir;
use crate::counts::AggregateConfig;
use crate::corpus::DEFAULT_PROGRESS_EVERY;
use crate::export::{EXPORT_MIN_BIGRAM_FREQ, EXPORT_MIN_UNIGRAM_FREQ, EXPORT_TOP_N, ExportOptions};
use crate::pipeline::{BuildOptions, DEFAULT_CHECKPOINT_EVERY, Sources};
use crate::pos::DEFAULT_EXTENSIONS;
use crate::query::{
    CollocateParams, DEFAULT_COLLOCATE_TOP_N, DEFAULT_GLOBAL_TOP_N, DEFAULT_MIN_BIGRAM_FREQ,
    DEFAULT_MIN_UNIGRAM_FREQ, Direction, GlobalParams,
};
use crate::upos::{parse_tag_list, parse_tag_pattern};
use crate::variants::{DEFAULT_VARIANT_CAPACITY, DEFAULT_VARIANT_KEEP};
use clap::Args;
use rustc_hash::FxHashSet;
use std::path::PathBuf;

pub const DEFAULT_CACHE_DIR: &str = "collocations_cache";
pub const DEFAULT_EXPORT_DIR: &str = "collocations_tsv";

/// Inputs, cache location and aggregation settings
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Lemmatized corpus, one sentence per line
    #[arg(long, env = "COLLOC_LEMMAS")]
    pub lemmas: PathBuf,

    /// Surface-form corpus, line-aligned with the lemma corpus
    #[arg(long, env = "COLLOC_SURFACES")]
    pub surfaces: PathBuf,

    /// Root of the POS annotation tree
    #[arg(long, env = "COLLOC_POS_ROOT")]
    pub pos_root: Option<PathBuf>,

    /// Annotation file extensions (".gz" variants are accepted too)
    #[arg(long = "pos-ext", value_delimiter = ',', default_value = DEFAULT_EXTENSIONS[0])]
    pub pos_extensions: Vec<String>,

    #[arg(long, env = "COLLOC_CACHE_DIR", default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Always rebuild from the corpus and leave the cache untouched
    #[arg(long)]
    pub no_cache: bool,

    /// Surface variants tracked per lemma pair during the scan
    #[arg(long, default_value_t = DEFAULT_VARIANT_CAPACITY)]
    pub variant_capacity: usize,

    /// Surface variants kept per lemma pair after the scan
    #[arg(long, default_value_t = DEFAULT_VARIANT_KEEP)]
    pub variant_keep: usize,

    #[arg(long, default_value_t = DEFAULT_PROGRESS_EVERY)]
    pub progress_every: u64,

    /// Lines between scan checkpoints (0 disables)
    #[arg(long, default_value_t = DEFAULT_CHECKPOINT_EVERY)]
    pub checkpoint_every: u64,

    /// Extra function-word lemmas, comma-separated
    #[arg(long = "stopwords", value_delimiter = ',')]
    pub extra_stopwords: Vec<String>,
}

impl Config {
    pub fn sources(&self) -> Sources {
        Sources {
            lemmas: self.lemmas.clone(),
            surfaces: self.surfaces.clone(),
            pos_root: self.pos_root.clone(),
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            aggregate: AggregateConfig {
                variant_capacity: self.variant_capacity.max(1),
                variant_keep: self.variant_keep.clamp(1, self.variant_capacity.max(1)),
            },
            progress_every: self.progress_every,
            checkpoint_every: self.checkpoint_every,
            pos_extensions: self.pos_extensions.clone(),
            extra_stopwords: self.extra_stopwords.clone(),
        }
    }

    pub fn cache(&self) -> Option<CacheDir> {
        (!self.no_cache).then(|| CacheDir::new(&self.cache_dir))
    }
}

fn pos_pattern(s: &str) -> Result<(String, String), String> {
    parse_tag_pattern(s).ok_or_else(|| format!("invalid POS pattern '{s}', expected e.g. A+N"))
}

fn pos_list(s: &str) -> Result<FxHashSet<String>, String> {
    parse_tag_list(s).ok_or_else(|| format!("no POS codes recognized in '{s}'"))
}

/// Global top-N settings
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    #[arg(long, default_value_t = DEFAULT_MIN_BIGRAM_FREQ)]
    pub min_bigram_freq: u64,

    #[arg(long, default_value_t = DEFAULT_MIN_UNIGRAM_FREQ)]
    pub min_unigram_freq: u64,

    #[arg(long, default_value_t = DEFAULT_GLOBAL_TOP_N)]
    pub top: usize,

    /// Restrict to a POS pair such as A+N or ADJ+NOUN
    #[arg(long, value_parser = pos_pattern)]
    pub pattern: Option<(String, String)>,

    /// Keep pairs where both lemmas are proper nouns
    #[arg(long)]
    pub keep_propn_pairs: bool,

    /// Keep pairs with PMI <= 0
    #[arg(long)]
    pub allow_negative_pmi: bool,

    /// Skip examples longer than this many characters
    #[arg(long)]
    pub max_example_chars: Option<usize>,
}

impl GlobalArgs {
    pub fn params(&self) -> GlobalParams {
        GlobalParams {
            min_bigram_freq: self.min_bigram_freq,
            min_unigram_freq: self.min_unigram_freq,
            top_n: self.top,
            skip_propn_pairs: !self.keep_propn_pairs,
            require_positive_pmi: !self.allow_negative_pmi,
            pos_pattern: self.pattern.clone(),
            max_example_chars: self.max_example_chars,
        }
    }
}

/// Per-lemma query settings
#[derive(Debug, Clone, Args)]
pub struct CollocateArgs {
    #[arg(long, default_value_t = DEFAULT_MIN_BIGRAM_FREQ)]
    pub min_bigram_freq: u64,

    #[arg(long, default_value_t = DEFAULT_MIN_UNIGRAM_FREQ)]
    pub min_unigram_freq: u64,

    #[arg(long, default_value_t = DEFAULT_COLLOCATE_TOP_N)]
    pub top: usize,

    /// L (collocate before the lemma), R (after) or B (either side)
    #[arg(long, default_value = "B")]
    pub direction: Direction,

    /// Allowed collocate POS, e.g. N,V or NOUN,VERB
    #[arg(long, value_parser = pos_list)]
    pub pos: Option<FxHashSet<String>>,

    /// Case-insensitive substring the surface form must contain
    #[arg(long)]
    pub surface: Option<String>,

    #[arg(long)]
    pub allow_negative_pmi: bool,

    #[arg(long)]
    pub max_example_chars: Option<usize>,
}

impl CollocateArgs {
    pub fn params(&self) -> CollocateParams {
        CollocateParams {
            min_bigram_freq: self.min_bigram_freq,
            min_unigram_freq: self.min_unigram_freq,
            top_n: self.top,
            direction: self.direction,
            allowed_pos: self.pos.clone(),
            surface_filter: self.surface.clone(),
            require_positive_pmi: !self.allow_negative_pmi,
            max_example_chars: self.max_example_chars,
        }
    }
}

/// Export settings
#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    #[arg(long, env = "COLLOC_EXPORT_DIR", default_value = DEFAULT_EXPORT_DIR)]
    pub export_dir: PathBuf,

    #[arg(long, default_value_t = EXPORT_MIN_BIGRAM_FREQ)]
    pub min_bigram_freq: u64,

    #[arg(long, default_value_t = EXPORT_MIN_UNIGRAM_FREQ)]
    pub min_unigram_freq: u64,

    #[arg(long, default_value_t = EXPORT_TOP_N)]
    pub top: usize,

    /// Lowercase the surface_form column
    #[arg(long)]
    pub lowercase_surface: bool,
}

impl ExportArgs {
    pub fn options(&self) -> ExportOptions {
        let mut options = ExportOptions {
            lowercase_surface: self.lowercase_surface,
            ..ExportOptions::default()
        };
        options.params.min_bigram_freq = self.min_bigram_freq;
        options.params.min_unigram_freq = self.min_unigram_freq;
        options.params.top_n = self.top;
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        config: Config,
        #[command(flatten)]
        collocate: CollocateArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["colloc", "--lemmas", "l.txt", "--surfaces", "s.txt"]).unwrap();
        assert_eq!(cli.config.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(cli.config.pos_extensions, vec!["vrt".to_string()]);
        assert!(cli.config.cache().is_some());

        let params = cli.collocate.params();
        assert_eq!(params, CollocateParams::default());
    }

    #[test]
    fn test_collocate_filters() {
        let cli = Cli::try_parse_from([
            "colloc",
            "--lemmas",
            "l.txt",
            "--surfaces",
            "s.txt",
            "--direction",
            "left",
            "--pos",
            "N,V",
            "--no-cache",
        ])
        .unwrap();
        let params = cli.collocate.params();
        assert_eq!(params.direction, Direction::Left);
        let pos = params.allowed_pos.unwrap();
        assert!(pos.contains("NOUN") && pos.contains("VERB"));
        assert!(cli.config.cache().is_none());
    }

    #[test]
    fn test_bad_pos_list_is_rejected() {
        let result = Cli::try_parse_from([
            "colloc", "--lemmas", "l.txt", "--surfaces", "s.txt", "--pos", "Q",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_build_options_clamp_keep() {
        let cli = Cli::try_parse_from([
            "colloc",
            "--lemmas",
            "l.txt",
            "--surfaces",
            "s.txt",
            "--variant-capacity",
            "4",
            "--variant-keep",
            "9",
        ])
        .unwrap();
        let options = cli.config.build_options();
        assert_eq!(options.aggregate.variant_capacity, 4);
        assert_eq!(options.aggregate.variant_keep, 4);
    }

    #[test]
    fn test_export_options() {
        let args = ExportArgs {
            export_dir: PathBuf::from("out"),
            min_bigram_freq: 3,
            min_unigram_freq: 30,
            top: 10,
            lowercase_surface: true,
        };
        let options = args.options();
        assert_eq!(options.params.min_bigram_freq, 3);
        assert_eq!(options.params.top_n, 10);
        assert!(options.params.require_positive_pmi);
        assert!(options.lowercase_surface);
    }
}
