//! Unigram/bigram aggregation
//!
//! Consumes aligned sentences and builds the three corpus tables:
//! - `UnigramTable`: content lemma -> frequency
//! - `BigramTable`: adjacent content lemma pair -> frequency
//! - `SurfaceVariantIndex`: lemma pair -> bounded surface variants with
//!   verified examples
//!
//! Tokens without any alphanumeric character (punctuation) are excluded
//! from every table, and a pair is only counted when both sides are
//! content lemmas.

use crate::corpus::Sentence;
use crate::error::Result;
use crate::interner::{LemmaId, LemmaInterner};
use crate::pmi::Totals;
use crate::variants::{
    DEFAULT_VARIANT_CAPACITY, DEFAULT_VARIANT_KEEP, ExampleText, LemmaPair, SurfaceVariantIndex,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::info;

/// True for tokens with at least one alphanumeric character
#[inline]
pub fn is_content_token(token: &str) -> bool {
    token.chars().any(char::is_alphanumeric)
}

/// Content lemma -> frequency
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnigramTable {
    vocab: LemmaInterner,
    counts: Vec<u64>, // parallel to the interner slab
}

impl UnigramTable {
    /// Count one occurrence of `lemma`
    pub fn add(&mut self, lemma: &str) -> LemmaId {
        let id = self.vocab.get_or_intern(lemma);
        let idx = self.index(id);
        if idx == self.counts.len() {
            self.counts.push(0);
        }
        self.counts[idx] += 1;
        id
    }

    pub fn id(&self, lemma: &str) -> Option<LemmaId> {
        self.vocab.get(lemma)
    }

    pub fn lemma(&self, id: LemmaId) -> &str {
        self.vocab.resolve(id)
    }

    pub fn freq(&self, id: LemmaId) -> u64 {
        self.counts.get(self.index(id)).copied().unwrap_or(0)
    }

    /// Frequency by lemma text, 0 if unseen
    pub fn freq_of(&self, lemma: &str) -> u64 {
        self.id(lemma).map_or(0, |id| self.freq(id))
    }

    pub fn contains(&self, lemma: &str) -> bool {
        self.freq_of(lemma) > 0
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }

    /// (lemma, frequency) pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.vocab
            .iter()
            .map(|(id, lemma)| (lemma, self.freq(id)))
    }

    #[inline]
    fn index(&self, id: LemmaId) -> usize {
        id.slot()
    }
}

/// Ordered lemma pair -> adjacency frequency
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigramTable {
    counts: FxHashMap<LemmaPair, u64>,
}

impl BigramTable {
    pub fn add(&mut self, pair: LemmaPair) {
        *self.counts.entry(pair).or_insert(0) += 1;
    }

    pub fn freq(&self, pair: &LemmaPair) -> u64 {
        self.counts.get(pair).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LemmaPair, u64)> + '_ {
        self.counts.iter().map(|(pair, &freq)| (pair, freq))
    }
}

/// The corpus tables, immutable once aggregation has finished
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTables {
    pub unigrams: UnigramTable,
    pub bigrams: BigramTable,
    pub surfaces: SurfaceVariantIndex,
}

impl FrequencyTables {
    pub fn totals(&self) -> Totals {
        Totals {
            tokens: self.unigrams.total(),
            bigrams: self.bigrams.total(),
        }
    }

    /// Frequency of the bigram (first, second) by lemma text
    pub fn bigram_freq(&self, first: &str, second: &str) -> u64 {
        match (self.unigrams.id(first), self.unigrams.id(second)) {
            (Some(a), Some(b)) => self.bigrams.freq(&(a, b)),
            _ => 0,
        }
    }
}

/// Aggregation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Hard per-pair bound on surface variants during the scan
    pub variant_capacity: usize,
    /// Per-pair size after the final trimming pass
    pub variant_keep: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            variant_capacity: DEFAULT_VARIANT_CAPACITY,
            variant_keep: DEFAULT_VARIANT_KEEP,
        }
    }
}

/// Streaming builder for `FrequencyTables`
///
/// Serializable so a long scan can be checkpointed and resumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregator {
    config: AggregateConfig,
    unigrams: UnigramTable,
    bigrams: BigramTable,
    surfaces: SurfaceVariantIndex,
    sentences: u64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(AggregateConfig::default())
    }
}

impl Aggregator {
    pub fn new(config: AggregateConfig) -> Self {
        Self {
            config,
            unigrams: UnigramTable::default(),
            bigrams: BigramTable::default(),
            surfaces: SurfaceVariantIndex::with_capacity(config.variant_capacity),
            sentences: 0,
        }
    }

    pub fn config(&self) -> AggregateConfig {
        self.config
    }

    /// Sentences consumed so far
    pub fn sentences(&self) -> u64 {
        self.sentences
    }

    pub fn add_sentence(&mut self, sentence: &Sentence) {
        self.sentences += 1;

        let ids: SmallVec<[Option<LemmaId>; 32]> = sentence
            .lemmas
            .iter()
            .map(|lemma| is_content_token(lemma).then(|| self.unigrams.add(lemma)))
            .collect();

        let text = ExampleText::new(&sentence.text);
        for (i, window) in ids.windows(2).enumerate() {
            let (Some(first), Some(second)) = (window[0], window[1]) else {
                continue;
            };
            let pair = (first, second);
            self.bigrams.add(pair);
            self.surfaces.record(
                pair,
                &sentence.surfaces[i],
                &sentence.surfaces[i + 1],
                &text,
            );
        }
    }

    /// Consume every sentence from `sentences`, stopping at the first error
    pub fn add_all<I>(&mut self, sentences: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<Sentence>>,
    {
        for sentence in sentences {
            self.add_sentence(&sentence?);
        }
        Ok(())
    }

    /// Run the final trimming pass and hand out the tables
    pub fn finish(mut self) -> FrequencyTables {
        self.surfaces.trim_all(self.config.variant_keep);
        let tables = FrequencyTables {
            unigrams: self.unigrams,
            bigrams: self.bigrams,
            surfaces: self.surfaces,
        };
        let totals = tables.totals();
        info!(
            "aggregation done: {} sentences, {} tokens, {} lemmas, {} bigram types",
            self.sentences,
            totals.tokens,
            tables.unigrams.len(),
            tables.bigrams.len()
        );
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::AlignedCorpus;

    fn aggregate(lemmas: &str, surfaces: &str) -> FrequencyTables {
        let mut aggregator = Aggregator::default();
        aggregator
            .add_all(AlignedCorpus::from_strs(lemmas, surfaces))
            .unwrap();
        aggregator.finish()
    }

    #[test]
    fn test_is_content_token() {
        assert!(is_content_token("kissa"));
        assert!(is_content_token("2017"));
        assert!(is_content_token("-ko"));
        assert!(!is_content_token("."));
        assert!(!is_content_token("--"));
        assert!(!is_content_token(""));
    }

    #[test]
    fn test_scenario_kissa_istua() {
        let tables = aggregate("kissa istua matto\n", "kissa istui matolla\n");

        assert_eq!(tables.bigram_freq("kissa", "istua"), 1);
        assert_eq!(tables.bigram_freq("istua", "matto"), 1);
        assert_eq!(tables.bigram_freq("istua", "kissa"), 0);

        let key = (
            tables.unigrams.id("kissa").unwrap(),
            tables.unigrams.id("istua").unwrap(),
        );
        let variant = tables.surfaces.get(&key).unwrap().iter().next().unwrap();
        assert_eq!(variant.surface(), "kissa istui");
        assert_eq!(variant.example.as_deref(), Some("kissa istui matolla"));
    }

    #[test]
    fn test_punctuation_excluded() {
        let tables = aggregate("hyvä päivä . hyvä ilta\n", "Hyvää päivää . Hyvää iltaa\n");

        assert_eq!(tables.unigrams.freq_of("hyvä"), 2);
        assert_eq!(tables.unigrams.freq_of("."), 0);
        assert_eq!(tables.unigrams.total(), 4);
        assert_eq!(tables.bigrams.total(), 2);
        assert_eq!(tables.bigram_freq("päivä", "hyvä"), 0);
    }

    #[test]
    fn test_totals() {
        let tables = aggregate("a b c\na b\n", "A B C\nA B\n");
        let totals = tables.totals();
        assert_eq!(totals.tokens, 5);
        assert_eq!(totals.bigrams, 3);
        assert_eq!(tables.bigram_freq("a", "b"), 2);
    }

    #[test]
    fn test_two_passes_are_identical() {
        let lemmas = "kissa istua matto\nkoira istua matto\nkissa juosta\n";
        let surfaces = "Kissa istui matolla\nKoira istui matolla\nKissa juoksi\n";
        let first = aggregate(lemmas, surfaces);
        let second = aggregate(lemmas, surfaces);

        let unigrams_a: FxHashMap<&str, u64> = first.unigrams.iter().collect();
        let unigrams_b: FxHashMap<&str, u64> = second.unigrams.iter().collect();
        assert_eq!(unigrams_a, unigrams_b);
        assert_eq!(first.bigrams, second.bigrams);
    }

    #[test]
    fn test_variants_bounded_after_finish() {
        let mut aggregator = Aggregator::new(AggregateConfig {
            variant_capacity: 4,
            variant_keep: 2,
        });
        let corpus = (0..10)
            .map(|i| format!("s{i} x"))
            .collect::<Vec<_>>()
            .join("\n");
        let lemmas = vec!["talo iso"; 10].join("\n");
        aggregator
            .add_all(AlignedCorpus::from_strs(&lemmas, &corpus))
            .unwrap();
        assert!(aggregator.surfaces.max_set_len() <= 4);

        let tables = aggregator.finish();
        assert_eq!(tables.bigram_freq("talo", "iso"), 10);
        assert!(tables.surfaces.max_set_len() <= 2);
    }
}
