//! Example harvesting for exported collocations
//!
//! Rescans the aligned corpus for the lemma bigrams behind a set of export
//! rows and collects further example sentences for each collocation.

use crate::corpus::{AlignedCorpus, Sentence};
use crate::error::{CollocError, Result};
use crate::export::{ExportRow, read_export, write_rows};
use crate::query::Direction;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::fs;
use std::path::Path;
use tracing::info;

pub const DEFAULT_MAX_EXAMPLES: usize = 10;

#[derive(Debug)]
struct Entry {
    template: ExportRow,
    seen: FxHashSet<String>,
    examples: Vec<ExportRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStats {
    pub collocations: usize,
    pub examples: usize,
}

/// Collects up to `max_examples` distinct sentences per collocation
#[derive(Debug)]
pub struct Harvester {
    max_examples: usize,
    entries: Vec<Entry>,
    // first lemma -> second lemma -> entry indices
    by_bigram: FxHashMap<String, FxHashMap<String, SmallVec<[usize; 2]>>>,
    open: usize,
}

impl Harvester {
    pub fn new(rows: Vec<ExportRow>, max_examples: usize) -> Self {
        let mut harvester = Self {
            max_examples,
            entries: Vec::with_capacity(rows.len()),
            by_bigram: FxHashMap::default(),
            open: 0,
        };
        for row in rows {
            harvester.add_collocation(row);
        }
        harvester
    }

    fn add_collocation(&mut self, row: ExportRow) {
        let index = self.entries.len();
        let (word, other) = (row.word.clone(), row.other_form.clone());
        let mut bigrams: SmallVec<[(String, String); 2]> = SmallVec::new();
        if matches!(row.direction, Direction::Right | Direction::Both) {
            bigrams.push((word.clone(), other.clone()));
        }
        if matches!(row.direction, Direction::Left | Direction::Both) {
            bigrams.push((other, word));
        }
        for (first, second) in bigrams {
            self.by_bigram
                .entry(first)
                .or_default()
                .entry(second)
                .or_default()
                .push(index);
        }
        self.entries.push(Entry {
            template: row,
            seen: FxHashSet::default(),
            examples: Vec::new(),
        });
        if self.max_examples > 0 {
            self.open += 1;
        }
    }

    /// True once every collocation has its full set of examples
    pub fn is_saturated(&self) -> bool {
        self.open == 0
    }

    pub fn add_sentence(&mut self, sentence: &Sentence) {
        for i in 0..sentence.len().saturating_sub(1) {
            let Some(indices) = self
                .by_bigram
                .get(sentence.lemmas[i].as_str())
                .and_then(|seconds| seconds.get(sentence.lemmas[i + 1].as_str()))
            else {
                continue;
            };

            for &index in indices {
                let entry = &mut self.entries[index];
                if entry.examples.len() >= self.max_examples || entry.seen.contains(&sentence.text) {
                    continue;
                }
                entry.seen.insert(sentence.text.clone());
                entry.examples.push(ExportRow {
                    surface_form: format!("{} {}", sentence.surfaces[i], sentence.surfaces[i + 1]),
                    example_sentence: sentence.text.clone(),
                    ..entry.template.clone()
                });
                if entry.examples.len() == self.max_examples {
                    self.open -= 1;
                }
            }
        }
    }

    /// Feed sentences until the input ends or every collocation is full
    pub fn harvest<I>(&mut self, sentences: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<Sentence>>,
    {
        for sentence in sentences {
            if self.is_saturated() {
                break;
            }
            self.add_sentence(&sentence?);
        }
        Ok(())
    }

    pub fn stats(&self) -> HarvestStats {
        HarvestStats {
            collocations: self.entries.len(),
            examples: self.entries.iter().map(|e| e.examples.len()).sum(),
        }
    }

    /// Example rows grouped by collocation, in input order
    pub fn into_rows(self) -> Vec<ExportRow> {
        self.entries
            .into_iter()
            .flat_map(|entry| entry.examples)
            .collect()
    }
}

/// Harvest examples for every row of `input` and write them to `output`
pub fn harvest_file(
    lemma_path: &Path,
    surface_path: &Path,
    input: &Path,
    output: &Path,
    max_examples: usize,
) -> Result<HarvestStats> {
    let rows = read_export(input)?;
    info!("harvesting examples for {} collocations from {}", rows.len(), input.display());

    let mut harvester = Harvester::new(rows, max_examples);
    harvester.harvest(AlignedCorpus::open(lemma_path, surface_path)?)?;
    let stats = harvester.stats();

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(output).map_err(|source| CollocError::FileOpen {
        path: output.to_path_buf(),
        source,
    })?;
    write_rows(file, &harvester.into_rows())?;

    info!(
        "collected {} examples for {} collocations into {}",
        stats.examples,
        stats.collocations,
        output.display()
    );
    Ok(stats)
}
