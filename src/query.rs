//! Collocation queries
//!
//! Two read-only query modes over the corpus tables:
//! - global top-N: strongest pairs in the whole corpus, ranked by PMI
//!   first and frequency second;
//! - per-lemma collocates: pairs containing a target lemma, ranked by
//!   frequency first and PMI second, so common pairs come first.
//!
//! Both modes drop pairs with undefined PMI and pairs without a verified
//! representative example.

use crate::counts::FrequencyTables;
use crate::example::select_representative;
use crate::filter::FunctionWordFilter;
use crate::interner::LemmaId;
use crate::pmi::{Totals, pmi};
use crate::pos::PosIndex;
use crate::upos::PROPN;
use crate::variants::{LemmaPair, contains_folded};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MIN_BIGRAM_FREQ: u64 = 20;
pub const DEFAULT_MIN_UNIGRAM_FREQ: u64 = 200;
pub const DEFAULT_COLLOCATE_TOP_N: usize = 30;
pub const DEFAULT_GLOBAL_TOP_N: usize = 50;

/// Side of the target lemma a collocate is looked for on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Target is the second element: (other, target)
    #[serde(rename = "L")]
    Left,
    /// Target is the first element: (target, other)
    #[serde(rename = "R")]
    Right,
    #[default]
    #[serde(rename = "B")]
    Both,
}

impl Direction {
    pub fn code(self) -> char {
        match self {
            Direction::Left => 'L',
            Direction::Right => 'R',
            Direction::Both => 'B',
        }
    }

    /// Direction of `other` relative to `target` in the pair (first, second)
    pub fn of_pair(target: &str, other: &str, first: &str, second: &str) -> Self {
        if first == target && second == other {
            Direction::Right
        } else if second == target && first == other {
            Direction::Left
        } else {
            Direction::Both
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Direction {
    type Err = String;

    /// Accepts "L"/"R"/"B" codes or "left"/"right"/"both", any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "l" | "left" => Ok(Direction::Left),
            "r" | "right" => Ok(Direction::Right),
            "b" | "both" => Ok(Direction::Both),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

/// Read-only view over the tables a query needs
#[derive(Debug, Clone, Copy)]
pub struct TableView<'a> {
    pub tables: &'a FrequencyTables,
    pub pos: &'a PosIndex,
    pub filter: &'a FunctionWordFilter,
    pub totals: Totals,
}

impl<'a> TableView<'a> {
    pub fn new(tables: &'a FrequencyTables, pos: &'a PosIndex, filter: &'a FunctionWordFilter) -> Self {
        Self {
            tables,
            pos,
            filter,
            totals: tables.totals(),
        }
    }

    fn lemma(&self, id: LemmaId) -> &'a str {
        self.tables.unigrams.lemma(id)
    }

    fn is_function_word(&self, lemma: &str) -> bool {
        self.filter.is_function_word(lemma, self.pos)
    }

    fn score(&self, pair: LemmaPair, f12: u64) -> Option<f64> {
        let f1 = self.tables.unigrams.freq(pair.0);
        let f2 = self.tables.unigrams.freq(pair.1);
        pmi(f12, f1, f2, self.totals)
    }

    /// Resolve the representative surface + example, or `None`
    fn represent(&self, pair: &LemmaPair, max_example_chars: Option<usize>) -> Option<(String, String)> {
        let set = self.tables.surfaces.get(pair)?;
        let rep = select_representative(set, max_example_chars)?;
        Some((rep.surface(), rep.example.to_string()))
    }
}

/// A scored lemma pair with its representative surface form and example
#[derive(Debug, Clone, PartialEq)]
pub struct Collocation {
    pub first: String,
    pub second: String,
    pub freq: u64,
    pub pmi: f64,
    pub surface: String,
    pub example: String,
}

/// A collocation seen from a target lemma
#[derive(Debug, Clone, PartialEq)]
pub struct Collocate {
    pub target: String,
    pub other: String,
    pub collocation: Collocation,
}

impl Collocate {
    /// Direction of the collocate in the pair that produced it
    pub fn direction(&self) -> Direction {
        Direction::of_pair(
            &self.target,
            &self.other,
            &self.collocation.first,
            &self.collocation.second,
        )
    }
}

/// Mode A parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalParams {
    pub min_bigram_freq: u64,
    /// Applied to both lemmas of the pair
    pub min_unigram_freq: u64,
    pub top_n: usize,
    /// Drop pairs where both lemmas are proper nouns
    pub skip_propn_pairs: bool,
    pub require_positive_pmi: bool,
    /// Exact (POS1, POS2) restriction
    pub pos_pattern: Option<(String, String)>,
    pub max_example_chars: Option<usize>,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            min_bigram_freq: DEFAULT_MIN_BIGRAM_FREQ,
            min_unigram_freq: DEFAULT_MIN_UNIGRAM_FREQ,
            top_n: DEFAULT_GLOBAL_TOP_N,
            skip_propn_pairs: true,
            require_positive_pmi: true,
            pos_pattern: None,
            max_example_chars: None,
        }
    }
}

/// Mode B parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CollocateParams {
    pub min_bigram_freq: u64,
    /// Applied to the collocate
    pub min_unigram_freq: u64,
    pub top_n: usize,
    pub direction: Direction,
    /// Allowed POS tags for the collocate
    pub allowed_pos: Option<FxHashSet<String>>,
    /// Case-insensitive substring the representative surface must contain
    pub surface_filter: Option<String>,
    pub require_positive_pmi: bool,
    pub max_example_chars: Option<usize>,
}

impl Default for CollocateParams {
    fn default() -> Self {
        Self {
            min_bigram_freq: DEFAULT_MIN_BIGRAM_FREQ,
            min_unigram_freq: DEFAULT_MIN_UNIGRAM_FREQ,
            top_n: DEFAULT_COLLOCATE_TOP_N,
            direction: Direction::Both,
            allowed_pos: None,
            surface_filter: None,
            require_positive_pmi: true,
            max_example_chars: None,
        }
    }
}

/// Outcome of a per-lemma query
#[derive(Debug, Clone, PartialEq)]
pub enum CollocateLookup {
    /// The target lemma does not occur in the corpus
    UnknownLemma(String),
    Found(Vec<Collocate>),
}

impl CollocateLookup {
    pub fn is_found(&self) -> bool {
        matches!(self, CollocateLookup::Found(_))
    }

    /// Collocates in ranking order (empty for an unknown lemma)
    pub fn collocates(&self) -> &[Collocate] {
        match self {
            CollocateLookup::UnknownLemma(_) => &[],
            CollocateLookup::Found(collocates) => collocates,
        }
    }

    pub fn into_collocates(self) -> Vec<Collocate> {
        match self {
            CollocateLookup::UnknownLemma(_) => Vec::new(),
            CollocateLookup::Found(collocates) => collocates,
        }
    }
}

fn keep_score(score: Option<f64>, require_positive: bool) -> Option<f64> {
    score.filter(|value| !require_positive || *value > 0.0)
}

/// Mode A: strongest collocations in the whole corpus
pub fn top_global(view: TableView<'_>, params: &GlobalParams) -> Vec<Collocation> {
    let unigrams = &view.tables.unigrams;
    let mut results = Vec::new();

    for (pair, f12) in view.tables.bigrams.iter() {
        if f12 < params.min_bigram_freq {
            continue;
        }
        if unigrams.freq(pair.0) < params.min_unigram_freq
            || unigrams.freq(pair.1) < params.min_unigram_freq
        {
            continue;
        }

        let (first, second) = (view.lemma(pair.0), view.lemma(pair.1));
        let pos1 = view.pos.get(first);
        let pos2 = view.pos.get(second);

        if params.skip_propn_pairs && pos1 == Some(PROPN) && pos2 == Some(PROPN) {
            continue;
        }
        if view.is_function_word(first) || view.is_function_word(second) {
            continue;
        }
        if let Some((want1, want2)) = &params.pos_pattern {
            if pos1 != Some(want1.as_str()) || pos2 != Some(want2.as_str()) {
                continue;
            }
        }

        let Some(score) = keep_score(view.score(*pair, f12), params.require_positive_pmi) else {
            continue;
        };
        let Some((surface, example)) = view.represent(pair, params.max_example_chars) else {
            continue;
        };

        results.push(Collocation {
            first: first.to_string(),
            second: second.to_string(),
            freq: f12,
            pmi: score,
            surface,
            example,
        });
    }

    results.sort_by(|a, b| {
        b.pmi
            .total_cmp(&a.pmi)
            .then_with(|| b.freq.cmp(&a.freq))
            .then_with(|| (&a.first, &a.second).cmp(&(&b.first, &b.second)))
    });
    results.truncate(params.top_n);
    results
}

/// Mode B: collocates of one target lemma
pub fn collocates_for(view: TableView<'_>, target: &str, params: &CollocateParams) -> CollocateLookup {
    let unigrams = &view.tables.unigrams;
    let Some(target_id) = unigrams.id(target).filter(|&id| unigrams.freq(id) > 0) else {
        return CollocateLookup::UnknownLemma(target.to_string());
    };
    let surface_filter = params.surface_filter.as_deref().filter(|s| !s.is_empty());

    let mut results = Vec::new();
    for (pair, f12) in view.tables.bigrams.iter() {
        if f12 < params.min_bigram_freq {
            continue;
        }

        let other_id = match params.direction {
            Direction::Right if pair.0 == target_id => pair.1,
            Direction::Left if pair.1 == target_id => pair.0,
            Direction::Both if pair.0 == target_id => pair.1,
            Direction::Both if pair.1 == target_id => pair.0,
            _ => continue,
        };

        if unigrams.freq(other_id) < params.min_unigram_freq {
            continue;
        }

        let other = view.lemma(other_id);
        if view.is_function_word(other) {
            continue;
        }
        if let Some(allowed) = &params.allowed_pos {
            if !view.pos.get(other).is_some_and(|tag| allowed.contains(tag)) {
                continue;
            }
        }

        let Some((surface, example)) = view.represent(pair, params.max_example_chars) else {
            continue;
        };
        if let Some(needle) = surface_filter {
            if !contains_folded(&surface, needle) {
                continue;
            }
        }

        let Some(score) = keep_score(view.score(*pair, f12), params.require_positive_pmi) else {
            continue;
        };

        results.push(Collocate {
            target: target.to_string(),
            other: other.to_string(),
            collocation: Collocation {
                first: view.lemma(pair.0).to_string(),
                second: view.lemma(pair.1).to_string(),
                freq: f12,
                pmi: score,
                surface,
                example,
            },
        });
    }

    results.sort_by(|a, b| {
        b.collocation
            .freq
            .cmp(&a.collocation.freq)
            .then_with(|| b.collocation.pmi.total_cmp(&a.collocation.pmi))
            .then_with(|| tie_break(a, b))
    });
    results.truncate(params.top_n);
    CollocateLookup::Found(results)
}

fn tie_break(a: &Collocate, b: &Collocate) -> Ordering {
    (&a.other, &a.collocation.first).cmp(&(&b.other, &b.collocation.first))
}
