//! Bounded surface-variant sets
//!
//! Every lemma bigram keeps a small set of the surface pairs that realized
//! it, each with a count and at most one example sentence. An example is
//! only stored for a variant when the sentence, lowercased, contains the
//! variant's lowercased surface pair.
//!
//! The set never grows past its capacity. When a new variant arrives at a
//! full set it takes the slot of the weakest entry (space-saving style: it
//! inherits that entry's count plus one). Variants holding a verified
//! example are retained ahead of variants without one, so eviction never
//! trades a usable example for an unusable one.

use crate::interner::LemmaId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cell::OnceCell;
use std::cmp::Ordering;

pub const DEFAULT_VARIANT_CAPACITY: usize = 16;
pub const DEFAULT_VARIANT_KEEP: usize = 8;

pub type LemmaPair = (LemmaId, LemmaId);

/// Case-insensitive substring test used for example verification
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// A sentence whose lowercased form is computed at most once
#[derive(Debug)]
pub struct ExampleText<'a> {
    raw: &'a str,
    lowered: OnceCell<String>,
}

impl<'a> ExampleText<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            lowered: OnceCell::new(),
        }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn lowered(&self) -> &str {
        self.lowered.get_or_init(|| self.raw.to_lowercase())
    }

    fn verifies(&self, first: &str, second: &str) -> bool {
        let surface = format!("{first} {second}").to_lowercase();
        self.lowered().contains(&surface)
    }
}

/// One surface realization of a lemma pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceVariant {
    pub first: Box<str>,
    pub second: Box<str>,
    pub count: u64,
    pub example: Option<Box<str>>,
}

impl SurfaceVariant {
    /// Surface pair as it appears in running text
    pub fn surface(&self) -> String {
        format!("{} {}", self.first, self.second)
    }

    /// Combined surface length in characters
    pub fn surface_len(&self) -> usize {
        self.first.chars().count() + self.second.chars().count()
    }

    /// True if the stored example still contains this variant's text
    pub fn is_verified(&self) -> bool {
        self.example
            .as_deref()
            .is_some_and(|example| contains_folded(example, &self.surface()))
    }

    fn has_example(&self) -> bool {
        self.example.is_some()
    }

    fn matches(&self, first: &str, second: &str) -> bool {
        &*self.first == first && &*self.second == second
    }

    /// Retention order: verified first, then count desc, then shorter surface
    fn retention_cmp(&self, other: &Self) -> Ordering {
        other
            .has_example()
            .cmp(&self.has_example())
            .then_with(|| other.count.cmp(&self.count))
            .then_with(|| self.surface_len().cmp(&other.surface_len()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSet {
    variants: SmallVec<[SurfaceVariant; 1]>,
}

impl VariantSet {
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SurfaceVariant> {
        self.variants.iter()
    }

    /// Count one occurrence of (first, second) seen in `sentence`
    pub fn record(&mut self, first: &str, second: &str, sentence: &ExampleText<'_>, capacity: usize) {
        if let Some(existing) = self.variants.iter_mut().find(|v| v.matches(first, second)) {
            existing.count += 1;
            if existing.example.is_none() && sentence.verifies(first, second) {
                existing.example = Some(sentence.raw().into());
            }
            return;
        }

        let example = sentence
            .verifies(first, second)
            .then(|| Box::<str>::from(sentence.raw()));

        if self.variants.len() < capacity.max(1) {
            self.variants.push(SurfaceVariant {
                first: first.into(),
                second: second.into(),
                count: 1,
                example,
            });
            return;
        }

        // Full: replace the weakest entry, unless that would evict an
        // example-bearing variant for one without an example.
        let Some((slot, weakest)) = self
            .variants
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.retention_cmp(b))
        else {
            return;
        };
        if weakest.has_example() && example.is_none() {
            return;
        }
        let count = weakest.count + 1;
        self.variants[slot] = SurfaceVariant {
            first: first.into(),
            second: second.into(),
            count,
            example,
        };
    }

    /// Keep only the `keep` strongest variants
    pub fn trim(&mut self, keep: usize) {
        if self.variants.len() <= keep {
            return;
        }
        self.variants.sort_by(SurfaceVariant::retention_cmp);
        self.variants.truncate(keep);
    }
}

/// Lemma pair -> bounded variant set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceVariantIndex {
    capacity: usize,
    sets: FxHashMap<LemmaPair, VariantSet>,
}

impl Default for SurfaceVariantIndex {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_VARIANT_CAPACITY)
    }
}

impl SurfaceVariantIndex {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            sets: FxHashMap::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&mut self, key: LemmaPair, first: &str, second: &str, sentence: &ExampleText<'_>) {
        self.sets
            .entry(key)
            .or_default()
            .record(first, second, sentence, self.capacity);
    }

    pub fn get(&self, key: &LemmaPair) -> Option<&VariantSet> {
        self.sets.get(key)
    }

    /// Trim every set to `keep` entries and lower the capacity to match
    pub fn trim_all(&mut self, keep: usize) {
        let keep = keep.max(1).min(self.capacity);
        for set in self.sets.values_mut() {
            set.trim(keep);
        }
        self.capacity = keep;
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Largest per-key set size
    pub fn max_set_len(&self) -> usize {
        self.sets.values().map(VariantSet::len).max().unwrap_or(0)
    }
}
