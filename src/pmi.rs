//! Pointwise mutual information
//!
//! PMI(l1, l2) = ln( P(l1,l2) / (P(l1) * P(l2)) ) with
//! P(l1,l2) = f12 / total_bigrams and P(l) = f(l) / total_tokens.
//! Natural log, no smoothing; the result may be negative.

use serde::{Deserialize, Serialize};

/// Corpus-wide totals the probabilities are normalized by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of all unigram frequencies
    pub tokens: u64,
    /// Sum of all bigram frequencies
    pub bigrams: u64,
}

/// PMI of a pair with joint frequency `f12` and unigram frequencies `f1`, `f2`
///
/// Returns `None` when the score is undefined: a zero unigram frequency or
/// any non-positive probability term. Callers must treat `None` as
/// "exclude", never as zero.
pub fn pmi(f12: u64, f1: u64, f2: u64, totals: Totals) -> Option<f64> {
    if f1 == 0 || f2 == 0 || totals.tokens == 0 || totals.bigrams == 0 {
        return None;
    }

    let p12 = f12 as f64 / totals.bigrams as f64;
    let p1 = f1 as f64 / totals.tokens as f64;
    let p2 = f2 as f64 / totals.tokens as f64;

    if p12 <= 0.0 || p1 <= 0.0 || p2 <= 0.0 {
        return None;
    }

    Some((p12 / (p1 * p2)).ln())
}
