//! Representative surface form and example selection
//!
//! Picks, for one lemma pair, the surface variant that best represents
//! it together with an example sentence that provably contains it.

use crate::variants::{SurfaceVariant, VariantSet};

/// A surface variant paired with its verified example
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Representative<'a> {
    pub variant: &'a SurfaceVariant,
    pub example: &'a str,
}

impl Representative<'_> {
    pub fn surface(&self) -> String {
        self.variant.surface()
    }
}

/// Choose the representative variant of `set`
///
/// Variants are ranked by count (descending) with shorter combined surface
/// length breaking ties. Walking that ranking, variants whose example is
/// longer than `max_example_chars` are skipped, and the first variant
/// whose stored example still contains its surface text wins.
///
/// `None` means no usable example exists; the candidate must be dropped
/// rather than shown with a borrowed or mismatched sentence.
pub fn select_representative(
    set: &VariantSet,
    max_example_chars: Option<usize>,
) -> Option<Representative<'_>> {
    let mut ranked: Vec<&SurfaceVariant> = set.iter().collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.surface_len().cmp(&b.surface_len()))
    });

    ranked.into_iter().find_map(|variant| {
        let example = variant.example.as_deref()?;
        if max_example_chars.is_some_and(|max| example.chars().count() > max) {
            return None;
        }
        variant.is_verified().then_some(Representative { variant, example })
    })
}
