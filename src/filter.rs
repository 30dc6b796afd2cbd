//! Function-word filtering
//!
//! A lemma counts as a function word if it is on the fixed stoplist or
//! its POS tag is one of the grammatical classes in `FUNCTION_UPOS`.
//! Function words are never offered as collocation candidates.

use crate::pos::PosIndex;
use rustc_hash::FxHashSet;

/// UPOS tags treated as grammatical noise
pub const FUNCTION_UPOS: [&str; 5] = ["PRON", "DET", "AUX", "CCONJ", "SCONJ"];

/// Lemmas always treated as function-like, whatever their POS
pub const FUNCTION_LEMMAS: &[&str] = &[
    // negation
    "ei",
    // personal, demonstrative and indefinite pronouns
    "minä", "sinä", "hän", "me", "te", "he", "minun", "sinun", "hänen", "meidän", "teidän",
    "heidän", "tämä", "tuo", "se", "nämä", "nuo", "jokin", "joku", "joka", "jotka", "kukaan",
    "mikään", "moni", "itse",
    // interrogatives
    "mitä", "mikä", "miksi", "missä", "milloin", "miten", "kuka",
    // conjunctions and subordinators
    "ja", "mutta", "tai", "sekä", "että", "jotta", "kun", "jos", "koska", "sillä", "vaikka",
    "vaan", "vai",
    // auxiliaries and semi-auxiliaries
    "voida", "pitää", "täytyä", "saada", "pystyä", "aikoa",
    // discourse adverbs
    "nyt", "sitten", "niin", "vain", "juuri", "edes", "ikinä", "koskaan", "ehkä",
    // adpositions
    "kanssa", "ilman", "kautta",
];

#[derive(Debug, Clone)]
pub struct FunctionWordFilter {
    stoplist: FxHashSet<String>,
    tags: FxHashSet<String>,
}

impl Default for FunctionWordFilter {
    fn default() -> Self {
        Self::from_lists(FUNCTION_LEMMAS, &FUNCTION_UPOS)
    }
}

impl FunctionWordFilter {
    pub fn from_lists(lemmas: &[&str], tags: &[&str]) -> Self {
        Self {
            stoplist: lemmas.iter().map(|w| w.to_string()).collect(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Add lemmas to the stoplist
    pub fn add_lemmas<S: AsRef<str>>(&mut self, lemmas: &[S]) {
        for lemma in lemmas {
            self.stoplist.insert(lemma.as_ref().to_string());
        }
    }

    pub fn is_function_word(&self, lemma: &str, pos: &PosIndex) -> bool {
        if self.stoplist.contains(lemma) {
            return true;
        }
        pos.get(lemma).is_some_and(|tag| self.tags.contains(tag))
    }
}
