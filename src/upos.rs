//! Universal POS tags and the one-letter codes accepted on the command line

use rustc_hash::FxHashSet;

pub const PROPN: &str = "PROPN";

/// One-letter POS code -> UPOS tag
pub const POS_CODES: [(char, &str); 14] = [
    ('N', "NOUN"),
    ('P', "PROPN"),
    ('V', "VERB"),
    ('A', "ADJ"),
    ('D', "ADV"),
    ('O', "PRON"),
    ('R', "ADP"), // adposition (pre/post)
    ('T', "DET"),
    ('M', "NUM"),
    ('U', "AUX"),
    ('C', "CCONJ"),
    ('S', "SCONJ"),
    ('I', "INTJ"),
    ('X', "X"),
];

/// Convert a one-letter code or a full UPOS name to a UPOS tag
pub fn parse_tag(s: &str) -> Option<&'static str> {
    let s = s.trim().to_uppercase();
    if s.is_empty() {
        return None;
    }

    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if let Some((_, upos)) = POS_CODES.iter().find(|(code, _)| *code == c) {
            return Some(*upos);
        }
    }

    POS_CODES
        .iter()
        .map(|(_, upos)| *upos)
        .find(|upos| *upos == s)
}

/// Parse comma-separated codes/names ("N,P", "ADJ,NOUN") into a tag set
///
/// Unrecognized items are ignored; `None` if nothing was recognized.
pub fn parse_tag_list(s: &str) -> Option<FxHashSet<String>> {
    let tags: FxHashSet<String> = s
        .split(',')
        .filter_map(parse_tag)
        .map(str::to_owned)
        .collect();
    if tags.is_empty() { None } else { Some(tags) }
}

/// Parse a bigram pattern like "A+N" or "ADJ+NOUN"
pub fn parse_tag_pattern(s: &str) -> Option<(String, String)> {
    let (left, right) = s.split_once('+')?;
    Some((parse_tag(left)?.to_owned(), parse_tag(right)?.to_owned()))
}

/// Legend printed by the command-line help
pub fn code_legend() -> String {
    POS_CODES
        .iter()
        .map(|(code, upos)| format!("{code}={upos}"))
        .collect::<Vec<_>>()
        .join(" ")
}
