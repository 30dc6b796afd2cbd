use collocations::cache::CacheDir;
use collocations::export::{ExportOptions, ExportOutcome, export_params, read_export};
use collocations::pipeline::{BuildOptions, Sources};
use collocations::variants::contains_folded;
use collocations::{
    CollocateLookup, CollocateParams, CollocationIndex, Direction, GlobalParams, pmi,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ADJECTIVES: &[(&str, &[&str])] = &[
    ("hyvä", &["hyvä", "hyvää", "hyvän"]),
    ("kaunis", &["kaunis", "kaunista", "kauniin"]),
    ("iso", &["iso", "isoa", "ison"]),
];
const NOUNS: &[(&str, &[&str])] = &[
    ("päivä", &["päivä", "päivää", "päivän"]),
    ("talo", &["talo", "taloa", "talon"]),
    ("ilta", &["ilta", "iltaa", "illan"]),
    ("kissa", &["kissa", "kissaa", "kissan"]),
];
const VERBS: &[(&str, &[&str])] = &[
    ("nähdä", &["näin", "näki", "nähdä"]),
    ("odottaa", &["odotan", "odotti", "odottaa"]),
];

struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }

    fn pick<'a>(&mut self, words: &'a [(&'a str, &'a [&'a str])]) -> (&'a str, &'a str) {
        let (lemma, forms) = words[self.next(words.len())];
        (lemma, forms[self.next(forms.len())])
    }
}

/// Deterministic corpus of "ADJ NOUN VERB ADJ NOUN ." sentences
fn write_corpus(dir: &Path) -> Sources {
    let mut rng = Lcg(7);
    let mut lemma_lines = Vec::new();
    let mut surface_lines = Vec::new();
    for i in 0..400 {
        let mut lemmas = Vec::new();
        let mut surfaces = Vec::new();
        for slot in [ADJECTIVES, NOUNS, VERBS, ADJECTIVES, NOUNS] {
            let (lemma, form) = rng.pick(slot);
            lemmas.push(lemma);
            surfaces.push(form);
        }
        // "hyvä päivä" is a strong fixed pair
        if i % 3 == 0 {
            lemmas[0] = "hyvä";
            lemmas[1] = "päivä";
            surfaces[0] = "Hyvää";
            surfaces[1] = "päivää";
        }
        lemmas.push(".");
        surfaces.push(".");
        lemma_lines.push(lemmas.join(" "));
        surface_lines.push(surfaces.join(" "));
    }

    let lemmas = dir.join("lemmas.txt");
    let surfaces = dir.join("surfaces.txt");
    fs::write(&lemmas, lemma_lines.join("\n")).unwrap();
    fs::write(&surfaces, surface_lines.join("\n")).unwrap();
    Sources {
        lemmas,
        surfaces,
        pos_root: None,
    }
}

fn build(dir: &Path) -> CollocationIndex {
    CollocationIndex::build(&write_corpus(dir), &BuildOptions::default()).unwrap()
}

fn loose_collocates() -> CollocateParams {
    CollocateParams {
        min_bigram_freq: 1,
        min_unigram_freq: 1,
        top_n: usize::MAX,
        require_positive_pmi: false,
        ..CollocateParams::default()
    }
}

fn loose_global() -> GlobalParams {
    GlobalParams {
        min_bigram_freq: 1,
        min_unigram_freq: 1,
        top_n: usize::MAX,
        require_positive_pmi: false,
        ..GlobalParams::default()
    }
}

#[test]
fn pmi_matches_log_difference_for_every_pair() {
    let dir = TempDir::new().unwrap();
    let index = build(dir.path());
    let tables = index.tables();
    let totals = index.totals();
    assert!(!tables.bigrams.is_empty());

    for (&(a, b), f12) in tables.bigrams.iter() {
        let (f1, f2) = (tables.unigrams.freq(a), tables.unigrams.freq(b));
        let expected = (f12 as f64 / totals.bigrams as f64).ln()
            - (f1 as f64 / totals.tokens as f64).ln()
            - (f2 as f64 / totals.tokens as f64).ln();
        let value = pmi(f12, f1, f2, totals).unwrap();
        assert!((value - expected).abs() < 1e-9);
    }
}

#[test]
fn two_builds_produce_identical_counts() {
    let dir = TempDir::new().unwrap();
    let sources = write_corpus(dir.path());
    let first = CollocationIndex::build(&sources, &BuildOptions::default()).unwrap();
    let second = CollocationIndex::build(&sources, &BuildOptions::default()).unwrap();
    assert_eq!(first.tables().unigrams, second.tables().unigrams);
    assert_eq!(first.tables().bigrams, second.tables().bigrams);
}

#[test]
fn punctuation_never_counted() {
    let dir = TempDir::new().unwrap();
    let index = build(dir.path());
    assert_eq!(index.tables().unigrams.freq_of("."), 0);
    assert_eq!(index.totals().tokens, 400 * 5);
    assert_eq!(index.totals().bigrams, 400 * 4);
}

#[test]
fn raising_min_bigram_freq_never_grows_results() {
    let dir = TempDir::new().unwrap();
    let index = build(dir.path());

    let mut previous = (usize::MAX, usize::MAX);
    for min in [1, 2, 5, 10, 20, 50, 100, 200] {
        let global = index
            .top_global(&GlobalParams {
                min_bigram_freq: min,
                ..loose_global()
            })
            .len();
        let local = index
            .collocates(
                "päivä",
                &CollocateParams {
                    min_bigram_freq: min,
                    ..loose_collocates()
                },
            )
            .collocates()
            .len();
        assert!(global <= previous.0 && local <= previous.1, "min_bigram_freq={min}");
        previous = (global, local);
    }
}

#[test]
fn reported_direction_matches_winning_pair() {
    let dir = TempDir::new().unwrap();
    let index = build(dir.path());

    for target in ["päivä", "hyvä", "talo", "nähdä"] {
        for direction in [Direction::Left, Direction::Right, Direction::Both] {
            let params = CollocateParams {
                direction,
                ..loose_collocates()
            };
            for c in index.collocates(target, &params).collocates() {
                let pair = (c.collocation.first.as_str(), c.collocation.second.as_str());
                match c.direction() {
                    Direction::Right => assert_eq!(pair, (target, c.other.as_str())),
                    Direction::Left => assert_eq!(pair, (c.other.as_str(), target)),
                    Direction::Both => panic!("adjacent pair must have a side"),
                }
                if direction != Direction::Both {
                    assert_eq!(c.direction(), direction);
                }
            }
        }
    }
}

#[test]
fn every_example_contains_its_surface_form() {
    let dir = TempDir::new().unwrap();
    let index = build(dir.path());

    let global = index.top_global(&loose_global());
    assert!(!global.is_empty());
    for c in &global {
        assert!(contains_folded(&c.example, &c.surface), "{c:?}");
    }

    for target in ["päivä", "kissa", "iso"] {
        for c in index.collocates(target, &loose_collocates()).collocates() {
            assert!(contains_folded(&c.collocation.example, &c.collocation.surface));
        }
    }
}

#[test]
fn strong_pair_leads_the_collocates() {
    let dir = TempDir::new().unwrap();
    let index = build(dir.path());

    let lookup = index.collocates("päivä", &loose_collocates());
    let first = &lookup.collocates()[0];
    assert_eq!(first.other, "hyvä");
    assert_eq!(first.direction(), Direction::Left);
    assert!(first.collocation.pmi > 0.0);
    assert!(contains_folded(&first.collocation.surface, "päivää"));
}

#[test]
fn export_round_trips_query_results() {
    let dir = TempDir::new().unwrap();
    let index = build(dir.path());
    let export_dir = dir.path().join("tsv");

    let options = ExportOptions::default();
    let outcome = index.export("päivä", &export_dir, &options).unwrap();
    let ExportOutcome::Written { path, rows } = outcome else {
        panic!("expected an export file, got {outcome:?}");
    };

    let expected: Vec<(String, String, Direction, u64)> = index
        .collocates("päivä", &export_params())
        .collocates()
        .iter()
        .map(|c| (c.target.clone(), c.other.clone(), c.direction(), c.collocation.freq))
        .collect();
    let parsed: Vec<(String, String, Direction, u64)> = read_export(&path)
        .unwrap()
        .into_iter()
        .map(|r| (r.word, r.other_form, r.direction, r.freq))
        .collect();

    assert_eq!(rows, expected.len());
    assert_eq!(parsed, expected);

    let text = fs::read_to_string(&path).unwrap();
    for line in text.lines().skip(1) {
        let pmi = line.split('\t').nth(5).unwrap();
        assert_eq!(pmi.split('.').nth(1).map(str::len), Some(4), "{pmi}");
    }
}

#[test]
fn unknown_lemma_is_reported_not_raised() {
    let dir = TempDir::new().unwrap();
    let index = build(dir.path());

    let lookup = index.collocates("olematon", &CollocateParams::default());
    assert!(matches!(lookup, CollocateLookup::UnknownLemma(ref lemma) if lemma == "olematon"));
    assert!(lookup.collocates().is_empty());

    let outcome = index
        .export("olematon", &dir.path().join("tsv"), &ExportOptions::default())
        .unwrap();
    assert_eq!(outcome, ExportOutcome::UnknownLemma);
}

#[test]
fn cached_tables_answer_like_fresh_ones() {
    let dir = TempDir::new().unwrap();
    let sources = write_corpus(dir.path());
    let cache = CacheDir::new(dir.path().join("cache"));
    let options = BuildOptions::default();

    let fresh = CollocationIndex::load_or_build(&sources, &options, &cache).unwrap();
    let cached = CollocationIndex::load_or_build(&sources, &options, &cache).unwrap();

    assert_eq!(
        fresh.collocates("päivä", &loose_collocates()),
        cached.collocates("päivä", &loose_collocates())
    );
    assert_eq!(fresh.top_global(&loose_global()), cached.top_global(&loose_global()));
}
