use collocations::{AlignedCorpus, Aggregator, CollocateParams, CollocationIndex, FunctionWordFilter, PosIndex};
use divan::{Bencher, black_box};

fn main() {
    divan::main();
}

const WORDS: &[(&str, &str)] = &[
    ("hyvä", "hyvää"),
    ("päivä", "päivää"),
    ("kaunis", "kaunis"),
    ("ilta", "iltaa"),
    ("nähdä", "näin"),
    ("talo", "talon"),
    ("iso", "ison"),
    ("kissa", "kissan"),
    (".", "."),
];

/// Synthetic aligned corpus with `lines` sentences of eight tokens
fn corpus(lines: usize) -> (String, String) {
    let mut lemmas = String::new();
    let mut surfaces = String::new();
    let mut state = 17usize;
    for _ in 0..lines {
        for i in 0..8 {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            let (lemma, surface) = WORDS[(state >> 16) % WORDS.len()];
            if i > 0 {
                lemmas.push(' ');
                surfaces.push(' ');
            }
            lemmas.push_str(lemma);
            surfaces.push_str(surface);
        }
        lemmas.push('\n');
        surfaces.push('\n');
    }
    (lemmas, surfaces)
}

#[divan::bench(args = [1_000, 10_000])]
fn aggregate(bencher: Bencher, lines: usize) {
    let (lemmas, surfaces) = corpus(lines);
    bencher.bench_local(|| {
        let mut aggregator = Aggregator::default();
        aggregator
            .add_all(AlignedCorpus::from_strs(black_box(&lemmas), black_box(&surfaces)))
            .unwrap();
        black_box(aggregator.finish())
    });
}

#[divan::bench]
fn collocates(bencher: Bencher) {
    let (lemmas, surfaces) = corpus(10_000);
    let index = CollocationIndex::from_corpus(
        AlignedCorpus::from_strs(&lemmas, &surfaces),
        PosIndex::new(),
        FunctionWordFilter::default(),
        Default::default(),
    )
    .unwrap();
    let params = CollocateParams::default();
    bencher.bench_local(|| black_box(index.collocates(black_box("päivä"), &params)));
}
