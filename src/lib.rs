//! Collocations: corpus-driven collocation extraction
//!
//! Builds lemma unigram/bigram statistics from a lemma-aligned and
//! surface-aligned corpus, scores lemma pairs by PMI, filters function
//! words and attaches a verified example sentence to every candidate.

// Core modules (leaves first)
pub mod corpus; // Aligned lemma/surface corpus reader
pub mod counts; // Unigram/bigram aggregation
pub mod error;
pub mod example; // Representative surface form + example selection
pub mod filter; // Function-word filter
pub mod interner; // Lemma interning
pub mod pmi; // Association scoring
pub mod pos; // Lemma -> POS index from annotated corpus trees
pub mod query; // Global and per-lemma collocation queries
pub mod upos; // POS code helpers
pub mod variants; // Bounded surface-variant sets

// Persistence and drivers
pub mod cache;
pub mod config;
pub mod export;
pub mod harvest;
pub mod pipeline;
pub mod request;

// Re-exports for convenience
pub use corpus::{AlignedCorpus, Sentence};
pub use counts::{Aggregator, FrequencyTables};
pub use error::{CacheError, CollocError};
pub use example::{Representative, select_representative};
pub use filter::FunctionWordFilter;
pub use pipeline::CollocationIndex;
pub use pmi::{Totals, pmi};
pub use pos::PosIndex;
pub use query::{
    CollocateLookup, CollocateParams, Collocation, Direction, GlobalParams, collocates_for,
    top_global,
};
pub use request::{Request, Response, dispatch};
