//! Cross-language search engine
//!
//! Pipeline: query -> expander -> classifier -> paged store query (fuzzy
//! match + vector distance in-database) -> re-validation -> highlight ->
//! assembler, looped by the keyset cursor until the store runs dry or the
//! requested page delta is consumed.

pub mod classifier;
pub mod cursor;
pub mod expander;
pub mod fuzzy;
pub mod highlight;
pub mod revalidate;
mod stream;

pub use classifier::{build_plan, classify, Classification};
pub use cursor::SortKey;
pub use expander::{expand, SearchExpansion};
pub use fuzzy::{MatchColumns, SearchPlan};
pub use stream::{
    cross_language_search, Highlight, PageBatch, SearchHit, SearchPages, SearchRequest,
    SearchServices,
};

/// Fuzzy acceptance threshold for keyword and sentence matching, in percent
pub const FUZZY_MATCH_THRESHOLD: f64 = 90.0;

/// Cosine-distance ceiling for embedding-only admission
pub const EMBEDDING_ONLY_MAX_DISTANCE: f64 = 0.4;

/// Cosine-similarity floor a fuzzy match must clear during re-validation
pub const REVALIDATION_MIN_SIMILARITY: f32 = 0.8;
