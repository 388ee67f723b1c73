//! Store layer for polyseek
//!
//! SQLite-backed chunk store. The search path is a pure reader: one paged
//! query per page evaluates the fuzzy-match and cosine-distance functions
//! in-database, applies the canonical ordering and the keyset predicate, and
//! projects candidate rows. Writes exist only for corpus loading.

mod functions;
mod items;
mod schema;
pub mod vectors;

pub use items::{CandidateRow, Item, PageFilter, PageFilterMode};
pub use schema::Database;
