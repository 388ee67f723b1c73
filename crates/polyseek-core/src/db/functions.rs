//! In-database search functions
//!
//! The fuzzy matcher and the query-side cosine distance run inside SQLite as
//! scalar functions, registered per request with the classified search terms
//! captured in the closure. This keeps admission, ordering and the page
//! limit in one store query.

use super::vectors;
use crate::db::Database;
use crate::error::Result;
use crate::search::fuzzy::{self, SearchPlan};
use rusqlite::functions::{Context, FunctionFlags};
use std::sync::Arc;

fn function_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> rusqlite::Error {
    rusqlite::Error::UserFunctionError(Box::new(e))
}

fn json_list(ctx: &Context<'_>, index: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = ctx.get(index)?;
    serde_json::from_str(&raw).map_err(function_error)
}

impl Database {
    /// Register `search_match(text, translation, 6 token-array columns)`.
    ///
    /// Returns the match-metadata JSON for the row, or NULL when no mode
    /// matched any column. The token index arrays travel in the signature
    /// for parity with the store contract; matching needs only the lists.
    pub fn register_match_function(&self, plan: Arc<SearchPlan>) -> Result<()> {
        self.conn.create_scalar_function(
            "search_match",
            8,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            move |ctx| {
                let text: String = ctx.get(0)?;
                let translation: String = ctx.get::<Option<String>>(1)?.unwrap_or_default();
                let token_list = json_list(ctx, 2)?;
                let translation_token_list = json_list(ctx, 5)?;

                let matched =
                    fuzzy::match_item(&plan, &text, &translation, &token_list, &translation_token_list);
                match matched {
                    Some(columns) => Ok(Some(
                        serde_json::to_string(&columns).map_err(function_error)?,
                    )),
                    None => Ok(None),
                }
            },
        )?;
        Ok(())
    }

    /// Register `query_cosine_distance(vector)`: the minimum cosine distance
    /// of the row's embedding against all sentence embeddings, NULL for rows
    /// without a vector.
    pub fn register_cosine_function(
        &self,
        sentence_embeddings: Arc<Vec<Vec<f32>>>,
        use_half_vec: bool,
    ) -> Result<()> {
        self.conn.create_scalar_function(
            "query_cosine_distance",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            move |ctx| {
                let blob: Option<Vec<u8>> = ctx.get(0)?;
                let Some(blob) = blob else {
                    return Ok(None);
                };
                if sentence_embeddings.is_empty() {
                    return Ok(None);
                }
                let vector = vectors::decode_vector(&blob, use_half_vec);
                let distance = sentence_embeddings
                    .iter()
                    .map(|embedding| vectors::cosine_distance(&vector, embedding) as f64)
                    .fold(f64::INFINITY, f64::min);
                Ok(Some(distance))
            },
        )?;
        Ok(())
    }
}
