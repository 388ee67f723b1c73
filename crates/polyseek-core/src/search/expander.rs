//! Query expansion
//!
//! One structured LLM call turns the query into same-language synonyms, an
//! English-detection flag and English translations; one embedding batch
//! covers every expansion string plus the query itself.

use crate::config::SearchConfig;
use crate::error::{PolyseekError, Result};
use crate::gather::with_retries;
use crate::llm::{Embedder, LLMClient};
use serde::Deserialize;
use std::collections::BTreeSet;

const EXPANSION_MAX_TOKENS: u32 = 1024;

/// Expanded query: synonyms and translations with their embeddings.
///
/// `synonyms[0]` is always the query itself and `synonym_embeddings` is
/// aligned with `synonyms`; likewise for translations.
#[derive(Debug, Clone)]
pub struct SearchExpansion {
    pub synonyms: Vec<String>,
    pub synonym_embeddings: Vec<Vec<f32>>,
    pub is_english: bool,
    pub translations: Vec<String>,
    pub translation_embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ExpansionResponse {
    #[serde(default)]
    synonym_list: Vec<String>,
    #[serde(default)]
    is_english: Option<bool>,
    #[serde(default)]
    translation_list: Vec<String>,
}

fn expansion_prompt(query: &str) -> String {
    format!(
        "Please complete the following tasks according to the search keyword or sentence **{query}**, then output the final result according to the format provided below:\n\
Task 1: Please provide some synonyms for the search keyword or sentence **{query}**. The synonyms need to be **in the same language with the search**. Please give at least 5 different synonyms and output them as a JSON list.\n\
Task 2: Please identify if the search only includes English, return a JSON value of **true** or **false**.\n\
Task 3: Please translate **{query}** into English **only if it is not in English**, return **an empty JSON list** if the search is in English. Please translate as briefly as possible. Please give at least 6 different possible translations and output them as a JSON list.\n\
The final result needs to be **a JSON object with the following structure**:\n\
{{\n\
  \"synonym_list\": [\"synonym1\", \"synonym2\", \"synonym3\", \"synonym4\", \"synonym5\"],\n\
  \"is_english\": true,\n\
  \"translation_list\": [\"translation1\", \"translation2\", \"translation3\", \"translation4\", \"translation5\", \"translation6\"]\n\
}}"
    )
}

/// Parse the structured response, falling back to the bare query when the
/// LLM did not produce the expected shape
fn parse_expansion(value: serde_json::Value, query: &str) -> (Vec<String>, bool, Vec<String>) {
    match serde_json::from_value::<ExpansionResponse>(value) {
        Ok(response) => (
            response.synonym_list,
            response.is_english.unwrap_or_else(|| query.is_ascii()),
            response.translation_list,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "expansion response malformed, using bare query");
            (vec![query.to_string()], query.is_ascii(), Vec::new())
        }
    }
}

/// Expand a query and embed every expansion string in one batch.
///
/// The LLM call fails the whole search as `ExpansionFailed` after the
/// configured retries; the embedding batch fails as `EmbeddingFailed`.
pub async fn expand(
    llm: &dyn LLMClient,
    embedder: &dyn Embedder,
    config: &SearchConfig,
    query: &str,
) -> Result<SearchExpansion> {
    let prompt = expansion_prompt(query);
    let response = with_retries(
        || llm.complete_json(&prompt, EXPANSION_MAX_TOKENS),
        config.max_retries,
        config.retry_delay(),
    )
    .await
    .map_err(|e| PolyseekError::ExpansionFailed(e.to_string()))?;

    let (synonym_list, is_english, translations) = parse_expansion(response, query);

    let mut synonym_set: BTreeSet<String> = synonym_list.into_iter().collect();
    synonym_set.remove(query);
    let synonyms: Vec<String> = synonym_set.into_iter().collect();

    let mut inputs: Vec<String> = synonyms.clone();
    inputs.extend(translations.iter().cloned());
    inputs.push(query.to_string());
    let embeddings = embedder
        .embed_batch(&inputs)
        .await
        .map_err(|e| PolyseekError::EmbeddingFailed(e.to_string()))?;
    if embeddings.len() != inputs.len() {
        return Err(PolyseekError::EmbeddingFailed(format!(
            "expected {} embeddings, got {}",
            inputs.len(),
            embeddings.len()
        )));
    }

    let query_embedding = embeddings
        .last()
        .cloned()
        .ok_or_else(|| PolyseekError::EmbeddingFailed("empty embedding batch".to_string()))?;
    let translation_embeddings =
        embeddings[synonyms.len()..synonyms.len() + translations.len()].to_vec();

    let (synonyms, synonym_embeddings) = if synonyms.is_empty() {
        (vec![query.to_string()], vec![query_embedding])
    } else {
        let mut pairs: Vec<(String, Vec<f32>)> = synonyms
            .into_iter()
            .zip(embeddings.into_iter())
            .collect();
        pairs.sort_by(|a, b| b.0.cmp(&a.0));
        pairs.insert(0, (query.to_string(), query_embedding));
        pairs.into_iter().unzip()
    };

    Ok(SearchExpansion {
        synonyms,
        synonym_embeddings,
        is_english,
        translations,
        translation_embeddings,
    })
}
