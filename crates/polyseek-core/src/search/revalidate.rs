//! Semantic re-validation of fuzzy matches
//!
//! Lexical matches can be semantically unrelated to the query (a matched
//! substring inside an unrelated word, a false-friend translation). Before
//! highlighting, every matched token and span text of the page is embedded
//! in one batch and compared against the expansion embeddings; matches whose
//! best cosine similarity does not clear the floor are dropped. A failed
//! embedding batch keeps all matches and logs a warning (fail-open).

use super::fuzzy::SearchPlan;
use super::REVALIDATION_MIN_SIMILARITY;
use crate::db::vectors::cosine_similarity;
use crate::db::CandidateRow;
use crate::llm::Embedder;
use std::collections::HashMap;

fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

fn intern(texts: &mut Vec<String>, ids: &mut HashMap<String, usize>, value: String) -> usize {
    if let Some(&id) = ids.get(&value) {
        return id;
    }
    let id = texts.len();
    ids.insert(value.clone(), id);
    texts.push(value);
    id
}

/// Re-validate every match in the page against the expansion embeddings,
/// dropping those below the similarity floor. Keyword and sentence modes are
/// handled independently.
pub async fn revalidate_page(rows: &mut [CandidateRow], plan: &SearchPlan, embedder: &dyn Embedder) {
    if plan.sentence_embeddings.is_empty() {
        return;
    }

    let mut texts: Vec<String> = Vec::new();
    let mut ids: HashMap<String, usize> = HashMap::new();
    for row in rows.iter() {
        let Some(matches) = &row.matches else { continue };
        for &index in matches.original_token_indices.iter().flatten() {
            if let Some(token) = row.item.token_list.get(index) {
                intern(&mut texts, &mut ids, token.clone());
            }
        }
        for &index in matches.translation_token_indices.iter().flatten() {
            if let Some(token) = row.item.translation_token_list.get(index) {
                intern(&mut texts, &mut ids, token.clone());
            }
        }
        for &(start, end) in matches.original_spans.iter().flatten() {
            intern(
                &mut texts,
                &mut ids,
                char_slice(&row.item.text_normalized, start, end),
            );
        }
        for &(start, end) in matches.translation_spans.iter().flatten() {
            intern(
                &mut texts,
                &mut ids,
                char_slice(&row.item.translation_normalized, start, end),
            );
        }
    }
    if texts.is_empty() {
        return;
    }

    let embeddings = match embedder.embed_batch(&texts).await {
        Ok(embeddings) if embeddings.len() == texts.len() => embeddings,
        Ok(embeddings) => {
            tracing::warn!(
                expected = texts.len(),
                got = embeddings.len(),
                "re-validation batch size mismatch, keeping all matches"
            );
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "re-validation embedding failed, keeping all matches");
            return;
        }
    };

    let keep: Vec<bool> = embeddings
        .iter()
        .map(|embedding| {
            plan.sentence_embeddings
                .iter()
                .map(|query_embedding| cosine_similarity(embedding, query_embedding))
                .fold(f32::MIN, f32::max)
                > REVALIDATION_MIN_SIMILARITY
        })
        .collect();
    let keep_text = |value: &str| ids.get(value).map(|&id| keep[id]).unwrap_or(true);

    for row in rows.iter_mut() {
        let Some(matches) = &mut row.matches else { continue };
        let item = &row.item;

        if let Some(indices) = matches.original_token_indices.take() {
            let retained: Vec<usize> = indices
                .into_iter()
                .filter(|&index| {
                    item.token_list
                        .get(index)
                        .map(|t| keep_text(t))
                        .unwrap_or(false)
                })
                .collect();
            matches.original_token_indices = non_empty(retained);
        }
        if let Some(indices) = matches.translation_token_indices.take() {
            let retained: Vec<usize> = indices
                .into_iter()
                .filter(|&index| {
                    item.translation_token_list
                        .get(index)
                        .map(|t| keep_text(t))
                        .unwrap_or(false)
                })
                .collect();
            matches.translation_token_indices = non_empty(retained);
        }
        if let Some(spans) = matches.original_spans.take() {
            let retained: Vec<(usize, usize)> = spans
                .into_iter()
                .filter(|&(start, end)| keep_text(&char_slice(&item.text_normalized, start, end)))
                .collect();
            matches.original_spans = non_empty(retained);
        }
        if let Some(spans) = matches.translation_spans.take() {
            let retained: Vec<(usize, usize)> = spans
                .into_iter()
                .filter(|&(start, end)| {
                    keep_text(&char_slice(&item.translation_normalized, start, end))
                })
                .collect();
            matches.translation_spans = non_empty(retained);
        }

        if !matches.has_any() {
            row.matches = None;
        }
    }
}

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}
