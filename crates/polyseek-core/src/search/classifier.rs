//! Search term classification
//!
//! Splits expansion terms into keyword (single token) and sentence
//! (multi-token) buckets, with embeddings following their strings, and
//! assembles the per-request search plan.

use super::expander::SearchExpansion;
use super::fuzzy::SearchPlan;
use crate::text;

/// One language bucket split into keyword and sentence terms
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub keyword_terms: Vec<String>,
    pub keyword_embeddings: Vec<Vec<f32>>,
    pub sentence_terms: Vec<String>,
    pub sentence_embeddings: Vec<Vec<f32>>,
}

/// Classify terms by their tokenized length.
///
/// Terms are normalized before classification so they compare against
/// `text_normalized` on equal footing; a term that normalizes to nothing is
/// dropped together with its embedding.
pub fn classify(terms: &[String], embeddings: &[Vec<f32>]) -> Classification {
    let mut classification = Classification::default();
    for (index, term) in terms.iter().enumerate() {
        let normalized = text::normalize(term);
        let (tokens, _, _) = text::tokenize(&normalized);
        let embedding = embeddings.get(index).cloned().unwrap_or_default();
        match tokens.len() {
            0 => continue,
            1 => {
                classification.keyword_terms.push(normalized);
                classification.keyword_embeddings.push(embedding);
            }
            _ => {
                classification.sentence_terms.push(normalized);
                classification.sentence_embeddings.push(embedding);
            }
        }
    }
    classification
}

/// Build the search plan from an expansion.
///
/// The original-language bucket holds the synonyms unless the query is
/// English (then it is empty); the target-language bucket holds the
/// translations, or the synonyms for an English query.
pub fn build_plan(expansion: &SearchExpansion) -> SearchPlan {
    let (original, target) = if expansion.is_english {
        (
            Classification::default(),
            classify(&expansion.synonyms, &expansion.synonym_embeddings),
        )
    } else {
        (
            classify(&expansion.synonyms, &expansion.synonym_embeddings),
            classify(&expansion.translations, &expansion.translation_embeddings),
        )
    };

    // The vector leg compares against every expanded query sentence,
    // keyword or not: synonyms, translations and the query itself.
    let mut sentence_embeddings = expansion.synonym_embeddings.clone();
    sentence_embeddings.extend(expansion.translation_embeddings.iter().cloned());

    SearchPlan {
        keyword_terms_original: original.keyword_terms,
        sentence_terms_original: original.sentence_terms,
        keyword_terms_target: target.keyword_terms,
        sentence_terms_target: target.sentence_terms,
        sentence_embeddings,
    }
}
