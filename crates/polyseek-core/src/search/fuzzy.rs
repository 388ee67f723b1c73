//! Fuzzy keyword and sentence matching
//!
//! Keyword terms (single token) are matched per-token with a prefix-weighted
//! Jaro-Winkler ratio; sentence terms (multi-token) are matched as
//! substrings with a sliding Levenshtein alignment driven by a FIFO queue of
//! unmatched segments. All offsets are character offsets.

use super::FUZZY_MATCH_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Levenshtein similarity percentage in [0, 100]
pub fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Jaro-Winkler similarity percentage in [0, 100], used for keyword terms
pub fn keyword_ratio(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(a, b) * 100.0
}

/// Best keyword ratio of `term` against all `|term|`-char windows of `token`
pub fn partial_keyword_ratio(token: &str, term: &str) -> f64 {
    let token_chars: Vec<char> = token.chars().collect();
    let term_len = term.chars().count();
    if term_len == 0 || token_chars.len() < term_len {
        return 0.0;
    }
    let mut best = 0.0f64;
    for start in 0..=(token_chars.len() - term_len) {
        let window: String = token_chars[start..start + term_len].iter().collect();
        let score = keyword_ratio(&window, term);
        if score > best {
            best = score;
        }
    }
    best
}

/// Best aligned substring match of `needle` inside `text`
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub score: f64,
    /// Char offset of the matched window
    pub start: usize,
    /// Exclusive char offset of the matched window
    pub end: usize,
}

/// Slide `needle` over `text` and return the best-scoring window above the
/// cutoff. Ties resolve to the lower start offset.
pub fn partial_ratio_alignment(text: &str, needle: &str, score_cutoff: f64) -> Option<Alignment> {
    let text_chars: Vec<char> = text.chars().collect();
    let needle_len = needle.chars().count();
    if needle_len == 0 || text_chars.len() < needle_len {
        return None;
    }
    let mut best: Option<Alignment> = None;
    for start in 0..=(text_chars.len() - needle_len) {
        let window: String = text_chars[start..start + needle_len].iter().collect();
        let score = ratio(&window, needle);
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(Alignment {
                score,
                start,
                end: start + needle_len,
            });
        }
    }
    best.filter(|a| a.score > score_cutoff)
}

/// Match keyword terms against a token list.
///
/// A token matches a term when the whole-token ratio clears the threshold,
/// or the token is at least as long as the term and some window of it does.
/// Returns the sorted unique set of matched token indices.
pub fn match_keywords(tokens: &[String], terms: &[&str]) -> Vec<usize> {
    let mut matched = BTreeSet::new();
    for (index, token) in tokens.iter().enumerate() {
        for term in terms {
            if term.is_empty() {
                continue;
            }
            if keyword_ratio(token, term) > FUZZY_MATCH_THRESHOLD {
                matched.insert(index);
                break;
            }
            if token.chars().count() >= term.chars().count()
                && partial_keyword_ratio(token, term) > FUZZY_MATCH_THRESHOLD
            {
                matched.insert(index);
                break;
            }
        }
    }
    matched.into_iter().collect()
}

/// Match sentence terms against normalized text.
///
/// Each term walks a FIFO queue of unmatched segments: a whole-segment ratio
/// hit emits the segment and stops the term; otherwise the best alignment
/// above the cutoff emits its span and the unmatched prefix and suffix are
/// enqueued. Spans from different terms may overlap; the result is the
/// sorted span set.
pub fn match_sentences(text: &str, terms: &[&str]) -> Vec<(usize, usize)> {
    let text_chars: Vec<char> = text.chars().collect();
    let mut spans = BTreeSet::new();
    for term in terms {
        if term.is_empty() {
            continue;
        }
        let term_len = term.chars().count();
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
        queue.push_back((0, text_chars.len()));
        while let Some((seg_start, seg_end)) = queue.pop_front() {
            let segment: String = text_chars[seg_start..seg_end].iter().collect();
            if ratio(&segment, term) > FUZZY_MATCH_THRESHOLD {
                spans.insert((seg_start, seg_end));
                break;
            } else if seg_end - seg_start >= term_len {
                if let Some(alignment) =
                    partial_ratio_alignment(&segment, term, FUZZY_MATCH_THRESHOLD)
                {
                    spans.insert((seg_start + alignment.start, seg_start + alignment.end));
                    if alignment.start > 0 {
                        queue.push_back((seg_start, seg_start + alignment.start));
                    }
                    if seg_start + alignment.end < seg_end {
                        queue.push_back((seg_start + alignment.end, seg_end));
                    }
                }
            }
        }
    }
    spans.into_iter().collect()
}

/// Per-row match metadata, one field per (mode, column) pair.
///
/// `None` means that mode found nothing in that column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchColumns {
    pub original_token_indices: Option<Vec<usize>>,
    pub translation_token_indices: Option<Vec<usize>>,
    pub original_spans: Option<Vec<(usize, usize)>>,
    pub translation_spans: Option<Vec<(usize, usize)>>,
}

impl MatchColumns {
    /// Whether any mode matched any column
    pub fn has_any(&self) -> bool {
        self.original_token_indices.is_some()
            || self.translation_token_indices.is_some()
            || self.original_spans.is_some()
            || self.translation_spans.is_some()
    }

    /// Whether the original column matched in any mode
    pub fn original_matched(&self) -> bool {
        self.original_token_indices.is_some() || self.original_spans.is_some()
    }
}

/// Classified search terms plus the embeddings that drive the vector filter
/// and the re-validation pass
#[derive(Debug, Clone, Default)]
pub struct SearchPlan {
    pub keyword_terms_original: Vec<String>,
    pub sentence_terms_original: Vec<String>,
    pub keyword_terms_target: Vec<String>,
    pub sentence_terms_target: Vec<String>,
    /// Embeddings of every expanded query sentence (synonyms, translations
    /// and the query itself). They drive the cosine-distance admission and
    /// the match re-validation.
    pub sentence_embeddings: Vec<Vec<f32>>,
}

/// Evaluate every (mode, column) pair for one row.
///
/// The original column sees both language buckets; the translation column is
/// consulted per mode only when the original column yielded nothing and the
/// row carries a translation.
pub fn match_item(
    plan: &SearchPlan,
    text: &str,
    translation: &str,
    tokens: &[String],
    translation_tokens: &[String],
) -> Option<MatchColumns> {
    let keyword_terms: Vec<&str> = plan
        .keyword_terms_original
        .iter()
        .chain(plan.keyword_terms_target.iter())
        .map(String::as_str)
        .collect();
    let target_keyword_terms: Vec<&str> = plan
        .keyword_terms_target
        .iter()
        .map(String::as_str)
        .collect();
    let sentence_terms: Vec<&str> = plan
        .sentence_terms_original
        .iter()
        .chain(plan.sentence_terms_target.iter())
        .map(String::as_str)
        .collect();
    let target_sentence_terms: Vec<&str> = plan
        .sentence_terms_target
        .iter()
        .map(String::as_str)
        .collect();

    let original_token_indices = match_keywords(tokens, &keyword_terms);
    let translation_token_indices = if original_token_indices.is_empty() && !translation.is_empty()
    {
        match_keywords(translation_tokens, &target_keyword_terms)
    } else {
        Vec::new()
    };

    let original_spans = match_sentences(text, &sentence_terms);
    let translation_spans = if original_spans.is_empty() && !translation.is_empty() {
        match_sentences(translation, &target_sentence_terms)
    } else {
        Vec::new()
    };

    let columns = MatchColumns {
        original_token_indices: non_empty(original_token_indices),
        translation_token_indices: non_empty(translation_token_indices),
        original_spans: non_empty(original_spans),
        translation_spans: non_empty(translation_spans),
    };
    if columns.has_any() {
        Some(columns)
    } else {
        None
    }
}

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn keyword_ratio_accepts_single_typo() {
        assert!(keyword_ratio("quick", "quik") > FUZZY_MATCH_THRESHOLD);
        assert!(keyword_ratio("brown", "quik") < FUZZY_MATCH_THRESHOLD);
    }

    #[test]
    fn keyword_match_finds_typo_token() {
        let matched = match_keywords(&tokens(&["the", "quick", "brown", "fox"]), &["quik"]);
        assert_eq!(matched, vec![1]);
    }

    #[test]
    fn keyword_match_finds_contained_term() {
        // Token carrying the term plus affixes matches through the window branch.
        let matched = match_keywords(&tokens(&["fast", "preprocessing", "step"]), &["processing"]);
        assert_eq!(matched, vec![1]);
    }

    #[test]
    fn keyword_match_ignores_shorter_tokens_for_window() {
        let matched = match_keywords(&tokens(&["ab", "cd"]), &["abcdef"]);
        assert!(matched.is_empty());
    }

    #[test]
    fn alignment_finds_exact_substring() {
        let alignment = partial_ratio_alignment("the quick brown fox", "brown", 90.0).unwrap();
        assert_eq!((alignment.start, alignment.end), (10, 15));
        assert!(alignment.score > 99.0);
    }

    #[test]
    fn alignment_tie_resolves_to_lower_start() {
        let alignment = partial_ratio_alignment("beta x beta", "beta", 90.0).unwrap();
        assert_eq!(alignment.start, 0);
    }

    #[test]
    fn alignment_below_cutoff_is_none() {
        assert!(partial_ratio_alignment("entirely different", "zzzzz", 90.0).is_none());
    }

    #[test]
    fn sentence_match_finds_every_occurrence() {
        // The queue re-scans the unmatched prefix and suffix, so both
        // occurrences surface even though one alignment wins per pass.
        let spans = match_sentences("alpha beta gamma beta", &["beta"]);
        assert_eq!(spans, vec![(6, 10), (17, 21)]);
    }

    #[test]
    fn sentence_match_whole_text() {
        let spans = match_sentences("machine learning", &["machine learning"]);
        assert_eq!(spans, vec![(0, 16)]);
    }

    #[test]
    fn sentence_match_tolerates_typos_in_long_needle() {
        let spans = match_sentences(
            "intro to statistical machine translation systems",
            &["statistical machine translations"],
        );
        assert_eq!(spans.len(), 1);
        let (start, end) = spans[0];
        assert!(start <= 9);
        assert!(end > start);
    }

    #[test]
    fn match_item_prefers_original_column() {
        let plan = SearchPlan {
            keyword_terms_target: vec!["fox".to_string()],
            ..Default::default()
        };
        let columns = match_item(
            &plan,
            "the fox",
            "fox story",
            &tokens(&["the", "fox"]),
            &tokens(&["fox", "story"]),
        )
        .unwrap();
        assert_eq!(columns.original_token_indices, Some(vec![1]));
        assert!(columns.translation_token_indices.is_none());
    }

    #[test]
    fn match_item_falls_back_to_translation() {
        let plan = SearchPlan {
            keyword_terms_target: vec!["fox".to_string()],
            ..Default::default()
        };
        let columns = match_item(
            &plan,
            "狐狸",
            "fox story",
            &tokens(&["狐", "狸"]),
            &tokens(&["fox", "story"]),
        )
        .unwrap();
        assert!(columns.original_token_indices.is_none());
        assert_eq!(columns.translation_token_indices, Some(vec![0]));
    }

    #[test]
    fn match_item_none_when_nothing_matches() {
        let plan = SearchPlan {
            keyword_terms_target: vec!["zebra".to_string()],
            ..Default::default()
        };
        assert!(match_item(&plan, "the fox", "", &tokens(&["the", "fox"]), &[]).is_none());
    }
}
