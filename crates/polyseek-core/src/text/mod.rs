//! Text normalization and tokenization
//!
//! One shared definition of the normalization pipeline and the tokenizer so
//! that stored token arrays, query-side expansion terms and tests all agree
//! on character offsets. All indices produced here are **character** offsets
//! into the normalized text, never byte offsets.

pub mod chinese;

pub use chinese::{to_simplified, to_traditional_hk};

/// Normalize text for matching: strip ASCII punctuation, trim, lowercase,
/// convert Traditional Chinese to Simplified.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    to_simplified(&stripped.trim().to_lowercase())
}

/// Whether converting to Simplified Chinese would change the text
pub fn has_traditional_chinese(text: &str) -> bool {
    to_simplified(text) != text
}

/// Tokenize normalized text into non-overlapping tokens with char offsets.
///
/// Runs of non-whitespace, non-CJK characters form one token; every CJK
/// ideograph or kana character is its own token. Returns aligned
/// `(tokens, start_indices, end_indices)`; both index arrays are strictly
/// increasing and `end[i] > start[i]`, `end[i] <= start[i+1]`.
pub fn tokenize(text: &str) -> (Vec<String>, Vec<usize>, Vec<usize>) {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut starts = Vec::new();
    let mut ends = Vec::new();

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if is_cjk(c) {
            tokens.push(c.to_string());
            starts.push(i);
            ends.push(i + 1);
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() && !is_cjk(chars[i]) {
            i += 1;
        }
        tokens.push(chars[start..i].iter().collect());
        starts.push(start);
        ends.push(i);
    }

    (tokens, starts, ends)
}

/// Normalize and tokenize in one step
pub fn normalize_tokenize(text: &str) -> (String, Vec<String>, Vec<usize>, Vec<usize>) {
    let normalized = normalize(text);
    let (tokens, starts, ends) = tokenize(&normalized);
    (normalized, tokens, starts, ends)
}

/// CJK ideographs and Japanese kana are tokenized per character
fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3040}'..='\u{30FF}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("  Hello, World!  "), "hello world");
        assert_eq!(normalize("a.b.c"), "abc");
    }

    #[test]
    fn normalize_converts_traditional() {
        assert_eq!(normalize("機器學習"), "机器学习");
    }

    #[test]
    fn tokenize_latin_words() {
        let (tokens, starts, ends) = tokenize("the quick brown fox");
        assert_eq!(tokens, vec!["the", "quick", "brown", "fox"]);
        assert_eq!(starts, vec![0, 4, 10, 16]);
        assert_eq!(ends, vec![3, 9, 15, 19]);
    }

    #[test]
    fn tokenize_cjk_per_char() {
        let (tokens, starts, ends) = tokenize("机器学习 rust");
        assert_eq!(tokens, vec!["机", "器", "学", "习", "rust"]);
        assert_eq!(starts, vec![0, 1, 2, 3, 5]);
        assert_eq!(ends, vec![1, 2, 3, 4, 9]);
    }

    #[test]
    fn tokenize_offsets_are_monotone() {
        let (_, starts, ends) = tokenize("mixed 文字 and spaces");
        for i in 0..starts.len() {
            assert!(ends[i] > starts[i]);
            if i + 1 < starts.len() {
                assert!(ends[i] <= starts[i + 1]);
            }
        }
    }

    #[test]
    fn traditional_detection() {
        assert!(has_traditional_chinese("機器"));
        assert!(!has_traditional_chinese("机器"));
        assert!(!has_traditional_chinese("plain ascii"));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "\\PC{0,64}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn tokenize_covers_in_order(s in "[a-z 测试機器]{0,32}") {
            let normalized = normalize(&s);
            let (tokens, starts, ends) = tokenize(&normalized);
            let chars: Vec<char> = normalized.chars().collect();
            prop_assert_eq!(tokens.len(), starts.len());
            prop_assert_eq!(tokens.len(), ends.len());
            for i in 0..tokens.len() {
                let span: String = chars[starts[i]..ends[i]].iter().collect();
                prop_assert_eq!(&span, &tokens[i]);
            }
        }
    }
}
