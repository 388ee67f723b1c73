//! Snippet highlighting and simplification
//!
//! Maps retained match sets onto the token list, merges adjacent marks into
//! groups, and emits a compact snippet: each matched group wrapped in
//! `<mark>…</mark>` with a few context tokens on each side, groups joined
//! with `"..."` where text was elided. All arithmetic is in characters.

/// Context tokens kept on each side of a matched group
pub const DEFAULT_CONTEXT_SIZE: usize = 3;

/// Token array view over one text column
#[derive(Debug, Clone, Copy)]
pub struct TokenLayout<'a> {
    pub tokens: &'a [String],
    pub starts: &'a [usize],
    pub ends: &'a [usize],
}

impl<'a> TokenLayout<'a> {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Binary-search the token covering `char_index`.
///
/// Returns `(index, true)` when the char falls inside token `index`, or
/// `(insertion_point, false)` when it falls between tokens.
pub fn token_index(starts: &[usize], ends: &[usize], char_index: usize) -> (usize, bool) {
    let mut left = 0;
    let mut right = starts.len();
    while left < right {
        let mid = (left + right) / 2;
        if char_index >= starts[mid] && char_index < ends[mid] {
            return (mid, true);
        } else if starts[mid] > char_index {
            right = mid;
        } else {
            left = mid + 1;
        }
    }
    (left, false)
}

/// Mark every token selected by a keyword index or covered by a span
pub fn marked_token_flags(
    layout: TokenLayout<'_>,
    keyword_indices: &[usize],
    spans: &[(usize, usize)],
) -> Vec<bool> {
    let n = layout.len();
    let mut marked = vec![false; n];
    for &index in keyword_indices {
        if index < n {
            marked[index] = true;
        }
    }
    for &(span_start, span_end) in spans {
        if span_end == 0 || span_end <= span_start {
            continue;
        }
        let (first, _) = token_index(layout.starts, layout.ends, span_start);
        let (mut last, inside) = token_index(layout.starts, layout.ends, span_end - 1);
        if inside {
            last += 1;
        }
        for flag in marked.iter_mut().take(last.min(n)).skip(first) {
            *flag = true;
        }
    }
    marked
}

/// Build the simplified highlighted snippet, or `None` when nothing is marked
pub fn build_snippet(
    text: &str,
    layout: TokenLayout<'_>,
    marked: &[bool],
    context_size: usize,
) -> Option<String> {
    let n = layout.len();
    if n == 0 || marked.iter().take(n).all(|m| !m) {
        return None;
    }
    let text_chars: Vec<char> = text.chars().collect();

    // Maximal runs of marked tokens; adjacent marks share one group, which
    // is what merges consecutive <mark> wrappers.
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut i = 0;
    while i < n {
        if marked[i] {
            let group_start = i;
            while i < n && marked[i] {
                i += 1;
            }
            groups.push((group_start, i));
        } else {
            i += 1;
        }
    }

    let mut output: Vec<char> = Vec::new();
    let mut last_match_end: i64 = -1;
    let mut last_end: i64 = -1;
    for (group_start, group_end) in groups {
        let match_start = layout.starts[group_start];
        let match_end = layout.ends[group_end - 1];
        let mut start = layout.starts[group_start.saturating_sub(context_size)];
        let end = layout.ends[(group_end + context_size).min(n) - 1];

        if start != 0 && (start as i64) > last_end {
            output.extend("...".chars());
        } else if (start as i64) < last_match_end {
            // Window reaches back into the previous match: drop the previous
            // context tail and restart at the previous match end.
            let drop = (last_end - last_match_end) as usize;
            output.truncate(output.len() - drop);
            start = last_match_end as usize;
        } else if (start as i64) < last_end {
            // Windows overlap on context only: trim the duplicated tail.
            let drop = (last_end - start as i64) as usize;
            output.truncate(output.len() - drop);
        }

        output.extend(text_chars[start..match_start].iter());
        output.extend("<mark>".chars());
        output.extend(text_chars[match_start..match_end].iter());
        output.extend("</mark>".chars());
        output.extend(text_chars[match_end..end].iter());
        last_match_end = match_end as i64;
        last_end = end as i64;
    }

    if last_end < text_chars.len() as i64 {
        output.extend("...".chars());
    }
    Some(output.into_iter().collect())
}
