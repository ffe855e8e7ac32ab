//! Keyword extraction shared by topic resolution and coverage scoring.
//!
//! Keywords are lowercase alphanumeric tokens longer than 3 characters that
//! are not in [`STOP_WORDS`]. Both the topic resolver and the ranking
//! engine's coverage score use this exact filter.

use std::collections::HashSet;

/// Minimum token length (exclusive) for a token to count as a keyword.
const MIN_KEYWORD_LEN: usize = 3;

/// Fixed stop-word set.
pub const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "also", "among", "and", "any", "are", "because", "been",
    "before", "being", "below", "between", "both", "but", "can", "could", "does", "doing", "down",
    "during", "each", "explain", "from", "further", "have", "having", "help", "here", "how",
    "into", "just", "know", "like", "make", "more", "most", "much", "need", "only", "other",
    "over", "please", "same", "should", "show", "some", "such", "tell", "than", "that", "their",
    "them", "then", "there", "these", "they", "thing", "this", "those", "through", "under",
    "until", "very", "want", "were", "what", "when", "where", "which", "while", "will", "with",
    "would", "your",
];

/// Check whether a lowercase token is a stop word.
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract deduplicated keywords in first-seen order.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() > MIN_KEYWORD_LEN && !is_stop_word(t))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
