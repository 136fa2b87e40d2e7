//! Word-overlap similarity for free-text answers.

use std::collections::HashSet;

/// Normalize an answer for exact comparison: trimmed and lower-cased
pub fn normalize(text: &str) -> String {
  text.trim().to_lowercase()
}

/// Lower-cased set of whitespace-separated words
pub fn word_set(text: &str) -> HashSet<String> {
  text.split_whitespace().map(str::to_lowercase).collect()
}

/// Jaccard similarity of the word sets of `a` and `b`, in `0.0..=1.0`.
///
/// Two texts with no words at all share nothing, so an empty union is 0.0.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
  let words_a = word_set(a);
  let words_b = word_set(b);

  let union = words_a.union(&words_b).count();
  if union == 0 {
    return 0.0;
  }
  let intersection = words_a.intersection(&words_b).count();
  intersection as f64 / union as f64
}

/// Similarity scaled to a 0-100 score, rounded to the nearest integer
pub fn similarity_score(a: &str, b: &str) -> u8 {
  (jaccard_similarity(a, b) * 100.0).round() as u8
}
