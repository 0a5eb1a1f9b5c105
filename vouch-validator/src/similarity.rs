//! Trigram text similarity.
//!
//! Words are lowercased alphanumeric runs, padded as `"  word "`, and split
//! into character trigrams. Similarity is the Jaccard index of the two
//! trigram sets.

use std::collections::HashSet;

/// Trigram set of `text`.
pub fn trigrams(text: &str) -> HashSet<String> {
    let mut set = HashSet::new();

    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = format!("  {} ", word.to_lowercase()).chars().collect();
        for window in padded.windows(3) {
            set.insert(window.iter().collect());
        }
    }

    set
}

/// Similarity of two texts in [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    let left = trigrams(a);
    let right = trigrams(b);
    jaccard(&left, &right)
}

fn jaccard(left: &HashSet<String>, right: &HashSet<String>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.intersection(right).count();
    let union = left.len() + right.len() - shared;
    shared as f64 / union as f64
}

/// Highest similarity between `text` and any entry of `corpus`, 0 when empty.
pub fn max_similarity<'a, I>(text: &str, corpus: I) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    let target = trigrams(text);

    corpus
        .into_iter()
        .map(|other| jaccard(&target, &trigrams(other)))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_trigrams() {
        let set = trigrams("Cat");
        let expected: HashSet<String> = ["  c", " ca", "cat", "at "]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn test_identical_text() {
        assert_eq!(similarity("Hello world!", "hello, WORLD"), 1.0);
    }

    #[test]
    fn test_disjoint_text() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_partial_overlap_is_between_bounds() {
        let s = similarity("the validator loop", "the validator pipeline");
        assert!(s > 0.0 && s < 1.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(similarity("", "anything"), 0.0);
        assert_eq!(max_similarity("anything", std::iter::empty()), 0.0);
    }

    #[test]
    fn test_max_over_corpus() {
        let corpus = ["completely unrelated", "decentralized future is bright"];
        let s = max_similarity("a decentralized future is bright", corpus.iter().copied());
        assert!(s > 0.8);
        assert!(s <= 1.0);
    }
}
