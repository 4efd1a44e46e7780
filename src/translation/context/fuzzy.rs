/*!
 * Similarity scoring between source texts.
 *
 * The context assembler only needs a score in `0.0..=1.0`; the scorer is
 * swappable through `SimilarityScorer`. `TokenOverlapScorer` is the default,
 * `EditDistanceScorer` is a character-level alternative.
 */

use std::collections::HashSet;
use std::fmt::Debug;

/// Scores how alike two source texts are (0.0-1.0)
pub trait SimilarityScorer: Send + Sync + Debug {
    fn score(&self, a: &str, b: &str) -> f32;
}

/// Token-overlap ratio over lowercase whitespace tokens
///
/// The ratio is the number of shared distinct tokens divided by the distinct
/// token count of the larger text. Pairs whose character lengths differ by
/// more than `max_length_difference` of the shorter text score 0.
#[derive(Debug, Clone)]
pub struct TokenOverlapScorer {
    max_length_difference: f32,
}

impl Default for TokenOverlapScorer {
    fn default() -> Self {
        Self {
            max_length_difference: 0.5,
        }
    }
}

impl TokenOverlapScorer {
    pub fn new(max_length_difference: f32) -> Self {
        Self {
            max_length_difference: max_length_difference.max(0.0),
        }
    }

    fn length_vetoed(&self, a: &str, b: &str) -> bool {
        let len_a = a.chars().count();
        let len_b = b.chars().count();
        let shorter = len_a.min(len_b) as f32;
        let difference = len_a.abs_diff(len_b) as f32;
        difference > shorter * self.max_length_difference
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|t| t.to_lowercase()).collect()
}

impl SimilarityScorer for TokenOverlapScorer {
    fn score(&self, a: &str, b: &str) -> f32 {
        if a.trim().is_empty() || b.trim().is_empty() {
            return 0.0;
        }
        if self.length_vetoed(a, b) {
            return 0.0;
        }

        let tokens_a = tokens(a);
        let tokens_b = tokens(b);
        let shared = tokens_a.intersection(&tokens_b).count();
        let larger = tokens_a.len().max(tokens_b.len());

        shared as f32 / larger as f32
    }
}

/// Normalized Levenshtein similarity, case-insensitive
#[derive(Debug, Clone, Default)]
pub struct EditDistanceScorer;

impl SimilarityScorer for EditDistanceScorer {
    fn score(&self, a: &str, b: &str) -> f32 {
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let a_lower: Vec<char> = a.to_lowercase().chars().collect();
        let b_lower: Vec<char> = b.to_lowercase().chars().collect();
        let distance = levenshtein_distance(&a_lower, &b_lower);
        let max_len = a_lower.len().max(b_lower.len());

        1.0 - (distance as f32 / max_len as f32)
    }
}

/// Levenshtein distance with the two-row optimization
fn levenshtein_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b.len() + 1];

    for (i, a_char) in a.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}
