//! String similarity.
//!
//! The taxonomic matcher only needs a score in `0.0..=100.0` that is symmetric
//! and equals 100 for identical strings. [`Levenshtein`] is the default; other
//! scorers plug in through [`Similarity`] and `match_species_with`.

/// A symmetric similarity score bounded to `0.0..=100.0`.
pub trait Similarity: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;

    /// Best score reachable by any pair of strings with these char counts.
    ///
    /// Used to skip names that cannot reach the threshold. The default never
    /// prunes.
    fn upper_bound(&self, _a_chars: usize, _b_chars: usize) -> f64 {
        100.0
    }
}

/// Normalized Levenshtein distance, scaled to 0-100.
#[derive(Debug, Clone, Copy, Default)]
pub struct Levenshtein;

impl Similarity for Levenshtein {
    fn score(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b) * 100.0
    }

    fn upper_bound(&self, a_chars: usize, b_chars: usize) -> f64 {
        let longest = a_chars.max(b_chars);
        if longest == 0 {
            return 100.0;
        }
        // at least |la - lb| insertions are needed
        100.0 * (1.0 - a_chars.abs_diff(b_chars) as f64 / longest as f64)
    }
}
