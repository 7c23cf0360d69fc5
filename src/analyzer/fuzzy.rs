//! Fuzzy string matching for table-name detection.
//!
//! Normalized Levenshtein similarity over lowercase tokens. This is the
//! last-resort table-detection strategy, so the cutoff is deliberately
//! strict and very short tokens are excluded outright.

/// Minimum normalized similarity for a fuzzy table match.
pub const SIMILARITY_CUTOFF: f64 = 0.6;

/// Tokens shorter than this never fuzzy-match anything.
pub const MIN_TOKEN_LEN: usize = 4;

/// Levenshtein edit distance, single-row dynamic programming.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut previous_diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous_diagonal + usize::from(ca != cb);
            previous_diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(previous_diagonal + 1);
        }
    }
    row[b.len()]
}

/// Similarity in `[0, 1]`: 1.0 for identical strings, 0.0 for nothing in
/// common.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / longest as f64
}

/// The closest candidates to `token`, best first, at most `limit` of them,
/// all at or above the similarity cutoff.
pub fn close_matches<'a>(token: &str, candidates: &'a [String], limit: usize) -> Vec<&'a str> {
    if token.chars().count() < MIN_TOKEN_LEN {
        return Vec::new();
    }
    let mut scored: Vec<(f64, &str)> = candidates
        .iter()
        .map(|candidate| (similarity(token, candidate), candidate.as_str()))
        .filter(|(score, _)| *score >= SIMILARITY_CUTOFF)
        .collect();
    // Descending by score, name order on ties for determinism
    scored.sort_by(|(sa, na), (sb, nb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| na.cmp(nb))
    });
    scored.truncate(limit);
    scored.into_iter().map(|(_, name)| name).collect()
}
