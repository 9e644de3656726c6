//! Approximate substring matching.
//!
//! Finds the span of `text` that is closest to `pattern` under optimal
//! string alignment distance (substitutions, insertions, deletions and
//! adjacent transpositions each cost one edit). The match may start and
//! end anywhere in `text`.

/// Best approximate occurrence of a pattern inside a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub errors: usize,
    /// Char offset where the matched span starts.
    pub start: usize,
    /// Char offset one past the end of the matched span.
    pub end: usize,
}

impl FuzzyMatch {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Returns the lowest-error occurrence of `pattern` in `text`, preferring
/// the earliest one on ties. `None` when either side is empty.
pub fn best_match(pattern: &[char], text: &[char]) -> Option<FuzzyMatch> {
    let m = pattern.len();
    let n = text.len();
    if m == 0 {
        return None;
    }

    // Three rolling rows of (cost, start) so transpositions can look back two rows.
    let first_row: Vec<(usize, usize)> = (0..=n).map(|j| (0, j)).collect();
    let mut before = first_row.clone();
    let mut prev = first_row;
    let mut cur = vec![(0, 0); n + 1];

    for i in 1..=m {
        cur[0] = (i, 0);
        for j in 1..=n {
            let substitution = usize::from(pattern[i - 1] != text[j - 1]);
            let (diag_cost, diag_start) = prev[j - 1];
            let mut best = (diag_cost + substitution, diag_start);

            let (up_cost, up_start) = prev[j];
            if up_cost + 1 < best.0 {
                best = (up_cost + 1, up_start);
            }
            let (left_cost, left_start) = cur[j - 1];
            if left_cost + 1 < best.0 {
                best = (left_cost + 1, left_start);
            }
            if i >= 2
                && j >= 2
                && pattern[i - 1] == text[j - 2]
                && pattern[i - 2] == text[j - 1]
            {
                let (swap_cost, swap_start) = before[j - 2];
                if swap_cost + 1 < best.0 {
                    best = (swap_cost + 1, swap_start);
                }
            }
            cur[j] = best;
        }
        std::mem::swap(&mut before, &mut prev);
        std::mem::swap(&mut prev, &mut cur);
    }

    // After the final swap the last computed row lives in `prev`.
    let (end, &(errors, start)) = prev
        .iter()
        .enumerate()
        .skip(1)
        .min_by_key(|(j, (cost, _))| (*cost, *j))?;

    Some(FuzzyMatch { errors, start, end })
}

/// Maximum edits tolerated for a token of `len` chars at `threshold`.
pub fn allowed_errors(len: usize, threshold: f64) -> usize {
    (len as f64 * threshold).floor() as usize
}
