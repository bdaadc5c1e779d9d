//! Longest common subsequence distance.

use crate::frames::sq_cost;

/// Banded LCSS over a rolling two-row match-count buffer.
///
/// Two frames match when their Euclidean distance is within `epsilon`.
/// Returns `1 - matches / min_len`, in `[0, 1]`. Early abandon uses the
/// admissible bound that every remaining row can add at most one match: when
/// even that bound cannot bring the distance under the cutoff, the
/// computation stops with [`f64::INFINITY`].
pub(crate) fn distance(
    a: &[&[f64]],
    b: &[&[f64]],
    epsilon: f64,
    half_width: usize,
    cutoff: f64,
) -> f64 {
    let n = a[0].len();
    let m = b[0].len();
    let w = half_width.max(n.abs_diff(m)).min(n.max(m));
    let min_len = n.min(m);
    let eps_sq = epsilon * epsilon;

    let mut prev = vec![0usize; m + 1];
    let mut curr = vec![0usize; m + 1];

    for i in 1..=n {
        std::mem::swap(&mut prev, &mut curr);
        curr.fill(0);

        let start = i.saturating_sub(w).max(1);
        let end = (i + w).min(m);
        let mut row_max = 0usize;

        for j in start..=end {
            let matches = if sq_cost(a, b, i - 1, j - 1) <= eps_sq {
                prev[j - 1] + 1
            } else {
                prev[j].max(curr[j - 1])
            };
            curr[j] = matches;
            row_max = row_max.max(matches);
        }

        if i < n {
            let best_possible = row_max + (n - i);
            let lower_bound = 1.0 - best_possible as f64 / min_len as f64;
            if lower_bound > cutoff {
                return f64::INFINITY;
            }
        }
    }

    let result = 1.0 - curr[m] as f64 / min_len as f64;
    if result > cutoff {
        return f64::INFINITY;
    }
    result
}
