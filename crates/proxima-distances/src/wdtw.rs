//! Weighted dynamic time warping.

use crate::frames::sq_cost;

/// Sigmoid phase weight for a warp of `delta` steps off the diagonal.
///
/// `half_len` is half the longer series length; `g` controls the penalty
/// steepness. `g = 0` weighs every cell 0.5, recovering half-cost DTW.
fn weight(g: f64, delta: usize, half_len: f64) -> f64 {
    1.0 / (1.0 + (-g * (delta as f64 - half_len)).exp())
}

/// WDTW over the full cost matrix (the measure is unbanded; the phase
/// weights already penalise off-diagonal cells).
///
/// Accumulates weighted squared frame costs and returns the square root.
/// Early abandon follows the same row-min scheme as the DTW kernel, against
/// the squared cutoff.
pub(crate) fn distance(a: &[&[f64]], b: &[&[f64]], g: f64, cutoff: f64) -> f64 {
    let n = a[0].len();
    let m = b[0].len();
    let half_len = n.max(m) as f64 / 2.0;
    let cutoff_sq = cutoff * cutoff;

    // Weights depend only on |i - j|.
    let weights: Vec<f64> = (0..n.max(m)).map(|d| weight(g, d, half_len)).collect();
    let cost = |i: usize, j: usize| weights[i.abs_diff(j)] * sq_cost(a, b, i, j);

    let mut prev = vec![f64::INFINITY; m];
    let mut curr = vec![f64::INFINITY; m];

    curr[0] = cost(0, 0);
    for j in 1..m {
        curr[j] = curr[j - 1] + cost(0, j);
    }
    if n > 1 {
        let row_min = curr.iter().copied().fold(f64::INFINITY, f64::min);
        if row_min > cutoff_sq {
            return f64::INFINITY;
        }
    }

    for i in 1..n {
        std::mem::swap(&mut prev, &mut curr);
        let mut row_min = f64::INFINITY;

        for j in 0..m {
            let diag = if j > 0 { prev[j - 1] } else { f64::INFINITY };
            let above = prev[j];
            let left = if j > 0 { curr[j - 1] } else { f64::INFINITY };

            let val = cost(i, j) + diag.min(above).min(left);
            curr[j] = val;
            row_min = row_min.min(val);
        }

        if i < n - 1 && row_min > cutoff_sq {
            return f64::INFINITY;
        }
    }

    let final_sq = curr[m - 1];
    if final_sq > cutoff_sq {
        return f64::INFINITY;
    }
    final_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(a: &[f64], b: &[f64], g: f64, cutoff: f64) -> f64 {
        distance(&[a], &[b], g, cutoff)
    }

    #[test]
    fn identical_series_distance_zero() {
        let s = [1.0, 2.0, 3.0];
        assert!(dist(&s, &s, 0.05, f64::INFINITY).abs() < 1e-10);
    }

    #[test]
    fn zero_g_halves_dtw_cost() {
        // g=0 -> every weight is 0.5. a=[0,1], b=[1,0] has unweighted optimal
        // path cost 2, so WDTW accumulates 1.0 and returns 1.0.
        let d = dist(&[0.0, 1.0], &[1.0, 0.0], 0.0, f64::INFINITY);
        assert!((d - 1.0).abs() < 1e-10);
    }

    #[test]
    fn symmetric() {
        let a = [1.0, 3.0, 2.0, 5.0];
        let b = [2.0, 1.0, 4.0];
        let ab = dist(&a, &b, 0.1, f64::INFINITY);
        let ba = dist(&b, &a, 0.1, f64::INFINITY);
        assert!((ab - ba).abs() < 1e-10);
    }

    #[test]
    fn cutoff_exactness() {
        let a = [0.0, 1.0, 2.0];
        let b = [2.0, 1.0, 0.0];
        let exact = dist(&a, &b, 0.2, f64::INFINITY);
        assert!((dist(&a, &b, 0.2, exact + 0.01) - exact).abs() < 1e-10);
        assert_eq!(dist(&a, &b, 0.2, exact - 0.01), f64::INFINITY);
    }

    #[test]
    fn weights_increase_with_warp() {
        // For g > 0 a larger warp always weighs at least as much.
        for delta in 0..9 {
            assert!(weight(0.25, delta, 5.0) <= weight(0.25, delta + 1, 5.0));
        }
    }

    #[test]
    fn zero_g_weights_are_half() {
        for delta in 0..10 {
            assert!((weight(0.0, delta, 5.0) - 0.5).abs() < 1e-12);
        }
    }
}
