//! Split quality scoring over class-count vectors.

/// Criterion for scoring a partitioning of labeled data against the parent
/// distribution. Higher is better for every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitScorer {
    /// Weighted Gini impurity decrease.
    GiniGain,
    /// Information gain (entropy decrease, natural log).
    InfoGain,
    /// Pearson chi-squared statistic of the child contingency table.
    ChiSquared,
}

/// Gini impurity of a class-count vector: `1 - sum(p_i^2)`.
///
/// An empty count vector is pure by definition (impurity 0), so empty child
/// partitions never divide by zero.
fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let sum_sq: f64 = counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum();
    1.0 - sum_sq
}

/// Entropy of a class-count vector: `-sum(p_i * ln(p_i))` over `p_i > 0`.
fn entropy(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    -counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            p * p.ln()
        })
        .sum::<f64>()
}

impl SplitScorer {
    /// Score a partitioning. `parent` is the class-count vector of the data
    /// at the node; `children` holds one class-count vector per partition.
    ///
    /// Finite for any legal partitioning (non-empty parent, counts
    /// consistent); empty children carry zero weight. Ties between candidate
    /// splits are broken elsewhere by insertion order.
    #[must_use]
    pub fn score(&self, parent: &[usize], children: &[Vec<usize>]) -> f64 {
        let parent_total: usize = parent.iter().sum();
        match self {
            SplitScorer::GiniGain => {
                gain(parent, parent_total, children, gini)
            }
            SplitScorer::InfoGain => {
                gain(parent, parent_total, children, entropy)
            }
            SplitScorer::ChiSquared => chi_squared(parent, parent_total, children),
        }
    }
}

/// Parent impurity minus the size-weighted child impurities.
fn gain(
    parent: &[usize],
    parent_total: usize,
    children: &[Vec<usize>],
    impurity: fn(&[usize], usize) -> f64,
) -> f64 {
    if parent_total == 0 {
        return 0.0;
    }
    let parent_impurity = impurity(parent, parent_total);
    let weighted: f64 = children
        .iter()
        .map(|child| {
            let total: usize = child.iter().sum();
            total as f64 / parent_total as f64 * impurity(child, total)
        })
        .sum();
    parent_impurity - weighted
}

/// Pearson chi-squared statistic: `sum((observed - expected)^2 / expected)`
/// over every (child, class) cell. Cells whose expectation is zero (class
/// absent from the parent) contribute nothing by definition.
fn chi_squared(parent: &[usize], parent_total: usize, children: &[Vec<usize>]) -> f64 {
    if parent_total == 0 {
        return 0.0;
    }
    let mut statistic = 0.0;
    for child in children {
        let child_total: usize = child.iter().sum();
        for (class, &observed) in child.iter().enumerate() {
            let expected =
                parent[class] as f64 * child_total as f64 / parent_total as f64;
            if expected > 0.0 {
                let diff = observed as f64 - expected;
                statistic += diff * diff / expected;
            }
        }
    }
    statistic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gini_gain_perfect_split() {
        // Parent [2,2] split into pure halves: gain = 0.5 - 0 = 0.5.
        let score = SplitScorer::GiniGain.score(&[2, 2], &[vec![2, 0], vec![0, 2]]);
        assert!((score - 0.5).abs() < 1e-10);
    }

    #[test]
    fn gini_gain_useless_split() {
        // Children mirror the parent distribution: no gain.
        let score = SplitScorer::GiniGain.score(&[4, 4], &[vec![2, 2], vec![2, 2]]);
        assert!(score.abs() < 1e-10);
    }

    #[test]
    fn info_gain_perfect_split() {
        // Parent entropy ln(2), children pure.
        let score = SplitScorer::InfoGain.score(&[2, 2], &[vec![2, 0], vec![0, 2]]);
        assert!((score - 2.0f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn empty_child_is_ignored() {
        let with_empty =
            SplitScorer::GiniGain.score(&[2, 2], &[vec![2, 0], vec![0, 2], vec![0, 0]]);
        let without = SplitScorer::GiniGain.score(&[2, 2], &[vec![2, 0], vec![0, 2]]);
        assert_eq!(with_empty, without);
        assert!(with_empty.is_finite());
    }

    #[test]
    fn chi_squared_perfect_split() {
        // 2x2 table with perfect association: statistic = n = 4.
        let score = SplitScorer::ChiSquared.score(&[2, 2], &[vec![2, 0], vec![0, 2]]);
        assert!((score - 4.0).abs() < 1e-10);
    }

    #[test]
    fn chi_squared_independent_split() {
        let score = SplitScorer::ChiSquared.score(&[4, 4], &[vec![2, 2], vec![2, 2]]);
        assert!(score.abs() < 1e-10);
    }

    #[test]
    fn perfect_beats_useless_for_all_scorers() {
        for scorer in [
            SplitScorer::GiniGain,
            SplitScorer::InfoGain,
            SplitScorer::ChiSquared,
        ] {
            let perfect = scorer.score(&[2, 2], &[vec![2, 0], vec![0, 2]]);
            let useless = scorer.score(&[2, 2], &[vec![1, 1], vec![1, 1]]);
            assert!(perfect > useless, "{scorer:?}");
        }
    }

    #[test]
    fn absent_class_in_parent_is_finite() {
        // Class 2 never appears: expectations of zero contribute nothing.
        let score =
            SplitScorer::ChiSquared.score(&[2, 2, 0], &[vec![2, 0, 0], vec![0, 2, 0]]);
        assert!(score.is_finite());
    }
}
