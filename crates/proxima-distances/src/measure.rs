//! The pluggable distance-measure type.

use std::fmt;

use proxima_data::TimeSeriesInstance;

use crate::derivative::derivative_series;
use crate::{dtw, erp, euclidean, lcss, msm, twe, wdtw};

/// A Sakoe-Chiba style warping window expressed as a fraction of the series
/// length.
///
/// The concrete half-window width is resolved once per dataset by
/// [`DistanceMeasure::fit`]; before fitting, the window behaves as
/// unconstrained. A fraction of 1.0 always covers the whole matrix and is
/// identical to an unbanded computation.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WarpingWindow {
    fraction: f64,
    width: Option<usize>,
}

impl WarpingWindow {
    /// A window covering the whole matrix.
    #[must_use]
    pub fn full() -> Self {
        Self {
            fraction: 1.0,
            width: None,
        }
    }

    /// A window of the given fraction of the series length, clamped to [0, 1].
    #[must_use]
    pub fn fraction(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
            width: None,
        }
    }

    /// Return the configured fraction.
    #[must_use]
    pub fn fraction_value(&self) -> f64 {
        self.fraction
    }

    /// Resolve the half-window width from the series length.
    pub(crate) fn fit(&mut self, max_series_len: usize) {
        self.width = Some((self.fraction * max_series_len as f64).ceil() as usize);
    }

    /// The resolved half-window width, unconstrained when unfitted.
    pub(crate) fn half_width(&self) -> usize {
        self.width.unwrap_or(usize::MAX)
    }
}

/// A dissimilarity measure between two time-series instances.
///
/// Elastic variants are dynamic-programming kernels; `Derivative` and
/// `Independent` are composing wrappers rather than standalone measures.
/// Every variant satisfies the shared contract:
///
/// - `distance(a, b, cutoff)` returns a non-negative value, or
///   [`f64::INFINITY`] once the running cost provably exceeds `cutoff`
///   (early abandon). A cutoff of [`f64::INFINITY`] disables abandoning and
///   the result then equals the exhaustive computation.
/// - finite inputs never produce NaN.
///
/// Value spaces differ per measure and cutoffs are interpreted in the
/// measure's own space: the squared-cost measures (`Euclidean`, `Dtw`,
/// `Wdtw`, `Erp`) report the square root of the accumulated cost, `Lcss`
/// reports `1 - matches / min_len`, and `Msm`/`Twe` report their raw cost.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DistanceMeasure {
    /// Pointwise Euclidean baseline.
    Euclidean,
    /// Dynamic time warping with an optional band.
    Dtw {
        /// Warping window constraint.
        window: WarpingWindow,
    },
    /// Weighted DTW with sigmoid phase weights.
    Wdtw {
        /// Weight steepness.
        g: f64,
    },
    /// Edit distance with real penalty.
    Erp {
        /// Gap alignment value.
        g: f64,
        /// Warping window constraint.
        window: WarpingWindow,
    },
    /// Longest-common-subsequence distance.
    Lcss {
        /// Frame match tolerance.
        epsilon: f64,
        /// Warping window constraint.
        window: WarpingWindow,
    },
    /// Move-split-merge distance.
    Msm {
        /// Split/merge penalty.
        cost: f64,
    },
    /// Time warp edit distance.
    Twe {
        /// Stiffness (time penalty per warp step).
        nu: f64,
        /// Edit penalty.
        lambda: f64,
    },
    /// Compute the inner measure on the Keogh derivative of both series.
    Derivative(Box<DistanceMeasure>),
    /// Compute the inner measure once per dimension and sum, short-circuiting
    /// the sum against the cutoff.
    Independent(Box<DistanceMeasure>),
}

impl DistanceMeasure {
    /// One-time setup against a dataset: resolves warping-window fractions
    /// into concrete half-window widths from the longest series length.
    /// Idempotent; wrappers recurse into their inner measure.
    pub fn fit(&mut self, max_series_len: usize) {
        match self {
            Self::Euclidean | Self::Wdtw { .. } | Self::Msm { .. } | Self::Twe { .. } => {}
            Self::Dtw { window }
            | Self::Erp { window, .. }
            | Self::Lcss { window, .. } => window.fit(max_series_len),
            Self::Derivative(inner) | Self::Independent(inner) => {
                inner.fit(max_series_len);
            }
        }
    }

    /// Compute the distance between two instances with early abandoning at
    /// `cutoff`. Pass [`f64::INFINITY`] to disable abandoning.
    #[must_use]
    pub fn distance(
        &self,
        a: &TimeSeriesInstance,
        b: &TimeSeriesInstance,
        cutoff: f64,
    ) -> f64 {
        self.distance_dims(&a.dims(), &b.dims(), cutoff)
    }

    /// Distance over borrowed dimension slices. Wrappers recurse here so
    /// per-dimension dispatch never copies series data.
    fn distance_dims(&self, a: &[&[f64]], b: &[&[f64]], cutoff: f64) -> f64 {
        match self {
            Self::Euclidean => euclidean::distance(a, b, cutoff),
            Self::Dtw { window } => dtw::distance(a, b, window.half_width(), cutoff),
            Self::Wdtw { g } => wdtw::distance(a, b, *g, cutoff),
            Self::Erp { g, window } => {
                erp::distance(a, b, *g, window.half_width(), cutoff)
            }
            Self::Lcss { epsilon, window } => {
                lcss::distance(a, b, *epsilon, window.half_width(), cutoff)
            }
            Self::Msm { cost } => msm::distance(a, b, *cost, cutoff),
            Self::Twe { nu, lambda } => twe::distance(a, b, *nu, *lambda, cutoff),
            Self::Derivative(inner) => {
                let da: Vec<Vec<f64>> = a.iter().map(|d| derivative_series(d)).collect();
                let db: Vec<Vec<f64>> = b.iter().map(|d| derivative_series(d)).collect();
                let da_refs: Vec<&[f64]> = da.iter().map(Vec::as_slice).collect();
                let db_refs: Vec<&[f64]> = db.iter().map(Vec::as_slice).collect();
                inner.distance_dims(&da_refs, &db_refs, cutoff)
            }
            Self::Independent(inner) => {
                let dims = a.len().min(b.len());
                let mut sum = 0.0;
                for d in 0..dims {
                    sum += inner.distance_dims(&a[d..=d], &b[d..=d], cutoff - sum);
                    if sum > cutoff {
                        return f64::INFINITY;
                    }
                }
                sum
            }
        }
    }

    /// Return true if the measure applies the derivative transform at its
    /// root (directly or under an `Independent` wrapper).
    #[must_use]
    pub fn is_derivative_rooted(&self) -> bool {
        match self {
            Self::Derivative(_) => true,
            Self::Independent(inner) => inner.is_derivative_rooted(),
            _ => false,
        }
    }

    /// Return the measure with one root-level `Derivative` wrapper removed.
    ///
    /// Used by callers that pre-derive their data through a transform cache;
    /// returns `self` unchanged when not derivative-rooted.
    #[must_use]
    pub fn strip_derivative(&self) -> DistanceMeasure {
        match self {
            Self::Derivative(inner) => (**inner).clone(),
            Self::Independent(inner) => {
                Self::Independent(Box::new(inner.strip_derivative()))
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for DistanceMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Euclidean => write!(f, "ed"),
            Self::Dtw { .. } => write!(f, "dtw"),
            Self::Wdtw { .. } => write!(f, "wdtw"),
            Self::Erp { .. } => write!(f, "erp"),
            Self::Lcss { .. } => write!(f, "lcss"),
            Self::Msm { .. } => write!(f, "msm"),
            Self::Twe { .. } => write!(f, "twe"),
            Self::Derivative(inner) => write!(f, "d{inner}"),
            Self::Independent(inner) => write!(f, "i{inner}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxima_data::TimeSeriesInstance;

    fn uni(values: &[f64]) -> TimeSeriesInstance {
        TimeSeriesInstance::univariate(values.to_vec(), 0).unwrap()
    }

    #[test]
    fn fit_resolves_window_width() {
        let mut m = DistanceMeasure::Dtw {
            window: WarpingWindow::fraction(0.5),
        };
        m.fit(10);
        let DistanceMeasure::Dtw { window } = m else {
            unreachable!()
        };
        assert_eq!(window.half_width(), 5);
    }

    #[test]
    fn unfitted_window_is_unconstrained() {
        assert_eq!(WarpingWindow::full().half_width(), usize::MAX);
    }

    #[test]
    fn full_fraction_covers_matrix() {
        let a = uni(&[0.0, 1.0, 0.0, 1.0]);
        let b = uni(&[1.0, 0.0, 1.0, 0.0]);
        let mut fitted = DistanceMeasure::Dtw {
            window: WarpingWindow::full(),
        };
        fitted.fit(4);
        let unfitted = DistanceMeasure::Dtw {
            window: WarpingWindow::full(),
        };
        assert_eq!(
            fitted.distance(&a, &b, f64::INFINITY),
            unfitted.distance(&a, &b, f64::INFINITY)
        );
    }

    #[test]
    fn derivative_wrapper_matches_manual_transform() {
        let a = uni(&[0.0, 1.0, 4.0, 9.0]);
        let b = uni(&[9.0, 4.0, 1.0, 0.0]);
        let ddtw = DistanceMeasure::Derivative(Box::new(DistanceMeasure::Dtw {
            window: WarpingWindow::full(),
        }));
        let dtw = DistanceMeasure::Dtw {
            window: WarpingWindow::full(),
        };
        let da = crate::derivative::derivative_instance(&a);
        let db = crate::derivative::derivative_instance(&b);
        assert_eq!(
            ddtw.distance(&a, &b, f64::INFINITY),
            dtw.distance(&da, &db, f64::INFINITY)
        );
    }

    #[test]
    fn independent_wrapper_sums_dimensions() {
        let a = TimeSeriesInstance::new(vec![vec![0.0, 0.0], vec![1.0, 1.0]], 0).unwrap();
        let b = TimeSeriesInstance::new(vec![vec![3.0, 4.0], vec![1.0, 1.0]], 0).unwrap();
        let ied = DistanceMeasure::Independent(Box::new(DistanceMeasure::Euclidean));
        let ed = DistanceMeasure::Euclidean;

        let a0 = uni(&[0.0, 0.0]);
        let b0 = uni(&[3.0, 4.0]);
        let a1 = uni(&[1.0, 1.0]);
        let b1 = uni(&[1.0, 1.0]);
        let expected = ed.distance(&a0, &b0, f64::INFINITY)
            + ed.distance(&a1, &b1, f64::INFINITY);
        assert!((ied.distance(&a, &b, f64::INFINITY) - expected).abs() < 1e-10);
    }

    #[test]
    fn independent_wrapper_short_circuits() {
        let a = TimeSeriesInstance::new(
            vec![vec![0.0, 0.0], vec![0.0, 0.0]],
            0,
        )
        .unwrap();
        let b = TimeSeriesInstance::new(
            vec![vec![10.0, 10.0], vec![10.0, 10.0]],
            0,
        )
        .unwrap();
        let ied = DistanceMeasure::Independent(Box::new(DistanceMeasure::Euclidean));
        assert_eq!(ied.distance(&a, &b, 1.0), f64::INFINITY);
    }

    #[test]
    fn strip_derivative_unwraps_one_level() {
        let ddtw = DistanceMeasure::Derivative(Box::new(DistanceMeasure::Dtw {
            window: WarpingWindow::full(),
        }));
        assert!(ddtw.is_derivative_rooted());
        assert!(!ddtw.strip_derivative().is_derivative_rooted());
        assert!(!DistanceMeasure::Euclidean.is_derivative_rooted());
    }

    #[test]
    fn display_names() {
        let ddtw = DistanceMeasure::Derivative(Box::new(DistanceMeasure::Dtw {
            window: WarpingWindow::full(),
        }));
        assert_eq!(format!("{ddtw}"), "ddtw");
        let imsm =
            DistanceMeasure::Independent(Box::new(DistanceMeasure::Msm { cost: 1.0 }));
        assert_eq!(format!("{imsm}"), "imsm");
    }

    #[test]
    fn all_measures_zero_on_identical_input() {
        let a = uni(&[1.0, 2.0, 3.0, 2.0]);
        let measures = vec![
            DistanceMeasure::Euclidean,
            DistanceMeasure::Dtw {
                window: WarpingWindow::full(),
            },
            DistanceMeasure::Wdtw { g: 0.05 },
            DistanceMeasure::Erp {
                g: 0.0,
                window: WarpingWindow::full(),
            },
            DistanceMeasure::Lcss {
                epsilon: 0.1,
                window: WarpingWindow::full(),
            },
            DistanceMeasure::Msm { cost: 1.0 },
            DistanceMeasure::Twe {
                nu: 0.001,
                lambda: 0.5,
            },
        ];
        for m in measures {
            assert!(
                m.distance(&a, &a, f64::INFINITY).abs() < 1e-10,
                "measure {m} non-zero on identical input"
            );
        }
    }
}
