//! Parameter spaces for the per-node random distance draw.

use std::fmt;

use rand::Rng;

use proxima_data::TimeSeriesInstance;
use proxima_distances::{DistanceMeasure, WarpingWindow};

/// Summary statistics a parameter space is derived from. A pure function of
/// the (transformed) data at a node; nothing here mutates the dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataStats {
    /// Longest series length.
    pub max_series_len: usize,
    /// Population standard deviation pooled over every value.
    pub std_dev: f64,
}

impl DataStats {
    /// Compute statistics over a set of instances.
    pub fn compute<'a, I>(instances: I) -> Self
    where
        I: IntoIterator<Item = &'a TimeSeriesInstance>,
    {
        let mut max_series_len = 0usize;
        let mut count = 0usize;
        let mut mean = 0.0f64;
        let mut m2 = 0.0f64;
        for inst in instances {
            max_series_len = max_series_len.max(inst.series_len());
            for dim in inst.iter_dims() {
                for &v in dim {
                    count += 1;
                    let delta = v - mean;
                    mean += delta / count as f64;
                    m2 += delta * (v - mean);
                }
            }
        }
        let std_dev = if count == 0 {
            0.0
        } else {
            (m2 / count as f64).sqrt()
        };
        Self {
            max_series_len,
            std_dev,
        }
    }
}

/// A domain of admissible values for one parameter flag.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamDomain {
    /// A finite set of values, drawn uniformly.
    Discrete(Vec<f64>),
    /// A continuous range, sampled uniformly (inclusive of both ends).
    Uniform {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
}

impl ParamDomain {
    fn sample(&self, rng: &mut impl Rng) -> f64 {
        match self {
            ParamDomain::Discrete(values) => values[rng.gen_range(0..values.len())],
            ParamDomain::Uniform { low, high } => rng.gen_range(*low..=*high),
        }
    }

    /// Return true if `value` is admissible in this domain.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        match self {
            ParamDomain::Discrete(values) => values.contains(&value),
            ParamDomain::Uniform { low, high } => (*low..=*high).contains(&value),
        }
    }
}

/// A builder for one distance measure's parameter space.
///
/// The eleven variants cover the full elastic-distance suite; a classifier
/// configures a list of these and draws one uniformly per split attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DistanceSpace {
    /// Plain Euclidean, no parameters.
    Euclidean,
    /// DTW with the window fixed to cover the whole matrix.
    DtwFullWindow,
    /// DTW with a window fraction sampled from [0, 0.25].
    DtwRestrictedWindow,
    /// DTW on derivatives, full window.
    DdtwFullWindow,
    /// DTW on derivatives, restricted window.
    DdtwRestrictedWindow,
    /// Weighted DTW, g sampled from [0, 1].
    Wdtw,
    /// Weighted DTW on derivatives.
    Wddtw,
    /// LCSS with epsilon scaled by the data spread and a restricted window.
    Lcss,
    /// ERP with the gap value scaled by the data spread and a restricted window.
    Erp,
    /// TWE over the usual stiffness/penalty grids.
    Twe,
    /// MSM over the usual cost ramp.
    Msm,
}

impl DistanceSpace {
    /// The full eleven-space suite in its conventional order.
    #[must_use]
    pub fn full_suite() -> Vec<DistanceSpace> {
        vec![
            DistanceSpace::Euclidean,
            DistanceSpace::DtwFullWindow,
            DistanceSpace::DtwRestrictedWindow,
            DistanceSpace::DdtwFullWindow,
            DistanceSpace::DdtwRestrictedWindow,
            DistanceSpace::Wdtw,
            DistanceSpace::Wddtw,
            DistanceSpace::Lcss,
            DistanceSpace::Erp,
            DistanceSpace::Twe,
            DistanceSpace::Msm,
        ]
    }

    /// Build the parameter space for this builder from dataset statistics.
    /// Pure: identical statistics always yield an identical space.
    #[must_use]
    pub fn build(&self, stats: &DataStats) -> ParamSpace {
        let restricted_window = ParamDomain::Uniform {
            low: 0.0,
            high: 0.25,
        };
        let spread = ParamDomain::Uniform {
            low: 0.2 * stats.std_dev,
            high: stats.std_dev,
        };
        let params: Vec<(&'static str, ParamDomain)> = match self {
            DistanceSpace::Euclidean
            | DistanceSpace::DtwFullWindow
            | DistanceSpace::DdtwFullWindow => Vec::new(),
            DistanceSpace::DtwRestrictedWindow | DistanceSpace::DdtwRestrictedWindow => {
                vec![("window", restricted_window)]
            }
            DistanceSpace::Wdtw | DistanceSpace::Wddtw => {
                vec![("g", ParamDomain::Uniform { low: 0.0, high: 1.0 })]
            }
            DistanceSpace::Lcss => {
                vec![("epsilon", spread), ("window", restricted_window)]
            }
            DistanceSpace::Erp => vec![("g", spread), ("window", restricted_window)],
            DistanceSpace::Twe => vec![
                (
                    "nu",
                    ParamDomain::Discrete(vec![1e-5, 1e-4, 1e-3, 1e-2, 1e-1, 1.0]),
                ),
                (
                    "lambda",
                    ParamDomain::Discrete((0..10).map(|i| f64::from(i) / 9.0).collect()),
                ),
            ],
            DistanceSpace::Msm => vec![("cost", ParamDomain::Discrete(msm_cost_ramp()))],
        };
        ParamSpace {
            space: *self,
            params,
        }
    }
}

impl fmt::Display for DistanceSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DistanceSpace::Euclidean => "ed",
            DistanceSpace::DtwFullWindow => "dtw-full",
            DistanceSpace::DtwRestrictedWindow => "dtw",
            DistanceSpace::DdtwFullWindow => "ddtw-full",
            DistanceSpace::DdtwRestrictedWindow => "ddtw",
            DistanceSpace::Wdtw => "wdtw",
            DistanceSpace::Wddtw => "wddtw",
            DistanceSpace::Lcss => "lcss",
            DistanceSpace::Erp => "erp",
            DistanceSpace::Twe => "twe",
            DistanceSpace::Msm => "msm",
        };
        write!(f, "{name}")
    }
}

/// The conventional 100-value MSM cost grid: four decades over [0.01, 100),
/// 25 evenly spaced values each.
fn msm_cost_ramp() -> Vec<f64> {
    let mut values = Vec::with_capacity(100);
    for base in [0.01, 0.1, 1.0, 10.0] {
        for i in 0..25 {
            values.push(base + base * 9.0 * f64::from(i) / 25.0);
        }
    }
    values
}

/// A built parameter space: one distance-measure kind plus the admissible
/// values of each of its flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpace {
    space: DistanceSpace,
    params: Vec<(&'static str, ParamDomain)>,
}

impl ParamSpace {
    /// Return the space builder this space came from.
    #[must_use]
    pub fn space(&self) -> DistanceSpace {
        self.space
    }

    /// Return the flag-to-domain mapping.
    #[must_use]
    pub fn domains(&self) -> &[(&'static str, ParamDomain)] {
        &self.params
    }

    /// Draw one concrete parameter assignment and construct the bound
    /// distance measure. The measure is not yet fitted to a dataset.
    #[must_use]
    pub fn sample(&self, rng: &mut impl Rng) -> DistanceMeasure {
        let mut drawn = Vec::with_capacity(self.params.len());
        for (flag, domain) in &self.params {
            drawn.push((*flag, domain.sample(rng)));
        }
        let get = |flag: &str| -> f64 {
            drawn
                .iter()
                .find(|(f, _)| *f == flag)
                .map(|(_, v)| *v)
                .unwrap_or(0.0)
        };

        match self.space {
            DistanceSpace::Euclidean => DistanceMeasure::Euclidean,
            DistanceSpace::DtwFullWindow => DistanceMeasure::Dtw {
                window: WarpingWindow::full(),
            },
            DistanceSpace::DtwRestrictedWindow => DistanceMeasure::Dtw {
                window: WarpingWindow::fraction(get("window")),
            },
            DistanceSpace::DdtwFullWindow => {
                DistanceMeasure::Derivative(Box::new(DistanceMeasure::Dtw {
                    window: WarpingWindow::full(),
                }))
            }
            DistanceSpace::DdtwRestrictedWindow => {
                DistanceMeasure::Derivative(Box::new(DistanceMeasure::Dtw {
                    window: WarpingWindow::fraction(get("window")),
                }))
            }
            DistanceSpace::Wdtw => DistanceMeasure::Wdtw { g: get("g") },
            DistanceSpace::Wddtw => DistanceMeasure::Derivative(Box::new(
                DistanceMeasure::Wdtw { g: get("g") },
            )),
            DistanceSpace::Lcss => DistanceMeasure::Lcss {
                epsilon: get("epsilon"),
                window: WarpingWindow::fraction(get("window")),
            },
            DistanceSpace::Erp => DistanceMeasure::Erp {
                g: get("g"),
                window: WarpingWindow::fraction(get("window")),
            },
            DistanceSpace::Twe => DistanceMeasure::Twe {
                nu: get("nu"),
                lambda: get("lambda"),
            },
            DistanceSpace::Msm => DistanceMeasure::Msm { cost: get("cost") },
        }
    }
}
