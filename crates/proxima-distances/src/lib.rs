//! Elastic distance computation for time series.
//!
//! Pure math library — zero I/O. Provides the elastic distance measures used
//! to score proximity splits (Euclidean, DTW, WDTW, ERP, LCSS, MSM, TWE), a
//! derivative transform wrapper, and an independent-dimension wrapper for
//! multivariate data. All dynamic-programming kernels support Sakoe-Chiba
//! style banding where the measure defines one, and early abandoning against
//! a caller-supplied cutoff.

mod derivative;
mod dtw;
mod erp;
mod euclidean;
mod frames;
mod lcss;
mod measure;
mod msm;
mod twe;
mod wdtw;

pub use derivative::{derivative_instance, derivative_series};
pub use measure::{DistanceMeasure, WarpingWindow};
