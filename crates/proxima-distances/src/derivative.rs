//! Keogh derivative transform.

use proxima_data::TimeSeriesInstance;

/// First-order Keogh derivative of a value series.
///
/// Interior points average the backward difference with half the centred
/// difference: `((q[i] - q[i-1]) + (q[i+1] - q[i-1]) / 2) / 2`. Endpoints
/// copy their interior neighbour. Length-1 series map to `[0]`, length-2 to
/// the plain difference repeated.
#[must_use]
pub fn derivative_series(q: &[f64]) -> Vec<f64> {
    let n = q.len();
    match n {
        1 => vec![0.0],
        2 => vec![q[1] - q[0]; 2],
        _ => {
            let mut out = vec![0.0; n];
            for i in 1..n - 1 {
                out[i] = ((q[i] - q[i - 1]) + (q[i + 1] - q[i - 1]) / 2.0) / 2.0;
            }
            out[0] = out[1];
            out[n - 1] = out[n - 2];
            out
        }
    }
}

/// Apply the derivative transform to every dimension of an instance.
///
/// The label is preserved; the output has the same shape as the input.
#[must_use]
pub fn derivative_instance(inst: &TimeSeriesInstance) -> TimeSeriesInstance {
    let dims = inst.iter_dims().map(derivative_series).collect();
    TimeSeriesInstance::from_validated(dims, inst.label())
}
