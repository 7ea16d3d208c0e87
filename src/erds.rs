//! Event-related (de)synchronization maps.
//!
//! ```text
//! erds[c, f, t] = (task[c, f, t] − rest_mean[c, f]) / rest_mean[c, f] · 100
//! ```
//!
//! `rest_mean` is the resting power averaged over time. Negative values are
//! desynchronization (power drop during the task), positive values
//! synchronization.
use ndarray::{Array1, Array3, Axis};

use crate::error::Result;
use crate::tfr::Tfr;

/// ERDS percentages, `data` is `[C, F, T]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ErdsMap {
    pub data: Array3<f64>,
    pub ch_names: Vec<String>,
    pub freqs: Vec<f64>,
    pub times: Array1<f64>,
    /// `(channel, freq)` cells whose resting baseline was zero, not finite
    /// or too small to divide by. Their rows in `data` are `NaN`.
    pub invalid: Vec<(usize, usize)>,
}

impl ErdsMap {
    #[inline]
    pub fn n_channels(&self) -> usize {
        self.data.shape()[0]
    }

    #[inline]
    pub fn n_freqs(&self) -> usize {
        self.data.shape()[1]
    }

    #[inline]
    pub fn n_times(&self) -> usize {
        self.data.shape()[2]
    }

    /// Finite `(min, max)` over the map, `None` if every cell is `NaN`.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Mean ERDS per `(channel, freq)` over time, `NaN` for invalid rows.
    pub fn mean_over_time(&self) -> ndarray::Array2<f64> {
        self.data.mean_axis(Axis(2)).unwrap_or_else(|| {
            ndarray::Array2::from_elem((self.n_channels(), self.n_freqs()), f64::NAN)
        })
    }
}

/// Baselines at or below this are treated as zero.
const MIN_BASELINE: f64 = f64::MIN_POSITIVE;

/// Percentage change of `task` power relative to the time-averaged `rest`
/// power, per channel and frequency.
///
/// Both TFRs must share channels, frequencies and time axis; otherwise
/// [`ErdsError::AxisMismatch`](crate::ErdsError::AxisMismatch) is returned.
/// A baseline that is zero, not finite, or small enough for the ratio to
/// overflow gives a `NaN` row instead of ±∞; the cell is listed in
/// [`ErdsMap::invalid`].
pub fn compute_erds(task: &Tfr, rest: &Tfr) -> Result<ErdsMap> {
    task.check_compatible(rest)?;

    let baseline = rest.mean_over_time();
    let mut data = task.data.clone();
    let mut invalid = Vec::new();

    for ((c, f), &base) in baseline.indexed_iter() {
        let mut row = data.slice_mut(ndarray::s![c, f, ..]);
        if base.is_finite() && base > MIN_BASELINE {
            row.mapv_inplace(|p| (p - base) / base * 100.0);
            if row.iter().all(|v| v.is_finite()) {
                continue;
            }
        }
        // Zero, non-finite, or so small that the ratio overflows.
        row.fill(f64::NAN);
        invalid.push((c, f));
    }

    if !invalid.is_empty() {
        log::warn!(
            "{} channel/frequency cells have a zero, tiny or non-finite resting baseline; \
             their ERDS is NaN (first: {} at {} Hz)",
            invalid.len(),
            rest.ch_names[invalid[0].0],
            rest.freqs[invalid[0].1]
        );
    }

    Ok(ErdsMap {
        data,
        ch_names: task.ch_names.clone(),
        freqs: task.freqs.clone(),
        times: task.times.clone(),
        invalid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErdsError;
    use approx::assert_abs_diff_eq;

    fn tfr(data: Array3<f64>) -> Tfr {
        let (c, f, t) = data.dim();
        Tfr::new(
            data,
            (0..c).map(|i| format!("C{i}")).collect(),
            (0..f).map(|i| 4.0 + i as f64).collect(),
            Array1::from_shape_fn(t, |i| i as f64 * 0.5),
            1,
        )
        .unwrap()
    }

    #[test]
    fn identical_inputs_give_zero() {
        let p = tfr(Array3::from_elem((2, 3, 5), 7.5));
        let m = compute_erds(&p, &p).unwrap();
        assert!(m.data.iter().all(|&v| v == 0.0));
        assert!(m.invalid.is_empty());
    }

    #[test]
    fn literal_percentages() {
        let rest = tfr(Array3::from_elem((1, 1, 4), 10.0));
        let m = compute_erds(&tfr(Array3::from_elem((1, 1, 4), 15.0)), &rest).unwrap();
        assert!(m.data.iter().all(|&v| (v - 50.0).abs() < 1e-12));
        let m = compute_erds(&tfr(Array3::from_elem((1, 1, 4), 20.0)), &rest).unwrap();
        assert!(m.data.iter().all(|&v| (v - 100.0).abs() < 1e-12));
        let m = compute_erds(&tfr(Array3::from_elem((1, 1, 4), 5.0)), &rest).unwrap();
        assert!(m.data.iter().all(|&v| (v + 50.0).abs() < 1e-12));
    }

    #[test]
    fn baseline_is_time_mean() {
        let mut r = Array3::zeros((1, 1, 4));
        r.slice_mut(ndarray::s![0, 0, ..]).assign(&Array1::from(vec![5.0, 15.0, 5.0, 15.0]));
        let m = compute_erds(&tfr(Array3::from_elem((1, 1, 4), 10.0)), &tfr(r)).unwrap();
        assert!(m.data.iter().all(|&v| v.abs() < 1e-12));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let task =
            tfr(Array3::from_shape_fn((2, 3, 4), |(c, f, t)| 1.0 + (c + 2 * f + 3 * t) as f64));
        let rest = tfr(Array3::from_shape_fn((2, 3, 4), |(c, f, t)| 2.0 + (c * f + t) as f64));
        let a = compute_erds(&task, &rest).unwrap();
        let b = compute_erds(&task, &rest).unwrap();
        assert_eq!(a, b);
        assert_abs_diff_eq!(
            a.data[[1, 2, 3]],
            (task.data[[1, 2, 3]] - 4.0 - 1.5) / 5.5 * 100.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn zero_baseline_is_nan_and_reported() {
        let mut r = Array3::from_elem((2, 2, 3), 4.0);
        r.slice_mut(ndarray::s![1, 0, ..]).fill(0.0);
        let m = compute_erds(&tfr(Array3::from_elem((2, 2, 3), 8.0)), &tfr(r)).unwrap();
        assert_eq!(m.invalid, vec![(1, 0)]);
        assert!(m.data.slice(ndarray::s![1, 0, ..]).iter().all(|v| v.is_nan()));
        assert!(m.data.iter().all(|v| !v.is_infinite()));
        assert_abs_diff_eq!(m.data[[0, 0, 0]], 100.0, epsilon = 1e-12);
        assert_eq!(m.finite_range(), Some((100.0, 100.0)));
    }

    #[test]
    fn tiny_baseline_never_gives_infinity() {
        let mut r = Array3::from_elem((1, 2, 2), 4.0);
        r.slice_mut(ndarray::s![0, 1, ..]).fill(1e-307);
        let m = compute_erds(&tfr(Array3::from_elem((1, 2, 2), 10.0)), &tfr(r)).unwrap();
        assert_eq!(m.invalid, vec![(0, 1)]);
        assert!(m.data.slice(ndarray::s![0, 1, ..]).iter().all(|v| v.is_nan()));
        assert_abs_diff_eq!(m.data[[0, 0, 1]], 150.0, epsilon = 1e-12);
    }

    #[test]
    fn mismatched_axes() {
        let task = tfr(Array3::from_elem((2, 3, 5), 1.0));
        let rest = tfr(Array3::from_elem((2, 3, 6), 1.0));
        assert!(matches!(compute_erds(&task, &rest), Err(ErdsError::AxisMismatch(_))));
        let rest = tfr(Array3::from_elem((2, 4, 5), 1.0));
        assert!(matches!(compute_erds(&task, &rest), Err(ErdsError::AxisMismatch(_))));
    }
}
