//! Discrete prolate spheroidal sequences (Slepian tapers).
//!
//! The tapers are the leading eigenvectors of the symmetric tridiagonal matrix
//! of Percival & Walden (1993, eq. 378), which commutes with the time/band
//! concentration operator:
//!
//! ```text
//!   diag[i]   = ((N − 1 − 2i) / 2)² · cos(2πW)
//!   off[i−1]  = i · (N − i) / 2
//! ```
//!
//! with `W = NW / N`. Signs follow the usual convention: symmetric tapers have
//! a positive sum, antisymmetric tapers start with a positive lobe.
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::Array2;
use std::f64::consts::PI;

use crate::error::{ErdsError, Result};

/// A family of tapers with their spectral concentrations.
#[derive(Debug, Clone)]
pub struct Dpss {
    /// `[K, N]`, each row with unit energy.
    pub windows: Array2<f64>,
    /// Fraction of each taper's energy inside `[-W, W]`, descending.
    pub concentrations: Vec<f64>,
}

impl Dpss {
    #[inline]
    pub fn n_tapers(&self) -> usize {
        self.windows.nrows()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.windows.ncols()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Compute the first `kmax` DPSS tapers of length `n`.
///
/// `half_nbw` is the standardised half bandwidth `NW`. With `sym == false`
/// the tapers are computed for `n + 1` points and the last sample dropped,
/// which gives the periodic variant used for spectral estimation.
pub fn dpss_windows(n: usize, half_nbw: f64, kmax: usize, sym: bool) -> Result<Dpss> {
    if n < 2 {
        return Err(ErdsError::InvalidFrequencies(format!(
            "DPSS length must be at least 2, got {n}"
        )));
    }
    if !(half_nbw.is_finite() && half_nbw > 0.0) {
        return Err(ErdsError::InvalidFrequencies(format!(
            "DPSS half bandwidth must be positive, got {half_nbw}"
        )));
    }
    if kmax == 0 || kmax > n {
        return Err(ErdsError::InvalidFrequencies(format!(
            "cannot take {kmax} tapers of length {n}"
        )));
    }

    let m = if sym { n } else { n + 1 };
    let w = half_nbw / m as f64;
    let cos_w = (2.0 * PI * w).cos();

    let mut mat = DMatrix::<f64>::zeros(m, m);
    for i in 0..m {
        let d = (m as f64 - 1.0 - 2.0 * i as f64) / 2.0;
        mat[(i, i)] = d * d * cos_w;
        if i > 0 {
            let off = i as f64 * (m - i) as f64 / 2.0;
            mat[(i - 1, i)] = off;
            mat[(i, i - 1)] = off;
        }
    }

    let eig = SymmetricEigen::new(mat);
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

    let mut full = Array2::<f64>::zeros((kmax, m));
    for (k, &col) in order.iter().take(kmax).enumerate() {
        let v = eig.eigenvectors.column(col);
        let norm = v.norm();
        for i in 0..m {
            full[[k, i]] = v[i] / norm;
        }
    }
    fix_signs(&mut full);

    let concentrations = (0..kmax)
        .map(|k| concentration(full.row(k).as_slice().unwrap_or(&[]), w))
        .collect();

    let windows = if sym {
        full
    } else {
        let mut cut = full.slice(ndarray::s![.., ..n]).to_owned();
        for mut row in cut.rows_mut() {
            let e = row.dot(&row).sqrt();
            if e > 0.0 {
                row /= e;
            }
        }
        cut
    };

    Ok(Dpss { windows, concentrations })
}

/// Even tapers get a positive sum, odd tapers a positive first lobe.
fn fix_signs(windows: &mut Array2<f64>) {
    let m = windows.ncols();
    let thresh = (1.0 / m as f64).max(1e-7);
    for (k, mut row) in windows.rows_mut().into_iter().enumerate() {
        let flip = if k % 2 == 0 {
            row.sum() < 0.0
        } else {
            row.iter().find(|v| *v * *v > thresh).is_some_and(|v| *v < 0.0)
        };
        if flip {
            row.mapv_inplace(|v| -v);
        }
    }
}

/// Energy fraction of a unit-energy taper inside `[-w, w]` cycles/sample.
fn concentration(taper: &[f64], w: f64) -> f64 {
    let m = taper.len();
    let mut ratio = 0.0;
    for lag in 0..m {
        let rxx: f64 = taper[..m - lag].iter().zip(&taper[lag..]).map(|(a, b)| a * b).sum();
        // Ideal band-limiting kernel, doubled for lag > 0 to cover negative lags.
        let r = if lag == 0 {
            2.0 * w
        } else {
            let x = 2.0 * PI * w * lag as f64;
            4.0 * w * x.sin() / x
        };
        ratio += rxx * r;
    }
    ratio
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn tapers_are_orthonormal() {
        let d = dpss_windows(64, 2.0, 3, true).unwrap();
        assert_eq!(d.windows.dim(), (3, 64));
        for a in 0..3 {
            for b in 0..3 {
                let dot = d.windows.row(a).dot(&d.windows.row(b));
                let want = if a == b { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(dot, want, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn symmetry_and_sign_convention() {
        let d = dpss_windows(101, 2.0, 3, true).unwrap();
        let n = d.len();
        for i in 0..n {
            assert_abs_diff_eq!(d.windows[[0, i]], d.windows[[0, n - 1 - i]], epsilon = 1e-9);
            assert_abs_diff_eq!(d.windows[[1, i]], -d.windows[[1, n - 1 - i]], epsilon = 1e-9);
            assert_abs_diff_eq!(d.windows[[2, i]], d.windows[[2, n - 1 - i]], epsilon = 1e-9);
        }
        assert!(d.windows.row(0).sum() > 0.0);
        assert!(d.windows.row(2).sum() > 0.0);
        let first_lobe = d.windows.row(1).iter().copied().find(|v| v * v > 1.0 / n as f64).unwrap();
        assert!(first_lobe > 0.0);
        // The first taper peaks in the middle.
        let mid = d.windows[[0, n / 2]];
        assert!(d.windows.row(0).iter().all(|&v| v <= mid + 1e-12));
    }

    #[test]
    fn concentrations_descend_towards_one() {
        let d = dpss_windows(128, 2.0, 3, true).unwrap();
        let c = &d.concentrations;
        assert!(c[0] > 0.999, "{c:?}");
        assert!(c[0] >= c[1] && c[1] >= c[2], "{c:?}");
        assert!(c[2] > 0.9, "{c:?}");
        assert!(c.iter().all(|&v| v <= 1.0 + 1e-9));
    }

    #[test]
    fn periodic_variant_drops_one_sample() {
        let d = dpss_windows(50, 2.0, 3, false).unwrap();
        assert_eq!(d.windows.dim(), (3, 50));
        for row in d.windows.rows() {
            assert_abs_diff_eq!(row.dot(&row), 1.0, epsilon = 1e-12);
        }
        // Periodic window: w[i] == w[n - i] for the full (n + 1)-point taper.
        assert_abs_diff_eq!(d.windows[[0, 1]], d.windows[[0, 49]], epsilon = 1e-9);
    }

    #[test]
    fn bad_arguments() {
        assert!(dpss_windows(1, 2.0, 1, true).is_err());
        assert!(dpss_windows(16, 0.0, 1, true).is_err());
        assert!(dpss_windows(16, 2.0, 0, true).is_err());
        assert!(dpss_windows(4, 2.0, 5, true).is_err());
    }
}
