//! Time-frequency power.
//!
//! - [`dpss`]: Slepian (DPSS) tapers.
//! - [`multitaper`]: multitaper wavelets and the averaged power transform,
//!   matching `epochs.compute_tfr(method="multitaper", use_fft=True,
//!   return_itc=False, average=True)` in MNE.
pub mod dpss;
pub mod multitaper;

use ndarray::{Array1, Array2, Array3, Axis};

use crate::error::{ErdsError, Result};

pub use dpss::{dpss_windows, Dpss};
pub use multitaper::{make_dpss_wavelets, next_fast_len, tfr_multitaper};

/// Power averaged over segments (and tapers): `data` is `[C, F, T]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tfr {
    pub data: Array3<f64>,
    pub ch_names: Vec<String>,
    pub freqs: Vec<f64>,
    /// Seconds from segment start, after decimation.
    pub times: Array1<f64>,
    /// Number of segments averaged into `data`.
    pub n_averaged: usize,
}

impl Tfr {
    /// Build a TFR, checking every axis length against `data`.
    pub fn new(
        data: Array3<f64>,
        ch_names: Vec<String>,
        freqs: Vec<f64>,
        times: Array1<f64>,
        n_averaged: usize,
    ) -> Result<Self> {
        let (c, f, t) = data.dim();
        if c != ch_names.len() || f != freqs.len() || t != times.len() {
            return Err(ErdsError::AxisMismatch(format!(
                "data is {:?} but axes are {} channels × {} freqs × {} times",
                data.dim(),
                ch_names.len(),
                freqs.len(),
                times.len()
            )));
        }
        Ok(Self { data, ch_names, freqs, times, n_averaged })
    }

    /// Power averaged over the time axis, `[C, F]`.
    pub fn mean_over_time(&self) -> Array2<f64> {
        let n_t = self.times.len();
        if n_t == 0 {
            return Array2::from_elem((self.ch_names.len(), self.freqs.len()), f64::NAN);
        }
        self.data.sum_axis(Axis(2)) / n_t as f64
    }

    /// Error unless `other` has the same channels, frequencies and times.
    pub fn check_compatible(&self, other: &Tfr) -> Result<()> {
        if self.ch_names != other.ch_names {
            return Err(ErdsError::AxisMismatch(format!(
                "channels {:?} vs {:?}",
                self.ch_names, other.ch_names
            )));
        }
        if !same_axis(&self.freqs, &other.freqs) {
            return Err(ErdsError::AxisMismatch(format!(
                "frequency axes differ ({} vs {} bins)",
                self.freqs.len(),
                other.freqs.len()
            )));
        }
        if !same_axis(self.times.as_slice().unwrap_or(&[]), other.times.as_slice().unwrap_or(&[])) {
            return Err(ErdsError::AxisMismatch(format!(
                "time axes differ ({} vs {} samples)",
                self.times.len(),
                other.times.len()
            )));
        }
        Ok(())
    }
}

/// Element-wise equality of two axes within 1e-9 (relative to magnitude).
pub(crate) fn same_axis(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= 1e-9 * x.abs().max(1.0))
}
