//! Zero-phase FIR filtering by FFT overlap-add, as MNE's `_overlap_add_filter`.
//!
//! The kernel is applied causally and every output sample is read
//! `(N-1)/2` samples early, cancelling the kernel's linear phase. Before
//! filtering, each signal is extended by `N-1` reflect-limited samples per
//! side so the edge transient falls into the padding.
use std::sync::Arc;

use ndarray::{Array2, ArrayView1};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::{ErdsError, Result};

/// An odd-length kernel prepared for signals of one length: FFT plans and
/// the kernel spectrum are computed once and shared by every channel.
struct OverlapAdd {
    n_h: usize,
    n_fft: usize,
    spectrum: Vec<Complex<f64>>,
    fwd: Arc<dyn Fft<f64>>,
    inv: Arc<dyn Fft<f64>>,
}

impl OverlapAdd {
    fn new(h: &[f64], n_x: usize) -> Result<Self> {
        if h.is_empty() || h.len() % 2 == 0 {
            return Err(ErdsError::InvalidFilter(format!(
                "zero-phase FIR needs an odd number of taps, got {}",
                h.len()
            )));
        }
        let n_h = h.len();
        let n_fft = choose_fft_len(n_h, n_x + 2 * (n_h - 1));

        let mut planner: FftPlanner<f64> = FftPlanner::new();
        let fwd = planner.plan_fft_forward(n_fft);
        let inv = planner.plan_fft_inverse(n_fft);
        let mut spectrum = Vec::with_capacity(n_fft);
        load_block(&mut spectrum, h, n_fft);
        fwd.process(&mut spectrum);

        Ok(Self { n_h, n_fft, spectrum, fwd, inv })
    }

    fn run(&self, x: &[f64]) -> Vec<f64> {
        if x.is_empty() {
            return vec![];
        }
        let pad = self.n_h - 1;
        let shift = pad / 2;
        let ext = reflect_limited_pad(x, pad, pad);
        let block = self.n_fft - self.n_h + 1;
        let scale = 1.0 / self.n_fft as f64;

        let mut acc = vec![0.0_f64; ext.len()];
        let mut buf = Vec::with_capacity(self.n_fft);
        for start in (0..ext.len()).step_by(block) {
            let stop = (start + block).min(ext.len());
            load_block(&mut buf, &ext[start..stop], self.n_fft);
            self.fwd.process(&mut buf);
            for (b, k) in buf.iter_mut().zip(&self.spectrum) {
                *b *= k;
            }
            self.inv.process(&mut buf);

            // Product sample `p` belongs at `start + p - shift`.
            for (p, v) in buf.iter().enumerate() {
                let Some(o) = (start + p).checked_sub(shift) else { continue };
                if o >= acc.len() {
                    break;
                }
                acc[o] += v.re * scale;
            }
        }
        acc[pad..pad + x.len()].to_vec()
    }
}

/// Filter every channel of `data` (`[C, T]`) and return the filtered copy.
///
/// `h` must have odd length, which the `design_*` functions guarantee.
pub fn apply_fir_zero_phase(data: &Array2<f64>, h: &[f64]) -> Result<Array2<f64>> {
    let n_t = data.ncols();
    let ola = OverlapAdd::new(h, n_t)?;
    if n_t < h.len() {
        log::warn!(
            "filter length {} is longer than the signal ({n_t} samples); edge effects dominate",
            h.len()
        );
    }
    log::debug!("overlap-add: {} taps, FFT blocks of {}", h.len(), ola.n_fft);

    let mut out = Array2::<f64>::zeros(data.raw_dim());
    for (src, mut dst) in data.rows().into_iter().zip(out.rows_mut()) {
        let filtered = ola.run(&src.to_vec());
        dst.assign(&ArrayView1::from(&filtered[..]));
    }
    Ok(out)
}

/// Filter one signal; the result has the length of `x`.
pub fn filter_1d(x: &[f64], h: &[f64]) -> Result<Vec<f64>> {
    Ok(OverlapAdd::new(h, x.len())?.run(x))
}

/// Clear `buf` and fill it with `values` as complex numbers, zero-padded to `len`.
fn load_block(buf: &mut Vec<Complex<f64>>, values: &[f64], len: usize) {
    buf.clear();
    buf.extend(values.iter().map(|&v| Complex::new(v, 0.0)));
    buf.resize(len, Complex::default());
}

/// Odd extension about the end samples (MNE's `_smart_pad`): the left side is
/// `2·x[0] − x[i]`, the right side `2·x[n−1] − x[n−1−i]`. Padding requested
/// beyond `n − 1` samples is filled with zeros.
fn reflect_limited_pad(x: &[f64], n_l: usize, n_r: usize) -> Vec<f64> {
    let n = x.len();
    let (first, last) = (x[0], x[n - 1]);
    let reach_l = n_l.min(n - 1);
    let reach_r = n_r.min(n - 1);

    let mut out = vec![0.0; n_l - reach_l];
    out.extend((1..=reach_l).rev().map(|i| 2.0 * first - x[i]));
    out.extend_from_slice(x);
    out.extend((1..=reach_r).map(|i| 2.0 * last - x[n - 1 - i]));
    out.resize(n_l + n + n_r, 0.0);
    out
}

/// Power-of-two block size with the lowest estimated cost, using MNE's model
/// `ceil(n_x / (N − n_h + 1)) · N · (log2 N + 1) + 4e-5 · N · n_x`.
fn choose_fft_len(n_h: usize, n_x: usize) -> usize {
    let lo = (2 * n_h - 1).next_power_of_two().trailing_zeros();
    let hi = (n_x.next_power_of_two().trailing_zeros() + 1).max(lo);
    (lo..=hi)
        .map(|p| {
            let n = 1_usize << p;
            let blocks = n_x.div_ceil(n - n_h + 1) as f64;
            (n, blocks * n as f64 * (p as f64 + 1.0) + 4e-5 * n as f64 * n_x as f64)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(1 << hi, |(n, _)| n)
}
