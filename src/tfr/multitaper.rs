//! Multitaper time-frequency power.
//!
//! For every frequency `f` a complex wavelet of `n_cycles / f` seconds is
//! built per DPSS taper, convolved with each segment ("same" mode, via one
//! zero-padded FFT per channel), decimated and squared. Power is averaged
//! over tapers and then over segments.
use std::collections::hash_map::{Entry, HashMap};
use std::f64::consts::PI;

use ndarray::{s, Array1, Array3};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::config::TfrConfig;
use crate::epoch::Segments;
use crate::error::{ErdsError, Result};

use super::dpss::{dpss_windows, Dpss};
use super::Tfr;

/// One complex wavelet.
pub type Wavelet = Vec<Complex<f64>>;

/// Wavelets indexed `[taper][freq]`.
///
/// `floor(time_bandwidth − 1)` tapers are used. Each wavelet spans
/// `n_cycles / f` seconds sampled at `sfreq`, is centred on its midpoint,
/// optionally made zero-mean, and scaled so that its squared norm is 2.
pub fn make_dpss_wavelets(
    sfreq: f64,
    freqs: &[f64],
    n_cycles: &[f64],
    time_bandwidth: f64,
    zero_mean: bool,
) -> Result<Vec<Vec<Wavelet>>> {
    if !(time_bandwidth >= 2.0) {
        return Err(ErdsError::InvalidFrequencies(format!(
            "time-bandwidth product must be at least 2, got {time_bandwidth}"
        )));
    }
    if n_cycles.len() != 1 && n_cycles.len() != freqs.len() {
        return Err(ErdsError::InvalidFrequencies(format!(
            "{} cycle counts for {} frequencies",
            n_cycles.len(),
            freqs.len()
        )));
    }
    if let Some(c) = n_cycles.iter().find(|c| !(c.is_finite() && **c > 0.0)) {
        return Err(ErdsError::InvalidFrequencies(format!("cycle count {c} is not positive")));
    }

    let n_taps = (time_bandwidth - 1.0).floor() as usize;
    let half_nbw = time_bandwidth / 2.0;
    let mut tapers: HashMap<usize, Dpss> = HashMap::new();
    let mut out: Vec<Vec<Wavelet>> = vec![Vec::with_capacity(freqs.len()); n_taps];

    for (k, &f) in freqs.iter().enumerate() {
        if !(f.is_finite() && f > 0.0) {
            return Err(ErdsError::InvalidFrequencies(format!("{f} Hz is not positive")));
        }
        let cycles = if n_cycles.len() == 1 { n_cycles[0] } else { n_cycles[k] };
        let t_win = cycles / f;
        let len = (t_win / (1.0 / sfreq)).ceil() as usize;
        if len < 2 {
            return Err(ErdsError::InvalidFrequencies(format!(
                "wavelet at {f} Hz is shorter than two samples"
            )));
        }

        let dpss = match tapers.entry(len) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let d = dpss_windows(len, half_nbw, n_taps, false)?;
                if let Some(c) = d.concentrations.iter().find(|&&c| c < 0.9) {
                    log::warn!(
                        "DPSS taper of {len} samples at {f} Hz has low concentration {c:.3}"
                    );
                }
                e.insert(d)
            }
        };

        for (m, taper) in dpss.windows.rows().into_iter().enumerate() {
            let mut w: Wavelet = taper
                .iter()
                .enumerate()
                .map(|(i, &a)| {
                    let t = i as f64 / sfreq - t_win / 2.0;
                    Complex::from_polar(a, 2.0 * PI * f * t)
                })
                .collect();
            if zero_mean {
                let mean = w.iter().sum::<Complex<f64>>() / len as f64;
                w.iter_mut().for_each(|v| *v -= mean);
            }
            let norm = w.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt();
            let scale = 1.0 / (0.5_f64.sqrt() * norm);
            w.iter_mut().for_each(|v| *v *= scale);
            out[m].push(w);
        }
    }
    Ok(out)
}

/// Smallest `n ≥ target` whose only prime factors are 2, 3 and 5.
pub fn next_fast_len(target: usize) -> usize {
    let mut n = target.max(1);
    loop {
        let mut m = n;
        for p in [2, 3, 5] {
            while m % p == 0 {
                m /= p;
            }
        }
        if m == 1 {
            return n;
        }
        n += 1;
    }
}

fn check_freqs(freqs: &[f64], sfreq: f64) -> Result<()> {
    if freqs.is_empty() {
        return Err(ErdsError::InvalidFrequencies("no frequencies requested".into()));
    }
    let nyquist = sfreq / 2.0;
    if let Some(f) = freqs.iter().find(|f| !(f.is_finite() && **f > 0.0 && **f <= nyquist)) {
        return Err(ErdsError::InvalidFrequencies(format!(
            "{f} Hz is outside (0, {nyquist}] Hz"
        )));
    }
    Ok(())
}

/// Average multitaper power of all segments, `[C, F, ceil(S / decim)]`.
///
/// # Errors
///
/// * [`ErdsError::InvalidFrequencies`] for an empty grid, a frequency outside
///   `(0, sfreq/2]`, bad cycle counts, `time_bandwidth < 2` or `decim == 0`.
/// * [`ErdsError::WaveletTooLong`] when a wavelet has more samples than a
///   segment.
/// * [`ErdsError::NoSegments`] when `segments` holds no window.
pub fn tfr_multitaper(segments: &Segments, cfg: &TfrConfig) -> Result<Tfr> {
    if cfg.decim == 0 {
        return Err(ErdsError::InvalidFrequencies("decimation factor must be ≥ 1".into()));
    }
    if segments.n_segments() == 0 {
        return Err(ErdsError::NoSegments { recording: 0.0, duration: segments.duration });
    }
    check_freqs(&cfg.freqs, segments.sfreq)?;
    let waves = make_dpss_wavelets(
        segments.sfreq,
        &cfg.freqs,
        &cfg.cycles(),
        cfg.time_bandwidth,
        cfg.zero_mean,
    )?;

    let n_times = segments.n_times();
    for (&freq, w) in cfg.freqs.iter().zip(&waves[0]) {
        if w.len() > n_times {
            return Err(ErdsError::WaveletTooLong { freq, wavelet_len: w.len(), n_times });
        }
    }

    let n_tapers = waves.len();
    let n_freqs = cfg.freqs.len();
    let n_ch = segments.n_channels();
    let n_seg = segments.n_segments();
    let decim = cfg.decim;
    let n_out = n_times.div_ceil(decim);

    let max_len = waves.iter().flatten().map(Vec::len).max().unwrap_or(1);
    let fsize = next_fast_len(n_times + max_len - 1);
    log::debug!(
        "multitaper: {n_seg} segments × {n_ch} channels × {n_freqs} freqs, \
         {n_tapers} tapers, FFT length {fsize}"
    );

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft_fwd = planner.plan_fft_forward(fsize);
    let fft_inv = planner.plan_fft_inverse(fsize);

    let fft_waves: Vec<Vec<Vec<Complex<f64>>>> = waves
        .iter()
        .map(|per_freq| {
            per_freq
                .iter()
                .map(|w| {
                    let mut buf = zero_padded(w.iter().copied(), fsize);
                    fft_fwd.process(&mut buf);
                    buf
                })
                .collect()
        })
        .collect();

    // |ifft|² needs the 1/fsize normalisation squared.
    let scale = 1.0 / (fsize as f64 * fsize as f64);
    let mut power = Array3::<f64>::zeros((n_ch, n_freqs, n_out));
    let mut conv = vec![Complex::default(); fsize];

    for e in 0..n_seg {
        for c in 0..n_ch {
            let x = segments.data.slice(s![e, c, ..]);
            let mut fft_x = zero_padded(x.iter().map(|&v| Complex::new(v, 0.0)), fsize);
            fft_fwd.process(&mut fft_x);

            for fi in 0..n_freqs {
                for t in 0..n_tapers {
                    let start = (waves[t][fi].len() - 1) / 2;
                    for ((o, a), b) in conv.iter_mut().zip(&fft_x).zip(&fft_waves[t][fi]) {
                        *o = a * b;
                    }
                    fft_inv.process(&mut conv);
                    let mut row = power.slice_mut(s![c, fi, ..]);
                    for (k, idx) in (start..start + n_times).step_by(decim).enumerate() {
                        row[k] += conv[idx].norm_sqr() * scale;
                    }
                }
            }
        }
    }
    power /= (n_tapers * n_seg) as f64;

    let times = Array1::from_iter(segments.times().iter().step_by(decim).copied());
    Tfr::new(power, segments.ch_names.clone(), cfg.freqs.clone(), times, n_seg)
}

fn zero_padded(values: impl Iterator<Item = Complex<f64>>, len: usize) -> Vec<Complex<f64>> {
    values.chain(std::iter::repeat(Complex::default())).take(len).collect()
}
