//! FIR filter design matching MNE / `scipy.signal.firwin`.
//!
//! For a band-pass `[l_freq, h_freq]` at sampling rate `sfreq`:
//!   • low transition  = min(max(0.25 · l_freq, 2.0), l_freq)
//!   • high transition = min(max(0.25 · h_freq, 2.0), sfreq/2 − h_freq)
//!   • filter length N = ceil(3.3 / min(transitions) · sfreq), rounded to odd
//!   • the kernel is assembled one transition at a time from Hamming-windowed
//!     sinc low-passes centred in the kernel (MNE's `_firwin_design`)
use std::f64::consts::PI;

use crate::error::{ErdsError, Result};

/// Hamming window main-lobe length factor (MNE `_length_factors['hamming']`).
const HAMMING_LENGTH_FACTOR: f64 = 3.3;

/// MNE-compatible transition bandwidth below a high-pass edge.
///
/// Rule: `min(max(0.25 * l_freq, 2.0), l_freq)`
pub fn auto_trans_bandwidth(l_freq: f64) -> f64 {
    (0.25 * l_freq).max(2.0).min(l_freq)
}

/// MNE-compatible transition bandwidth above a low-pass edge.
///
/// Rule: `min(max(0.25 * h_freq, 2.0), sfreq / 2 - h_freq)`
pub fn auto_h_trans_bandwidth(h_freq: f64, sfreq: f64) -> f64 {
    (0.25 * h_freq).max(2.0).min(sfreq / 2.0 - h_freq)
}

/// Number of FIR taps for a given transition bandwidth.
/// Returns an odd integer (required for zero-phase linear-phase FIR).
///
/// Formula: `ceil(3.3 / trans_bw * sfreq)` rounded up to odd.
pub fn auto_filter_length(trans_bw: f64, sfreq: f64) -> usize {
    let n_raw = (HAMMING_LENGTH_FACTOR / trans_bw * sfreq).ceil() as usize;
    if n_raw % 2 == 0 { n_raw + 1 } else { n_raw }
}

/// Design a zero-phase FIR filter.
///
/// `l_freq` only → high-pass, `h_freq` only → low-pass, both → band-pass.
/// An `h_freq` at or above Nyquist is dropped with a warning (MNE does the
/// same), as is a non-positive `l_freq`.
///
/// Matches `mne.filter.create_filter(data, sfreq, l_freq, h_freq,
///   filter_length='auto', fir_window='hamming', fir_design='firwin', phase='zero')`.
pub fn design_filter(l_freq: Option<f64>, h_freq: Option<f64>, sfreq: f64) -> Result<Vec<f64>> {
    if !sfreq.is_finite() || sfreq <= 0.0 {
        return Err(ErdsError::InvalidFilter(format!("sampling rate {sfreq} Hz")));
    }
    let nyq = sfreq / 2.0;
    let l_freq = l_freq.filter(|&l| l > 0.0);
    let h_freq = match h_freq {
        Some(h) if h >= nyq => {
            log::warn!("h_freq {h} Hz is at or above Nyquist ({nyq} Hz), low-pass edge dropped");
            None
        }
        other => other,
    };

    let (n, freq, gain) = match (l_freq, h_freq) {
        (None, None) => {
            return Err(ErdsError::InvalidFilter("neither a high-pass nor a low-pass edge".into()))
        }
        (Some(l), Some(h)) if l >= h => {
            return Err(ErdsError::InvalidFilter(format!("l_freq {l} Hz >= h_freq {h} Hz")))
        }
        (Some(l), None) => {
            let lt = auto_trans_bandwidth(l);
            (
                auto_filter_length(lt, sfreq),
                vec![0.0, l - lt, l, nyq],
                vec![0.0, 0.0, 1.0, 1.0],
            )
        }
        (None, Some(h)) => {
            let ht = auto_h_trans_bandwidth(h, sfreq);
            (
                auto_filter_length(ht, sfreq),
                vec![0.0, h, h + ht, nyq],
                vec![1.0, 1.0, 0.0, 0.0],
            )
        }
        (Some(l), Some(h)) => {
            let lt = auto_trans_bandwidth(l);
            let ht = auto_h_trans_bandwidth(h, sfreq);
            (
                auto_filter_length(lt.min(ht), sfreq),
                vec![0.0, l - lt, l, h, h + ht, nyq],
                vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
            )
        }
    };

    log::debug!(
        "FIR design l_freq={l_freq:?} h_freq={h_freq:?} sfreq={sfreq}: {n} taps"
    );
    firwin_design(n, &freq, &gain, sfreq)
}

/// Zero-phase band-pass between `l_freq` and `h_freq`.
pub fn design_bandpass(l_freq: f64, h_freq: f64, sfreq: f64) -> Result<Vec<f64>> {
    design_filter(Some(l_freq), Some(h_freq), sfreq)
}

/// Zero-phase high-pass at `l_freq`.
pub fn design_highpass(l_freq: f64, sfreq: f64) -> Result<Vec<f64>> {
    design_filter(Some(l_freq), None, sfreq)
}

/// Assemble a piecewise-constant response from low-pass kernels.
///
/// `freq` (Hz, ascending from 0 to Nyquist) and `gain` (0 or 1) describe the
/// ideal response. Walking from Nyquist down, every gain change adds or
/// subtracts a low-pass whose cutoff sits in the middle of that transition
/// and whose length satisfies that transition's width.
fn firwin_design(n: usize, freq: &[f64], gain: &[f64], sfreq: f64) -> Result<Vec<f64>> {
    let mut h = vec![0.0_f64; n];
    let mut prev_freq = freq[freq.len() - 1];
    let mut prev_gain = gain[gain.len() - 1];
    if prev_gain == 1.0 {
        h[n / 2] = 1.0;
    }
    for (&this_freq, &this_gain) in freq.iter().rev().skip(1).zip(gain.iter().rev().skip(1)) {
        if this_gain != prev_gain {
            let transition = (prev_freq - this_freq) / sfreq;
            let mut this_n = (HAMMING_LENGTH_FACTOR / transition).round() as usize;
            this_n += 1 - this_n % 2;
            let this_n = this_n.min(n);
            let this_h = firwin(this_n, (prev_freq + this_freq) / 2.0, sfreq)?;
            let offset = (n - this_n) / 2;
            let sign = if this_gain == 0.0 { -1.0 } else { 1.0 };
            for (dst, &v) in h[offset..offset + this_n].iter_mut().zip(this_h.iter()) {
                *dst += sign * v;
            }
        }
        prev_gain = this_gain;
        prev_freq = this_freq;
    }
    Ok(h)
}

/// Design a lowpass FIR filter using a Hamming-windowed sinc with unit DC
/// gain. `cutoff_hz` is the -6 dB point.
///
/// # Errors
///
/// [`ErdsError::InvalidFilter`] if `n` is even (no linear-phase centre tap).
pub fn firwin(n: usize, cutoff_hz: f64, sfreq: f64) -> Result<Vec<f64>> {
    if n % 2 == 0 {
        return Err(ErdsError::InvalidFilter(format!(
            "firwin needs an odd number of taps, got {n}"
        )));
    }
    let alpha = (n - 1) as f64 / 2.0;
    let nyq = sfreq / 2.0;
    let fc = cutoff_hz / nyq;   // normalised [0, 1]

    let win = hamming(n);

    let mut h: Vec<f64> = (0..n)
        .map(|i| {
            let x = i as f64 - alpha;
            // f(x) = sin(π·fc·x) / (π·x);  lim_{x→0} f(x) = fc  (L'Hôpital)
            let sinc = if x == 0.0 { fc } else { (PI * fc * x).sin() / (PI * x) };
            sinc * win[i]
        })
        .collect();

    // Unit DC gain for lowpass.
    let s: f64 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= s);
    Ok(h)
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

/// Magnitude of the frequency response of `h` at `freq` Hz.
pub fn response_at(h: &[f64], freq: f64, sfreq: f64) -> f64 {
    let w = 2.0 * PI * freq / sfreq;
    let (re, im) = h.iter().enumerate().fold((0.0, 0.0), |(re, im), (k, &v)| {
        (re + v * (w * k as f64).cos(), im - v * (w * k as f64).sin())
    });
    (re * re + im * im).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_length_is_odd() {
        for l_freq in [0.5, 1.0, 2.0, 5.0] {
            let tb = auto_trans_bandwidth(l_freq);
            let n  = auto_filter_length(tb, 256.0);
            assert!(n % 2 == 1, "N={n} is even for l_freq={l_freq}");
        }
    }

    #[test]
    fn highpass_known_length_256hz() {
        // At 256 Hz / 0.5 Hz: MNE produces 1691 taps.
        let h = design_highpass(0.5, 256.0).unwrap();
        assert_eq!(h.len(), 1691, "expected 1691 taps, got {}", h.len());
    }

    #[test]
    fn bandpass_known_length_500hz() {
        // 0.5–45 Hz at 500 Hz: limited by the 0.5 Hz low transition → 3301 taps.
        let h = design_bandpass(0.5, 45.0, 500.0).unwrap();
        assert_eq!(h.len(), 3301);
    }

    #[test]
    fn bandpass_is_symmetric_with_zero_dc() {
        let h = design_bandpass(0.5, 45.0, 256.0).unwrap();
        let n = h.len();
        for i in 0..n / 2 {
            approx::assert_abs_diff_eq!(h[i], h[n - 1 - i], epsilon = 1e-12);
        }
        let dc: f64 = h.iter().sum();
        assert!(dc.abs() < 1e-9, "bandpass DC gain = {dc:.2e}");
    }

    #[test]
    fn bandpass_response_shape() {
        let sfreq = 256.0;
        let h = design_bandpass(0.5, 45.0, sfreq).unwrap();
        approx::assert_abs_diff_eq!(response_at(&h, 10.0, sfreq), 1.0, epsilon = 1e-2);
        approx::assert_abs_diff_eq!(response_at(&h, 30.0, sfreq), 1.0, epsilon = 1e-2);
        assert!(response_at(&h, 80.0, sfreq) < 1e-2);
    }

    #[test]
    fn h_freq_above_nyquist_becomes_highpass() {
        let bp = design_filter(Some(0.5), Some(200.0), 256.0).unwrap();
        let hp = design_highpass(0.5, 256.0).unwrap();
        assert_eq!(bp.len(), hp.len());
        for (a, b) in bp.iter().zip(hp.iter()) {
            approx::assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn inverted_band_rejected() {
        assert!(design_bandpass(40.0, 4.0, 256.0).is_err());
        assert!(design_filter(None, None, 256.0).is_err());
    }

    #[test]
    fn lowpass_dc_gain_unity() {
        let h = firwin(101, 10.0, 256.0).unwrap();
        let dc: f64 = h.iter().sum();
        approx::assert_abs_diff_eq!(dc, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn even_lowpass_length_is_an_error() {
        assert!(matches!(firwin(100, 10.0, 256.0), Err(ErdsError::InvalidFilter(_))));
        assert!(matches!(firwin(0, 10.0, 256.0), Err(ErdsError::InvalidFilter(_))));
    }
}
