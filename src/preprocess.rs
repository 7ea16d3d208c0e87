//! Channel selection and band-pass filtering.
//!
//! Equivalent to `raw.pick_types(eeg=True); raw.filter(l_freq, h_freq)` in
//! MNE, except that the input recording is left untouched and a new one is
//! returned.
use crate::config::FilterConfig;
use crate::error::Result;
use crate::filter::{apply_fir_zero_phase, design_filter};
use crate::recording::Recording;

/// Keep EEG channels and apply the zero-phase FIR band-pass.
pub fn preprocess(raw: &Recording, cfg: &FilterConfig) -> Result<Recording> {
    let eeg = raw.pick_eeg()?;
    let dropped = raw.n_channels() - eeg.n_channels();
    if dropped > 0 {
        log::debug!("dropped {dropped} non-EEG channels");
    }
    let h = design_filter(Some(cfg.l_freq), Some(cfg.h_freq), eeg.sfreq)?;
    log::info!(
        "band-pass {}–{} Hz, {} taps, {} channels",
        cfg.l_freq,
        cfg.h_freq,
        h.len(),
        eeg.n_channels()
    );
    let filtered = apply_fir_zero_phase(&eeg.data, &h)?;
    eeg.with_data(filtered)
}
