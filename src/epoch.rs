//! Fixed-length, optionally overlapping segmentation.
//!
//! Cuts a continuous [`Recording`] into windows of `duration` seconds whose
//! starts are `duration − overlap` seconds apart, the way
//! `mne.Epochs(raw, events, tmin=0, tmax=duration, baseline=None)` does with
//! one synthetic event per window start. Windows include both end points, so
//! each has `round(duration · sfreq) + 1` samples. No baseline correction.
use ndarray::{s, Array1, Array3};

use crate::config::SegmentConfig;
use crate::error::{ErdsError, Result};
use crate::recording::Recording;

/// Event id given to every synthetic window marker.
pub const SEGMENT_EVENT_ID: i32 = 1;

/// Synthetic marker at the start of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Sample index of the window start.
    pub sample: usize,
    pub id: i32,
}

/// Equal-length windows cut from one recording.
#[derive(Debug, Clone)]
pub struct Segments {
    /// `[E, C, S]`.
    pub data: Array3<f64>,
    pub events: Vec<Event>,
    pub sfreq: f64,
    pub ch_names: Vec<String>,
    pub duration: f64,
    pub overlap: f64,
}

impl Segments {
    #[inline]
    pub fn n_segments(&self) -> usize {
        self.data.shape()[0]
    }

    #[inline]
    pub fn n_channels(&self) -> usize {
        self.data.shape()[1]
    }

    #[inline]
    pub fn n_times(&self) -> usize {
        self.data.shape()[2]
    }

    /// Time of each sample within a window, `0 … duration`.
    pub fn times(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.n_times(), |i| i as f64 / self.sfreq)
    }

    /// Window start times in seconds.
    pub fn onsets(&self) -> Vec<f64> {
        self.events.iter().map(|e| e.sample as f64 / self.sfreq).collect()
    }
}

/// Start samples of every window of `win` samples, one every `step_secs`
/// seconds, in a recording whose last sample index is `last`.
///
/// Each start is rounded from its own time `k · step_secs` so that rounding
/// never accumulates. The count comes from the time formula; a start that
/// rounds past the last full window is dropped.
fn window_starts(last: usize, win: usize, step_secs: f64, sfreq: f64) -> Vec<usize> {
    if last < win {
        return vec![];
    }
    let step = step_secs * sfreq;
    let n = ((last - win) as f64 / step + 1e-9).floor() as usize + 1;
    (0..n)
        .map(|k| (k as f64 * step_secs * sfreq).round() as usize)
        .filter(|&start| start + win <= last)
        .collect()
}

/// Segment with a [`SegmentConfig`].
pub fn segment_with(rec: &Recording, cfg: &SegmentConfig) -> Result<Segments> {
    segment(rec, cfg.duration, cfg.overlap)
}

/// Cut `rec` into windows of `duration` seconds overlapping by `overlap`.
///
/// Window `k` starts at `k · (duration − overlap)` seconds; the last window
/// ends at or before the last sample. The count is
/// `floor((L − duration) / (duration − overlap)) + 1` with `L` the time of
/// the last sample.
///
/// # Errors
///
/// * [`ErdsError::InvalidWindow`] if `duration ≤ 0`, `overlap < 0` or
///   `overlap ≥ duration`.
/// * [`ErdsError::NoSegments`] if the recording is shorter than one window.
pub fn segment(rec: &Recording, duration: f64, overlap: f64) -> Result<Segments> {
    let step_secs = duration - overlap;
    let finite = duration.is_finite() && overlap.is_finite();
    if !finite || duration <= 0.0 || overlap < 0.0 || step_secs <= 0.0 {
        return Err(ErdsError::InvalidWindow { duration, overlap });
    }

    let win = (duration * rec.sfreq).round() as usize;
    if win == 0 || (step_secs * rec.sfreq).round() == 0.0 {
        return Err(ErdsError::InvalidWindow { duration, overlap });
    }
    let n_times = win + 1;

    let starts = window_starts(rec.n_times().saturating_sub(1), win, step_secs, rec.sfreq);
    let n_seg = starts.len();
    if n_seg == 0 {
        return Err(ErdsError::NoSegments {
            recording: rec.duration_secs(),
            duration,
        });
    }

    let n_ch = rec.n_channels();
    let mut data = Array3::<f64>::zeros((n_seg, n_ch, n_times));
    let mut events = Vec::with_capacity(n_seg);
    for (k, &start) in starts.iter().enumerate() {
        data.slice_mut(s![k, .., ..])
            .assign(&rec.data.slice(s![.., start..start + n_times]));
        events.push(Event { sample: start, id: SEGMENT_EVENT_ID });
    }

    log::debug!("{n_seg} segments of {duration} s ({n_times} samples), step {step_secs} s");

    Ok(Segments {
        data,
        events,
        sfreq: rec.sfreq,
        ch_names: rec.ch_names(),
        duration,
        overlap,
    })
}
