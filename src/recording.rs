//! Continuous multichannel recording, the value passed between the loader,
//! the preprocessor and the segmenter.
//!
//! A [`Recording`] is never mutated by the pipeline: channel picking and
//! filtering build a new value, so the rest and task recordings of a subject
//! can never alias each other.
use ndarray::{Array1, Array2, Axis};

use crate::error::{ErdsError, Result};

/// Channel type, as MNE assigns it when reading an EDF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Eeg,
    Eog,
    Ecg,
    Emg,
    Stim,
    Misc,
}

impl ChannelKind {
    /// Map an EDF label type prefix (`"EEG"`, `"ECG"`, …) to a kind.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_uppercase().as_str() {
            "EEG" => Some(Self::Eeg),
            "EOG" => Some(Self::Eog),
            "ECG" | "EKG" => Some(Self::Ecg),
            "EMG" => Some(Self::Emg),
            "STIM" | "STATUS" | "TRIGGER" => Some(Self::Stim),
            "MISC" | "RESP" | "TEMP" | "SAO2" => Some(Self::Misc),
            _ => None,
        }
    }

    /// Electrophysiological scalp channel.
    pub fn is_eeg(self) -> bool {
        self == Self::Eeg
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub name: String,
    pub kind: ChannelKind,
    /// Physical dimension as written in the file (`"uV"`, `"mV"`, …).
    pub unit: String,
}

impl ChannelInfo {
    pub fn eeg(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Eeg,
            unit: "V".into(),
        }
    }
}

/// A continuous recording: `data` is `[C, T]` in volts.
#[derive(Debug, Clone)]
pub struct Recording {
    pub sfreq: f64,
    pub channels: Vec<ChannelInfo>,
    pub data: Array2<f64>,
}

impl Recording {
    /// Build a recording, checking that `data` has one row per channel.
    pub fn new(sfreq: f64, channels: Vec<ChannelInfo>, data: Array2<f64>) -> Result<Self> {
        if data.nrows() != channels.len() {
            return Err(ErdsError::AxisMismatch(format!(
                "{} channel descriptors for {} data rows",
                channels.len(),
                data.nrows()
            )));
        }
        if !sfreq.is_finite() || sfreq <= 0.0 {
            return Err(ErdsError::InvalidFrequencies(format!(
                "sampling rate must be positive, got {sfreq}"
            )));
        }
        Ok(Self { sfreq, channels, data })
    }

    #[inline]
    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn n_times(&self) -> usize {
        self.data.ncols()
    }

    /// Time of the last sample in seconds (MNE's `raw.times[-1]`).
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.n_times().saturating_sub(1) as f64 / self.sfreq
    }

    pub fn times(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.n_times(), |i| i as f64 / self.sfreq)
    }

    pub fn ch_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }

    /// New recording holding only the channels at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Recording {
        Recording {
            sfreq: self.sfreq,
            channels: indices.iter().map(|&i| self.channels[i].clone()).collect(),
            data: self.data.select(Axis(0), indices),
        }
    }

    /// Keep only EEG channels (MNE `pick_types(eeg=True)`).
    pub fn pick_eeg(&self) -> Result<Recording> {
        let idx: Vec<usize> = self
            .channels
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind.is_eeg())
            .map(|(i, _)| i)
            .collect();
        if idx.is_empty() {
            return Err(ErdsError::NoEegChannels);
        }
        Ok(self.select(&idx))
    }

    /// Keep the requested channels that exist, in the requested order.
    ///
    /// Missing names are skipped; if none exist the call fails with
    /// [`ErdsError::NoChannelsAvailable`].
    pub fn pick_available(&self, names: &[String]) -> Result<Recording> {
        let mut idx = Vec::with_capacity(names.len());
        for name in names {
            match self.channel_index(name) {
                Some(i) if !idx.contains(&i) => idx.push(i),
                Some(_) => {}
                None => log::debug!("channel {name} not in recording, skipped"),
            }
        }
        if idx.is_empty() {
            return Err(ErdsError::NoChannelsAvailable {
                requested: names.to_vec(),
                available: self.ch_names(),
            });
        }
        Ok(self.select(&idx))
    }

    /// Same channels and rate, new sample matrix.
    pub fn with_data(&self, data: Array2<f64>) -> Result<Recording> {
        Recording::new(self.sfreq, self.channels.clone(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec() -> Recording {
        let channels = vec![
            ChannelInfo::eeg("Fp1"),
            ChannelInfo { name: "ECG".into(), kind: ChannelKind::Ecg, unit: "uV".into() },
            ChannelInfo::eeg("F3"),
        ];
        let data = Array2::from_shape_fn((3, 11), |(c, t)| (c * 100 + t) as f64);
        Recording::new(10.0, channels, data).unwrap()
    }

    #[test]
    fn duration_is_last_sample_time() {
        approx::assert_abs_diff_eq!(rec().duration_secs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn pick_eeg_drops_ecg() {
        let r = rec().pick_eeg().unwrap();
        assert_eq!(r.ch_names(), vec!["Fp1", "F3"]);
        assert_eq!(r.data[[1, 0]], 200.0);
    }

    #[test]
    fn pick_available_follows_requested_order() {
        let names = vec!["F3".to_string(), "Cz".to_string(), "Fp1".to_string()];
        let r = rec().pick_available(&names).unwrap();
        assert_eq!(r.ch_names(), vec!["F3", "Fp1"]);
        assert_eq!(r.data[[0, 3]], 203.0);
    }

    #[test]
    fn pick_available_none_is_error() {
        let names = vec!["O1".to_string()];
        assert!(matches!(
            rec().pick_available(&names),
            Err(ErdsError::NoChannelsAvailable { .. })
        ));
    }

    #[test]
    fn mismatched_rows_rejected() {
        let data = Array2::zeros((2, 5));
        assert!(Recording::new(10.0, vec![ChannelInfo::eeg("A")], data).is_err());
    }
}
