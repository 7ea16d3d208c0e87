//! Raw EDF data reader.
//!
//! # Algorithm
//! 1. Parse the fixed header and the signal header block.
//! 2. Resolve `n_records == -1` from the file size and check the data region
//!    is complete.
//! 3. Drop `EDF Annotations` signals; all remaining signals must share one
//!    sampling rate.
//! 4. Read every data record into a `[n_chan, n_times]` array.
//!
//! # Calibration
//! ```text
//! volts[ch, t] = (gain[ch] × digital[ch, t] + offset[ch]) × unit_scale[ch]
//! gain   = (phys_max − phys_min) / (dig_max − dig_min)
//! offset = phys_max − gain × dig_max
//! ```
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use ndarray::Array2;

use super::header::{read_header, read_signal_headers, EdfHeader, EdfSignal};
use super::EdfError;
use crate::error::{ErdsError, Result};
use crate::recording::{ChannelInfo, ChannelKind, Recording};

/// Options applied when turning an EDF file into a [`Recording`].
#[derive(Debug, Clone, Default)]
pub struct EdfOptions {
    /// Infer channel kinds from label prefixes such as `"EEG Fp1"` or
    /// `"ECG ECG"` and strip the prefix (MNE `infer_types=True`).
    /// When off every data signal is EEG.
    pub infer_types: bool,
}

/// An opened EDF file: headers parsed, data not yet loaded.
#[derive(Debug, Clone)]
pub struct RawEdf {
    pub header: EdfHeader,
    /// All signals, annotations included, in file order.
    pub signals: Vec<EdfSignal>,
    /// Indices into `signals` of the data (non-annotation) signals.
    pub data_signals: Vec<usize>,
    pub sfreq: f64,
    pub path: PathBuf,
}

impl RawEdf {
    /// Bytes in one data record (all signals).
    pub fn record_bytes(&self) -> usize {
        self.signals.iter().map(|s| s.samples_per_record * 2).sum()
    }

    pub fn n_records(&self) -> usize {
        self.header.n_records.max(0) as usize
    }

    /// Samples per data-signal over the whole file.
    pub fn n_times(&self) -> usize {
        self.data_signals
            .first()
            .map(|&i| self.signals[i].samples_per_record * self.n_records())
            .unwrap_or(0)
    }

    pub fn duration_secs(&self) -> f64 {
        self.n_records() as f64 * self.header.record_duration
    }

    /// Raw labels of the data signals as stored in the file.
    pub fn labels(&self) -> Vec<&str> {
        self.data_signals.iter().map(|&i| self.signals[i].label.as_str()).collect()
    }

    /// Read every data signal into `[n_chan, n_times]` volts.
    pub fn read_all_data(&self) -> Result<Array2<f64>> {
        let n_ch = self.data_signals.len();
        let n_rec = self.n_records();
        let spr = self
            .data_signals
            .first()
            .map_or(0, |&i| self.signals[i].samples_per_record);
        let mut out = Array2::<f64>::zeros((n_ch, n_rec * spr));

        // Output row of every file signal, `None` for annotations.
        let mut row_of = vec![None; self.signals.len()];
        for (row, &sig) in self.data_signals.iter().enumerate() {
            row_of[sig] = Some(row);
        }
        let cal: Vec<(f64, f64)> = self
            .signals
            .iter()
            .map(|s| (s.gain() * s.unit_scale(), s.offset() * s.unit_scale()))
            .collect();

        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(self.header.header_bytes as u64))?;

        let mut record = vec![0u8; self.record_bytes()];
        for r in 0..n_rec {
            reader
                .read_exact(&mut record)
                .map_err(|source| EdfError::Io { field: "data record", source })?;
            let mut pos = 0;
            for (s, signal) in self.signals.iter().enumerate() {
                let n = signal.samples_per_record;
                if let Some(row) = row_of[s] {
                    let (gain, offset) = cal[s];
                    let t0 = r * spr;
                    for k in 0..n {
                        let b = pos + 2 * k;
                        let dig = i16::from_le_bytes([record[b], record[b + 1]]) as f64;
                        out[[row, t0 + k]] = gain * dig + offset;
                    }
                }
                pos += 2 * n;
            }
        }
        Ok(out)
    }

    /// Channel descriptors for the data signals, names normalized.
    pub fn channels(&self, opts: &EdfOptions) -> Result<Vec<ChannelInfo>> {
        let mut channels: Vec<ChannelInfo> = Vec::with_capacity(self.data_signals.len());
        for &i in &self.data_signals {
            let signal = &self.signals[i];
            let (kind, label) = if opts.infer_types {
                split_type_prefix(&signal.label)
            } else {
                (ChannelKind::Eeg, signal.label.as_str())
            };
            let name = normalize_channel_name(label);
            if channels.iter().any(|c| c.name == name) {
                return Err(EdfError::DuplicateChannel(name).into());
            }
            channels.push(ChannelInfo {
                name,
                kind,
                unit: signal.physical_dimension.clone(),
            });
        }
        Ok(channels)
    }

    /// Load the data and build a [`Recording`].
    pub fn to_recording(&self, opts: &EdfOptions) -> Result<Recording> {
        let channels = self.channels(opts)?;
        let data = self.read_all_data()?;
        Recording::new(self.sfreq, channels, data)
    }
}

/// Strip the delimiter dots (and padding) some EDF exporters leave around
/// labels: `"Fp1."` → `"Fp1"`. Labels without dots are returned unchanged.
pub fn normalize_channel_name(label: &str) -> String {
    label.trim().trim_matches('.').to_string()
}

/// `"EEG Fp1"` → `(Eeg, "Fp1")`; unknown or missing prefixes keep the label.
fn split_type_prefix(label: &str) -> (ChannelKind, &str) {
    if let Some((prefix, rest)) = label.trim().split_once(' ') {
        if let Some(kind) = ChannelKind::from_prefix(prefix) {
            let rest = rest.trim();
            if !rest.is_empty() {
                return (kind, rest);
            }
        }
    }
    (ChannelKind::Eeg, label)
}

// ── Reader entry points ───────────────────────────────────────────────────

/// Open an EDF file and parse its headers without loading samples.
pub fn open_raw<P: AsRef<Path>>(path: P) -> Result<RawEdf> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ErdsError::FileNotFound(path.to_path_buf()),
        _ => ErdsError::Io(e),
    })?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut header = read_header(&mut reader)?;
    let signals = read_signal_headers(&mut reader, header.n_signals)?;

    let record_bytes = signals
        .iter()
        .try_fold(0_u64, |acc, s| {
            (s.samples_per_record as u64).checked_mul(2)?.checked_add(acc)
        })
        .ok_or_else(|| EdfError::InvalidField {
            field: "samples per record",
            value: format!("{} signals", signals.len()),
        })?;
    if record_bytes == 0 {
        return Err(EdfError::NoSignals.into());
    }
    let data_bytes = file_len.saturating_sub(header.header_bytes as u64);
    if header.n_records < 0 {
        header.n_records = (data_bytes / record_bytes) as i64;
        log::debug!("n_records unknown in header, {} from file size", header.n_records);
    }
    let expected = (header.n_records as u64).checked_mul(record_bytes).ok_or_else(|| {
        EdfError::InvalidField {
            field: "number of records",
            value: format!("{} records of {record_bytes} bytes", header.n_records),
        }
    })?;
    if data_bytes < expected {
        return Err(EdfError::Truncated { expected, actual: data_bytes }.into());
    }

    if header.record_duration <= 0.0 {
        return Err(EdfError::InvalidField {
            field: "record duration",
            value: header.record_duration.to_string(),
        }
        .into());
    }

    let data_signals: Vec<usize> = signals
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_annotation())
        .map(|(i, _)| i)
        .collect();
    let first = *data_signals.first().ok_or(EdfError::NoSignals)?;
    let sfreq = signals[first].sfreq(header.record_duration);
    for &i in &data_signals {
        let s = &signals[i];
        if s.samples_per_record != signals[first].samples_per_record {
            return Err(EdfError::MixedSampleRates {
                label: s.label.clone(),
                sfreq: s.sfreq(header.record_duration),
                expected: sfreq,
            }
            .into());
        }
    }

    log::debug!(
        "opened {}: {} data signals @ {sfreq} Hz, {} records",
        path.display(),
        data_signals.len(),
        header.n_records
    );

    Ok(RawEdf {
        header,
        signals,
        data_signals,
        sfreq,
        path: path.to_path_buf(),
    })
}

/// Read a whole EDF file into a [`Recording`] with normalized channel names.
///
/// Mirrors `mne.io.read_raw_edf(path, preload=True)` followed by
/// `rename_channels(lambda x: x.strip("."))`.
pub fn read_edf<P: AsRef<Path>>(path: P, opts: &EdfOptions) -> Result<Recording> {
    let raw = open_raw(path)?;
    raw.to_recording(opts)
}
