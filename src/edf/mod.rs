//! EDF / EDF+ file reader (and a minimal writer).
//!
//! Reads `.edf` recordings the way `mne.io.read_raw_edf(preload=True)` does:
//! physical calibration, unit scaling to volts, annotation signals skipped.
//!
//! # Quick start
//! ```no_run
//! use erds::edf::{read_edf, EdfOptions};
//!
//! let rec = read_edf("EEG_arithmetic_task/Subject00_1.edf", &EdfOptions::default()).unwrap();
//! println!("{} channels @ {} Hz", rec.n_channels(), rec.sfreq);
//! ```
pub mod header;
pub mod raw;
pub mod writer;

use thiserror::Error;

pub use header::{read_header, read_signal_headers, EdfHeader, EdfSignal, ANNOTATION_LABEL};
pub use raw::{normalize_channel_name, open_raw, read_edf, EdfOptions, RawEdf};
pub use writer::write_edf;

#[derive(Error, Debug)]
pub enum EdfError {
    #[error("failed to read {field}: {source}")]
    Io {
        field: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {field}: '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("file has {actual} data bytes, header promises {expected}")]
    Truncated { expected: u64, actual: u64 },

    #[error("signal '{label}' is sampled at {sfreq} Hz, expected {expected} Hz")]
    MixedSampleRates { label: String, sfreq: f64, expected: f64 },

    #[error("duplicate channel name '{0}' after normalization")]
    DuplicateChannel(String),

    #[error("file contains no data signals")]
    NoSignals,

    #[error("cannot write EDF: {0}")]
    Write(String),
}
