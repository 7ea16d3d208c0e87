//! Error types shared by every pipeline stage.
use std::path::PathBuf;
use thiserror::Error;

use crate::edf::EdfError;

#[derive(Error, Debug)]
pub enum ErdsError {
    #[error("input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("EDF error: {0}")]
    Edf(#[from] EdfError),

    #[error(
        "subject id {0} is outside the supported range 0..={max}",
        max = crate::loader::MAX_SUBJECT
    )]
    InvalidSubject(u32),

    #[error("recording has no EEG channels")]
    NoEegChannels,

    #[error(
        "none of the requested channels {requested:?} exist in the recording \
         (available: {available:?})"
    )]
    NoChannelsAvailable {
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("invalid segment window: duration={duration} s, overlap={overlap} s")]
    InvalidWindow { duration: f64, overlap: f64 },

    #[error("recording of {recording:.3} s is shorter than one {duration} s segment")]
    NoSegments { recording: f64, duration: f64 },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid frequencies: {0}")]
    InvalidFrequencies(String),

    #[error("wavelet at {freq} Hz needs {wavelet_len} samples but segments have only {n_times}")]
    WaveletTooLong {
        freq: f64,
        wavelet_len: usize,
        n_times: usize,
    },

    #[error("axis mismatch: {0}")]
    AxisMismatch(String),

    #[error("group '{0}' has no subjects")]
    EmptyGroup(String),

    #[error("grouping file {}: {message}", path.display())]
    GroupFile { path: PathBuf, message: String },

    #[error("array file {}: {message}", path.display())]
    ArrayFile { path: PathBuf, message: String },

    #[error("plot error: {0}")]
    Plot(String),

    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ErdsError>;
