//! Analysis configuration.
//!
//! Every stage has its own plain config struct with `pub` fields and a
//! `Default` impl; [`AnalysisConfig`] bundles them for the subject and group
//! runs. Construct variants with struct-update syntax:
//!
//! ```
//! use erds::{AnalysisConfig, SegmentConfig};
//!
//! let cfg = AnalysisConfig {
//!     segment: SegmentConfig { duration: 20.0, overlap: 10.0 },
//!     ..AnalysisConfig::default()
//! };
//! assert_eq!(cfg.channels, ["F3", "F4", "F7", "F8"]);
//! ```
use std::path::PathBuf;

use crate::edf::EdfOptions;

/// Band-pass applied by the preprocessor.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    /// High-pass edge in Hz. Default: `0.5`.
    pub l_freq: f64,
    /// Low-pass edge in Hz. Dropped with a warning if at or above Nyquist.
    /// Default: `45.0`.
    pub h_freq: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { l_freq: 0.5, h_freq: 45.0 }
    }
}

/// Window layout used by the segmenter.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentConfig {
    /// Window length in seconds. Default: `60.0`.
    pub duration: f64,
    /// Seconds shared by consecutive windows; must be `< duration`.
    /// Default: `0.0`.
    pub overlap: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self { duration: 60.0, overlap: 0.0 }
    }
}

impl SegmentConfig {
    /// Distance between consecutive window starts, `duration − overlap`.
    pub fn step(&self) -> f64 {
        self.duration - self.overlap
    }
}

/// Evenly spaced frequency grid, both ends inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct FreqGrid {
    pub fmin: f64,
    pub fmax: f64,
    pub step: f64,
}

impl Default for FreqGrid {
    /// 4–40 Hz in 1 Hz steps (37 frequencies).
    fn default() -> Self {
        Self { fmin: 4.0, fmax: 40.0, step: 1.0 }
    }
}

impl FreqGrid {
    /// Materialise the grid.
    ///
    /// ```
    /// use erds::FreqGrid;
    /// let f = FreqGrid::default().freqs();
    /// assert_eq!(f.len(), 37);
    /// assert_eq!((f[0], f[36]), (4.0, 40.0));
    /// ```
    pub fn freqs(&self) -> Vec<f64> {
        if self.step <= 0.0 || self.fmax < self.fmin {
            return vec![];
        }
        let n = ((self.fmax - self.fmin) / self.step + 1e-9).floor() as usize + 1;
        (0..n).map(|k| self.fmin + k as f64 * self.step).collect()
    }
}

/// Multitaper time-frequency settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TfrConfig {
    /// Frequencies of interest in Hz. Default: 4–40 Hz, 1 Hz steps.
    pub freqs: Vec<f64>,
    /// Cycles per frequency, either one value for all or one per frequency.
    /// `None` uses `freq / 2`.
    pub n_cycles: Option<Vec<f64>>,
    /// Time-bandwidth product; `floor(tb − 1)` tapers are used.
    /// Default: `4.0` (3 tapers).
    pub time_bandwidth: f64,
    /// Keep every `decim`-th time sample of the transform. Default: `2`.
    pub decim: usize,
    /// Remove the mean of every wavelet before normalisation. Default: `true`.
    pub zero_mean: bool,
}

impl Default for TfrConfig {
    fn default() -> Self {
        Self {
            freqs: FreqGrid::default().freqs(),
            n_cycles: None,
            time_bandwidth: 4.0,
            decim: 2,
            zero_mean: true,
        }
    }
}

impl TfrConfig {
    /// Cycle count for every frequency.
    pub fn cycles(&self) -> Vec<f64> {
        match &self.n_cycles {
            None => self.freqs.iter().map(|f| f / 2.0).collect(),
            Some(c) if c.len() == 1 => vec![c[0]; self.freqs.len()],
            Some(c) => c.clone(),
        }
    }
}

/// Per-figure plot options.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
    /// Lower end of the diverging colour scale (ERDS %). Default: `-100`.
    pub vmin: f64,
    /// Upper end of the colour scale. Default: `100`.
    pub vmax: f64,
    /// Figure title drawn above all panels.
    pub title: Option<String>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self { vmin: -100.0, vmax: 100.0, title: None }
    }
}

/// Rendering style, passed explicitly to every plot call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub font_family: String,
    pub title_font_size: u32,
    pub caption_font_size: u32,
    pub label_font_size: u32,
    /// Pixel size of one channel panel (colour bar included).
    pub panel_width: u32,
    pub panel_height: u32,
    /// Height reserved for the figure title.
    pub title_height: u32,
    pub background: [u8; 3],
    /// Colour for cells whose ERDS value is not finite.
    pub nan_color: [u8; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_family: "sans-serif".into(),
            title_font_size: 30,
            caption_font_size: 22,
            label_font_size: 16,
            panel_width: 1200,
            panel_height: 400,
            title_height: 50,
            background: [255, 255, 255],
            nan_color: [160, 160, 160],
        }
    }
}

/// Everything a subject or group analysis needs.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Directory holding `Subject{NN}_{1,2}.edf`. Default: `./EEG_arithmetic_task`.
    pub data_dir: PathBuf,
    /// Where figures (and arrays) are written. Default: `results`.
    pub results_dir: PathBuf,
    /// Channels to analyse; missing ones are skipped. Default: `F3 F4 F7 F8`.
    pub channels: Vec<String>,
    pub edf: EdfOptions,
    pub filter: FilterConfig,
    /// Default: 30 s windows with 15 s overlap.
    pub segment: SegmentConfig,
    pub tfr: TfrConfig,
    /// Default: colour scale ±50 %.
    pub plot: PlotOptions,
    pub render: RenderConfig,
    /// Also write each map as `.safetensors`.
    pub save_arrays: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./EEG_arithmetic_task"),
            results_dir: PathBuf::from("results"),
            channels: ["F3", "F4", "F7", "F8"].iter().map(|s| s.to_string()).collect(),
            edf: EdfOptions::default(),
            filter: FilterConfig::default(),
            segment: SegmentConfig { duration: 30.0, overlap: 15.0 },
            tfr: TfrConfig::default(),
            plot: PlotOptions { vmin: -50.0, vmax: 50.0, title: None },
            render: RenderConfig::default(),
            save_arrays: false,
        }
    }
}
