//! # erds: EEG event-related (de)synchronization maps
//!
//! `erds` measures how oscillatory EEG power changes while a subject performs
//! a task (mental arithmetic) relative to rest. For every channel, frequency
//! and time point it reports
//!
//! ```text
//! ERDS = (P_task − mean_t P_rest) / mean_t P_rest · 100   [%]
//! ```
//!
//! Negative values are desynchronization (ERD), positive ones
//! synchronization (ERS). The DSP follows [MNE-Python](https://mne.tools)
//! conventions: firwin band-pass design, overlap-add zero-phase filtering,
//! inclusive-endpoint epochs and DPSS multitaper wavelets.
//!
//! ## Pipeline overview
//!
//! ```text
//! Subject{NN}_1.edf (rest)      Subject{NN}_2.edf (task)
//!   │                               │
//!   ├─ edf::read_edf()              native EDF/EDF+ reader, volts
//!   ├─ preprocess()                 EEG only, 0.5–45 Hz zero-phase FIR
//!   ├─ Recording::pick_available()  F3 F4 F7 F8 (missing ones skipped)
//!   ├─ epoch::segment()             30 s windows, 15 s overlap
//!   ├─ tfr::tfr_multitaper()        4–40 Hz, n_cycles = f/2, 3 tapers, decim 2
//!   └──────────────┬────────────────┘
//!                  ├─ erds::compute_erds()     [C, F, T] percent
//!                  ├─ plot::plot_erds_map()    results/subject{NN}_erds.png
//!                  └─ group::average_maps()    results/group_{label}_erds.png
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use erds::{analyze_subject, plot_erds_map, AnalysisConfig, PlotOptions};
//!
//! let cfg = AnalysisConfig::default();
//! let res = analyze_subject(0, &cfg).unwrap();
//! let opts = PlotOptions { title: Some("Subject 00 ERDS map".into()), ..cfg.plot.clone() };
//! plot_erds_map(&res.map, &opts, &cfg.render, "results/subject00_erds.png").unwrap();
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use erds::{compute_erds, preprocess, read_edf, segment, tfr_multitaper};
//! use erds::{EdfOptions, FilterConfig, TfrConfig};
//!
//! let rest = read_edf("Subject00_1.edf", &EdfOptions::default()).unwrap();
//! let task = read_edf("Subject00_2.edf", &EdfOptions::default()).unwrap();
//!
//! let rest = preprocess(&rest, &FilterConfig::default()).unwrap();
//! let task = preprocess(&task, &FilterConfig::default()).unwrap();
//!
//! let tfr_cfg = TfrConfig::default();
//! let p_rest = tfr_multitaper(&segment(&rest, 30.0, 15.0).unwrap(), &tfr_cfg).unwrap();
//! let p_task = tfr_multitaper(&segment(&task, 30.0, 15.0).unwrap(), &tfr_cfg).unwrap();
//!
//! let map = compute_erds(&p_task, &p_rest).unwrap();
//! println!("{:?}", map.data.dim()); // [C, 37, T]
//! ```

pub mod config;
pub mod edf;
pub mod epoch;
pub mod erds;
pub mod error;
pub mod filter;
pub mod group;
pub mod io;
pub mod loader;
pub mod plot;
pub mod preprocess;
pub mod recording;
pub mod tfr;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{
    AnalysisConfig, FilterConfig, FreqGrid, PlotOptions, RenderConfig, SegmentConfig, TfrConfig,
};

// error
pub use error::{ErdsError, Result};

// recording + loading
pub use edf::{read_edf, write_edf, EdfError, EdfOptions};
pub use loader::{discover_subjects, load_subject, SubjectPaths, MAX_SUBJECT};
pub use recording::{ChannelInfo, ChannelKind, Recording};

// signal processing
pub use epoch::{segment, segment_with, Event, Segments};
pub use filter::{apply_fir_zero_phase, design_filter};
pub use preprocess::preprocess;
pub use tfr::{dpss_windows, make_dpss_wavelets, tfr_multitaper, Tfr};

// ERDS, groups, output
pub use erds::{compute_erds, ErdsMap};
pub use group::{
    analyze_groups, analyze_subject, average_maps, erds_from_recordings, GroupErds, GroupPolicy,
    SubjectErds,
};
pub use io::{read_erds_map, write_erds_map};
pub use plot::plot_erds_map;
