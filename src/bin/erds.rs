use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use erds::edf::open_raw;
use erds::group::{group_figure_path, subject_figure_path};
use erds::io::array_path_for;
use erds::{
    analyze_groups, analyze_subject, plot_erds_map, write_erds_map, AnalysisConfig, EdfOptions,
    ErdsMap, FreqGrid, GroupPolicy, PlotOptions, SegmentConfig, TfrConfig,
};

#[derive(Parser)]
#[command(
    name = "erds",
    version,
    about = "EEG event-related (de)synchronization maps for the mental-arithmetic dataset",
    long_about = "Without a subcommand: analyse subject 0, then every group in --groups.\n\
                  Reads <data-dir>/Subject{NN}_1.edf (rest) and Subject{NN}_2.edf (task),\n\
                  writes PNG heat maps to <results-dir>."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    analysis: AnalysisArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Analyse one subject
    Subject {
        /// Subject id (0–35)
        subject: u32,
    },
    /// Average ERDS maps per group (needs --groups)
    Groups,
    /// Print the header and channels of an EDF file
    Info {
        file: PathBuf,
    },
}

#[derive(Args)]
struct AnalysisArgs {
    /// Directory with Subject{NN}_{1,2}.edf
    #[arg(long, default_value = "./EEG_arithmetic_task", global = true)]
    data_dir: PathBuf,

    /// Output directory for figures and arrays
    #[arg(long, default_value = "results", global = true)]
    results_dir: PathBuf,

    /// Channels to analyse (comma-separated); missing ones are skipped
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = ["F3", "F4", "F7", "F8"].map(String::from),
        global = true
    )]
    channels: Vec<String>,

    /// Segment length in seconds
    #[arg(long, default_value_t = 30.0, global = true)]
    duration: f64,

    /// Overlap between segments in seconds
    #[arg(long, default_value_t = 15.0, global = true)]
    overlap: f64,

    /// Lowest analysed frequency (Hz)
    #[arg(long, default_value_t = 4.0, global = true)]
    fmin: f64,

    /// Highest analysed frequency (Hz)
    #[arg(long, default_value_t = 40.0, global = true)]
    fmax: f64,

    /// Frequency step (Hz)
    #[arg(long, default_value_t = 1.0, global = true)]
    fstep: f64,

    /// Colour scale minimum (ERDS %)
    #[arg(long, default_value_t = -50.0, allow_negative_numbers = true, global = true)]
    vmin: f64,

    /// Colour scale maximum (ERDS %)
    #[arg(long, default_value_t = 50.0, global = true)]
    vmax: f64,

    /// Infer channel types from EDF label prefixes ("EEG Fp1", "ECG ECG")
    #[arg(long, global = true)]
    infer_types: bool,

    /// Also write every map as .safetensors next to its figure
    #[arg(long, global = true)]
    save_arrays: bool,

    /// CSV with a `subject,group` header defining the groups
    #[arg(long, global = true)]
    groups: Option<PathBuf>,
}

impl AnalysisArgs {
    fn to_config(&self) -> AnalysisConfig {
        let defaults = AnalysisConfig::default();
        let grid = FreqGrid { fmin: self.fmin, fmax: self.fmax, step: self.fstep };
        AnalysisConfig {
            data_dir: self.data_dir.clone(),
            results_dir: self.results_dir.clone(),
            channels: self.channels.clone(),
            edf: EdfOptions { infer_types: self.infer_types },
            segment: SegmentConfig { duration: self.duration, overlap: self.overlap },
            tfr: TfrConfig { freqs: grid.freqs(), ..TfrConfig::default() },
            plot: PlotOptions { vmin: self.vmin, vmax: self.vmax, title: None },
            save_arrays: self.save_arrays,
            ..defaults
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let cfg = cli.analysis.to_config();
    match cli.command {
        None => {
            run_subject(0, &cfg)?;
            match &cli.analysis.groups {
                Some(path) => run_groups(path, &cfg)?,
                None => log::warn!("no --groups file given, group analysis skipped"),
            }
        }
        Some(Command::Subject { subject }) => run_subject(subject, &cfg)?,
        Some(Command::Groups) => {
            let Some(path) = &cli.analysis.groups else {
                bail!("the groups command needs --groups <csv>");
            };
            run_groups(path, &cfg)?;
        }
        Some(Command::Info { file }) => print_info(&file)?,
    }
    Ok(())
}

fn run_subject(subject: u32, cfg: &AnalysisConfig) -> Result<()> {
    std::fs::create_dir_all(&cfg.results_dir)
        .with_context(|| format!("creating {}", cfg.results_dir.display()))?;
    let res = analyze_subject(subject, cfg)
        .with_context(|| format!("analysing subject {subject:02}"))?;
    let path = subject_figure_path(&cfg.results_dir, subject);
    save_map(&res.map, &path, format!("Subject {subject:02} ERDS map"), cfg)?;
    println!("subject {subject:02} → {}", path.display());
    Ok(())
}

fn run_groups(groups_csv: &Path, cfg: &AnalysisConfig) -> Result<()> {
    let policy = GroupPolicy::from_csv(groups_csv)
        .with_context(|| format!("reading groups from {}", groups_csv.display()))?;
    std::fs::create_dir_all(&cfg.results_dir)
        .with_context(|| format!("creating {}", cfg.results_dir.display()))?;
    let groups = analyze_groups(&policy, cfg).context("group analysis")?;
    for (label, g) in &groups {
        let path = group_figure_path(&cfg.results_dir, label);
        save_map(&g.map, &path, format!("Group {label} mean ERDS map"), cfg)?;
        println!("group {label} ({} subjects) → {}", g.subjects.len(), path.display());
    }
    Ok(())
}

fn save_map(map: &ErdsMap, path: &Path, title: String, cfg: &AnalysisConfig) -> Result<()> {
    let opts = PlotOptions { title: Some(title), ..cfg.plot.clone() };
    plot_erds_map(map, &opts, &cfg.render, path)
        .with_context(|| format!("plotting {}", path.display()))?;
    if cfg.save_arrays {
        let arrays = array_path_for(path);
        write_erds_map(map, &arrays).with_context(|| format!("writing {}", arrays.display()))?;
    }
    Ok(())
}

fn print_info(file: &Path) -> Result<()> {
    let raw = open_raw(file).with_context(|| format!("opening {}", file.display()))?;
    let h = &raw.header;
    println!("file:       {}", raw.path.display());
    println!("format:     {}", if h.is_edf_plus() { "EDF+" } else { "EDF" });
    println!("patient:    {}", h.patient_id);
    println!("recording:  {}", h.recording_id);
    println!("start:      {} {}", h.start_date, h.start_time);
    println!("records:    {} × {} s", raw.n_records(), h.record_duration);
    println!("duration:   {:.3} s", raw.duration_secs());
    println!("sfreq:      {} Hz", raw.sfreq);
    println!("signals:    {} ({} data)", raw.signals.len(), raw.data_signals.len());
    for (i, s) in raw.signals.iter().enumerate() {
        println!(
            "  {i:>3}  {:<16} {:<6} {:>5} samples/record  [{}, {}]{}",
            s.label,
            s.physical_dimension,
            s.samples_per_record,
            s.physical_min,
            s.physical_max,
            if s.is_annotation() { "  (annotations)" } else { "" }
        );
    }
    Ok(())
}
