/// Shared helpers: synthetic recordings and on-disk subject fixtures.
use erds::{write_edf, ChannelInfo, Recording};
use ndarray::Array2;
use std::f64::consts::PI;
use std::path::Path;

/// Volts per microvolt.
pub const UV: f64 = 1e-6;

#[allow(unused)]
/// One sinusoid per channel: `(name, freq_hz, amplitude_uv)`.
pub fn tones(sfreq: f64, secs: f64, signals: &[(&str, f64, f64)]) -> Recording {
    let n = (sfreq * secs).round() as usize;
    let data = Array2::from_shape_fn((signals.len(), n), |(c, i)| {
        let (_, f, a) = signals[c];
        a * UV * (2.0 * PI * f * i as f64 / sfreq).sin()
    });
    let channels = signals.iter().map(|(name, _, _)| ChannelInfo::eeg(*name)).collect();
    Recording::new(sfreq, channels, data).unwrap()
}

#[allow(unused)]
/// Write `Subject{NN}_1.edf` (rest) and `Subject{NN}_2.edf` (task) into `dir`.
pub fn write_subject(dir: &Path, subject: u32, rest: &Recording, task: &Recording) {
    write_edf(dir.join(format!("Subject{subject:02}_1.edf")), rest).unwrap();
    write_edf(dir.join(format!("Subject{subject:02}_2.edf")), task).unwrap();
}

#[allow(unused)]
/// Median of the finite values in `xs`.
pub fn median(xs: impl IntoIterator<Item = f64>) -> f64 {
    let mut v: Vec<f64> = xs.into_iter().filter(|x| x.is_finite()).collect();
    assert!(!v.is_empty(), "no finite values");
    v.sort_by(f64::total_cmp);
    v[v.len() / 2]
}
