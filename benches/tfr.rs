use std::f64::consts::PI;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use erds::{
    dpss_windows, preprocess, segment, tfr_multitaper, ChannelInfo, FilterConfig, Recording,
    TfrConfig,
};
use ndarray::Array2;

/// Four channels of 10 Hz + 20 Hz at 500 Hz, `secs` long.
fn recording(secs: f64) -> Recording {
    let sfreq = 500.0;
    let n = (secs * sfreq) as usize;
    let data = Array2::from_shape_fn((4, n), |(c, i)| {
        let t = i as f64 / sfreq;
        1e-5 * (2.0 * PI * 10.0 * t + c as f64).sin() + 5e-6 * (2.0 * PI * 20.0 * t).sin()
    });
    let channels = ["F3", "F4", "F7", "F8"].into_iter().map(ChannelInfo::eeg).collect();
    Recording::new(sfreq, channels, data).unwrap()
}

fn bench_dpss(c: &mut Criterion) {
    c.bench_function("dpss_windows N=250 NW=2 K=3", |b| {
        b.iter(|| {
            let d = dpss_windows(black_box(250), 2.0, 3, false).unwrap();
            black_box(d.concentrations[0])
        })
    });
}

fn bench_preprocess(c: &mut Criterion) {
    let rec = recording(60.0);
    c.bench_function("preprocess [4×30000] 0.5–45 Hz", |b| {
        b.iter(|| {
            let out = preprocess(black_box(&rec), &FilterConfig::default()).unwrap();
            black_box(out.data[[0, 0]])
        })
    });
}

fn bench_tfr_multitaper(c: &mut Criterion) {
    let seg = segment(&recording(60.0), 30.0, 15.0).unwrap();
    let cfg = TfrConfig::default();
    let mut group = c.benchmark_group("tfr_multitaper");
    group.sample_size(10);
    group.bench_function("2 segments × 4 ch × 37 freqs, 30 s @ 500 Hz", |b| {
        b.iter(|| {
            let p = tfr_multitaper(black_box(&seg), &cfg).unwrap();
            black_box(p.data[[0, 6, 100]])
        })
    });
    group.finish();
}

criterion_group!(benches, bench_dpss, bench_preprocess, bench_tfr_multitaper);
criterion_main!(benches);
