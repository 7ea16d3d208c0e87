/// Segmentation of recordings laid out like the arithmetic-task dataset.
mod common;

use approx::assert_abs_diff_eq;
use common::tones;
use erds::{segment, segment_with, SegmentConfig};

#[test]
fn dataset_sized_recordings() {
    // 180 s of rest and 60 s of task at 500 Hz, 30 s windows every 15 s.
    let cfg = SegmentConfig { duration: 30.0, overlap: 15.0 };
    let rest = tones(500.0, 180.0, &[("F3", 10.0, 10.0)]);
    let task = tones(500.0, 60.0, &[("F3", 10.0, 10.0)]);

    let r = segment_with(&rest, &cfg).unwrap();
    let t = segment_with(&task, &cfg).unwrap();
    // Last sample at 179.998 s and 59.998 s respectively.
    assert_eq!(r.n_segments(), 10);
    assert_eq!(t.n_segments(), 2);
    assert_eq!(r.n_times(), 15_001);
    assert_eq!(r.onsets().last().copied(), Some(135.0));
}

#[test]
fn one_extra_sample_adds_a_window() {
    let short = tones(100.0, 45.0, &[("F3", 1.0, 1.0)]);
    assert_eq!(segment(&short, 30.0, 15.0).unwrap().n_segments(), 1);

    let exact = tones(100.0, 45.01, &[("F3", 1.0, 1.0)]);
    assert_eq!(exact.n_times(), 4501);
    assert_eq!(segment(&exact, 30.0, 15.0).unwrap().n_segments(), 2);
}

#[test]
fn windows_copy_source_samples() {
    let rec = tones(64.0, 20.0, &[("F3", 3.0, 5.0), ("F4", 7.0, 2.0)]);
    let seg = segment(&rec, 4.0, 1.0).unwrap();
    assert_eq!(seg.ch_names, rec.ch_names());
    assert_eq!(seg.sfreq, 64.0);
    let times = seg.times();
    assert_abs_diff_eq!(times[times.len() - 1], 4.0);
    for (k, ev) in seg.events.iter().enumerate() {
        for c in 0..2 {
            for i in [0, 100, 256] {
                assert_eq!(seg.data[[k, c, i]], rec.data[[c, ev.sample + i]]);
            }
        }
    }
}
