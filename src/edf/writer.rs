//! Minimal EDF writer: one-second data records, 16-bit samples, µV.
//!
//! Used to export recordings and to build fixtures for tests and benchmarks.
//! Physical bounds are whole microvolts. Values that do not fit their header
//! field are rejected rather than cut.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::EdfError;
use crate::error::Result;
use crate::recording::Recording;

const DIGITAL_MIN: i32 = -32768;
const DIGITAL_MAX: i32 = 32767;

fn write_field<W: Write>(w: &mut W, text: &str, size: usize) -> Result<()> {
    let bytes = text.as_bytes();
    if bytes.len() > size {
        return Err(EdfError::Write(format!("'{text}' does not fit a {size}-byte field")).into());
    }
    let mut buf = vec![b' '; size];
    buf[..bytes.len()].copy_from_slice(bytes);
    w.write_all(&buf)?;
    Ok(())
}

/// Write `rec` as an EDF file with 1 s records.
///
/// The sampling rate must be a whole number of Hz. A trailing partial record
/// is padded by repeating the last sample.
///
/// # Errors
///
/// [`EdfError::Write`] for an empty recording, a fractional sampling rate,
/// non-finite samples, or a header value wider than its field (for example
/// physical bounds beyond ±9999999 µV). Checks run before the file is created.
pub fn write_edf<P: AsRef<Path>>(path: P, rec: &Recording) -> Result<()> {
    if rec.sfreq.fract() != 0.0 {
        let msg = format!("sampling rate {} Hz is not integral", rec.sfreq);
        return Err(EdfError::Write(msg).into());
    }
    let ns = rec.n_channels();
    if ns == 0 || rec.n_times() == 0 {
        return Err(EdfError::Write("empty recording".into()).into());
    }
    if let Some(c) = rec.data.rows().into_iter().position(|r| r.iter().any(|v| !v.is_finite())) {
        let msg = format!("channel {} has non-finite samples", rec.channels[c].name);
        return Err(EdfError::Write(msg).into());
    }
    let spr = rec.sfreq as usize;
    let n_records = rec.n_times().div_ceil(spr);

    // Bounds in µV, widened to whole numbers.
    let bounds: Vec<(f64, f64)> = rec
        .data
        .rows()
        .into_iter()
        .map(|row| {
            let lo = row.iter().cloned().fold(f64::INFINITY, f64::min) * 1e6;
            let hi = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max) * 1e6;
            (lo.floor() - 1.0, hi.ceil() + 1.0)
        })
        .collect();
    let bounds_text: Vec<(String, String)> =
        bounds.iter().map(|(lo, hi)| (format!("{lo}"), format!("{hi}"))).collect();
    let too_wide = |t: &String| t.len() > 8;
    if let Some(c) = bounds_text.iter().position(|(lo, hi)| too_wide(lo) || too_wide(hi)) {
        let (lo, hi) = &bounds_text[c];
        let msg = format!(
            "channel {}: physical range {lo}..{hi} uV does not fit 8 characters",
            rec.channels[c].name
        );
        return Err(EdfError::Write(msg).into());
    }

    let mut w = BufWriter::new(File::create(path.as_ref())?);
    write_field(&mut w, "0", 8)?;
    write_field(&mut w, "X X X X", 80)?;
    write_field(&mut w, "Startdate X X X X", 80)?;
    write_field(&mut w, "01.01.00", 8)?;
    write_field(&mut w, "00.00.00", 8)?;
    write_field(&mut w, &(256 + 256 * ns).to_string(), 8)?;
    write_field(&mut w, "", 44)?;
    write_field(&mut w, &n_records.to_string(), 8)?;
    write_field(&mut w, "1", 8)?;
    write_field(&mut w, &ns.to_string(), 4)?;

    for ch in &rec.channels {
        write_field(&mut w, &ch.name, 16)?;
    }
    for _ in 0..ns {
        write_field(&mut w, "", 80)?;
    }
    for _ in 0..ns {
        write_field(&mut w, "uV", 8)?;
    }
    for (lo, _) in &bounds_text {
        write_field(&mut w, lo, 8)?;
    }
    for (_, hi) in &bounds_text {
        write_field(&mut w, hi, 8)?;
    }
    for _ in 0..ns {
        write_field(&mut w, &DIGITAL_MIN.to_string(), 8)?;
    }
    for _ in 0..ns {
        write_field(&mut w, &DIGITAL_MAX.to_string(), 8)?;
    }
    for _ in 0..ns {
        write_field(&mut w, "", 80)?;
    }
    for _ in 0..ns {
        write_field(&mut w, &spr.to_string(), 8)?;
    }
    for _ in 0..ns {
        write_field(&mut w, "", 32)?;
    }

    let dig_span = (DIGITAL_MAX - DIGITAL_MIN) as f64;
    let last = rec.n_times() - 1;
    for r in 0..n_records {
        for (c, &(lo, hi)) in bounds.iter().enumerate() {
            let scale = dig_span / (hi - lo);
            for k in 0..spr {
                let t = (r * spr + k).min(last);
                let uv = rec.data[[c, t]] * 1e6;
                let dig = ((uv - lo) * scale + DIGITAL_MIN as f64)
                    .round()
                    .clamp(DIGITAL_MIN as f64, DIGITAL_MAX as f64) as i16;
                w.write_all(&dig.to_le_bytes())?;
            }
        }
    }
    w.flush()?;
    Ok(())
}
