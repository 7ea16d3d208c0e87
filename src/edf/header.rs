//! EDF / EDF+ header parsing.
//!
//! On-disk layout (ASCII, space padded):
//!
//! ```text
//! fixed header (256 bytes)
//!   8 version │ 80 patient │ 80 recording │ 8 start date │ 8 start time
//!   8 header bytes │ 44 reserved │ 8 n records │ 8 record duration │ 4 ns
//! signal headers (ns × 256 bytes, field-major)
//!   16 label │ 80 transducer │ 8 physical dim │ 8 phys min │ 8 phys max
//!   8 dig min │ 8 dig max │ 80 prefiltering │ 8 samples/record │ 32 reserved
//! ```
use std::io::Read;

use super::EdfError;

/// Size of the fixed part of the header.
pub const FIXED_HEADER_BYTES: usize = 256;
/// Size of one signal's header block.
pub const SIGNAL_HEADER_BYTES: usize = 256;
/// Label used by EDF+ for the annotation signal.
pub const ANNOTATION_LABEL: &str = "EDF Annotations";

#[derive(Debug, Clone, PartialEq)]
pub struct EdfHeader {
    pub version: String,
    pub patient_id: String,
    pub recording_id: String,
    pub start_date: String,
    pub start_time: String,
    pub header_bytes: usize,
    pub reserved: String,
    /// `-1` in the file means "unknown"; resolved from the file size on open.
    pub n_records: i64,
    pub record_duration: f64,
    pub n_signals: usize,
}

impl EdfHeader {
    /// `EDF+C` / `EDF+D` files carry the variant in the reserved field.
    pub fn is_edf_plus(&self) -> bool {
        self.reserved.starts_with("EDF+")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdfSignal {
    pub label: String,
    pub transducer: String,
    pub physical_dimension: String,
    pub physical_min: f64,
    pub physical_max: f64,
    pub digital_min: i32,
    pub digital_max: i32,
    pub prefiltering: String,
    pub samples_per_record: usize,
    pub reserved: String,
}

impl EdfSignal {
    pub fn is_annotation(&self) -> bool {
        self.label == ANNOTATION_LABEL
    }

    /// Physical units per digital step.
    pub fn gain(&self) -> f64 {
        let span = (self.digital_max - self.digital_min) as f64;
        if span == 0.0 {
            1.0
        } else {
            (self.physical_max - self.physical_min) / span
        }
    }

    pub fn offset(&self) -> f64 {
        self.physical_max - self.gain() * self.digital_max as f64
    }

    /// Factor converting the physical dimension to volts.
    pub fn unit_scale(&self) -> f64 {
        match self.physical_dimension.trim() {
            "uV" | "µV" | "μV" | "uv" => 1e-6,
            "mV" | "mv" => 1e-3,
            "nV" | "nv" => 1e-9,
            _ => 1.0,
        }
    }

    pub fn sfreq(&self, record_duration: f64) -> f64 {
        self.samples_per_record as f64 / record_duration
    }
}

// ── Field readers ─────────────────────────────────────────────────────────

fn read_field<R: Read>(
    reader: &mut R,
    size: usize,
    field: &'static str,
) -> Result<String, EdfError> {
    let mut buf = vec![0u8; size];
    reader
        .read_exact(&mut buf)
        .map_err(|source| EdfError::Io { field, source })?;
    // Latin-1 is a strict superset of the printable ASCII EDF requires.
    Ok(buf.iter().map(|&b| b as char).collect::<String>().trim().to_string())
}

fn parse_field<T: std::str::FromStr>(text: &str, field: &'static str) -> Result<T, EdfError> {
    text.trim().parse::<T>().map_err(|_| EdfError::InvalidField {
        field,
        value: text.to_string(),
    })
}

fn read_parsed<R: Read, T: std::str::FromStr>(
    reader: &mut R,
    size: usize,
    field: &'static str,
) -> Result<T, EdfError> {
    let text = read_field(reader, size, field)?;
    parse_field(&text, field)
}

/// Read the fixed 256-byte header.
pub fn read_header<R: Read>(reader: &mut R) -> Result<EdfHeader, EdfError> {
    let version = read_field(reader, 8, "version")?;
    if version != "0" {
        return Err(EdfError::InvalidField { field: "version", value: version });
    }
    let patient_id = read_field(reader, 80, "patient id")?;
    let recording_id = read_field(reader, 80, "recording id")?;
    let start_date = read_field(reader, 8, "start date")?;
    let start_time = read_field(reader, 8, "start time")?;
    let header_bytes: usize = read_parsed(reader, 8, "header bytes")?;
    let reserved = read_field(reader, 44, "reserved")?;
    let n_records: i64 = read_parsed(reader, 8, "number of records")?;
    let record_duration: f64 = read_parsed(reader, 8, "record duration")?;
    let n_signals: usize = read_parsed(reader, 4, "number of signals")?;

    if header_bytes != FIXED_HEADER_BYTES + n_signals * SIGNAL_HEADER_BYTES {
        return Err(EdfError::InvalidField {
            field: "header bytes",
            value: header_bytes.to_string(),
        });
    }

    log::debug!(
        "EDF header: {n_signals} signals, {n_records} records of {record_duration} s"
    );

    Ok(EdfHeader {
        version,
        patient_id,
        recording_id,
        start_date,
        start_time,
        header_bytes,
        reserved,
        n_records,
        record_duration,
        n_signals,
    })
}

/// Read the `ns × 256` signal header block (stored field by field).
pub fn read_signal_headers<R: Read>(reader: &mut R, ns: usize) -> Result<Vec<EdfSignal>, EdfError> {
    let strings = |reader: &mut R, size: usize, field: &'static str| {
        (0..ns)
            .map(|_| read_field(reader, size, field))
            .collect::<Result<Vec<String>, EdfError>>()
    };

    let labels = strings(reader, 16, "label")?;
    let transducers = strings(reader, 80, "transducer")?;
    let dims = strings(reader, 8, "physical dimension")?;
    let pmins = strings(reader, 8, "physical minimum")?;
    let pmaxs = strings(reader, 8, "physical maximum")?;
    let dmins = strings(reader, 8, "digital minimum")?;
    let dmaxs = strings(reader, 8, "digital maximum")?;
    let prefilters = strings(reader, 80, "prefiltering")?;
    let n_samps = strings(reader, 8, "samples per record")?;
    let reserved = strings(reader, 32, "signal reserved")?;

    let mut out = Vec::with_capacity(ns);
    for i in 0..ns {
        let signal = EdfSignal {
            label: labels[i].clone(),
            transducer: transducers[i].clone(),
            physical_dimension: dims[i].clone(),
            physical_min: parse_field(&pmins[i], "physical minimum")?,
            physical_max: parse_field(&pmaxs[i], "physical maximum")?,
            digital_min: parse_field(&dmins[i], "digital minimum")?,
            digital_max: parse_field(&dmaxs[i], "digital maximum")?,
            prefiltering: prefilters[i].clone(),
            samples_per_record: parse_field(&n_samps[i], "samples per record")?,
            reserved: reserved[i].clone(),
        };
        if signal.digital_max <= signal.digital_min {
            return Err(EdfError::InvalidField {
                field: "digital maximum",
                value: format!("{} (min {})", signal.digital_max, signal.digital_min),
            });
        }
        out.push(signal);
    }
    Ok(out)
}
