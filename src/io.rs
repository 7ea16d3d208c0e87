//! Safetensors export of ERDS maps.
//!
//! Layout of a map file:
//!
//! | tensor    | dtype | shape       |
//! |-----------|-------|-------------|
//! | `erds`    | F64   | `[C, F, T]` |
//! | `freqs`   | F64   | `[F]`       |
//! | `times`   | F64   | `[T]`       |
//! | `invalid` | I64   | `[K, 2]`    |
//!
//! Channel names go in `__metadata__.ch_names`, newline separated.
use ndarray::{Array1, Array3};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::erds::ErdsMap;
use crate::error::{ErdsError, Result};

// ── Writer ────────────────────────────────────────────────────────────────────

/// Minimal safetensors writer for F64 and I64 tensors plus string metadata.
///
/// ```rust,no_run
/// use erds::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("signal", &[1.0, 2.0, 3.0], &[1, 3]);
/// w.add_metadata("units", "percent");
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    /// Row-major copy of a 3-D array.
    pub fn add_f64_arr3(&mut self, name: &str, arr: &Array3<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, arr.shape());
    }

    pub fn add_i64(&mut self, name: &str, data: &[i64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I64", shape.to_vec()));
    }

    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), serde_json::Value::String(value.to_string()));
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut header_map = serde_json::Map::new();
        if !self.metadata.is_empty() {
            let metadata = serde_json::Value::Object(self.metadata.clone());
            header_map.insert("__metadata__".into(), metadata);
        }
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes.into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();
        let mut f = std::fs::File::create(path)?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

/// `<figure>.png` → `<figure>.safetensors`.
pub fn array_path_for(figure: &Path) -> PathBuf {
    figure.with_extension("safetensors")
}

/// Write `map` as a safetensors file.
pub fn write_erds_map(map: &ErdsMap, path: &Path) -> Result<()> {
    let mut w = StWriter::new();
    w.add_f64_arr3("erds", &map.data);
    w.add_f64("freqs", &map.freqs, &[map.freqs.len()]);
    let times: Vec<f64> = map.times.to_vec();
    w.add_f64("times", &times, &[times.len()]);
    let invalid: Vec<i64> = map
        .invalid
        .iter()
        .flat_map(|&(c, f)| [c as i64, f as i64])
        .collect();
    w.add_i64("invalid", &invalid, &[map.invalid.len(), 2]);
    w.add_metadata("ch_names", &map.ch_names.join("\n"));
    w.add_metadata("units", "percent");
    w.write(path)?;
    log::info!("wrote {}", path.display());
    Ok(())
}

// ── Reader ────────────────────────────────────────────────────────────────────

struct StFile {
    bytes: Vec<u8>,
    header: HashMap<String, serde_json::Value>,
    data_start: usize,
    path: PathBuf,
}

impl StFile {
    fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ErdsError::FileNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        let mut file = Self {
            bytes,
            header: HashMap::new(),
            data_start: 0,
            path: path.to_path_buf(),
        };
        if file.bytes.len() < 8 {
            return Err(file.err("file too small"));
        }
        let mut len = [0u8; 8];
        len.copy_from_slice(&file.bytes[..8]);
        let n = u64::from_le_bytes(len) as usize;
        let end = n.checked_add(8).ok_or_else(|| file.err("header length overflows"))?;
        let hdr = file
            .bytes
            .get(8..end)
            .ok_or_else(|| file.err("header runs past end of file"))?;
        file.header = serde_json::from_slice(hdr)?;
        file.data_start = end;
        Ok(file)
    }

    fn err(&self, message: impl Into<String>) -> ErdsError {
        ErdsError::ArrayFile { path: self.path.clone(), message: message.into() }
    }

    fn entry(&self, name: &str) -> Result<&serde_json::Value> {
        self.header.get(name).ok_or_else(|| self.err(format!("missing tensor '{name}'")))
    }

    fn shape(&self, name: &str) -> Result<Vec<usize>> {
        self.entry(name)?["shape"]
            .as_array()
            .ok_or_else(|| self.err(format!("'{name}' has no shape")))?
            .iter()
            .map(|v| {
                v.as_u64()
                    .map(|d| d as usize)
                    .ok_or_else(|| self.err(format!("bad shape in '{name}'")))
            })
            .collect()
    }

    fn raw(&self, name: &str, dtype: &str) -> Result<&[u8]> {
        let entry = self.entry(name)?;
        if entry["dtype"].as_str() != Some(dtype) {
            return Err(self.err(format!("'{name}' is not {dtype}")));
        }
        let offsets: Vec<usize> = entry["data_offsets"]
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_u64()).map(|v| v as usize).collect())
            .unwrap_or_default();
        let [s, e] = offsets[..] else {
            return Err(self.err(format!("'{name}' has bad data_offsets")));
        };
        self.bytes
            .get(self.data_start + s..self.data_start + e)
            .ok_or_else(|| self.err(format!("'{name}' runs past end of file")))
    }

    fn f64s(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self
            .raw(name, "F64")?
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect())
    }

    fn i64s(&self, name: &str) -> Result<Vec<i64>> {
        Ok(self
            .raw(name, "I64")?
            .chunks_exact(8)
            .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect())
    }

    fn metadata(&self, key: &str) -> Option<&str> {
        self.header.get("__metadata__")?.get(key)?.as_str()
    }
}

/// Read a map written by [`write_erds_map`].
pub fn read_erds_map(path: &Path) -> Result<ErdsMap> {
    let st = StFile::open(path)?;
    let shape = st.shape("erds")?;
    let [c, f, t] = shape[..] else {
        return Err(st.err(format!("'erds' must be 3-D, got {shape:?}")));
    };
    let data = Array3::from_shape_vec((c, f, t), st.f64s("erds")?)?;
    let freqs = st.f64s("freqs")?;
    let times = Array1::from(st.f64s("times")?);
    let invalid = st
        .i64s("invalid")?
        .chunks_exact(2)
        .map(|p| (p[0] as usize, p[1] as usize))
        .collect();
    let ch_names: Vec<String> = st
        .metadata("ch_names")
        .unwrap_or_default()
        .split('\n')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if ch_names.len() != c || freqs.len() != f || times.len() != t {
        return Err(st.err(format!(
            "axes ({} channels, {} freqs, {} times) do not match data {shape:?}",
            ch_names.len(),
            freqs.len(),
            times.len()
        )));
    }
    Ok(ErdsMap { data, ch_names, freqs, times, invalid })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> ErdsMap {
        ErdsMap {
            data: Array3::from_shape_fn((2, 3, 4), |(c, f, t)| {
                (c * 100 + f * 10 + t) as f64 - 50.5
            }),
            ch_names: vec!["F3".into(), "F4".into()],
            freqs: vec![4.0, 5.0, 6.0],
            times: Array1::from(vec![0.0, 0.5, 1.0, 1.5]),
            invalid: vec![(1, 2)],
        }
    }

    #[test]
    fn header_is_aligned_and_describes_tensors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.safetensors");
        write_erds_map(&map(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
        assert_eq!(n % 8, 0);
        let header: serde_json::Value = serde_json::from_slice(&bytes[8..8 + n]).unwrap();
        assert_eq!(header["erds"]["dtype"], "F64");
        assert_eq!(header["erds"]["shape"], serde_json::json!([2, 3, 4]));
        assert_eq!(header["invalid"]["shape"], serde_json::json!([1, 2]));
        assert_eq!(header["__metadata__"]["ch_names"], "F3\nF4");
        // erds + freqs + times + invalid
        assert_eq!(bytes.len(), 8 + n + 8 * (24 + 3 + 4 + 2));
    }

    #[test]
    fn read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.safetensors");
        let m = map();
        write_erds_map(&m, &path).unwrap();
        assert_eq!(read_erds_map(&path).unwrap(), m);
    }

    #[test]
    fn nan_cells_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.safetensors");
        let mut m = map();
        m.data[[1, 2, 0]] = f64::NAN;
        write_erds_map(&m, &path).unwrap();
        let back = read_erds_map(&path).unwrap();
        assert!(back.data[[1, 2, 0]].is_nan());
        assert_eq!(back.data[[0, 0, 0]], -50.5);
    }

    #[test]
    fn truncated_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.safetensors");
        write_erds_map(&map(), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 16]).unwrap();
        assert!(matches!(read_erds_map(&path), Err(ErdsError::ArrayFile { .. })));
    }

    #[test]
    fn figure_to_array_path() {
        assert_eq!(
            array_path_for(Path::new("results/subject00_erds.png")),
            Path::new("results/subject00_erds.safetensors")
        );
    }
}
