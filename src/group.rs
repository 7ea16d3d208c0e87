//! Subject and group analyses.
//!
//! [`analyze_subject`] runs the whole chain for one subject:
//!
//! ```text
//! load rest/task EDF
//!   ├─ preprocess        EEG only, 0.5–45 Hz zero-phase FIR
//!   ├─ pick_available    requested channels that exist, in order
//!   ├─ segment           30 s windows, 15 s overlap
//!   ├─ tfr_multitaper    4–40 Hz, power averaged over segments
//!   └─ compute_erds      task vs. time-averaged rest
//! ```
//!
//! Groups are never guessed. A [`GroupPolicy`] maps each label to the
//! subjects it averages, built in code or read from a `subject,group` CSV.
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::AnalysisConfig;
use crate::epoch::segment_with;
use crate::erds::{compute_erds, ErdsMap};
use crate::error::{ErdsError, Result};
use crate::loader::{load_subject, MAX_SUBJECT};
use crate::preprocess::preprocess;
use crate::recording::Recording;
use crate::tfr::{same_axis, tfr_multitaper};

/// Explicit label → subject ids mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPolicy {
    groups: BTreeMap<String, Vec<u32>>,
}

#[derive(Debug, Deserialize)]
struct GroupRow {
    subject: u32,
    group: String,
}

impl GroupPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `subjects` to `label`, creating the group if needed. Subjects
    /// already in the group are not repeated.
    pub fn insert(&mut self, label: impl Into<String>, subjects: impl IntoIterator<Item = u32>) {
        let members = self.groups.entry(label.into()).or_default();
        for s in subjects {
            if !members.contains(&s) {
                members.push(s);
            }
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_group(
        mut self,
        label: impl Into<String>,
        subjects: impl IntoIterator<Item = u32>,
    ) -> Self {
        self.insert(label, subjects);
        self
    }

    /// Read a CSV with a `subject,group` header, one row per membership.
    ///
    /// ```text
    /// subject,group
    /// 0,good
    /// 1,bad
    /// ```
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ErdsError::FileNotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, path)
    }

    /// [`from_csv`](Self::from_csv) over any reader; `source` is only used
    /// in error messages.
    pub fn from_reader<R: std::io::Read>(reader: R, source: &Path) -> Result<Self> {
        let bad = |message: String| ErdsError::GroupFile {
            path: source.to_path_buf(),
            message,
        };
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut policy = Self::new();
        for (i, row) in rdr.deserialize::<GroupRow>().enumerate() {
            let row = row.map_err(|e| bad(format!("row {}: {e}", i + 1)))?;
            if row.subject > MAX_SUBJECT {
                return Err(bad(format!(
                    "row {}: subject {} is outside 0..={MAX_SUBJECT}",
                    i + 1,
                    row.subject
                )));
            }
            if row.group.is_empty() {
                return Err(bad(format!("row {}: empty group label", i + 1)));
            }
            policy.insert(row.group, [row.subject]);
        }
        if policy.is_empty() {
            return Err(bad("no group memberships".into()));
        }
        log::debug!("groups from {}: {:?}", source.display(), policy.groups);
        Ok(policy)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Subjects of `label`, in insertion order.
    pub fn subjects(&self, label: &str) -> Option<&[u32]> {
        self.groups.get(label).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// ERDS map of one subject.
#[derive(Debug, Clone)]
pub struct SubjectErds {
    pub subject: u32,
    pub map: ErdsMap,
}

/// Mean ERDS map of a group and the subjects that went into it.
#[derive(Debug, Clone)]
pub struct GroupErds {
    pub label: String,
    pub subjects: Vec<u32>,
    pub map: ErdsMap,
}

/// Rest/task recordings → ERDS map, with the settings in `cfg`.
pub fn erds_from_recordings(
    rest: &Recording,
    task: &Recording,
    cfg: &AnalysisConfig,
) -> Result<ErdsMap> {
    log::info!("available channels: {}", rest.ch_names().join(", "));

    let rest = preprocess(rest, &cfg.filter)?.pick_available(&cfg.channels)?;
    let task = preprocess(task, &cfg.filter)?.pick_available(&rest.ch_names())?;

    let seg_rest = segment_with(&rest, &cfg.segment)?;
    let seg_task = segment_with(&task, &cfg.segment)?;
    log::info!(
        "segments: rest {}, task {} ({} channels)",
        seg_rest.n_segments(),
        seg_task.n_segments(),
        seg_rest.n_channels()
    );

    let tfr_rest = tfr_multitaper(&seg_rest, &cfg.tfr)?;
    let tfr_task = tfr_multitaper(&seg_task, &cfg.tfr)?;
    compute_erds(&tfr_task, &tfr_rest)
}

/// Load one subject from `cfg.data_dir` and compute its ERDS map.
pub fn analyze_subject(subject: u32, cfg: &AnalysisConfig) -> Result<SubjectErds> {
    let (rest, task) = load_subject(&cfg.data_dir, subject, &cfg.edf)?;
    let map = erds_from_recordings(&rest, &task, cfg)?;
    log::info!(
        "subject {subject:02}: ERDS map {} ch × {} freqs × {} times",
        map.n_channels(),
        map.n_freqs(),
        map.n_times()
    );
    Ok(SubjectErds { subject, map })
}

/// Element-wise mean of maps sharing channels, frequencies and times.
///
/// `NaN` cells stay `NaN`; `invalid` is the union over all maps.
pub fn average_maps(maps: &[ErdsMap]) -> Result<ErdsMap> {
    let (first, rest) = maps
        .split_first()
        .ok_or_else(|| ErdsError::AxisMismatch("cannot average zero maps".into()))?;

    let mut sum = first.data.clone();
    let mut invalid: BTreeSet<(usize, usize)> = first.invalid.iter().copied().collect();
    for m in rest {
        if m.ch_names != first.ch_names
            || !same_axis(&m.freqs, &first.freqs)
            || m.data.dim() != first.data.dim()
            || !same_axis(
                m.times.as_slice().unwrap_or(&[]),
                first.times.as_slice().unwrap_or(&[]),
            )
        {
            return Err(ErdsError::AxisMismatch(format!(
                "map {:?} over {:?} cannot be averaged with {:?} over {:?}",
                m.data.dim(),
                m.ch_names,
                first.data.dim(),
                first.ch_names
            )));
        }
        sum += &m.data;
        invalid.extend(m.invalid.iter().copied());
    }

    Ok(ErdsMap {
        data: sum / maps.len() as f64,
        ch_names: first.ch_names.clone(),
        freqs: first.freqs.clone(),
        times: first.times.clone(),
        invalid: invalid.into_iter().collect(),
    })
}

/// Mean ERDS map of every group in `policy`.
///
/// A subject listed in several groups is analysed once. The first failing
/// subject aborts the whole run.
pub fn analyze_groups(
    policy: &GroupPolicy,
    cfg: &AnalysisConfig,
) -> Result<BTreeMap<String, GroupErds>> {
    if let Some((label, _)) = policy.iter().find(|(_, s)| s.is_empty()) {
        return Err(ErdsError::EmptyGroup(label.to_string()));
    }

    let mut cache: BTreeMap<u32, ErdsMap> = BTreeMap::new();
    let mut out = BTreeMap::new();
    for (label, subjects) in policy.iter() {
        log::info!("group {label}: subjects {subjects:?}");
        let mut maps = Vec::with_capacity(subjects.len());
        for &s in subjects {
            let map = match cache.entry(s) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => e.insert(analyze_subject(s, cfg)?.map),
            };
            maps.push(map.clone());
        }
        let map = average_maps(&maps)?;
        out.insert(
            label.to_string(),
            GroupErds { label: label.to_string(), subjects: subjects.to_vec(), map },
        );
    }
    Ok(out)
}

/// `<results_dir>/subject{NN}_erds.png`
pub fn subject_figure_path(results_dir: &Path, subject: u32) -> PathBuf {
    results_dir.join(format!("subject{subject:02}_erds.png"))
}

/// `<results_dir>/group_{label}_erds.png`, with path separators and other
/// unusual characters in `label` replaced by `_`.
pub fn group_figure_path(results_dir: &Path, label: &str) -> PathBuf {
    let safe: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    results_dir.join(format!("group_{safe}_erds.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array3};

    fn map(value: f64, invalid: Vec<(usize, usize)>) -> ErdsMap {
        ErdsMap {
            data: Array3::from_elem((2, 3, 4), value),
            ch_names: vec!["F3".into(), "F4".into()],
            freqs: vec![4.0, 5.0, 6.0],
            times: Array1::linspace(0.0, 3.0, 4),
            invalid,
        }
    }

    #[test]
    fn csv_policy() {
        let text = "subject,group\n0,good\n 3 , bad\n1,good\n0,good\n# note\n";
        let p = GroupPolicy::from_reader(text.as_bytes(), Path::new("groups.csv")).unwrap();
        assert_eq!(p.labels().collect::<Vec<_>>(), vec!["bad", "good"]);
        assert_eq!(p.subjects("good"), Some(&[0, 1][..]));
        assert_eq!(p.subjects("bad"), Some(&[3][..]));
    }

    #[test]
    fn csv_errors() {
        let path = Path::new("g.csv");
        assert!(matches!(
            GroupPolicy::from_reader("subject,group\nx,good\n".as_bytes(), path),
            Err(ErdsError::GroupFile { .. })
        ));
        assert!(matches!(
            GroupPolicy::from_reader("subject,group\n99,good\n".as_bytes(), path),
            Err(ErdsError::GroupFile { .. })
        ));
        assert!(matches!(
            GroupPolicy::from_reader("subject,group\n".as_bytes(), path),
            Err(ErdsError::GroupFile { .. })
        ));
        assert!(matches!(
            GroupPolicy::from_csv("/nonexistent/groups.csv"),
            Err(ErdsError::FileNotFound(_))
        ));
    }

    #[test]
    fn mean_is_elementwise() {
        let mut a = map(10.0, vec![(1, 2)]);
        a.data[[0, 1, 2]] = 40.0;
        let b = map(-20.0, vec![(0, 0)]);
        let m = average_maps(&[a, b]).unwrap();
        assert_eq!(m.data[[1, 1, 1]], -5.0);
        assert_eq!(m.data[[0, 1, 2]], 10.0);
        assert_eq!(m.invalid, vec![(0, 0), (1, 2)]);
    }

    #[test]
    fn mean_of_one_is_identity() {
        let a = map(12.5, vec![]);
        assert_eq!(average_maps(std::slice::from_ref(&a)).unwrap(), a);
    }

    #[test]
    fn mean_rejects_mismatch_and_empty() {
        let mut b = map(1.0, vec![]);
        b.ch_names[1] = "F8".into();
        assert!(average_maps(&[map(1.0, vec![]), b]).is_err());
        assert!(average_maps(&[]).is_err());
    }

    #[test]
    fn empty_group_is_error() {
        let policy = GroupPolicy::new().with_group("good", [0]).with_group("bad", []);
        assert!(matches!(
            analyze_groups(&policy, &AnalysisConfig::default()),
            Err(ErdsError::EmptyGroup(label)) if label == "bad"
        ));
    }

    #[test]
    fn figure_paths() {
        let dir = Path::new("results");
        assert_eq!(subject_figure_path(dir, 0), Path::new("results/subject00_erds.png"));
        assert_eq!(group_figure_path(dir, "good"), Path::new("results/group_good_erds.png"));
        assert_eq!(group_figure_path(dir, "a/b c"), Path::new("results/group_a_b_c_erds.png"));
    }
}
