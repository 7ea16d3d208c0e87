//! Per-subject file layout of the mental-arithmetic dataset.
//!
//! Every subject has two recordings in one directory:
//! `Subject{NN}_1.edf` (rest) and `Subject{NN}_2.edf` (task).
use std::path::{Path, PathBuf};

use crate::edf::{read_edf, EdfOptions};
use crate::error::{ErdsError, Result};
use crate::recording::Recording;

/// Highest subject id in the dataset (ids run `0..=MAX_SUBJECT`).
pub const MAX_SUBJECT: u32 = 35;

/// Paths of one subject's rest and task recordings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectPaths {
    pub subject: u32,
    pub rest: PathBuf,
    pub task: PathBuf,
}

impl SubjectPaths {
    pub fn new(data_dir: &Path, subject: u32) -> Result<Self> {
        if subject > MAX_SUBJECT {
            return Err(ErdsError::InvalidSubject(subject));
        }
        Ok(Self {
            subject,
            rest: data_dir.join(format!("Subject{subject:02}_1.edf")),
            task: data_dir.join(format!("Subject{subject:02}_2.edf")),
        })
    }

    pub fn exist(&self) -> bool {
        self.rest.is_file() && self.task.is_file()
    }
}

/// Load `(rest, task)` recordings for `subject`.
pub fn load_subject(
    data_dir: &Path,
    subject: u32,
    opts: &EdfOptions,
) -> Result<(Recording, Recording)> {
    let paths = SubjectPaths::new(data_dir, subject)?;
    log::info!("subject {subject:02}: loading {}", paths.rest.display());
    let rest = read_edf(&paths.rest, opts)?;
    log::info!("subject {subject:02}: loading {}", paths.task.display());
    let task = read_edf(&paths.task, opts)?;
    log::debug!(
        "subject {subject:02}: rest {} ch × {} samples, task {} ch × {} samples",
        rest.n_channels(),
        rest.n_times(),
        task.n_channels(),
        task.n_times()
    );
    Ok((rest, task))
}

/// Subject ids in `0..=MAX_SUBJECT` whose rest and task files both exist.
pub fn discover_subjects(data_dir: &Path) -> Vec<u32> {
    (0..=MAX_SUBJECT)
        .filter(|&s| SubjectPaths::new(data_dir, s).map(|p| p.exist()).unwrap_or(false))
        .collect()
}
