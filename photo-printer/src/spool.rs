//! Job spool directory
//!
//! Every job gets its own directory under the spool root. The directory is
//! owned by a [`JobFiles`] guard and removed when the guard goes away, so the
//! source image, the normalized image and the PDF never outlive the job,
//! whichever way it ends. [`SpoolDir::sweep_stale`] covers the one case a guard
//! cannot: the process dying mid-job.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use uuid::Uuid;

use crate::error::PrintResult;

/// Prefix of per-job directories, used to recognise them when sweeping
const JOB_DIR_PREFIX: &str = "job-";

/// Spool root (`temp/` under the working directory by default)
#[derive(Debug, Clone)]
pub struct SpoolDir {
    root: PathBuf,
}

impl SpoolDir {
    /// Open the spool root, creating it if needed
    pub fn new(root: impl Into<PathBuf>) -> PrintResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the scoped workspace of one job
    pub fn create_job(&self, job_id: Uuid) -> PrintResult<JobFiles> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}{}-", JOB_DIR_PREFIX, job_id))
            .tempdir_in(&self.root)?;
        tracing::debug!(job_id = %job_id, dir = %dir.path().display(), "Created job directory");
        Ok(JobFiles {
            job_id,
            dir,
            pdf_path: None,
        })
    }

    /// Remove job directories older than `max_age`
    ///
    /// Returns the number of directories removed. Failures on single entries
    /// are logged and skipped.
    pub fn sweep_stale(&self, max_age: Duration) -> PrintResult<usize> {
        self.sweep_stale_except(max_age, |_| false)
    }

    /// Like [`sweep_stale`](Self::sweep_stale), but directories whose job id
    /// satisfies `is_live` are left alone whatever their age
    pub fn sweep_stale_except(
        &self,
        max_age: Duration,
        is_live: impl Fn(Uuid) -> bool,
    ) -> PrintResult<usize> {
        let now = SystemTime::now();
        let mut removed = 0;

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(rest) = name.strip_prefix(JOB_DIR_PREFIX) else {
                continue;
            };
            if job_id_of(rest).is_some_and(&is_live) {
                continue;
            }

            let metadata = entry.metadata()?;
            if !metadata.is_dir() {
                continue;
            }
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < max_age {
                continue;
            }

            match fs::remove_dir_all(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(dir = %name, error = %e, "Failed to remove stale job directory");
                }
            }
        }

        if removed > 0 {
            tracing::info!(count = removed, "Stale job directories removed");
        }
        Ok(removed)
    }
}

/// Job id at the start of a job directory name, after the prefix
fn job_id_of(rest: &str) -> Option<Uuid> {
    rest.get(..36).and_then(|id| Uuid::parse_str(id).ok())
}

/// Files of a single job; dropping the guard deletes them
#[derive(Debug)]
pub struct JobFiles {
    job_id: Uuid,
    dir: TempDir,
    pdf_path: Option<PathBuf>,
}

impl JobFiles {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Persist the decoded upload as received
    pub fn write_source(&self, extension: &str, bytes: &[u8]) -> PrintResult<PathBuf> {
        self.write(&format!("source.{}", extension), bytes)
    }

    /// Persist the fit-contained PNG
    pub fn write_normalized(&self, png: &[u8]) -> PrintResult<PathBuf> {
        self.write("normalized.png", png)
    }

    /// Persist the print PDF
    pub fn write_pdf(&mut self, pdf: &[u8]) -> PrintResult<PathBuf> {
        let path = self.write(&format!("{}.pdf", self.job_id), pdf)?;
        self.pdf_path = Some(path.clone());
        Ok(path)
    }

    /// Path of the PDF, once written
    pub fn pdf_path(&self) -> Option<&Path> {
        self.pdf_path.as_deref()
    }

    /// Delete the job directory now, reporting failures
    pub fn close(self) -> PrintResult<()> {
        let job_id = self.job_id;
        self.dir.close()?;
        tracing::debug!(job_id = %job_id, "Removed job directory");
        Ok(())
    }

    fn write(&self, file_name: &str, bytes: &[u8]) -> PrintResult<PathBuf> {
        let path = self.dir.path().join(file_name);
        fs::write(&path, bytes)?;
        Ok(path)
    }
}
