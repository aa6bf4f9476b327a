//! Print job records exposed over the API

use chrono::{DateTime, Utc};
use photo_printer::{PrintError, PrintOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a print job
///
/// `queued -> printing -> completed | failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Printing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed or failed
    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Printing => "printing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One accepted print request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub id: Uuid,
    pub status: JobStatus,
    /// Program the job is dispatched to (`lp`, SumatraPDF, ...)
    pub printer: String,
    pub source_width: u32,
    pub source_height: u32,
    pub pdf_bytes: usize,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// First stdout line of the print command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PrintJob {
    pub fn queued(
        id: Uuid,
        printer: impl Into<String>,
        source_size: (u32, u32),
        pdf_bytes: usize,
    ) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            printer: printer.into(),
            source_width: source_size.0,
            source_height: source_size.1,
            pdf_bytes,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            exit_code: None,
            output: None,
            error: None,
        }
    }

    pub fn mark_printing(&mut self) {
        self.status = JobStatus::Printing;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self, outcome: &PrintOutcome) {
        self.status = JobStatus::Completed;
        self.finished_at = Some(Utc::now());
        self.exit_code = outcome.exit_code;
        self.output = outcome.output.clone();
    }

    pub fn mark_failed(&mut self, error: &PrintError) {
        self.status = JobStatus::Failed;
        self.finished_at = Some(Utc::now());
        if let PrintError::PrintCommand { exit_code, .. } = error {
            self.exit_code = *exit_code;
        }
        self.error = Some(error.to_string());
    }
}

/// `POST /api/print` body
#[derive(Debug, Deserialize)]
pub struct PrintRequest {
    #[serde(rename = "imageStr")]
    pub image_str: Option<String>,
}

/// `POST /api/print` success body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintAccepted {
    pub message: &'static str,
    pub job_id: Uuid,
    pub status: JobStatus,
}

impl PrintAccepted {
    pub const MESSAGE: &'static str = "Printing request received";

    pub fn new(job: &PrintJob) -> Self {
        Self {
            message: Self::MESSAGE,
            job_id: job.id,
            status: job.status,
        }
    }
}
