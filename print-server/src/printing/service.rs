//! Print job service
//!
//! Accepts an image payload, prepares the job on a blocking thread, records
//! it in the registry and hands the PDF to the printer in the background.
//! The HTTP response never waits for the print command.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use photo_printer::{
    CommandPrinter, PaperSize, Platform, PreparedJob, PrintError, PrintResult, Printer,
    PrinterSettings, SpoolDir, prepare_job,
};
use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::registry::JobRegistry;
use super::types::PrintJob;
use crate::core::Result;

/// Print job service
#[derive(Debug, Clone)]
pub struct PrintJobService {
    paper: PaperSize,
    spool: SpoolDir,
    platform: Platform,
    settings: PrinterSettings,
    registry: JobRegistry,
    /// Bounds the number of print commands running at once
    permits: Arc<Semaphore>,
}

impl PrintJobService {
    pub fn new(
        paper: PaperSize,
        spool: SpoolDir,
        platform: Platform,
        settings: PrinterSettings,
        max_concurrent_prints: usize,
    ) -> Self {
        Self {
            paper,
            spool,
            platform,
            settings,
            registry: JobRegistry::new(),
            permits: Arc::new(Semaphore::new(max_concurrent_prints.max(1))),
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn spool(&self) -> &SpoolDir {
        &self.spool
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Remove spool directories older than `max_age`, skipping every job
    /// that is still queued or printing
    pub fn sweep_spool(&self, max_age: Duration) -> PrintResult<usize> {
        let registry = &self.registry;
        self.spool
            .sweep_stale_except(max_age, |id| registry.is_active(&id))
    }

    /// Print command for this host, or an error on unsupported platforms
    pub fn resolve_printer(&self) -> PrintResult<CommandPrinter> {
        CommandPrinter::for_platform(&self.platform, &self.settings)
    }

    /// Accept one image payload
    ///
    /// Returns once the PDF is on disk and the job is queued. Any failure up
    /// to that point leaves no job record and no files behind.
    #[instrument(skip_all, fields(job_id = tracing::field::Empty))]
    pub async fn submit(&self, image_str: String) -> Result<PrintJob> {
        // Unsupported hosts fail before any work is done
        let printer = self.resolve_printer()?;

        let job_id = Uuid::new_v4();
        tracing::Span::current().record("job_id", tracing::field::display(job_id));

        let paper = self.paper;
        let spool = self.spool.clone();
        let prepared =
            tokio::task::spawn_blocking(move || prepare_job(&image_str, &paper, &spool, job_id))
                .await
                .map_err(|e| anyhow!("job preparation task failed: {}", e))??;

        let job = PrintJob::queued(
            job_id,
            printer.command().program_name(),
            prepared.source_size,
            prepared.pdf_bytes,
        );
        self.registry.insert(job.clone());
        info!(printer = %job.printer, "Print job queued");

        let registry = self.registry.clone();
        let permits = self.permits.clone();
        tokio::spawn(dispatch(registry, permits, printer, prepared));

        Ok(job)
    }
}

/// Run the print command for a prepared job and record the result
///
/// The job directory is removed whatever the outcome, before the final status
/// becomes visible.
#[instrument(skip_all, fields(job_id = %prepared.files.job_id()))]
async fn dispatch(
    registry: JobRegistry,
    permits: Arc<Semaphore>,
    printer: CommandPrinter,
    prepared: PreparedJob,
) {
    let job_id = prepared.files.job_id();

    let result = match permits.acquire_owned().await {
        Ok(_permit) => {
            registry.update(&job_id, |job| job.mark_printing());
            printer.print(&prepared.pdf_path).await
        }
        Err(_) => Err(PrintError::command("print queue closed")),
    };

    let files = prepared.files;
    match tokio::task::spawn_blocking(move || files.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Failed to remove job directory"),
        Err(e) => warn!(error = %e, "Job cleanup task failed"),
    }

    match result {
        Ok(outcome) => {
            info!(elapsed_ms = outcome.elapsed_ms, output = ?outcome.output, "Print job completed");
            registry.update(&job_id, |job| job.mark_completed(&outcome));
        }
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Print job failed");
            registry.update(&job_id, |job| job.mark_failed(&e));
        }
    }
}
