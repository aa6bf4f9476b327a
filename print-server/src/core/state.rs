//! Shared server state

use std::sync::Arc;
use std::time::{Duration, Instant};

use photo_printer::{Platform, Printer, SpoolDir};

use crate::core::{BackgroundTasks, Config};
use crate::printing::{JobRegistry, PrintJobService};
use crate::utils::logger;

/// Server state, cheap to clone into every handler
#[derive(Debug, Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub print_service: Arc<PrintJobService>,
    pub started_at: Instant,
}

impl ServerState {
    /// Build state for the host platform
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        Self::with_platform(config, Platform::current())
    }

    /// Build state for an explicit platform
    pub fn with_platform(config: &Config, platform: Platform) -> anyhow::Result<Self> {
        let spool = SpoolDir::new(&config.temp_dir)?;

        let print_service = PrintJobService::new(
            config.paper,
            spool,
            platform,
            config.printer.clone(),
            config.max_concurrent_prints,
        );

        match print_service.resolve_printer() {
            Ok(printer) => {
                if printer.is_available() {
                    tracing::info!(command = %printer.command(), "Print command resolved");
                } else {
                    tracing::warn!(
                        command = %printer.command(),
                        "Print command not found, jobs will fail until it is installed"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "No print command for this platform, print requests will fail");
            }
        }

        Ok(Self {
            config: Arc::new(config.clone()),
            print_service: Arc::new(print_service),
            started_at: Instant::now(),
        })
    }

    pub fn jobs(&self) -> &JobRegistry {
        self.print_service.registry()
    }

    /// Register housekeeping tasks
    ///
    /// - spool sweep at startup (crash leftovers)
    /// - periodic spool sweep
    /// - eviction of finished jobs
    /// - log retention when file logging is on
    ///
    /// Must run before the listener accepts requests.
    pub async fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let max_age = self.config.spool_max_age;

        // No job is in flight yet, so every job dir is a crash leftover
        let startup_spool = self.print_service.spool().clone();
        tasks
            .warmup("spool_startup_sweep", async move {
                let result =
                    tokio::task::spawn_blocking(move || startup_spool.sweep_stale(Duration::ZERO))
                        .await;
                match result {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::warn!(error = %e, "Startup spool sweep failed"),
                    Err(e) => tracing::warn!(error = %e, "Startup spool sweep task failed"),
                }
            })
            .await;

        // Queued and printing jobs keep their directories whatever their age
        let service = self.print_service.clone();
        let sweep_period = (max_age / 2).max(Duration::from_secs(60));
        tasks.spawn_periodic("spool_sweep", sweep_period, move || {
            let service = service.clone();
            tokio::task::spawn_blocking(move || {
                if let Err(e) = service.sweep_spool(max_age) {
                    tracing::warn!(error = %e, "Spool sweep failed");
                }
            });
        });

        let jobs = self.jobs().clone();
        let retention = self.config.job_retention;
        let evict_period = (retention / 4).max(Duration::from_secs(30));
        tasks.spawn_periodic("job_eviction", evict_period, move || {
            let evicted = jobs.evict_finished(retention);
            if evicted > 0 {
                tracing::debug!(evicted, "Evicted finished print jobs");
            }
        });

        if let Some(dir) = self.config.log.dir.clone() {
            let retention_days = self.config.log.retention_days;
            tasks.spawn_periodic(
                "log_cleanup",
                Duration::from_secs(3600),
                move || {
                    if let Err(e) = logger::cleanup_old_logs(&dir, retention_days) {
                        tracing::error!(error = %e, "Failed to cleanup old logs");
                    }
                },
            );
        }

        tasks.log_summary();
    }
}
