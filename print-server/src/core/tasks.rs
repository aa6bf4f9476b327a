//! Background task management
//!
//! Registration, startup and shutdown of every long-running task.
//!
//! # Task kinds
//!
//! - [`TaskKind::Warmup`] - startup work, runs once
//! - [`TaskKind::Periodic`] - timer driven housekeeping

use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Warmup,
    Periodic,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Warmup => write!(f, "Warmup"),
            TaskKind::Periodic => write!(f, "Periodic"),
        }
    }
}

struct RegisteredTask {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Background task manager
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
///
/// tasks.spawn_periodic("spool_sweep", Duration::from_secs(600), move || {
///     // housekeeping
/// });
///
/// tasks.shutdown().await;
/// ```
pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
    warmups_run: usize,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            warmups_run: 0,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token cancelled when [`BackgroundTasks::shutdown`] runs
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Register and start a task
    ///
    /// Panics inside the task are caught and logged.
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let wrapped_future = async move {
            let result = AssertUnwindSafe(future).catch_unwind().await;
            match result {
                Ok(()) => {
                    if kind != TaskKind::Warmup && !shutdown.is_cancelled() {
                        tracing::warn!(task = %name, kind = %kind, "Background task completed unexpectedly");
                    }
                }
                Err(panic_info) => {
                    tracing::error!(
                        task = %name,
                        kind = %kind,
                        panic = %panic_message(panic_info.as_ref()),
                        "Background task panicked"
                    );
                }
            }
        };

        let handle = tokio::spawn(wrapped_future);
        tracing::debug!(task = %name, kind = %kind, "Registered background task");
        self.tasks.push(RegisteredTask { name, kind, handle });
    }

    /// Run a warmup task to completion before anything else starts
    ///
    /// Panics are caught and logged like those of spawned tasks.
    pub async fn warmup<F>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::debug!(task = %name, kind = %TaskKind::Warmup, "Running warmup task");
        if let Err(panic_info) = AssertUnwindSafe(future).catch_unwind().await {
            tracing::error!(
                task = %name,
                kind = %TaskKind::Warmup,
                panic = %panic_message(panic_info.as_ref()),
                "Background task panicked"
            );
        }
        self.warmups_run += 1;
    }

    /// Run `tick` every `period` until shutdown
    ///
    /// The first tick fires one full period after registration.
    pub fn spawn_periodic<F>(&mut self, name: &'static str, period: Duration, mut tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        self.spawn(name, TaskKind::Periodic, async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => tick(),
                }
            }
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task count per kind: (warmup, periodic)
    ///
    /// Warmups are counted once they have run.
    pub fn count_by_kind(&self) -> (usize, usize) {
        let spawned_warmups = self
            .tasks
            .iter()
            .filter(|t| t.kind == TaskKind::Warmup)
            .count();
        (
            self.warmups_run + spawned_warmups,
            self.tasks.len() - spawned_warmups,
        )
    }

    pub fn log_summary(&self) {
        let (warmup, periodic) = self.count_by_kind();
        tracing::info!(
            "Background tasks registered: {} running (Periodic: {}), {} warmup completed",
            self.tasks.len(),
            periodic,
            warmup
        );
    }

    /// Cancel every task and wait for it to finish
    pub async fn shutdown(self) {
        tracing::info!("Shutting down {} background tasks...", self.tasks.len());

        self.shutdown.cancel();

        for task in self.tasks {
            match task.handle.await {
                Ok(()) => tracing::debug!(task = %task.name, "Task completed"),
                Err(e) if e.is_cancelled() => tracing::debug!(task = %task.name, "Task cancelled"),
                Err(e) => tracing::error!(task = %task.name, error = ?e, "Task panicked"),
            }
        }

        tracing::info!("All background tasks stopped");
    }
}

fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}
