//! In-memory job registry

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::types::PrintJob;

/// Concurrent map of job id to job record
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<DashMap<Uuid, PrintJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: PrintJob) {
        self.jobs.insert(job.id, job);
    }

    pub fn get(&self, id: &Uuid) -> Option<PrintJob> {
        self.jobs.get(id).map(|entry| entry.value().clone())
    }

    /// Apply `f` to a job in place; returns false when the job is gone
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut PrintJob)) -> bool {
        match self.jobs.get_mut(id) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    /// All jobs, newest first
    pub fn list(&self) -> Vec<PrintJob> {
        let mut jobs: Vec<PrintJob> = self.jobs.iter().map(|e| e.value().clone()).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Jobs not yet completed or failed
    pub fn active_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|e| !e.value().status.is_finished())
            .count()
    }

    /// Whether the job is known and not yet completed or failed
    pub fn is_active(&self, id: &Uuid) -> bool {
        self.jobs
            .get(id)
            .is_some_and(|entry| !entry.value().status.is_finished())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Drop finished jobs whose completion is older than `retention`
    pub fn evict_finished(&self, retention: Duration) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        let cutoff = Utc::now() - retention;
        let before = self.jobs.len();
        self.jobs.retain(|_, job| {
            !(job.status.is_finished() && job.finished_at.is_some_and(|t| t <= cutoff))
        });
        before - self.jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printing::types::JobStatus;
    use photo_printer::{PrintError, PrintOutcome};

    fn job() -> PrintJob {
        PrintJob::queued(Uuid::new_v4(), "lp", (10, 10), 100)
    }

    #[test]
    fn test_insert_get_update() {
        let registry = JobRegistry::new();
        let job = job();
        let id = job.id;
        registry.insert(job);

        assert_eq!(registry.get(&id).unwrap().status, JobStatus::Queued);
        assert_eq!(registry.active_count(), 1);

        assert!(registry.update(&id, |j| j.mark_printing()));
        assert_eq!(registry.get(&id).unwrap().status, JobStatus::Printing);
        assert!(registry.is_active(&id));

        registry.update(&id, |j| j.mark_failed(&PrintError::command("offline")));
        assert!(!registry.is_active(&id));
        assert!(!registry.is_active(&Uuid::new_v4()));

        assert!(!registry.update(&Uuid::new_v4(), |j| j.mark_printing()));
        assert!(registry.get(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let registry = JobRegistry::new();
        let mut older = job();
        older.created_at = Utc::now() - chrono::Duration::seconds(30);
        let newer = job();
        let (older_id, newer_id) = (older.id, newer.id);
        registry.insert(older);
        registry.insert(newer);

        let ids: Vec<Uuid> = registry.list().iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![newer_id, older_id]);
    }

    #[test]
    fn test_evict_only_old_finished_jobs() {
        let registry = JobRegistry::new();

        let active = job();
        let mut fresh = job();
        fresh.mark_completed(&PrintOutcome {
            exit_code: Some(0),
            output: None,
            elapsed_ms: 5,
        });
        let mut stale = fresh.clone();
        stale.id = Uuid::new_v4();
        stale.finished_at = Some(Utc::now() - chrono::Duration::hours(2));

        let (active_id, fresh_id) = (active.id, fresh.id);
        registry.insert(active);
        registry.insert(fresh);
        registry.insert(stale);

        assert_eq!(registry.evict_finished(Duration::from_secs(3600)), 1);
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&active_id).is_some());
        assert!(registry.get(&fresh_id).is_some());
    }
}
