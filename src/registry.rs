use std::sync::{Arc, Mutex};

use crate::job::DownloadJob;
use crate::lock;
use crate::model::JobId;

/// Jobs in creation order.
///
/// Membership only controls visibility: removing a job never stops it.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<Vec<Arc<DownloadJob>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends unless the same job is already present.
    pub fn append(&self, job: Arc<DownloadJob>) {
        let mut jobs = lock(&self.jobs);
        if jobs.iter().any(|j| Arc::ptr_eq(j, &job)) {
            return;
        }
        jobs.push(job);
    }

    /// Removes by identity; `None` if the job was not present.
    pub fn remove(&self, id: JobId) -> Option<Arc<DownloadJob>> {
        let mut jobs = lock(&self.jobs);
        let pos = jobs.iter().position(|j| j.id() == id)?;
        Some(jobs.remove(pos))
    }

    pub fn get(&self, id: JobId) -> Option<Arc<DownloadJob>> {
        lock(&self.jobs).iter().find(|j| j.id() == id).cloned()
    }

    pub fn contains(&self, id: JobId) -> bool {
        lock(&self.jobs).iter().any(|j| j.id() == id)
    }

    pub fn len(&self) -> usize {
        lock(&self.jobs).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.jobs).is_empty()
    }

    /// Snapshot of the current contents, in creation order.
    pub fn snapshot(&self) -> Vec<Arc<DownloadJob>> {
        lock(&self.jobs).clone()
    }

    /// Iterates a snapshot; later appends/removals don't affect it.
    pub fn iter_in_order(&self) -> std::vec::IntoIter<Arc<DownloadJob>> {
        self.snapshot().into_iter()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::runtime::Handle;

    use super::*;
    use crate::events;
    use crate::test_helpers::{ScriptedTransfer, metadata, settings};

    fn job(id: u64) -> Arc<DownloadJob> {
        let (sink, _rx) = events::channel();
        DownloadJob::new(
            JobId(id),
            metadata(&format!("video {id}")),
            &settings(),
            Arc::new(ScriptedTransfer::new()),
            sink,
            Handle::current(),
        )
    }

    fn ids(registry: &JobRegistry) -> Vec<u64> {
        registry.iter_in_order().map(|j| j.id().0).collect()
    }

    #[tokio::test]
    async fn keeps_creation_order() {
        let registry = JobRegistry::new();
        for id in 1..=3 {
            registry.append(job(id));
        }
        assert_eq!(ids(&registry), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn same_job_is_not_added_twice() {
        let registry = JobRegistry::new();
        let j = job(1);
        registry.append(Arc::clone(&j));
        registry.append(j);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn remove_by_identity() {
        let registry = JobRegistry::new();
        for id in 1..=3 {
            registry.append(job(id));
        }
        let removed = registry.remove(JobId(2)).expect("job 2 present");
        assert_eq!(removed.id(), JobId(2));
        assert_eq!(ids(&registry), vec![1, 3]);
        assert!(registry.remove(JobId(2)).is_none());
        assert!(!registry.contains(JobId(2)));
    }

    #[tokio::test]
    async fn iteration_is_a_snapshot() {
        let registry = JobRegistry::new();
        registry.append(job(1));
        let iter = registry.iter_in_order();
        registry.append(job(2));
        registry.remove(JobId(1));
        let seen: Vec<u64> = iter.map(|j| j.id().0).collect();
        assert_eq!(seen, vec![1]);
        assert_eq!(ids(&registry), vec![2]);
    }
}
