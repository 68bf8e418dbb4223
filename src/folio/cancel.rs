//! Cooperative cancellation and the single active-search registry.
//!
//! Searches never get killed. They poll their [`CancelToken`] between store
//! visits and page fetches and bail out with [`FolioError::Cancelled`].
//! [`SearchJobs`] makes sure only the newest search can deliver a result:
//! starting a job cancels every job still registered, and delivery happens
//! under the same lock, so a superseded job can never slip its result out.

use crate::error::{FolioError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(FolioError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Handle for one registered search.
#[derive(Debug, Clone)]
pub struct SearchJob {
    id: u64,
    token: CancelToken,
}

impl SearchJob {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

#[derive(Debug)]
struct JobTable<T> {
    next_id: u64,
    running: HashMap<u64, CancelToken>,
    latest: Option<T>,
}

/// Registry of running searches. `T` is whatever a finished search delivers;
/// the most recently delivered value is kept for later inspection.
#[derive(Debug)]
pub struct SearchJobs<T> {
    inner: Arc<Mutex<JobTable<T>>>,
}

impl<T> Clone for SearchJobs<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SearchJobs<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SearchJobs<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(JobTable {
                next_id: 1,
                running: HashMap::new(),
                latest: None,
            })),
        }
    }

    fn table(&self) -> MutexGuard<'_, JobTable<T>> {
        // A panicking observer must not wedge every later search.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cancels every running job, then registers and returns a new one.
    pub fn begin(&self) -> SearchJob {
        let mut table = self.table();
        for (id, token) in table.running.drain() {
            debug!("Superseding search job {}", id);
            token.cancel();
        }
        let id = table.next_id;
        table.next_id += 1;
        let token = CancelToken::new();
        table.running.insert(id, token.clone());
        SearchJob { id, token }
    }

    /// Delivers `value` through `deliver` unless the job was cancelled.
    ///
    /// Returns whether delivery happened. The job is deregistered either way.
    pub fn finish<F>(&self, job: &SearchJob, value: T, deliver: F) -> bool
    where
        F: FnOnce(&T),
    {
        let mut table = self.table();
        table.running.remove(&job.id);
        if job.token.is_cancelled() {
            debug!("Dropping result of cancelled search job {}", job.id);
            return false;
        }
        deliver(&value);
        table.latest = Some(value);
        true
    }

    /// Deregisters a job that ended without a result.
    pub fn abandon(&self, job: &SearchJob) {
        self.table().running.remove(&job.id);
    }

    pub fn cancel_all(&self) {
        let mut table = self.table();
        for (_, token) in table.running.drain() {
            token.cancel();
        }
    }

    pub fn running(&self) -> usize {
        self.table().running.len()
    }

    pub fn latest(&self) -> Option<T>
    where
        T: Clone,
    {
        self.table().latest.clone()
    }
}
