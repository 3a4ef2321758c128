//! Backtest job tracking
//!
//! The registry is the only owner of job state. The worker writes through
//! [`JobRegistry::update`]; pollers read through [`JobRegistry::get`].

use crate::error::DeepQuantError;
use crate::models::BacktestStatus;
use crate::Result;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

pub mod worker;
pub use worker::{BacktestJob, BacktestWorker, JobQueue};

/// Job id → latest status, behind a single mutex.
///
/// The lock is held only for the map operation itself.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<Uuid, BacktestStatus>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, BacktestStatus>> {
        // A panic while holding the lock cannot leave the map half-written
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new job in the pending state
    pub fn create(&self, job_id: Uuid) -> Result<BacktestStatus> {
        let status = BacktestStatus::pending(job_id);
        let mut jobs = self.lock();
        if jobs.contains_key(&job_id) {
            return Err(DeepQuantError::DuplicateJob(job_id));
        }
        jobs.insert(job_id, status.clone());
        Ok(status)
    }

    /// Replace the stored status wholesale; transitions are not validated
    pub fn update(&self, job_id: Uuid, status: BacktestStatus) -> Result<()> {
        let mut jobs = self.lock();
        match jobs.get_mut(&job_id) {
            Some(slot) => {
                *slot = status;
                Ok(())
            }
            None => Err(DeepQuantError::JobNotFound(job_id)),
        }
    }

    pub fn get(&self, job_id: Uuid) -> Result<BacktestStatus> {
        self.lock()
            .get(&job_id)
            .cloned()
            .ok_or(DeepQuantError::JobNotFound(job_id))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
