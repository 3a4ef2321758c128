//! Background execution of backtest jobs
//!
//! Submission pushes a [`BacktestJob`] onto an unbounded channel. A single
//! worker task drains the channel and runs each job on its own task, so jobs
//! execute independently. Every outcome, including a panic inside the runner,
//! ends as a terminal status in the registry.

use super::JobRegistry;
use crate::backtest::BacktestRunner;
use crate::error::DeepQuantError;
use crate::market_data::ResilientSource;
use crate::models::{BacktestStatus, StrategyConfig};
use crate::progress::ProgressCallback;
use crate::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// One unit of queued work
#[derive(Debug, Clone)]
pub struct BacktestJob {
    pub job_id: Uuid,
    pub policy_id: Uuid,
    pub strategy: StrategyConfig,
}

/// Submission handle; cloning shares the same queue
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<BacktestJob>,
}

impl JobQueue {
    pub fn enqueue(&self, job: BacktestJob) -> Result<()> {
        self.tx.send(job).map_err(|_| DeepQuantError::QueueClosed)
    }
}

#[derive(Clone)]
pub struct BacktestWorker {
    registry: Arc<JobRegistry>,
    data: ResilientSource,
}

impl BacktestWorker {
    pub fn new(registry: Arc<JobRegistry>, data: ResilientSource) -> Self {
        Self { registry, data }
    }

    /// Start the worker loop on the current tokio runtime
    pub fn spawn(self) -> JobQueue {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(self.drain(rx));
        JobQueue { tx }
    }

    async fn drain(self, mut rx: mpsc::UnboundedReceiver<BacktestJob>) {
        info!("Backtest worker started");
        while let Some(job) = rx.recv().await {
            let worker = self.clone();
            tokio::spawn(async move { worker.execute(job).await });
        }
        info!("Job queue closed, backtest worker stopping");
    }

    /// Run one job to a terminal status
    pub async fn execute(&self, job: BacktestJob) {
        let job_id = job.job_id;
        info!(%job_id, ticker = %job.strategy.ticker, "Starting backtest job");

        let registry = self.registry.clone();
        let progress: ProgressCallback = Arc::new(move |pct: f64, message: &str| {
            if let Err(e) = registry.update(job_id, BacktestStatus::running(job_id, pct, message)) {
                warn!(%job_id, error = %e, "Dropping progress update");
            }
        });

        let source = Arc::new(self.data.with_progress(progress.clone()));
        let runner = BacktestRunner::new(source).with_progress(progress);

        let task = tokio::spawn(async move {
            runner.run(&job.strategy, Some(job.policy_id)).await
        });

        let status = match task.await {
            Ok(Ok(result)) => {
                info!(%job_id, "Backtest job completed");
                BacktestStatus::completed(job_id, result)
            }
            Ok(Err(e)) => {
                warn!(%job_id, error = %e, "Backtest job failed");
                BacktestStatus::failed(job_id, e.to_string())
            }
            Err(e) => {
                error!(%job_id, error = %e, "Backtest task aborted");
                BacktestStatus::failed(job_id, format!("Backtest task aborted: {}", e))
            }
        };

        if let Err(e) = self.registry.update(job_id, status) {
            error!(%job_id, error = %e, "Could not record job outcome");
        }
    }
}
