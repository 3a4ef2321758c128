//! DeepQuant agent service
//!
//! Composition root for the backtest pipeline: owns the policy parser, the
//! policy store, the job registry and the submission queue. HTTP handlers
//! and the CLI go through [`DeepQuantAgent`] only.
//!
//! SUBMIT → PARSE/LOOKUP → STORE → REGISTER (pending) → ENQUEUE → WORKER

use crate::config::Settings;
use crate::error::DeepQuantError;
use crate::jobs::{BacktestJob, BacktestWorker, JobQueue, JobRegistry};
use crate::market_data::{self, ResilientSource};
use crate::models::{BacktestRequest, BacktestStatus, Policy, PolicyRequest, PolicyResponse, StrategyConfig};
use crate::parser::{PolicyParser, RegexPolicyParser};
use crate::store::{InMemoryPolicyStore, JsonPolicyStore, PolicyStore};
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct DeepQuantAgent {
    parser: Arc<dyn PolicyParser>,
    policies: Arc<dyn PolicyStore>,
    jobs: Arc<JobRegistry>,
    queue: JobQueue,
}

impl DeepQuantAgent {
    pub fn new(
        parser: Arc<dyn PolicyParser>,
        policies: Arc<dyn PolicyStore>,
        jobs: Arc<JobRegistry>,
        queue: JobQueue,
    ) -> Self {
        Self {
            parser,
            policies,
            jobs,
            queue,
        }
    }

    /// Wire the production stack: JSON store, live data with fallback, background worker.
    ///
    /// Must be called inside a tokio runtime; the worker loop is spawned here.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let store = JsonPolicyStore::open(&settings.policy_db_path).await?;
        let data = market_data::from_settings(settings)?;

        info!(
            policy_db = %settings.policy_db_path.display(),
            use_sample_data = settings.use_sample_data,
            allow_sample_fallback = settings.allow_sample_fallback,
            "DeepQuant agent initialized"
        );

        Ok(Self::with_store(Arc::new(store), data))
    }

    /// Volatile policies, for tests and throwaway servers
    pub fn in_memory(data: ResilientSource) -> Self {
        Self::with_store(Arc::new(InMemoryPolicyStore::new()), data)
    }

    fn with_store(policies: Arc<dyn PolicyStore>, data: ResilientSource) -> Self {
        let jobs = Arc::new(JobRegistry::new());
        let queue = BacktestWorker::new(jobs.clone(), data).spawn();
        Self::new(Arc::new(RegexPolicyParser::new()), policies, jobs, queue)
    }

    pub fn jobs(&self) -> &Arc<JobRegistry> {
        &self.jobs
    }

    /// Parse a prompt and persist it as a new policy
    pub async fn create_policy(&self, request: PolicyRequest) -> Result<PolicyResponse> {
        let policy = self.store_prompt(&request.prompt, request.name.as_deref()).await?;
        Ok(PolicyResponse {
            policy_id: policy.id,
            strategy: policy.strategy,
        })
    }

    pub async fn list_policies(&self) -> Result<Vec<Policy>> {
        self.policies.list().await
    }

    pub async fn get_policy(&self, policy_id: Uuid) -> Result<Policy> {
        self.policies
            .get(policy_id)
            .await?
            .ok_or(DeepQuantError::PolicyNotFound(policy_id))
    }

    /// Register a backtest job and hand it to the worker.
    ///
    /// A prompt wins over a policy id when both are given. Every input error
    /// is returned before the job exists; the returned status is the pending
    /// snapshot taken at registration.
    pub async fn submit_backtest(&self, request: BacktestRequest) -> Result<BacktestStatus> {
        let prompt = request.prompt.as_deref().map(str::trim).filter(|p| !p.is_empty());
        let policy_ref = request
            .policy_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        let (policy_id, strategy) = match (prompt, policy_ref) {
            (Some(prompt), _) => {
                let policy = self.store_prompt(prompt, request.name.as_deref()).await?;
                (policy.id, policy.strategy)
            }
            (None, Some(raw_id)) => {
                let policy = self.get_policy(Uuid::parse_str(raw_id)?).await?;
                (policy.id, policy.strategy)
            }
            (None, None) => {
                return Err(DeepQuantError::InvalidRequest(
                    "Provide either prompt or policy_id".to_string(),
                ))
            }
        };

        self.enqueue(policy_id, strategy)
    }

    pub fn backtest_status(&self, job_id: Uuid) -> Result<BacktestStatus> {
        self.jobs.get(job_id)
    }

    async fn store_prompt(&self, prompt: &str, name: Option<&str>) -> Result<Policy> {
        let parsed = self.parser.parse(prompt, name).await;
        let policy = self
            .policies
            .add(Uuid::new_v4(), &parsed.prompt, parsed.strategy, &parsed.name)
            .await?;

        info!(policy_id = %policy.id, ticker = %policy.strategy.ticker, "Policy created");
        Ok(policy)
    }

    fn enqueue(&self, policy_id: Uuid, strategy: StrategyConfig) -> Result<BacktestStatus> {
        let job_id = Uuid::new_v4();
        let status = self.jobs.create(job_id)?;

        let job = BacktestJob {
            job_id,
            policy_id,
            strategy,
        };
        if let Err(e) = self.queue.enqueue(job) {
            warn!(%job_id, error = %e, "Could not enqueue backtest job");
            self.jobs.update(job_id, BacktestStatus::failed(job_id, e.to_string()))?;
            return Err(e);
        }

        info!(%job_id, %policy_id, "Backtest job queued");
        Ok(status)
    }
}
