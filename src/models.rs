//! Core data models for the backtest agent

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

//
// ================= Strategy =================
//

/// Moving-average crossover configuration for a single ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub short_window: usize,
    pub long_window: usize,
    pub initial_cash: f64,
}

impl StrategyConfig {
    /// Reject configurations the runner cannot simulate.
    ///
    /// `short_window < long_window` is not required here.
    pub fn validate(&self) -> crate::Result<()> {
        if self.short_window == 0 || self.long_window == 0 {
            return Err(crate::error::DeepQuantError::InvalidStrategy(format!(
                "moving-average windows must be positive (short={}, long={})",
                self.short_window, self.long_window
            )));
        }
        if !self.initial_cash.is_finite() || self.initial_cash < 0.0 {
            return Err(crate::error::DeepQuantError::InvalidStrategy(format!(
                "initial cash must be a non-negative amount, got {}",
                self.initial_cash
            )));
        }
        Ok(())
    }
}

//
// ================= Policy =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: Uuid,
    pub prompt: String,
    pub name: String,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRequest {
    pub prompt: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResponse {
    pub policy_id: Uuid,
    pub strategy: StrategyConfig,
}

//
// ================= Market Data =================
//

/// One daily close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
}

//
// ================= Backtest =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    /// Existing stored policy id
    #[serde(default)]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// YYYY-MM-DD
    pub date: String,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub policy_id: Option<Uuid>,
    pub summary: BTreeMap<String, f64>,
    pub equity_curve: Vec<EquityPoint>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Snapshot of a backtest job as seen by pollers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestStatus {
    pub job_id: Uuid,
    pub status: JobState,
    pub progress: f64,
    pub message: String,
    pub result: Option<BacktestResult>,
}

impl BacktestStatus {
    pub fn pending(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: JobState::Pending,
            progress: 0.0,
            message: "Queued".to_string(),
            result: None,
        }
    }

    pub fn running(job_id: Uuid, progress: f64, message: impl Into<String>) -> Self {
        Self {
            job_id,
            status: JobState::Running,
            progress: (progress.clamp(0.0, 1.0) * 1000.0).round() / 1000.0,
            message: message.into(),
            result: None,
        }
    }

    pub fn completed(job_id: Uuid, result: BacktestResult) -> Self {
        Self {
            job_id,
            status: JobState::Completed,
            progress: 1.0,
            message: "Done".to_string(),
            result: Some(result),
        }
    }

    pub fn failed(job_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            job_id,
            status: JobState::Failed,
            progress: 1.0,
            message: message.into(),
            result: None,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy() -> StrategyConfig {
        StrategyConfig {
            ticker: "AAPL".to_string(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            short_window: 20,
            long_window: 50,
            initial_cash: 10_000.0,
        }
    }

    #[test]
    fn test_strategy_dates_serialize_as_iso() {
        let value = serde_json::to_value(strategy()).unwrap();
        assert_eq!(value["start_date"], "2020-01-01");
        assert_eq!(value["end_date"], "2024-01-01");
    }

    #[test]
    fn test_strategy_validation() {
        assert!(strategy().validate().is_ok());

        let mut zero_window = strategy();
        zero_window.short_window = 0;
        assert!(zero_window.validate().is_err());

        let mut negative_cash = strategy();
        negative_cash.initial_cash = -1.0;
        assert!(negative_cash.validate().is_err());
    }

    #[test]
    fn test_job_state_serialization() {
        let status = BacktestStatus::pending(Uuid::new_v4());
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["progress"], 0.0);
        assert!(value["result"].is_null());
    }

    #[test]
    fn test_running_progress_is_clamped_and_rounded() {
        let id = Uuid::new_v4();
        assert_eq!(BacktestStatus::running(id, 1.7, "x").progress, 1.0);
        assert_eq!(BacktestStatus::running(id, 0.61234, "x").progress, 0.612);
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Pending.is_terminal());
    }
}
