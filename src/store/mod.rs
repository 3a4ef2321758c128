//! Policy persistence layer
//!
//! Policies are append-only: added once, read many times, never mutated.

use crate::models::{Policy, StrategyConfig};
use crate::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod json;
pub use json::JsonPolicyStore;

/// Trait for policy persistence
#[async_trait::async_trait]
pub trait PolicyStore: Send + Sync {
    /// Insert a new record. Ids are caller-generated and not checked for duplicates.
    async fn add(&self, id: Uuid, prompt: &str, strategy: StrategyConfig, name: &str) -> Result<Policy>;
    async fn get(&self, id: Uuid) -> Result<Option<Policy>>;
    /// All records in insertion order
    async fn list(&self) -> Result<Vec<Policy>>;
}

/// In-memory policy store for tests and throwaway deployments
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    policies: Arc<RwLock<Vec<Policy>>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn add(&self, id: Uuid, prompt: &str, strategy: StrategyConfig, name: &str) -> Result<Policy> {
        let policy = Policy {
            id,
            prompt: prompt.to_string(),
            name: name.to_string(),
            strategy,
        };
        self.policies.write().await.push(policy.clone());
        Ok(policy)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Policy>> {
        let policies = self.policies.read().await;
        Ok(policies.iter().find(|p| p.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Policy>> {
        Ok(self.policies.read().await.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn strategy(ticker: &str) -> StrategyConfig {
        StrategyConfig {
            ticker: ticker.to_string(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            short_window: 20,
            long_window: 50,
            initial_cash: 10_000.0,
        }
    }

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let store = InMemoryPolicyStore::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        store.add(first, "buy AAPL", strategy("AAPL"), "one").await.unwrap();
        store.add(second, "buy MSFT", strategy("MSFT"), "two").await.unwrap();

        let found = store.get(second).await.unwrap().unwrap();
        assert_eq!(found.strategy.ticker, "MSFT");
        assert_eq!(found.name, "two");
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());

        let ids: Vec<Uuid> = store.list().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first, second]);
    }
}
