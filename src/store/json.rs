//! JSON document store for policies
//!
//! On-disk layout is a single table of numbered documents:
//!
//! ```json
//! {"_default": {"1": {"id": "...", "prompt": "...", "name": "...", "strategy": {...}}}}
//! ```
//!
//! The whole file is rewritten through a temp file and rename on every insert.

use super::PolicyStore;
use crate::error::DeepQuantError;
use crate::models::{Policy, StrategyConfig};
use crate::Result;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

const TABLE: &str = "_default";

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(rename = "_default", default)]
    table: HashMap<String, Policy>,
}

/// Serializes records as `{"_default": {"1": .., "2": ..}}` in insertion order
struct DocumentRef<'a>(&'a [Policy]);

struct TableRef<'a>(&'a [Policy]);

impl Serialize for DocumentRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(TABLE, &TableRef(self.0))?;
        map.end()
    }
}

impl Serialize for TableRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .iter()
                .enumerate()
                .map(|(i, policy)| ((i + 1).to_string(), policy)),
        )
    }
}

pub struct JsonPolicyStore {
    path: PathBuf,
    policies: RwLock<Vec<Policy>>,
}

impl JsonPolicyStore {
    /// Open (or create) the collection at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let policies = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => Vec::new(),
            Ok(contents) => parse_document(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), policies = policies.len(), "Policy store opened");

        Ok(Self {
            path,
            policies: RwLock::new(policies),
        })
    }

    async fn persist(&self, policies: &[Policy]) -> Result<()> {
        let body = serde_json::to_vec(&DocumentRef(policies))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn parse_document(contents: &str) -> Result<Vec<Policy>> {
    let document: Document = serde_json::from_str(contents)?;

    let mut numbered = document
        .table
        .into_iter()
        .map(|(key, policy)| {
            key.parse::<u64>()
                .map(|n| (n, policy))
                .map_err(|_| DeepQuantError::Store(format!("invalid document id '{}'", key)))
        })
        .collect::<Result<Vec<_>>>()?;

    numbered.sort_by_key(|(n, _)| *n);
    Ok(numbered.into_iter().map(|(_, policy)| policy).collect())
}

#[async_trait::async_trait]
impl PolicyStore for JsonPolicyStore {
    async fn add(&self, id: Uuid, prompt: &str, strategy: StrategyConfig, name: &str) -> Result<Policy> {
        // serde_json writes non-finite floats as null, which the loader rejects
        strategy.validate()?;

        let policy = Policy {
            id,
            prompt: prompt.to_string(),
            name: name.to_string(),
            strategy,
        };

        let mut policies = self.policies.write().await;
        policies.push(policy.clone());
        if let Err(e) = self.persist(&policies).await {
            policies.pop();
            return Err(DeepQuantError::Store(format!(
                "failed to write {}: {}",
                self.path.display(),
                e
            )));
        }

        debug!(policy_id = %id, "Policy stored");
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
