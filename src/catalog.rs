//! Agent catalog and registry
//!
//! Agents are registered explicitly at startup. Each one is addressed by a
//! URL slug (`deep-quant`), derived from its package name (`deep_quant`),
//! and its routes are mounted under `/api/agents/{slug}`.

use std::collections::BTreeMap;

pub const DEEPQUANT_SLUG: &str = "deepquant";

/// `deep_quant` → `deep-quant`
pub fn package_to_slug(package: &str) -> String {
    package.trim().to_lowercase().replace('_', "-")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDescriptor {
    pub slug: String,
    pub package: String,
    pub description: String,
}

impl AgentDescriptor {
    pub fn new(package: &str, description: &str) -> Self {
        Self {
            slug: package_to_slug(package),
            package: package.to_string(),
            description: description.to_string(),
        }
    }

    /// Mount point of this agent's routes
    pub fn mount_path(&self) -> String {
        format!("/api/agents/{}", self.slug)
    }
}

/// Registered agents keyed by slug
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    agents: BTreeMap<String, AgentDescriptor>,
}

impl AgentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every agent this crate ships
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(AgentDescriptor::new(
            DEEPQUANT_SLUG,
            "Moving-average crossover backtests from plain-text strategy prompts",
        ));
        catalog
    }

    /// Re-registering a slug replaces the previous entry
    pub fn register(&mut self, agent: AgentDescriptor) {
        self.agents.insert(agent.slug.clone(), agent);
    }

    /// Look up by slug or package name
    pub fn get(&self, name: &str) -> Option<&AgentDescriptor> {
        self.agents.get(&package_to_slug(name))
    }

    /// Slugs in sorted order
    pub fn slugs(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    pub fn list(&self) -> Vec<&AgentDescriptor> {
        self.agents.values().collect()
    }
}
