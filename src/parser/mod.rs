//! Strategy extraction
//!
//! Turns free-text policy descriptions into a [`StrategyConfig`].
//! The default extractor is a keyword/regex heuristic; anything smarter
//! (an LLM chain, a form parser) plugs in behind the same trait.

use crate::models::StrategyConfig;
use async_trait::async_trait;
use serde::Serialize;

pub mod heuristic;
pub use heuristic::RegexPolicyParser;

pub const DEFAULT_POLICY_NAME: &str = "Quant Policy";

/// Output of a parser: the structured strategy plus the text it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPolicy {
    pub strategy: StrategyConfig,
    pub prompt: String,
    pub name: String,
}

/// Trait for prompt → strategy extraction
///
/// Implementations must not fail: unparsed fields fall back to defaults.
#[async_trait]
pub trait PolicyParser: Send + Sync {
    async fn parse(&self, prompt: &str, name: Option<&str>) -> ParsedPolicy;
}

/// Resolve the display name for a policy
pub(crate) fn policy_name(name: Option<&str>) -> String {
    match name {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        _ => DEFAULT_POLICY_NAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_name_defaults() {
        assert_eq!(policy_name(None), DEFAULT_POLICY_NAME);
        assert_eq!(policy_name(Some("   ")), DEFAULT_POLICY_NAME);
        assert_eq!(policy_name(Some(" Golden Cross ")), "Golden Cross");
    }
}
