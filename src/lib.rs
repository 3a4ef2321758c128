//! DeepQuant backtest agent
//!
//! Turns plain-text strategy prompts into moving-average crossover backtests:
//! - Parses prompts into a `StrategyConfig` (ticker, dates, windows, cash)
//! - Persists parsed prompts as policies in a JSON document store
//! - Fetches daily closes from Yahoo Finance, falling back to synthetic data
//! - Runs each backtest as a background job with pollable progress
//!
//! PIPELINE:
//! PROMPT → PARSE → STORE → QUEUE → FETCH → INDICATORS → SIMULATE → SUMMARIZE

pub mod agent;
pub mod api;
pub mod backtest;
pub mod catalog;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod market_data;
pub mod models;
pub mod parser;
pub mod progress;
pub mod store;

pub use error::Result;

// Re-export common types
pub use agent::DeepQuantAgent;
pub use config::Settings;
pub use models::*;
