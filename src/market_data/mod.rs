//! Market data sources
//!
//! - [`YahooSource`]: live daily closes from Yahoo Finance
//! - [`SyntheticSource`]: random-walk closes on a business-day calendar
//! - [`ResilientSource`]: wraps a primary source and falls back to synthetic data

use crate::config::Settings;
use crate::models::PriceBar;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

pub mod resilient;
pub mod synthetic;
pub mod yahoo;

pub use resilient::{FallbackPolicy, ResilientSource};
pub use synthetic::SyntheticSource;
pub use yahoo::YahooSource;

/// Trait for historical price providers
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &str;

    /// Daily closes for `ticker` between `start` and `end`, oldest first
    async fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>>;
}

/// Live Yahoo source behind the fallback policy from `settings`
pub fn from_settings(settings: &Settings) -> Result<ResilientSource> {
    let live = YahooSource::new(settings.market_data_timeout)?;
    Ok(ResilientSource::new(Arc::new(live), settings.fallback_policy()))
}
