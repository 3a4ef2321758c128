//! Synthetic price series
//!
//! Business-day calendar (Mon–Fri, holidays ignored) with a bounded random
//! walk starting at 100. Used when live data is disabled or unavailable.

use super::MarketDataSource;
use crate::models::PriceBar;
use crate::Result;
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const START_PRICE: f64 = 100.0;
pub const MIN_PRICE: f64 = 5.0;
const MIN_DRIFT: f64 = -0.5;
const MAX_DRIFT: f64 = 0.7;

#[derive(Debug, Clone, Default)]
pub struct SyntheticSource {
    seed: Option<u64>,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self { seed: None }
    }

    /// Same seed, same series
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    pub fn generate(&self, start: NaiveDate, end: NaiveDate) -> Vec<PriceBar> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut price = START_PRICE;
        business_days(start, end)
            .into_iter()
            .map(|date| {
                price = (price + rng.gen_range(MIN_DRIFT..MAX_DRIFT)).max(MIN_PRICE);
                PriceBar { date, close: price }
            })
            .collect()
    }
}

#[async_trait]
impl MarketDataSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn fetch(&self, _ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
        Ok(self.generate(start, end))
    }
}

/// Weekdays from `start` to `end`, both inclusive
pub fn business_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
        day += Duration::days(1);
    }
    days
}
