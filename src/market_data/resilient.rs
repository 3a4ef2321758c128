//! Fallback decorator over a primary market data source

use super::{MarketDataSource, SyntheticSource};
use crate::error::DeepQuantError;
use crate::models::PriceBar;
use crate::progress::{self, ProgressCallback};
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

/// Progress reported when the synthetic series replaces live data
pub const FALLBACK_PROGRESS: f64 = 0.2;

/// When synthetic data may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Skip the primary source entirely
    pub use_sample: bool,
    /// Substitute synthetic data when the primary fails or returns nothing
    pub allow_fallback: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            use_sample: false,
            allow_fallback: true,
        }
    }
}

/// Delegates to `primary`; degrades to `fallback` according to `policy`.
///
/// Cheap to clone: each job takes its own copy via [`ResilientSource::with_progress`].
#[derive(Clone)]
pub struct ResilientSource {
    primary: Arc<dyn MarketDataSource>,
    fallback: SyntheticSource,
    policy: FallbackPolicy,
    progress: ProgressCallback,
}

impl ResilientSource {
    pub fn new(primary: Arc<dyn MarketDataSource>, policy: FallbackPolicy) -> Self {
        Self {
            primary,
            fallback: SyntheticSource::new(),
            policy,
            progress: progress::noop(),
        }
    }

    pub fn with_fallback(mut self, fallback: SyntheticSource) -> Self {
        self.fallback = fallback;
        self
    }

    /// Copy of this source that reports fallback events to `progress`
    pub fn with_progress(&self, progress: ProgressCallback) -> Self {
        Self {
            progress,
            ..self.clone()
        }
    }

    fn synthetic(&self, start: NaiveDate, end: NaiveDate, reason: &str) -> Vec<PriceBar> {
        let bars = self.fallback.generate(start, end);
        (self.progress)(FALLBACK_PROGRESS, &format!("Using sample data ({})", reason));
        bars
    }
}

#[async_trait]
impl MarketDataSource for ResilientSource {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
        if self.policy.use_sample {
            info!(ticker, "Sample data enabled, skipping live fetch");
            return Ok(self.synthetic(start, end, "sample data enabled"));
        }

        let allow_fallback = self.policy.allow_fallback;

        match self.primary.fetch(ticker, start, end).await {
            Ok(bars) if !bars.is_empty() => Ok(bars),
            Ok(_) => {
                if allow_fallback {
                    warn!(ticker, source = self.primary.name(), "Empty response, using sample data");
                    return Ok(self.synthetic(start, end, "empty response"));
                }
                Err(DeepQuantError::MarketData(format!(
                    "No data returned for {}. Check ticker spelling, date range, or network connectivity.",
                    ticker
                )))
            }
            Err(e) => {
                if allow_fallback {
                    warn!(ticker, source = self.primary.name(), error = %e, "Live fetch failed, using sample data");
                    return Ok(self.synthetic(start, end, &e.to_string()));
                }
                Err(DeepQuantError::MarketData(format!(
                    "Failed to download data for {}: {}",
                    ticker, e
                )))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Primary that always fails, counting calls
    pub(crate) struct FailingSource {
        pub calls: AtomicUsize,
    }

    impl FailingSource {
        pub fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MarketDataSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self, _: &str, _: NaiveDate, _: NaiveDate) -> Result<Vec<PriceBar>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(DeepQuantError::MarketData("connection refused".to_string()))
        }
    }

    struct EmptySource;

    #[async_trait]
    impl MarketDataSource for EmptySource {
        fn name(&self) -> &str {
            "empty"
        }

        async fn fetch(&self, _: &str, _: NaiveDate, _: NaiveDate) -> Result<Vec<PriceBar>> {
            Ok(Vec::new())
        }
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
        )
    }

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<(f64, String)>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let cb: ProgressCallback = Arc::new(move |p: f64, m: &str| sink.lock().unwrap().push((p, m.to_string())));
        (cb, events)
    }

    #[tokio::test]
    async fn test_falls_back_and_reports_reason() {
        let (cb, events) = recorder();
        let source = ResilientSource::new(Arc::new(FailingSource::new()), FallbackPolicy::default())
            .with_progress(cb);
        let (start, end) = range();

        let bars = source.fetch("AAPL", start, end).await.unwrap();
        assert!(!bars.is_empty());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, FALLBACK_PROGRESS);
        assert!(events[0].1.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_fallback_disabled_surfaces_error() {
        let policy = FallbackPolicy {
            use_sample: false,
            allow_fallback: false,
        };
        let source = ResilientSource::new(Arc::new(FailingSource::new()), policy);
        let (start, end) = range();

        let err = source.fetch("AAPL", start, end).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Failed to download data for AAPL"));
        assert!(message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_empty_response() {
        let (start, end) = range();

        let lenient = ResilientSource::new(Arc::new(EmptySource), FallbackPolicy::default());
        assert!(!lenient.fetch("ZZZZ", start, end).await.unwrap().is_empty());

        let strict = ResilientSource::new(
            Arc::new(EmptySource),
            FallbackPolicy {
                use_sample: false,
                allow_fallback: false,
            },
        );
        let err = strict.fetch("ZZZZ", start, end).await.unwrap_err();
        assert!(err.to_string().contains("No data returned for ZZZZ"));
    }

    #[tokio::test]
    async fn test_use_sample_skips_primary() {
        let primary = Arc::new(FailingSource::new());
        let policy = FallbackPolicy {
            use_sample: true,
            allow_fallback: false,
        };
        let source = ResilientSource::new(primary.clone(), policy)
            .with_fallback(SyntheticSource::with_seed(1));
        let (start, end) = range();

        let bars = source.fetch("AAPL", start, end).await.unwrap();
        assert_eq!(bars, SyntheticSource::with_seed(1).generate(start, end));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }
}
