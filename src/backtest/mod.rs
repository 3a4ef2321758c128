//! Backtest runner
//!
//! PARSE → LOAD → INDICATORS → SIMULATE → SUMMARIZE
//!
//! Long/flat moving-average crossover: all-in when the short average moves
//! above the long one, all-out when it moves below. No sizing, no costs,
//! no shorting.

use crate::error::DeepQuantError;
use crate::market_data::MarketDataSource;
use crate::models::{BacktestResult, EquityPoint, PriceBar, StrategyConfig};
use crate::progress::{self, ProgressCallback};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub mod indicators;
pub mod metrics;

use indicators::{apply_indicators, SignalBar};

/// Bars between simulation progress checkpoints
const PROGRESS_EVERY: usize = 25;
const SIMULATION_START: f64 = 0.6;
const SIMULATION_SPAN: f64 = 0.3;
const SIMULATION_END: f64 = 0.9;

pub const TRADE_COUNT: &str = "trade_count";

/// Equity curve plus bookkeeping from the simulation stage
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub equity_curve: Vec<EquityPoint>,
    /// Number of entries into the market
    pub trades: usize,
}

/// Runs one strategy against one data source. Holds no state between runs.
pub struct BacktestRunner {
    source: Arc<dyn MarketDataSource>,
    progress: ProgressCallback,
}

impl BacktestRunner {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            source,
            progress: progress::noop(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(&self, strategy: &StrategyConfig, policy_id: Option<Uuid>) -> Result<BacktestResult> {
        self.report(0.1, "Parsing strategy");
        strategy.validate()?;

        info!(
            ticker = %strategy.ticker,
            start = %strategy.start_date,
            end = %strategy.end_date,
            source = self.source.name(),
            "Loading market data"
        );
        let bars = self
            .source
            .fetch(&strategy.ticker, strategy.start_date, strategy.end_date)
            .await?;
        validate_bars(&bars)?;

        self.report(0.4, "Calculating indicators");
        let signals = apply_indicators(&bars, strategy.short_window, strategy.long_window);
        debug!(
            bars = bars.len(),
            usable = signals.len(),
            "Indicators applied"
        );

        self.report(0.6, "Simulating trades");
        let simulation = self.simulate(&signals, strategy.initial_cash);

        self.report(0.9, "Calculating summary statistics");
        let values: Vec<f64> = simulation.equity_curve.iter().map(|p| p.equity).collect();
        let mut summary = metrics::summarize(&values);
        if !values.is_empty() {
            summary.insert(TRADE_COUNT.to_string(), simulation.trades as f64);
        }

        self.report(1.0, "Completed");
        info!(
            ticker = %strategy.ticker,
            points = simulation.equity_curve.len(),
            trades = simulation.trades,
            "Backtest completed"
        );

        Ok(BacktestResult {
            policy_id,
            summary,
            equity_curve: simulation.equity_curve,
        })
    }

    /// Bar-by-bar long/flat simulation.
    ///
    /// Trades fire only when the signal differs from the last distinct signal
    /// seen, so a repeated signal never re-enters.
    pub fn simulate(&self, signals: &[SignalBar], initial_cash: f64) -> Simulation {
        let mut cash = initial_cash;
        let mut position = 0.0_f64;
        let mut last_signal = 0_i8;
        let mut trades = 0;
        let mut equity_curve = Vec::with_capacity(signals.len());

        for bar in signals {
            let price = bar.close;

            if bar.signal != last_signal {
                if bar.signal == 1 && position == 0.0 {
                    position = cash / price;
                    cash = 0.0;
                    trades += 1;
                } else if bar.signal == -1 && position > 0.0 {
                    cash = position * price;
                    position = 0.0;
                }
                last_signal = bar.signal;
            }

            let date = bar.date.format("%Y-%m-%d").to_string();
            equity_curve.push(EquityPoint {
                date,
                equity: cash + position * price,
            });

            if equity_curve.len() % PROGRESS_EVERY == 0 {
                let pct = SIMULATION_START
                    + SIMULATION_SPAN * (equity_curve.len() as f64 / signals.len() as f64);
                let message = format!("Simulating {}", bar.date.format("%Y-%m-%d"));
                self.report(pct.min(SIMULATION_END), &message);
            }
        }

        if position > 0.0 {
            if let (Some(last_bar), Some(last_point)) = (signals.last(), equity_curve.last_mut()) {
                last_point.equity = position * last_bar.close;
            }
        }

        Simulation {
            equity_curve,
            trades,
        }
    }

    fn report(&self, progress: f64, message: &str) {
        (self.progress)(progress, message);
    }
}

fn validate_bars(bars: &[PriceBar]) -> Result<()> {
    if let Some(bad) = bars.iter().find(|b| !b.close.is_finite() || b.close <= 0.0) {
        return Err(DeepQuantError::Backtest(format!(
            "invalid close {} on {}",
            bad.close, bad.date
        )));
    }
    if bars.windows(2).any(|w| w[0].date > w[1].date) {
        return Err(DeepQuantError::Backtest(
            "price series is not in chronological order".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::SyntheticSource;
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate};
    use std::sync::Mutex;

    /// Serves a fixed close series on consecutive days
    struct FixedSource {
        closes: Vec<f64>,
    }

    #[async_trait]
    impl MarketDataSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self, _: &str, start: NaiveDate, _: NaiveDate) -> Result<Vec<PriceBar>> {
            Ok(self
                .closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PriceBar {
                    date: start + Duration::days(i as i64),
                    close,
                })
                .collect())
        }
    }

    fn strategy(short: usize, long: usize) -> StrategyConfig {
        StrategyConfig {
            ticker: "TEST".to_string(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            short_window: short,
            long_window: long,
            initial_cash: 1000.0,
        }
    }

    fn signal_bars(rows: &[(f64, i8)]) -> Vec<SignalBar> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        rows.iter()
            .enumerate()
            .map(|(i, &(close, signal))| SignalBar {
                date: start + Duration::days(i as i64),
                close,
                sma_short: 0.0,
                sma_long: 0.0,
                signal,
            })
            .collect()
    }

    fn runner() -> BacktestRunner {
        BacktestRunner::new(Arc::new(FixedSource { closes: vec![] }))
    }

    #[test]
    fn test_enter_and_exit_on_transitions() {
        let sim = runner().simulate(
            &signal_bars(&[(10.0, 0), (10.0, 1), (20.0, 1), (15.0, -1), (30.0, -1)]),
            100.0,
        );
        let equity: Vec<f64> = sim.equity_curve.iter().map(|p| p.equity).collect();
        assert_eq!(equity, vec![100.0, 100.0, 200.0, 150.0, 150.0]);
        assert_eq!(sim.trades, 1);
    }

    #[test]
    fn test_final_liquidation_overwrites_last_point() {
        let sim = runner().simulate(&signal_bars(&[(10.0, 1), (12.0, 1), (15.0, 1)]), 100.0);
        assert_eq!(sim.equity_curve.last().unwrap().equity, 150.0);
        assert_eq!(sim.equity_curve.len(), 3);
    }

    #[test]
    fn test_neutral_signal_resets_transition_tracking() {
        // 1 → 0 → 1: the second +1 is a transition but we are still invested
        let sim = runner().simulate(
            &signal_bars(&[(10.0, 1), (10.0, 0), (20.0, 1), (10.0, -1), (5.0, 1)]),
            100.0,
        );
        let equity: Vec<f64> = sim.equity_curve.iter().map(|p| p.equity).collect();
        // exit at 10 (100 cash), re-enter at 5, liquidate at 5 → 100
        assert_eq!(equity, vec![100.0, 100.0, 200.0, 100.0, 100.0]);
        assert_eq!(sim.trades, 2);
    }

    #[test]
    fn test_sell_signal_while_flat_is_ignored() {
        let sim = runner().simulate(&signal_bars(&[(10.0, -1), (20.0, -1), (5.0, 1)]), 50.0);
        let equity: Vec<f64> = sim.equity_curve.iter().map(|p| p.equity).collect();
        assert_eq!(equity, vec![50.0, 50.0, 50.0]);
    }

    #[test]
    fn test_dates_are_formatted_and_ordered() {
        let sim = runner().simulate(&signal_bars(&[(1.0, 0), (1.0, 0)]), 1.0);
        assert_eq!(sim.equity_curve[0].date, "2020-01-01");
        assert_eq!(sim.equity_curve[1].date, "2020-01-02");
    }

    #[tokio::test]
    async fn test_run_constant_prices() {
        let source = Arc::new(FixedSource {
            closes: vec![50.0; 40],
        });
        let result = BacktestRunner::new(source)
            .run(&strategy(3, 5), None)
            .await
            .unwrap();

        assert_eq!(result.equity_curve.len(), 36);
        assert_eq!(result.summary[metrics::TOTAL_RETURN_PCT], 0.0);
        assert_eq!(result.summary[metrics::MAX_DRAWDOWN_PCT], 0.0);
        assert_eq!(result.summary[TRADE_COUNT], 0.0);
        assert!(result.equity_curve.iter().all(|p| p.equity == 1000.0));
    }

    #[tokio::test]
    async fn test_run_with_insufficient_history() {
        let source = Arc::new(FixedSource {
            closes: vec![1.0, 2.0, 3.0],
        });
        let result = BacktestRunner::new(source)
            .run(&strategy(2, 10), None)
            .await
            .unwrap();
        assert!(result.equity_curve.is_empty());
        assert_eq!(result.summary[metrics::SHARPE], 0.0);
    }

    #[tokio::test]
    async fn test_run_reports_monotonic_progress() {
        let events = Arc::new(Mutex::new(Vec::<(f64, String)>::new()));
        let sink = events.clone();
        let cb: ProgressCallback = Arc::new(move |p: f64, m: &str| sink.lock().unwrap().push((p, m.to_string())));

        let policy_id = Uuid::new_v4();
        let result = BacktestRunner::new(Arc::new(SyntheticSource::with_seed(3)))
            .with_progress(cb)
            .run(&strategy(10, 30), Some(policy_id))
            .await
            .unwrap();

        assert_eq!(result.policy_id, Some(policy_id));
        assert!(!result.equity_curve.is_empty());
        assert!(result
            .equity_curve
            .windows(2)
            .all(|w| w[0].date <= w[1].date));
        let dd = result.summary[metrics::MAX_DRAWDOWN_PCT];
        assert!((0.0..=100.0).contains(&dd));

        let events = events.lock().unwrap();
        assert_eq!(events.first().unwrap().0, 0.1);
        assert_eq!(events.last().unwrap(), &(1.0, "Completed".to_string()));
        assert!(events.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(events.iter().any(|(_, m)| m.starts_with("Simulating 2020-")));
    }

    #[tokio::test]
    async fn test_invalid_strategy_is_rejected() {
        let err = runner().run(&strategy(0, 5), None).await.unwrap_err();
        assert!(matches!(err, DeepQuantError::InvalidStrategy(_)));
    }

    #[tokio::test]
    async fn test_bad_prices_fail_the_run() {
        let source = Arc::new(FixedSource {
            closes: vec![1.0, -2.0, 3.0],
        });
        let err = BacktestRunner::new(source)
            .run(&strategy(1, 2), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid close"));
    }
}
