//! Moving averages and crossover signals

use crate::models::PriceBar;
use chrono::NaiveDate;

/// A bar that survived indicator warm-up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalBar {
    pub date: NaiveDate,
    pub close: f64,
    pub sma_short: f64,
    pub sma_long: f64,
    /// +1 short above long, -1 below, 0 equal
    pub signal: i8,
}

/// Rolling simple moving average; `None` until `window` values are available.
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

pub fn crossover_signal(short: f64, long: f64) -> i8 {
    if short > long {
        1
    } else if short < long {
        -1
    } else {
        0
    }
}

/// Attach both averages and the signal, dropping bars that lack either average
pub fn apply_indicators(bars: &[PriceBar], short_window: usize, long_window: usize) -> Vec<SignalBar> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let short = sma(&closes, short_window);
    let long = sma(&closes, long_window);

    bars.iter()
        .zip(short.into_iter().zip(long))
        .filter_map(|(bar, averages)| match averages {
            (Some(sma_short), Some(sma_long)) => Some(SignalBar {
                date: bar.date,
                close: bar.close,
                sma_short,
                sma_long,
                signal: crossover_signal(sma_short, sma_long),
            }),
            _ => None,
        })
        .collect()
}
