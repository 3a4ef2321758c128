//! Summary statistics over an equity curve
//!
//! Pure functions: equity values in, scalar out.

use std::collections::BTreeMap;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const MIN_YEARS: f64 = 1e-5;
const STD_EPSILON: f64 = 1e-9;

pub const TOTAL_RETURN_PCT: &str = "total_return_pct";
pub const CAGR_PCT: &str = "cagr_pct";
pub const MAX_DRAWDOWN_PCT: &str = "max_drawdown_pct";
pub const SHARPE: &str = "sharpe";
pub const START_EQUITY: &str = "start_equity";
pub const END_EQUITY: &str = "end_equity";

/// Named statistics for a finished run. Empty curves yield zeroed defaults.
pub fn summarize(equity: &[f64]) -> BTreeMap<String, f64> {
    let mut summary = BTreeMap::new();

    let (Some(&start), Some(&end)) = (equity.first(), equity.last()) else {
        for key in [TOTAL_RETURN_PCT, CAGR_PCT, MAX_DRAWDOWN_PCT, SHARPE] {
            summary.insert(key.to_string(), 0.0);
        }
        return summary;
    };

    summary.insert(TOTAL_RETURN_PCT.to_string(), round2(total_return(equity) * 100.0));
    summary.insert(CAGR_PCT.to_string(), round2(cagr(equity) * 100.0));
    summary.insert(MAX_DRAWDOWN_PCT.to_string(), round2(max_drawdown(equity) * 100.0));
    summary.insert(SHARPE.to_string(), round2(sharpe_ratio(equity)));
    summary.insert(START_EQUITY.to_string(), start);
    summary.insert(END_EQUITY.to_string(), end);
    summary
}

/// (final - initial) / initial
pub fn total_return(equity: &[f64]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(&start), Some(&end)) if start > 0.0 => (end - start) / start,
        _ => 0.0,
    }
}

/// Compound annual growth rate; the curve length is measured in trading days
pub fn cagr(equity: &[f64]) -> f64 {
    let (Some(&start), Some(&end)) = (equity.first(), equity.last()) else {
        return 0.0;
    };
    if start <= 0.0 {
        return 0.0;
    }
    let years = (equity.len() as f64 / TRADING_DAYS_PER_YEAR).max(MIN_YEARS);
    let growth = (end / start).powf(1.0 / years) - 1.0;
    if growth.is_finite() {
        growth
    } else {
        0.0
    }
}

/// Largest peak-to-trough decline as a positive fraction in [0, 1]
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let Some(&first) = equity.first() else {
        return 0.0;
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &value in equity {
        peak = peak.max(value);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak);
        }
    }
    max_dd.clamp(0.0, 1.0)
}

/// Bar-to-bar returns, skipping steps from a zero value
pub fn daily_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Annualized Sharpe: mean / (population std + ε) × √252
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    let returns = daily_returns(equity);
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    (mean / (variance.sqrt() + STD_EPSILON)) * TRADING_DAYS_PER_YEAR.sqrt()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_curve_defaults() {
        let summary = summarize(&[]);
        assert_eq!(summary.len(), 4);
        assert!(summary.values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_constant_curve() {
        let summary = summarize(&[10_000.0; 30]);
        assert_eq!(summary[TOTAL_RETURN_PCT], 0.0);
        assert_eq!(summary[MAX_DRAWDOWN_PCT], 0.0);
        assert_eq!(summary[CAGR_PCT], 0.0);
        assert_eq!(summary[SHARPE], 0.0);
        assert_eq!(summary[START_EQUITY], 10_000.0);
        assert_eq!(summary[END_EQUITY], 10_000.0);
    }

    #[test]
    fn test_total_return() {
        assert!((total_return(&[100.0, 150.0, 120.0]) - 0.2).abs() < 1e-12);
        assert_eq!(total_return(&[0.0, 10.0]), 0.0);
    }

    #[test]
    fn test_max_drawdown() {
        // peak 120 → trough 60
        let dd = max_drawdown(&[100.0, 120.0, 90.0, 60.0, 130.0, 110.0]);
        assert!((dd - 0.5).abs() < 1e-12);
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(max_drawdown(&[100.0, 0.0]), 1.0);
    }

    #[test]
    fn test_cagr_one_year() {
        let mut curve = vec![100.0; 252];
        curve[251] = 110.0;
        assert!((cagr(&curve) - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_sharpe_sign_and_population_std() {
        // returns: +10%, -10% → mean 0
        assert!(sharpe_ratio(&[100.0, 110.0, 99.0]).abs() < 1e-9);

        // returns +1%, +3%: mean 0.02, population std 0.01
        let sharpe = sharpe_ratio(&[100.0, 101.0, 104.03]);
        assert!((sharpe - 2.0 * 252f64.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_daily_returns_skip_zero_base() {
        assert_eq!(daily_returns(&[0.0, 10.0, 20.0]), vec![1.0]);
    }

    #[test]
    fn test_summary_rounding() {
        let summary = summarize(&[100.0, 101.2345]);
        assert_eq!(summary[TOTAL_RETURN_PCT], 1.23);
    }
}
