//! Regex-based policy parser
//!
//! Best-effort text extraction, not language understanding: the first
//! uppercase token is taken as the ticker, ISO dates are taken in order,
//! and numbers next to `sma`/`ma` or a currency word fill the remaining fields.

use super::{policy_name, ParsedPolicy, PolicyParser};
use crate::models::StrategyConfig;
use async_trait::async_trait;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

pub const DEFAULT_TICKER: &str = "AAPL";
pub const DEFAULT_SHORT_WINDOW: usize = 20;
pub const DEFAULT_LONG_WINDOW: usize = 50;
pub const DEFAULT_INITIAL_CASH: f64 = 10_000.0;

lazy_static! {
    static ref TICKER_RE: Regex = Regex::new(r"\b([A-Z]{1,5})\b").unwrap();
    static ref DATE_RE: Regex = Regex::new(r"(20\d{2}-\d{2}-\d{2})").unwrap();
    static ref SMA_RE: Regex = Regex::new(r"\bsma\s*(\d+)").unwrap();
    static ref MA_RE: Regex = Regex::new(r"\bma\s*(\d+)").unwrap();
    static ref CASH_RE: Regex =
        Regex::new(r"(\d[\d,]*(?:\.\d+)?)\s*(?:usd|cash|dollars)\b").unwrap();
}

/// Uppercase words that show up in prompts but are never tickers
const NON_TICKERS: &[&str] = &["SMA", "MA", "EMA", "USD", "CASH", "I", "A"];

pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

pub fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

/// Default prompt parser
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexPolicyParser;

impl RegexPolicyParser {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous entry point; the trait impl delegates here
    pub fn parse_text(&self, prompt: &str, name: Option<&str>) -> ParsedPolicy {
        let lowered = prompt.to_lowercase();

        let ticker = extract_ticker(prompt).unwrap_or_else(|| DEFAULT_TICKER.to_string());
        let (start, end) = extract_dates(prompt);
        let (short_window, long_window) = extract_windows(&lowered);
        let initial_cash = extract_cash(&lowered);

        let strategy = StrategyConfig {
            ticker,
            start_date: start.unwrap_or_else(default_start_date),
            end_date: end.unwrap_or_else(default_end_date),
            short_window,
            long_window,
            initial_cash,
        };

        debug!(
            ticker = %strategy.ticker,
            short_window,
            long_window,
            initial_cash,
            "Parsed policy prompt"
        );

        ParsedPolicy {
            strategy,
            prompt: prompt.to_string(),
            name: policy_name(name),
        }
    }
}

#[async_trait]
impl PolicyParser for RegexPolicyParser {
    async fn parse(&self, prompt: &str, name: Option<&str>) -> ParsedPolicy {
        self.parse_text(prompt, name)
    }
}

fn extract_ticker(prompt: &str) -> Option<String> {
    TICKER_RE
        .captures_iter(prompt)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|token| !NON_TICKERS.contains(token))
        .map(str::to_string)
}

fn extract_dates(prompt: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let mut dates = DATE_RE
        .captures_iter(prompt)
        .filter_map(|c| c.get(1))
        .filter_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok());

    let start = dates.next();
    let end = dates.next();
    (start, end)
}

fn window_numbers(re: &Regex, text: &str) -> Vec<usize> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .collect()
}

fn extract_windows(text: &str) -> (usize, usize) {
    let mut numbers = window_numbers(&SMA_RE, text);
    if numbers.is_empty() {
        numbers = window_numbers(&MA_RE, text);
    }

    match numbers.as_slice() {
        [] => (DEFAULT_SHORT_WINDOW, DEFAULT_LONG_WINDOW),
        [short] => (*short, (short.saturating_mul(2)).max(DEFAULT_LONG_WINDOW)),
        [short, long, ..] => (*short, *long),
    }
}

fn extract_cash(text: &str) -> f64 {
    CASH_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        // digit runs past f64 range parse to infinity
        .filter(|cash| cash.is_finite())
        .unwrap_or(DEFAULT_INITIAL_CASH)
}
