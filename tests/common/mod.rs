#![allow(dead_code)]

use candlesim::domain::backtest::BacktestConfig;
use candlesim::domain::error::CandlesimError;
pub use candlesim::domain::ohlcv::{Bar, BarSeries};
pub use candlesim::domain::signal::{Direction, PatternSignal};
use candlesim::domain::strategy::{EntryRule, ExitRule, StrategyConfig, Timeframe};
use candlesim::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

pub struct MockDataPort {
    pub series: HashMap<String, BarSeries>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: BarSeries) -> Self {
        self.series.insert(series.symbol.clone(), series);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(&self, symbol: &str) -> Result<BarSeries, CandlesimError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(CandlesimError::DataLoad {
                file: format!("{symbol}.csv"),
                reason: reason.clone(),
            });
        }
        match self.series.get(symbol) {
            Some(series) => Ok(series.clone()),
            None => Err(CandlesimError::NoData {
                symbol: symbol.to_string(),
            }),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, CandlesimError> {
        let mut symbols: Vec<String> = self.series.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn ts(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(day: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: ts(day),
        open,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

/// A bar that trades at a single price all day.
pub fn flat_bar(day: u32, price: f64) -> Bar {
    make_bar(day, price, price, price, price)
}

pub fn make_signal(bar_index: usize, pattern: &str, direction: Direction) -> PatternSignal {
    PatternSignal {
        bar_index,
        pattern: pattern.to_string(),
        direction,
        strength: 1.0,
    }
}

pub fn make_series(bars: Vec<Bar>, signals: Vec<PatternSignal>) -> BarSeries {
    BarSeries::new("TEST", bars, signals).unwrap()
}

pub fn make_strategy(entry_rule: EntryRule, exit_rule: ExitRule) -> StrategyConfig {
    StrategyConfig {
        name: "Test".to_string(),
        patterns: vec!["CDLHAMMER".to_string(), "CDLENGULFING".to_string()],
        entry_rule,
        exit_rule,
        timeframe: Timeframe::D1,
        position_size_pct: 10.0,
        stop_loss_pct: 2.0,
        take_profit_pct: 4.0,
        max_bars_hold: 20,
        trailing_stop_pct: 2.0,
    }
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        initial_capital: 100_000.0,
        commission_rate: 0.0,
        slippage_rate: 0.0,
    }
}

/// Bars drifting upward one point per day from `start_price`.
pub fn generate_bars(start_day: u32, count: usize, start_price: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let price = start_price + i as f64;
            Bar {
                timestamp: ts(start_day) + chrono::Duration::days(i as i64),
                open: price,
                high: price + 1.0,
                low: price - 1.0,
                close: price + 0.5,
                volume: 1000.0,
            }
        })
        .collect()
}
