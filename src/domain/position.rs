//! Open-position tracking and the closed-trade record.

use crate::domain::ohlcv::Bar;
use crate::domain::signal::Direction;
use crate::domain::strategy::StrategyConfig;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Why a position closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    OppositePattern,
    TimeBased,
    TrailingStop,
    EndOfData,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::OppositePattern => "opposite_pattern",
            ExitReason::TimeBased => "time_based",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::EndOfData => "end_of_data",
        };
        write!(f, "{s}")
    }
}

/// The single in-flight position. Owned by the simulation loop while open,
/// converted into a [`Trade`] at close.
///
/// Protective levels derive from `fill_price` (the quoted market price);
/// `entry_price` is the slippage-adjusted price the P&L is computed from.
#[derive(Debug, Clone)]
pub struct Position {
    pub direction: Direction,
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub pattern: String,
    pub units: f64,
    pub fill_price: f64,
    pub entry_price: f64,
    pub stop_price: f64,
    pub take_profit_price: f64,
    /// Best favorable price since entry. Starts at the fill price.
    pub watermark: f64,
    pub bars_held: usize,
}

impl Position {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        direction: Direction,
        entry_index: usize,
        entry_time: NaiveDateTime,
        pattern: String,
        units: f64,
        fill_price: f64,
        entry_price: f64,
        strategy: &StrategyConfig,
    ) -> Self {
        let sign = direction.sign();
        Position {
            direction,
            entry_index,
            entry_time,
            pattern,
            units,
            fill_price,
            entry_price,
            stop_price: fill_price * (1.0 - sign * strategy.stop_loss_pct / 100.0),
            take_profit_price: fill_price * (1.0 + sign * strategy.take_profit_pct / 100.0),
            watermark: fill_price,
            bars_held: 0,
        }
    }

    /// Capital committed at entry, at the executed price.
    pub fn entry_notional(&self) -> f64 {
        self.units * self.entry_price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.direction.sign() * self.units * (price - self.entry_price)
    }

    pub fn stop_hit(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Long => bar.low <= self.stop_price,
            Direction::Short => bar.high >= self.stop_price,
        }
    }

    pub fn take_profit_hit(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Long => bar.high >= self.take_profit_price,
            Direction::Short => bar.low <= self.take_profit_price,
        }
    }

    /// Absorb the bar's favorable extreme into the watermark.
    pub fn update_watermark(&mut self, bar: &Bar) {
        match self.direction {
            Direction::Long => self.watermark = self.watermark.max(bar.high),
            Direction::Short => self.watermark = self.watermark.min(bar.low),
        }
    }

    /// Advance per-bar state ahead of exit evaluation: one more bar held,
    /// and the watermark sees this bar before any retrace check.
    pub fn observe_bar(&mut self, bar: &Bar) {
        self.bars_held += 1;
        self.update_watermark(bar);
    }

    /// Price at which the trailing retrace fires, from the current watermark.
    pub fn trailing_level(&self, trailing_stop_pct: f64) -> f64 {
        self.watermark * (1.0 - self.direction.sign() * trailing_stop_pct / 100.0)
    }

    pub fn trailing_hit(&self, bar: &Bar, trailing_stop_pct: f64) -> bool {
        let level = self.trailing_level(trailing_stop_pct);
        match self.direction {
            Direction::Long => bar.low <= level,
            Direction::Short => bar.high >= level,
        }
    }
}

/// Immutable record of a closed position. Prices are effective
/// (slippage-adjusted) executed prices; `commission` covers both legs.
#[derive(Debug, Clone, Serialize)]
pub struct Trade {
    pub direction: Direction,
    pub pattern: String,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub units: f64,
    pub gross_pnl: f64,
    pub commission: f64,
    pub net_pnl: f64,
    pub bars_held: usize,
    pub return_pct: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.net_pnl < 0.0
    }
}
