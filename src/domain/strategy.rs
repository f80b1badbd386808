//! Strategy configuration: pattern set, entry/exit rules, risk parameters.

use crate::domain::error::CandlesimError;
use crate::domain::signal::{Direction, PatternSignal};
use serde::Serialize;
use std::collections::HashSet;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// How an entry fill price is derived from a signal bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRule {
    /// Fill at the open of the bar after the signal bar.
    OpenNextBar,
    /// Fill at (high + low) / 2 of the signal bar.
    MidOfPattern,
    /// Fill at the close of the signal bar.
    CloseOfPattern,
}

impl std::str::FromStr for EntryRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open_next_bar" => Ok(EntryRule::OpenNextBar),
            "mid_of_pattern" => Ok(EntryRule::MidOfPattern),
            "close_of_pattern" => Ok(EntryRule::CloseOfPattern),
            other => Err(format!("unknown entry rule: {other}")),
        }
    }
}

impl std::fmt::Display for EntryRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryRule::OpenNextBar => "open_next_bar",
            EntryRule::MidOfPattern => "mid_of_pattern",
            EntryRule::CloseOfPattern => "close_of_pattern",
        };
        write!(f, "{s}")
    }
}

/// How and when an open position closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitRule {
    StopLossTakeProfit,
    TakeProfitOnly,
    OppositePattern,
    TimeBased,
    TrailingStop,
}

impl std::str::FromStr for ExitRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stop_loss_take_profit" => Ok(ExitRule::StopLossTakeProfit),
            "take_profit_only" => Ok(ExitRule::TakeProfitOnly),
            "opposite_pattern" => Ok(ExitRule::OppositePattern),
            "time_based" => Ok(ExitRule::TimeBased),
            "trailing_stop" => Ok(ExitRule::TrailingStop),
            other => Err(format!("unknown exit rule: {other}")),
        }
    }
}

impl std::fmt::Display for ExitRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitRule::StopLossTakeProfit => "stop_loss_take_profit",
            ExitRule::TakeProfitOnly => "take_profit_only",
            ExitRule::OppositePattern => "opposite_pattern",
            ExitRule::TimeBased => "time_based",
            ExitRule::TrailingStop => "trailing_stop",
        };
        write!(f, "{s}")
    }
}

/// Bar interval of the input series. Drives Sharpe annualization only; the
/// engine itself is interval-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
    #[serde(rename = "1M")]
    MN1,
}

impl Timeframe {
    /// Period count used to annualize per-trade returns. Daily bars assume
    /// 252 trading days; intraday frames assume a 24/7 venue.
    pub fn periods_per_year(self) -> f64 {
        match self {
            Timeframe::M1 => 525_600.0,
            Timeframe::M5 => 105_120.0,
            Timeframe::M15 => 35_040.0,
            Timeframe::M30 => 17_520.0,
            Timeframe::H1 => 8_760.0,
            Timeframe::H4 => 2_190.0,
            Timeframe::D1 => TRADING_DAYS_PER_YEAR,
            Timeframe::W1 => 52.0,
            Timeframe::MN1 => 12.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
            Timeframe::MN1 => "1M",
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    // Case-sensitive: "1m" is one minute, "1M" is one month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" => Ok(Timeframe::M1),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "30m" => Ok(Timeframe::M30),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            "1w" => Ok(Timeframe::W1),
            "1M" => Ok(Timeframe::MN1),
            other => Err(format!("unknown timeframe: {other}")),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternListError {
    #[error("empty token in pattern list")]
    EmptyToken,

    #[error("duplicate pattern: {0}")]
    DuplicatePattern(String),
}

/// Parse a comma-separated pattern list, upper-casing and rejecting
/// duplicates. Order is preserved; it is the signal-selection priority.
pub fn parse_patterns(input: &str) -> Result<Vec<String>, PatternListError> {
    let mut patterns = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(PatternListError::EmptyToken);
        }
        let pattern = trimmed.to_uppercase();
        if seen.contains(&pattern) {
            return Err(PatternListError::DuplicatePattern(pattern));
        }
        seen.insert(pattern.clone());
        patterns.push(pattern);
    }

    Ok(patterns)
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyConfig {
    pub name: String,
    /// Enabled patterns in priority order.
    pub patterns: Vec<String>,
    pub entry_rule: EntryRule,
    pub exit_rule: ExitRule,
    pub timeframe: Timeframe,
    /// Percent of current capital committed per trade, (0, 100].
    pub position_size_pct: f64,
    /// Stop distance from the fill price, percent.
    pub stop_loss_pct: f64,
    /// Take-profit distance from the fill price, percent.
    pub take_profit_pct: f64,
    /// Bar count cap for `ExitRule::TimeBased`.
    pub max_bars_hold: usize,
    /// Retrace distance from the watermark for `ExitRule::TrailingStop`, percent.
    pub trailing_stop_pct: f64,
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), CandlesimError> {
        if self.name.trim().is_empty() {
            return Err(invalid("name", "must not be empty"));
        }
        if self.patterns.is_empty() {
            return Err(invalid("patterns", "at least one pattern must be enabled"));
        }
        validate_pct("position_size", self.position_size_pct)?;
        validate_pct("stop_loss", self.stop_loss_pct)?;
        validate_pct("take_profit", self.take_profit_pct)?;
        validate_pct("trailing_stop", self.trailing_stop_pct)?;
        if self.exit_rule == ExitRule::TimeBased && self.max_bars_hold < 1 {
            return Err(invalid("max_bars_hold", "must be at least 1 for a time-based exit"));
        }
        Ok(())
    }

    /// Highest-priority signal among `candidates`, scanning the configured
    /// pattern list in order. Detection order breaks ties within a pattern.
    pub fn select_signal<'a>(&self, candidates: &'a [PatternSignal]) -> Option<&'a PatternSignal> {
        self.patterns
            .iter()
            .find_map(|p| candidates.iter().find(|s| &s.pattern == p))
    }

    /// Same scan restricted to one direction. Used for opposite-pattern exits.
    pub fn select_signal_in_direction<'a>(
        &self,
        candidates: &'a [PatternSignal],
        direction: Direction,
    ) -> Option<&'a PatternSignal> {
        self.patterns
            .iter()
            .find_map(|p| candidates.iter().find(|s| &s.pattern == p && s.direction == direction))
    }
}

fn invalid(field: &str, reason: &str) -> CandlesimError {
    CandlesimError::StrategyInvalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_pct(field: &str, value: f64) -> Result<(), CandlesimError> {
    if !value.is_finite() || value <= 0.0 || value > 100.0 {
        return Err(invalid(field, "must be a percentage in (0, 100]"));
    }
    Ok(())
}
