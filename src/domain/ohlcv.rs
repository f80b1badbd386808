//! OHLCV bars and the validated series the simulation runs over.

use crate::domain::signal::PatternSignal;
use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// (high + low) / 2
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

/// Validation failure in the bar/signal input, reported at the first
/// offending index.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DataError {
    #[error("bar {index}: timestamp does not increase over the previous bar")]
    NonMonotonicTimestamp { index: usize },

    #[error("bar {index}: {field} is not a finite number")]
    NonFinite { index: usize, field: &'static str },

    #[error("bar {index}: high {high} is below low {low}")]
    HighBelowLow { index: usize, high: f64, low: f64 },

    #[error("bar {index}: {field} lies outside the low..high range")]
    PriceOutOfRange { index: usize, field: &'static str },

    #[error("bar {index}: volume is negative")]
    NegativeVolume { index: usize },

    #[error("signal references bar {bar_index} but the series has {bar_count} bars")]
    SignalOutOfRange { bar_index: usize, bar_count: usize },

    #[error("signal {pattern} on bar {bar_index}: strength {strength} outside [0, 1]")]
    SignalStrength {
        bar_index: usize,
        pattern: String,
        strength: f64,
    },
}

/// An ordered bar sequence with its pattern signals, checked once at
/// construction. The engine assumes these invariants and never re-validates.
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
    /// Sorted by bar index; detection order is preserved within a bar.
    pub signals: Vec<PatternSignal>,
}

impl BarSeries {
    pub fn new(
        symbol: impl Into<String>,
        bars: Vec<Bar>,
        mut signals: Vec<PatternSignal>,
    ) -> Result<Self, DataError> {
        for (index, bar) in bars.iter().enumerate() {
            validate_bar(index, bar)?;
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(DataError::NonMonotonicTimestamp { index });
            }
        }

        for signal in &signals {
            if signal.bar_index >= bars.len() {
                return Err(DataError::SignalOutOfRange {
                    bar_index: signal.bar_index,
                    bar_count: bars.len(),
                });
            }
            if !signal.strength.is_finite() || signal.strength < 0.0 || signal.strength > 1.0 {
                return Err(DataError::SignalStrength {
                    bar_index: signal.bar_index,
                    pattern: signal.pattern.clone(),
                    strength: signal.strength,
                });
            }
        }
        signals.sort_by_key(|s| s.bar_index);

        Ok(BarSeries {
            symbol: symbol.into(),
            bars,
            signals,
        })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// All signals detected on one bar, in detection order.
    pub fn signals_at(&self, bar_index: usize) -> &[PatternSignal] {
        let start = self.signals.partition_point(|s| s.bar_index < bar_index);
        let end = self.signals.partition_point(|s| s.bar_index <= bar_index);
        &self.signals[start..end]
    }
}

fn validate_bar(index: usize, bar: &Bar) -> Result<(), DataError> {
    for (field, value) in [
        ("open", bar.open),
        ("high", bar.high),
        ("low", bar.low),
        ("close", bar.close),
        ("volume", bar.volume),
    ] {
        if !value.is_finite() {
            return Err(DataError::NonFinite { index, field });
        }
    }
    if bar.high < bar.low {
        return Err(DataError::HighBelowLow {
            index,
            high: bar.high,
            low: bar.low,
        });
    }
    if bar.open > bar.high || bar.open < bar.low {
        return Err(DataError::PriceOutOfRange {
            index,
            field: "open",
        });
    }
    if bar.close > bar.high || bar.close < bar.low {
        return Err(DataError::PriceOutOfRange {
            index,
            field: "close",
        });
    }
    if bar.volume < 0.0 {
        return Err(DataError::NegativeVolume { index });
    }
    Ok(())
}
