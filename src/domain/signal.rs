//! Pattern signals attached to bars by an upstream candlestick detector.

use serde::Serialize;

/// Trade direction, shared by signals, positions and closed trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// +1.0 for long, -1.0 for short. Multiplier for P&L arithmetic.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" | "bull" | "bullish" => Ok(Direction::Long),
            "short" | "bear" | "bearish" => Ok(Direction::Short),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

/// One detected candlestick pattern on one bar.
///
/// `pattern` is the upstream detector's identifier (TA-Lib style, e.g.
/// `CDLHAMMER`), upper-case by convention. `strength` is the detector's
/// confidence in [0, 1]; the engine carries it through to the trade log but
/// does not gate entries on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSignal {
    pub bar_index: usize,
    pub pattern: String,
    pub direction: Direction,
    pub strength: f64,
}
