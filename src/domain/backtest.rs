//! Simulation loop: a single pass over the bars with at most one open
//! position, producing trades, an equity curve and a run-event log.
//!
//! Per bar the loop runs exits first, then entry fills landing on the bar,
//! then marks equity to the bar's close. No future bar is consulted; the
//! OPEN_NEXT_BAR fill is realized as a one-bar backward reference at the
//! fill bar.

use crate::domain::entry::{self, EntryFill};
use crate::domain::error::CandlesimError;
use crate::domain::exit;
use crate::domain::ledger::{CapitalLedger, EntrySizing};
use crate::domain::ohlcv::BarSeries;
use crate::domain::position::{ExitReason, Position, Trade};
use crate::domain::signal::{Direction, PatternSignal};
use crate::domain::strategy::{EntryRule, ExitRule, StrategyConfig};
use chrono::NaiveDateTime;
use log::{debug, info};
use serde::Serialize;

/// Capital and cost model for one run.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Fraction of notional charged per leg, e.g. 0.001.
    pub commission_rate: f64,
    /// Fraction of price moved against the fill per leg, e.g. 0.001.
    pub slippage_rate: f64,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), CandlesimError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(invalid("initial_capital", "must be positive"));
        }
        if !self.commission_rate.is_finite() || self.commission_rate < 0.0 || self.commission_rate >= 1.0 {
            return Err(invalid("commission", "must be a fraction in [0, 1)"));
        }
        if !self.slippage_rate.is_finite() || self.slippage_rate < 0.0 || self.slippage_rate >= 1.0 {
            return Err(invalid("slippage", "must be a fraction in [0, 1)"));
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> CandlesimError {
    CandlesimError::ConfigInvalid {
        section: "backtest".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// One equity observation per processed bar, marked to the bar's close.
#[derive(Debug, Clone, Serialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
    pub peak: f64,
    pub drawdown_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    PositionOpen,
    EndOfSeries,
    InsufficientCapital,
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DiscardReason::PositionOpen => "position open",
            DiscardReason::EndOfSeries => "end of series",
            DiscardReason::InsufficientCapital => "insufficient capital",
        };
        write!(f, "{s}")
    }
}

/// Noteworthy non-error conditions, recorded instead of raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunEvent {
    SignalDiscarded {
        bar_index: usize,
        pattern: String,
        reason: DiscardReason,
    },
    ForcedClose {
        bar_index: usize,
    },
}

impl std::fmt::Display for RunEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunEvent::SignalDiscarded {
                bar_index,
                pattern,
                reason,
            } => write!(f, "bar {bar_index}: {pattern} signal discarded ({reason})"),
            RunEvent::ForcedClose { bar_index } => {
                write!(f, "bar {bar_index}: end of data, open position force-closed")
            }
        }
    }
}

/// Everything one run produces. Plain data; metrics are derived separately.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub events: Vec<RunEvent>,
}

enum PositionState {
    Flat,
    Open(Position),
}

/// Run the simulation. Inputs are assumed validated; the engine performs no
/// I/O and no re-validation.
pub fn run_backtest(
    series: &BarSeries,
    strategy: &StrategyConfig,
    config: &BacktestConfig,
) -> BacktestResult {
    info!(
        "starting backtest for {}: {} bars, {} signals, strategy '{}'",
        series.symbol,
        series.len(),
        series.signals.len(),
        strategy.name
    );

    let mut ledger = CapitalLedger::new(config);
    let mut state = PositionState::Flat;
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(series.len());
    let mut events: Vec<RunEvent> = Vec::new();
    let mut peak = config.initial_capital;

    for (index, bar) in series.bars.iter().enumerate() {
        // Exits before entries, so a close frees the bar for a new fill.
        state = match state {
            PositionState::Open(mut position) => {
                position.observe_bar(bar);
                let opposite_fill = if strategy.exit_rule == ExitRule::OppositePattern {
                    resolve_opposite_fill(series, strategy, position.direction, index)
                } else {
                    None
                };
                match exit::evaluate_exit(&position, bar, opposite_fill, strategy) {
                    Some(decision) => {
                        let trade = close_position(
                            &mut ledger,
                            &position,
                            index,
                            bar.timestamp,
                            decision.price,
                            decision.reason,
                        );
                        debug!(
                            "bar {index}: exit {} at {:.4}, net {:+.2}",
                            trade.exit_reason, trade.exit_price, trade.net_pnl
                        );
                        trades.push(trade);
                        PositionState::Flat
                    }
                    None => PositionState::Open(position),
                }
            }
            PositionState::Flat => PositionState::Flat,
        };

        state = match state {
            PositionState::Flat => match entry_landing_on(series, strategy, index) {
                Some((signal, fill)) => {
                    match ledger.size_entry(signal.direction, fill.fill_price, strategy.position_size_pct)
                    {
                        EntrySizing::Sized {
                            units, entry_price, ..
                        } => {
                            debug!(
                                "bar {index}: {} entry on {} at {:.4} x{}",
                                signal.direction, signal.pattern, entry_price, units
                            );
                            PositionState::Open(Position::open(
                                signal.direction,
                                index,
                                bar.timestamp,
                                signal.pattern.clone(),
                                units,
                                fill.fill_price,
                                entry_price,
                                strategy,
                            ))
                        }
                        EntrySizing::InsufficientCapital => {
                            events.push(RunEvent::SignalDiscarded {
                                bar_index: index,
                                pattern: signal.pattern.clone(),
                                reason: DiscardReason::InsufficientCapital,
                            });
                            PositionState::Flat
                        }
                    }
                }
                None => PositionState::Flat,
            },
            PositionState::Open(position) => {
                if let Some((signal, _)) = entry_landing_on(series, strategy, index) {
                    events.push(RunEvent::SignalDiscarded {
                        bar_index: index,
                        pattern: signal.pattern.clone(),
                        reason: DiscardReason::PositionOpen,
                    });
                }
                PositionState::Open(position)
            }
        };

        let equity = match &state {
            PositionState::Open(position) => ledger.capital() + position.unrealized_pnl(bar.close),
            PositionState::Flat => ledger.capital(),
        };
        peak = peak.max(equity);
        let drawdown_pct = if peak > 0.0 {
            (peak - equity) / peak * 100.0
        } else {
            0.0
        };
        equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity,
            peak,
            drawdown_pct,
        });
    }

    // Signals on the final bar can never fill under OPEN_NEXT_BAR.
    if strategy.entry_rule == EntryRule::OpenNextBar && !series.is_empty() {
        let last_index = series.len() - 1;
        if let Some(signal) = strategy.select_signal(series.signals_at(last_index)) {
            events.push(RunEvent::SignalDiscarded {
                bar_index: last_index,
                pattern: signal.pattern.clone(),
                reason: DiscardReason::EndOfSeries,
            });
        }
    }

    if let PositionState::Open(position) = state {
        let last_index = series.len() - 1;
        let last = &series.bars[last_index];
        events.push(RunEvent::ForcedClose {
            bar_index: last_index,
        });
        let trade = close_position(
            &mut ledger,
            &position,
            last_index,
            last.timestamp,
            last.close,
            ExitReason::EndOfData,
        );
        debug!(
            "bar {last_index}: end of data, closed at {:.4}, net {:+.2}",
            trade.exit_price, trade.net_pnl
        );
        trades.push(trade);
    }

    info!(
        "backtest complete for {}: {} trades, final capital {:.2}",
        series.symbol,
        trades.len(),
        ledger.capital()
    );

    BacktestResult {
        symbol: series.symbol.clone(),
        initial_capital: config.initial_capital,
        final_capital: ledger.capital(),
        trades,
        equity_curve,
        events,
    }
}

/// The signal, if any, whose fill lands on `bar_index`, with its fill.
fn entry_landing_on<'a>(
    series: &'a BarSeries,
    strategy: &StrategyConfig,
    bar_index: usize,
) -> Option<(&'a PatternSignal, EntryFill)> {
    let source = entry::signal_source_index(strategy.entry_rule, bar_index)?;
    let signal = strategy.select_signal(series.signals_at(source))?;
    let fill = entry::resolve_entry(series, strategy.entry_rule, signal)?;
    debug_assert_eq!(fill.fill_index, bar_index);
    Some((signal, fill))
}

/// Fill price an opposite-direction signal would produce on `bar_index`
/// under the strategy's entry rule.
fn resolve_opposite_fill(
    series: &BarSeries,
    strategy: &StrategyConfig,
    direction: Direction,
    bar_index: usize,
) -> Option<f64> {
    let source = entry::signal_source_index(strategy.entry_rule, bar_index)?;
    let signal = strategy.select_signal_in_direction(series.signals_at(source), direction.opposite())?;
    let fill = entry::resolve_entry(series, strategy.entry_rule, signal)?;
    Some(fill.fill_price)
}

fn close_position(
    ledger: &mut CapitalLedger,
    position: &Position,
    exit_index: usize,
    exit_time: NaiveDateTime,
    market_price: f64,
    reason: ExitReason,
) -> Trade {
    let settlement = ledger.settle(position, market_price);
    Trade {
        direction: position.direction,
        pattern: position.pattern.clone(),
        entry_index: position.entry_index,
        exit_index,
        entry_time: position.entry_time,
        exit_time,
        entry_price: position.entry_price,
        exit_price: settlement.exit_price,
        units: position.units,
        gross_pnl: settlement.gross_pnl,
        commission: settlement.commission,
        net_pnl: settlement.net_pnl,
        bars_held: exit_index - position.entry_index,
        return_pct: settlement.return_pct,
        exit_reason: reason,
    }
}
