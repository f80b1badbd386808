//! Performance metrics, recomputed from the immutable trade and equity logs.

use crate::domain::backtest::{BacktestResult, EquityPoint};
use crate::domain::position::Trade;
use crate::domain::signal::Direction;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-pattern trade statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternStats {
    pub pattern: String,
    pub trades: usize,
    pub wins: usize,
    pub win_rate_pct: f64,
    pub total_pnl: f64,
    pub avg_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_pnl: f64,
    pub total_return_pct: f64,
    pub total_trades: usize,
    pub long_trades: usize,
    pub short_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate_pct: f64,
    /// Gains over losses; `f64::INFINITY` when there are gains but no
    /// losses, 0 when there are no gains.
    pub profit_factor: f64,
    pub avg_win: f64,
    /// Magnitude of the mean losing trade.
    pub avg_loss: f64,
    pub largest_win: f64,
    /// Magnitude of the worst losing trade.
    pub largest_loss: f64,
    pub avg_trade_pnl: f64,
    pub median_trade_pnl: f64,
    /// Sample standard deviation of per-trade net P&L.
    pub pnl_stddev: f64,
    /// Mean bars held per trade.
    pub avg_bars_held: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub max_drawdown_pct: f64,
    /// Longest run of bars spent below the running equity peak.
    pub max_drawdown_bars: usize,
    /// Annualized from per-trade returns: mean/stddev * sqrt(periods/year).
    pub sharpe_ratio: f64,
    pub pattern_stats: Vec<PatternStats>,
}

impl MetricsSummary {
    pub fn compute(result: &BacktestResult, periods_per_year: f64) -> Self {
        let trades = &result.trades;
        let initial_capital = result.initial_capital;

        let total_pnl: f64 = trades.iter().map(|t| t.net_pnl).sum();
        let final_capital = initial_capital + total_pnl;
        let total_return_pct = if initial_capital > 0.0 {
            total_pnl / initial_capital * 100.0
        } else {
            0.0
        };

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut long_trades = 0usize;
        let mut short_trades = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_bars_held = 0usize;

        for trade in trades {
            match trade.direction {
                Direction::Long => long_trades += 1,
                Direction::Short => short_trades += 1,
            }
            let pnl = trade.net_pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                if pnl > largest_win {
                    largest_win = pnl;
                }
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                if pnl.abs() > largest_loss {
                    largest_loss = pnl.abs();
                }
            } else {
                trades_breakeven += 1;
            }
            total_bars_held += trade.bars_held;
        }

        let total_trades = trades.len();
        let win_rate_pct = if total_trades > 0 {
            trades_won as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };
        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };
        let avg_trade_pnl = if total_trades > 0 {
            total_pnl / total_trades as f64
        } else {
            0.0
        };
        let avg_bars_held = if total_trades > 0 {
            total_bars_held as f64 / total_trades as f64
        } else {
            0.0
        };

        let pnls: Vec<f64> = trades.iter().map(|t| t.net_pnl).collect();
        let median_trade_pnl = median(&pnls);
        let pnl_stddev = sample_stddev(&pnls);

        let (max_drawdown_pct, max_drawdown_bars) = compute_drawdown(&result.equity_curve);

        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct / 100.0).collect();
        let sharpe_ratio = compute_sharpe(&returns, periods_per_year);

        let max_consecutive_wins = max_consecutive(trades, |t| t.is_win());
        let max_consecutive_losses = max_consecutive(trades, |t| t.is_loss());

        let pattern_stats = compute_pattern_stats(trades);

        MetricsSummary {
            initial_capital,
            final_capital,
            total_pnl,
            total_return_pct,
            total_trades,
            long_trades,
            short_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate_pct,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_trade_pnl,
            median_trade_pnl,
            pnl_stddev,
            avg_bars_held,
            max_consecutive_wins,
            max_consecutive_losses,
            max_drawdown_pct,
            max_drawdown_bars,
            sharpe_ratio,
            pattern_stats,
        }
    }
}

/// Maximum peak-to-trough decline in percent, and the longest run of bars
/// below the peak. Recomputed from the raw equity values.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    if equity_curve.is_empty() {
        return (0.0, 0);
    }

    let mut peak = equity_curve[0].equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_bars = 0usize;
    let mut current_dd_bars = 0usize;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
            current_dd_bars = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
            if dd > 0.0 {
                current_dd_bars += 1;
                if current_dd_bars > max_dd_bars {
                    max_dd_bars = current_dd_bars;
                }
            } else {
                current_dd_bars = 0;
            }
        }
    }

    (max_dd, max_dd_bars)
}

fn compute_sharpe(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let stddev = sample_stddev(returns);
    if stddev > 0.0 {
        mean / stddev * periods_per_year.sqrt()
    } else {
        0.0
    }
}

/// Sample standard deviation (n - 1). Zero below two values.
fn sample_stddev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn max_consecutive(trades: &[Trade], pred: impl Fn(&Trade) -> bool) -> usize {
    let mut best = 0usize;
    let mut run = 0usize;
    for trade in trades {
        if pred(trade) {
            run += 1;
            if run > best {
                best = run;
            }
        } else {
            run = 0;
        }
    }
    best
}

fn compute_pattern_stats(trades: &[Trade]) -> Vec<PatternStats> {
    let mut groups: BTreeMap<&str, (usize, usize, f64)> = BTreeMap::new();
    for trade in trades {
        let entry = groups.entry(trade.pattern.as_str()).or_insert((0, 0, 0.0));
        entry.0 += 1;
        if trade.is_win() {
            entry.1 += 1;
        }
        entry.2 += trade.net_pnl;
    }
    groups
        .into_iter()
        .map(|(pattern, (count, wins, total_pnl))| PatternStats {
            pattern: pattern.to_string(),
            trades: count,
            wins,
            win_rate_pct: wins as f64 / count as f64 * 100.0,
            total_pnl,
            avg_pnl: total_pnl / count as f64,
        })
        .collect()
}
