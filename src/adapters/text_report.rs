//! Plain-text report adapter.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::CandlesimError;
use crate::domain::metrics::MetricsSummary;
use crate::domain::strategy::{ExitRule, StrategyConfig};
use crate::ports::report_port::ReportPort;

pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for TextReportAdapter {
    fn render(
        &self,
        result: &BacktestResult,
        metrics: &MetricsSummary,
        strategy: &StrategyConfig,
    ) -> Result<String, CandlesimError> {
        let mut out = String::new();

        out.push_str(&format!("Backtest report: {}\n", result.symbol));
        out.push_str(&"=".repeat(50));
        out.push_str("\n\n");

        out.push_str(&format!("Strategy: {}\n", strategy.name));
        out.push_str(&format!("  patterns:      {}\n", strategy.patterns.join(", ")));
        out.push_str(&format!("  entry rule:    {}\n", strategy.entry_rule));
        out.push_str(&format!("  exit rule:     {}\n", strategy.exit_rule));
        out.push_str(&format!("  timeframe:     {}\n", strategy.timeframe));
        out.push_str(&format!(
            "  position size: {:.1}%\n",
            strategy.position_size_pct
        ));
        out.push_str(&format!("  stop loss:     {:.1}%\n", strategy.stop_loss_pct));
        out.push_str(&format!("  take profit:   {:.1}%\n", strategy.take_profit_pct));
        match strategy.exit_rule {
            ExitRule::TimeBased => {
                out.push_str(&format!("  max bars held: {}\n", strategy.max_bars_hold));
            }
            ExitRule::TrailingStop => {
                out.push_str(&format!(
                    "  trailing stop: {:.1}%\n",
                    strategy.trailing_stop_pct
                ));
            }
            _ => {}
        }

        out.push_str("\nPerformance\n-----------\n");
        out.push_str(&format!(
            "  initial capital:   {:.2}\n",
            metrics.initial_capital
        ));
        out.push_str(&format!("  final capital:     {:.2}\n", metrics.final_capital));
        out.push_str(&format!(
            "  total return:      {:.2}%\n",
            metrics.total_return_pct
        ));
        out.push_str(&format!("  total P&L:         {:.2}\n", metrics.total_pnl));
        out.push_str(&format!(
            "  max drawdown:      {:.2}% ({} bars)\n",
            metrics.max_drawdown_pct, metrics.max_drawdown_bars
        ));
        out.push_str(&format!("  sharpe ratio:      {:.2}\n", metrics.sharpe_ratio));

        out.push_str("\nTrades\n------\n");
        out.push_str(&format!(
            "  total:             {} ({} long, {} short)\n",
            metrics.total_trades, metrics.long_trades, metrics.short_trades
        ));
        out.push_str(&format!(
            "  won / lost / flat: {} / {} / {}\n",
            metrics.trades_won, metrics.trades_lost, metrics.trades_breakeven
        ));
        out.push_str(&format!("  win rate:          {:.1}%\n", metrics.win_rate_pct));
        out.push_str(&format!(
            "  profit factor:     {}\n",
            format_profit_factor(metrics.profit_factor)
        ));
        out.push_str(&format!(
            "  avg win / loss:    {:.2} / {:.2}\n",
            metrics.avg_win, metrics.avg_loss
        ));
        out.push_str(&format!(
            "  largest win / loss: {:.2} / {:.2}\n",
            metrics.largest_win, metrics.largest_loss
        ));
        out.push_str(&format!(
            "  avg P&L:           {:.2} (median {:.2}, stddev {:.2})\n",
            metrics.avg_trade_pnl, metrics.median_trade_pnl, metrics.pnl_stddev
        ));
        out.push_str(&format!("  avg bars held:     {:.1}\n", metrics.avg_bars_held));
        out.push_str(&format!(
            "  max consecutive:   {} wins, {} losses\n",
            metrics.max_consecutive_wins, metrics.max_consecutive_losses
        ));

        if !metrics.pattern_stats.is_empty() {
            out.push_str("\nPatterns\n--------\n");
            out.push_str(&format!(
                "  {:<16} {:>6} {:>5} {:>9} {:>12} {:>10}\n",
                "pattern", "trades", "wins", "win rate", "total P&L", "avg P&L"
            ));
            for stats in &metrics.pattern_stats {
                out.push_str(&format!(
                    "  {:<16} {:>6} {:>5} {:>8.1}% {:>12.2} {:>10.2}\n",
                    stats.pattern,
                    stats.trades,
                    stats.wins,
                    stats.win_rate_pct,
                    stats.total_pnl,
                    stats.avg_pnl
                ));
            }
        }

        out.push_str("\nTrade log\n---------\n");
        if result.trades.is_empty() {
            out.push_str("  no trades\n");
        } else {
            for (i, trade) in result.trades.iter().enumerate() {
                out.push_str(&format!(
                    "  {:>3} {:<5} {:<16} {} @ {:<9.2} -> {} @ {:<9.2} {:>4} bars  {:<16} {:>10.2}\n",
                    i + 1,
                    trade.direction.to_string(),
                    trade.pattern,
                    trade.entry_time.format("%Y-%m-%d %H:%M"),
                    trade.entry_price,
                    trade.exit_time.format("%Y-%m-%d %H:%M"),
                    trade.exit_price,
                    trade.bars_held,
                    trade.exit_reason.to_string(),
                    trade.net_pnl
                ));
            }
        }

        if !result.events.is_empty() {
            out.push_str("\nEvents\n------\n");
            for event in &result.events {
                out.push_str(&format!("  {event}\n"));
            }
        }

        Ok(out)
    }
}

fn format_profit_factor(pf: f64) -> String {
    if pf.is_infinite() {
        "inf".to_string()
    } else {
        format!("{pf:.2}")
    }
}
