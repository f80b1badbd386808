//! Capital ledger: position sizing, slippage, commissions, P&L settlement.
//!
//! The ledger is the only mutator of running capital. Capital moves exactly
//! once per trade, at close; an open position affects only the equity curve.

use crate::domain::backtest::BacktestConfig;
use crate::domain::position::Position;
use crate::domain::signal::Direction;

/// Result of sizing an entry at a fill price.
#[derive(Debug, Clone, PartialEq)]
pub enum EntrySizing {
    Sized {
        /// Whole units, floored.
        units: f64,
        /// Slippage-adjusted executed price.
        entry_price: f64,
        /// units * entry_price
        notional: f64,
    },
    InsufficientCapital,
}

/// Economics of one closed trade.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    /// Slippage-adjusted executed exit price.
    pub exit_price: f64,
    pub gross_pnl: f64,
    /// Entry leg plus exit leg.
    pub commission: f64,
    pub net_pnl: f64,
    /// Net P&L over entry notional, percent.
    pub return_pct: f64,
}

#[derive(Debug, Clone)]
pub struct CapitalLedger {
    capital: f64,
    commission_rate: f64,
    slippage_rate: f64,
}

impl CapitalLedger {
    pub fn new(config: &BacktestConfig) -> Self {
        CapitalLedger {
            capital: config.initial_capital,
            commission_rate: config.commission_rate,
            slippage_rate: config.slippage_rate,
        }
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    /// Entry execution price: adverse offset, so longs pay up and shorts
    /// receive less.
    pub fn entry_price(&self, direction: Direction, market_price: f64) -> f64 {
        market_price * (1.0 + direction.sign() * self.slippage_rate)
    }

    /// Exit execution price: adverse offset on the closing leg.
    pub fn exit_price(&self, direction: Direction, market_price: f64) -> f64 {
        market_price * (1.0 - direction.sign() * self.slippage_rate)
    }

    /// Size an entry from current capital. Does not move capital.
    pub fn size_entry(
        &self,
        direction: Direction,
        fill_price: f64,
        position_size_pct: f64,
    ) -> EntrySizing {
        if self.capital <= 0.0 {
            return EntrySizing::InsufficientCapital;
        }
        let entry_price = self.entry_price(direction, fill_price);
        if entry_price <= 0.0 {
            return EntrySizing::InsufficientCapital;
        }
        let budget = self.capital * position_size_pct / 100.0;
        let units = (budget / entry_price).floor();
        if units < 1.0 {
            return EntrySizing::InsufficientCapital;
        }
        EntrySizing::Sized {
            units,
            entry_price,
            notional: units * entry_price,
        }
    }

    /// Close a position at a market exit price, realizing P&L net of both
    /// commission legs. The single capital update per trade happens here.
    pub fn settle(&mut self, position: &Position, market_exit_price: f64) -> Settlement {
        let exit_price = self.exit_price(position.direction, market_exit_price);
        let gross_pnl =
            position.direction.sign() * position.units * (exit_price - position.entry_price);

        let entry_notional = position.entry_notional();
        let exit_notional = position.units * exit_price;
        let commission = (entry_notional + exit_notional) * self.commission_rate;

        let net_pnl = gross_pnl - commission;
        self.capital += net_pnl;

        let return_pct = if entry_notional > 0.0 {
            net_pnl / entry_notional * 100.0
        } else {
            0.0
        };

        Settlement {
            exit_price,
            gross_pnl,
            commission,
            net_pnl,
            return_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::{EntryRule, ExitRule, StrategyConfig, Timeframe};
    use chrono::NaiveDate;

    fn make_config() -> BacktestConfig {
        BacktestConfig {
            initial_capital: 100_000.0,
            commission_rate: 0.001,
            slippage_rate: 0.001,
        }
    }

    fn make_strategy() -> StrategyConfig {
        StrategyConfig {
            name: "test".into(),
            patterns: vec!["CDLHAMMER".into()],
            entry_rule: EntryRule::OpenNextBar,
            exit_rule: ExitRule::StopLossTakeProfit,
            timeframe: Timeframe::D1,
            position_size_pct: 10.0,
            stop_loss_pct: 2.0,
            take_profit_pct: 4.0,
            max_bars_hold: 20,
            trailing_stop_pct: 2.0,
        }
    }

    // Settlement only reads direction, units and the executed entry price,
    // so the fill price can be anything here.
    fn make_position(direction: Direction, units: f64, entry_price: f64) -> Position {
        Position::open(
            direction,
            1,
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            "CDLHAMMER".into(),
            units,
            entry_price,
            entry_price,
            &make_strategy(),
        )
    }

    #[test]
    fn slippage_long_entry_pays_up() {
        let ledger = CapitalLedger::new(&make_config());
        assert!((ledger.entry_price(Direction::Long, 100.0) - 100.1).abs() < 1e-9);
    }

    #[test]
    fn slippage_short_entry_receives_less() {
        let ledger = CapitalLedger::new(&make_config());
        assert!((ledger.entry_price(Direction::Short, 100.0) - 99.9).abs() < 1e-9);
    }

    #[test]
    fn slippage_long_exit_receives_less() {
        let ledger = CapitalLedger::new(&make_config());
        assert!((ledger.exit_price(Direction::Long, 100.0) - 99.9).abs() < 1e-9);
    }

    #[test]
    fn slippage_short_exit_pays_up() {
        let ledger = CapitalLedger::new(&make_config());
        assert!((ledger.exit_price(Direction::Short, 100.0) - 100.1).abs() < 1e-9);
    }

    #[test]
    fn zero_slippage_is_identity() {
        let mut config = make_config();
        config.slippage_rate = 0.0;
        let ledger = CapitalLedger::new(&config);
        assert!((ledger.entry_price(Direction::Long, 100.0) - 100.0).abs() < f64::EPSILON);
        assert!((ledger.exit_price(Direction::Short, 100.0) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn size_entry_floors_units() {
        let ledger = CapitalLedger::new(&make_config());
        // budget 10_000 at 100.1 executed = 99.9 units, floored to 99
        match ledger.size_entry(Direction::Long, 100.0, 10.0) {
            EntrySizing::Sized {
                units,
                entry_price,
                notional,
            } => {
                assert!((units - 99.0).abs() < f64::EPSILON);
                assert!((entry_price - 100.1).abs() < 1e-9);
                assert!((notional - 99.0 * 100.1).abs() < 1e-9);
            }
            EntrySizing::InsufficientCapital => panic!("expected a sized entry"),
        }
    }

    #[test]
    fn size_entry_rejects_zero_units() {
        let mut config = make_config();
        config.initial_capital = 500.0;
        let ledger = CapitalLedger::new(&config);
        // budget 50, price 100 → 0 units
        assert_eq!(
            ledger.size_entry(Direction::Long, 100.0, 10.0),
            EntrySizing::InsufficientCapital
        );
    }

    #[test]
    fn size_entry_rejects_depleted_capital() {
        let mut config = make_config();
        config.initial_capital = 0.0;
        let ledger = CapitalLedger::new(&config);
        assert_eq!(
            ledger.size_entry(Direction::Long, 100.0, 10.0),
            EntrySizing::InsufficientCapital
        );
        config.initial_capital = -50.0;
        let ledger = CapitalLedger::new(&config);
        assert_eq!(
            ledger.size_entry(Direction::Long, 100.0, 10.0),
            EntrySizing::InsufficientCapital
        );
    }

    #[test]
    fn sizing_does_not_move_capital() {
        let ledger = CapitalLedger::new(&make_config());
        let _ = ledger.size_entry(Direction::Long, 100.0, 10.0);
        assert!((ledger.capital() - 100_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn settle_long_profit() {
        let mut config = make_config();
        config.slippage_rate = 0.0;
        let mut ledger = CapitalLedger::new(&config);
        let position = make_position(Direction::Long, 100.0, 100.0);

        let settlement = ledger.settle(&position, 104.0);

        // gross 100 * (104 - 100) = 400
        assert!((settlement.gross_pnl - 400.0).abs() < 1e-9);
        // commission 0.001 * (10_000 + 10_400) = 20.4
        assert!((settlement.commission - 20.4).abs() < 1e-9);
        assert!((settlement.net_pnl - 379.6).abs() < 1e-9);
        assert!((ledger.capital() - 100_379.6).abs() < 1e-9);
        // 379.6 / 10_000
        assert!((settlement.return_pct - 3.796).abs() < 1e-9);
    }

    #[test]
    fn settle_short_profit() {
        let mut config = make_config();
        config.slippage_rate = 0.0;
        let mut ledger = CapitalLedger::new(&config);
        let position = make_position(Direction::Short, 100.0, 100.0);

        let settlement = ledger.settle(&position, 96.0);

        // gross -1 * 100 * (96 - 100) = 400
        assert!((settlement.gross_pnl - 400.0).abs() < 1e-9);
        assert!((settlement.commission - 0.001 * (10_000.0 + 9_600.0)).abs() < 1e-9);
        assert!((settlement.net_pnl - (400.0 - 19.6)).abs() < 1e-9);
        assert!((ledger.capital() - 100_380.4).abs() < 1e-9);
    }

    #[test]
    fn settle_loss_with_exit_slippage() {
        let mut ledger = CapitalLedger::new(&make_config());
        let position = make_position(Direction::Long, 99.0, 100.1);

        let settlement = ledger.settle(&position, 98.0);

        let exit_price = 98.0 * 0.999;
        assert!((settlement.exit_price - exit_price).abs() < 1e-9);
        let gross = 99.0 * (exit_price - 100.1);
        assert!((settlement.gross_pnl - gross).abs() < 1e-9);
        let commission = (99.0 * 100.1 + 99.0 * exit_price) * 0.001;
        assert!((settlement.commission - commission).abs() < 1e-9);
        assert!((settlement.net_pnl - (gross - commission)).abs() < 1e-9);
        assert!((ledger.capital() - (100_000.0 + gross - commission)).abs() < 1e-9);
        assert!(settlement.net_pnl < 0.0);
    }

    #[test]
    fn capital_moves_once_per_close() {
        let mut config = make_config();
        config.slippage_rate = 0.0;
        config.commission_rate = 0.0;
        let mut ledger = CapitalLedger::new(&config);

        let first = make_position(Direction::Long, 10.0, 100.0);
        ledger.settle(&first, 110.0);
        assert!((ledger.capital() - 100_100.0).abs() < 1e-9);

        let second = make_position(Direction::Long, 10.0, 100.0);
        ledger.settle(&second, 90.0);
        assert!((ledger.capital() - 100_000.0).abs() < 1e-9);
    }
}
