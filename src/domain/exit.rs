//! Exit rule evaluation.
//!
//! One pure decision per bar for an open position, in fixed precedence:
//! stop-loss, then take-profit, then the rule-specific check. Protective
//! exits win any same-bar ambiguity.

use crate::domain::ohlcv::Bar;
use crate::domain::position::{ExitReason, Position};
use crate::domain::strategy::{ExitRule, StrategyConfig};

/// A close decision: market price the exit executes at, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitDecision {
    pub price: f64,
    pub reason: ExitReason,
}

/// Decide whether `position` closes on `bar`.
///
/// `opposite_fill` is the fill price implied by an opposite-direction signal
/// under the strategy's entry rule, resolved by the caller; it is only
/// consulted for `ExitRule::OppositePattern`. The caller must have advanced
/// the position with [`Position::observe_bar`] for this bar already.
pub fn evaluate_exit(
    position: &Position,
    bar: &Bar,
    opposite_fill: Option<f64>,
    strategy: &StrategyConfig,
) -> Option<ExitDecision> {
    let rule = strategy.exit_rule;

    // TAKE_PROFIT_ONLY is the one variant that does not arm the stop.
    if rule != ExitRule::TakeProfitOnly && position.stop_hit(bar) {
        return Some(ExitDecision {
            price: position.stop_price,
            reason: ExitReason::StopLoss,
        });
    }

    let take_profit_armed = matches!(
        rule,
        ExitRule::StopLossTakeProfit | ExitRule::TakeProfitOnly
    );
    if take_profit_armed && position.take_profit_hit(bar) {
        return Some(ExitDecision {
            price: position.take_profit_price,
            reason: ExitReason::TakeProfit,
        });
    }

    match rule {
        ExitRule::OppositePattern => opposite_fill.map(|price| ExitDecision {
            price,
            reason: ExitReason::OppositePattern,
        }),
        ExitRule::TimeBased => (position.bars_held >= strategy.max_bars_hold).then(|| {
            ExitDecision {
                price: bar.close,
                reason: ExitReason::TimeBased,
            }
        }),
        ExitRule::TrailingStop => {
            position
                .trailing_hit(bar, strategy.trailing_stop_pct)
                .then(|| ExitDecision {
                    price: position.trailing_level(strategy.trailing_stop_pct),
                    reason: ExitReason::TrailingStop,
                })
        }
        ExitRule::StopLossTakeProfit | ExitRule::TakeProfitOnly => None,
    }
}
