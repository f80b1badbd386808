//! Entry rule evaluation: at which bar and price a signal fills.

use crate::domain::ohlcv::BarSeries;
use crate::domain::signal::PatternSignal;
use crate::domain::strategy::EntryRule;

/// A resolved fill for one signal.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFill {
    /// Bar at which the position opens.
    pub fill_index: usize,
    /// Market fill price, before slippage.
    pub fill_price: f64,
}

/// Resolve the fill a signal produces under an entry rule. `None` when the
/// signal cannot fill, i.e. OPEN_NEXT_BAR on the final bar.
pub fn resolve_entry(
    series: &BarSeries,
    rule: EntryRule,
    signal: &PatternSignal,
) -> Option<EntryFill> {
    let bar = &series.bars[signal.bar_index];
    match rule {
        EntryRule::OpenNextBar => {
            let fill_index = signal.bar_index + 1;
            let next = series.bars.get(fill_index)?;
            Some(EntryFill {
                fill_index,
                fill_price: next.open,
            })
        }
        EntryRule::MidOfPattern => Some(EntryFill {
            fill_index: signal.bar_index,
            fill_price: bar.midpoint(),
        }),
        EntryRule::CloseOfPattern => Some(EntryFill {
            fill_index: signal.bar_index,
            fill_price: bar.close,
        }),
    }
}

/// Bar whose signals can produce a fill landing on `bar_index`. OPEN_NEXT_BAR
/// fills come from the previous bar; same-bar rules fill from the bar itself.
/// `None` for bar 0 under OPEN_NEXT_BAR.
pub fn signal_source_index(rule: EntryRule, bar_index: usize) -> Option<usize> {
    match rule {
        EntryRule::OpenNextBar => bar_index.checked_sub(1),
        EntryRule::MidOfPattern | EntryRule::CloseOfPattern => Some(bar_index),
    }
}
