//! Data access port trait.

use crate::domain::error::CandlesimError;
use crate::domain::ohlcv::BarSeries;

pub trait DataPort {
    /// Load the bar series (and any pattern signals) for one symbol.
    fn fetch_series(&self, symbol: &str) -> Result<BarSeries, CandlesimError>;

    /// Symbols the backing store can serve.
    fn list_symbols(&self) -> Result<Vec<String>, CandlesimError>;
}
