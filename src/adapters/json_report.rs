//! JSON report adapter.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::CandlesimError;
use crate::domain::metrics::MetricsSummary;
use crate::domain::strategy::StrategyConfig;
use crate::ports::report_port::ReportPort;
use serde::Serialize;

/// Everything a downstream consumer needs in one document.
#[derive(Serialize)]
struct ReportDocument<'a> {
    strategy: &'a StrategyConfig,
    result: &'a BacktestResult,
    metrics: &'a MetricsSummary,
}

pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for JsonReportAdapter {
    fn render(
        &self,
        result: &BacktestResult,
        metrics: &MetricsSummary,
        strategy: &StrategyConfig,
    ) -> Result<String, CandlesimError> {
        let document = ReportDocument {
            strategy,
            result,
            metrics,
        };
        serde_json::to_string_pretty(&document).map_err(|e| CandlesimError::Report {
            reason: e.to_string(),
        })
    }
}
