//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::CandlesimError;
use crate::domain::metrics::MetricsSummary;
use crate::domain::strategy::StrategyConfig;
use std::path::Path;

/// Port for rendering backtest reports.
pub trait ReportPort {
    fn render(
        &self,
        result: &BacktestResult,
        metrics: &MetricsSummary,
        strategy: &StrategyConfig,
    ) -> Result<String, CandlesimError>;

    /// Default implementation: render, create parent directories, write.
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &MetricsSummary,
        strategy: &StrategyConfig,
        output_path: &Path,
    ) -> Result<(), CandlesimError> {
        let content = self.render(result, metrics, strategy)?;
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(output_path, content)?;
        Ok(())
    }
}
