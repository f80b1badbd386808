//! Domain error types.

use crate::domain::ohlcv::DataError;

/// Top-level error type for candlesim.
#[derive(Debug, thiserror::Error)]
pub enum CandlesimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid strategy: {field}: {reason}")]
    StrategyInvalid { field: String, reason: String },

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("failed to load {file}: {reason}")]
    DataLoad { file: String, reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&CandlesimError> for std::process::ExitCode {
    fn from(err: &CandlesimError) -> Self {
        let code: u8 = match err {
            CandlesimError::Io(_) | CandlesimError::Report { .. } => 1,
            CandlesimError::ConfigParse { .. }
            | CandlesimError::ConfigMissing { .. }
            | CandlesimError::ConfigInvalid { .. }
            | CandlesimError::StrategyInvalid { .. } => 2,
            CandlesimError::Data(_) | CandlesimError::DataLoad { .. } => 3,
            CandlesimError::NoData { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
