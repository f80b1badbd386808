//! Raw configuration validation.
//!
//! Checks every key before any struct is built, so a bad file fails with the
//! offending section and key instead of a default silently taking over.

use crate::domain::error::CandlesimError;
use crate::domain::strategy::{parse_patterns, EntryRule, ExitRule, Timeframe};
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), CandlesimError> {
    validate_initial_capital(config)?;
    validate_rate(config, "commission")?;
    validate_rate(config, "slippage")?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), CandlesimError> {
    validate_patterns(config)?;
    validate_entry_rule(config)?;
    validate_exit_rule(config)?;
    validate_timeframe(config)?;
    validate_pct_key(config, "position_size")?;
    validate_pct_key(config, "stop_loss")?;
    validate_pct_key(config, "take_profit")?;
    validate_pct_key(config, "trailing_stop")?;
    validate_max_bars_hold(config)?;
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), CandlesimError> {
    if config.get_string("backtest", "initial_capital").is_none() {
        return Err(CandlesimError::ConfigMissing {
            section: "backtest".to_string(),
            key: "initial_capital".to_string(),
        });
    }
    // NAN default catches both out-of-range and unparseable values.
    let value = config.get_double("backtest", "initial_capital", f64::NAN);
    if !value.is_finite() || value <= 0.0 {
        return Err(CandlesimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be a positive number".to_string(),
        });
    }
    Ok(())
}

/// Per-leg cost rates are optional and default to zero, but when present
/// must be a fraction below 1.
fn validate_rate(config: &dyn ConfigPort, key: &str) -> Result<(), CandlesimError> {
    if config.get_string("backtest", key).is_none() {
        return Ok(());
    }
    let value = config.get_double("backtest", key, f64::NAN);
    if !value.is_finite() || value < 0.0 || value >= 1.0 {
        return Err(CandlesimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: key.to_string(),
            reason: format!("{key} must be a fraction in [0, 1)"),
        });
    }
    Ok(())
}

fn validate_patterns(config: &dyn ConfigPort) -> Result<(), CandlesimError> {
    let raw = match config.get_string("strategy", "patterns") {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            return Err(CandlesimError::ConfigMissing {
                section: "strategy".to_string(),
                key: "patterns".to_string(),
            })
        }
    };
    parse_patterns(&raw).map_err(|e| CandlesimError::ConfigInvalid {
        section: "strategy".to_string(),
        key: "patterns".to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

fn validate_entry_rule(config: &dyn ConfigPort) -> Result<(), CandlesimError> {
    let raw = match config.get_string("strategy", "entry_rule") {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            return Err(CandlesimError::ConfigMissing {
                section: "strategy".to_string(),
                key: "entry_rule".to_string(),
            })
        }
    };
    raw.parse::<EntryRule>()
        .map_err(|reason| CandlesimError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "entry_rule".to_string(),
            reason,
        })?;
    Ok(())
}

fn validate_exit_rule(config: &dyn ConfigPort) -> Result<(), CandlesimError> {
    let raw = match config.get_string("strategy", "exit_rule") {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            return Err(CandlesimError::ConfigMissing {
                section: "strategy".to_string(),
                key: "exit_rule".to_string(),
            })
        }
    };
    raw.parse::<ExitRule>()
        .map_err(|reason| CandlesimError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "exit_rule".to_string(),
            reason,
        })?;
    Ok(())
}

fn validate_timeframe(config: &dyn ConfigPort) -> Result<(), CandlesimError> {
    let raw = match config.get_string("strategy", "timeframe") {
        Some(s) => s,
        None => return Ok(()),
    };
    raw.parse::<Timeframe>()
        .map_err(|reason| CandlesimError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "timeframe".to_string(),
            reason,
        })?;
    Ok(())
}

fn validate_pct_key(config: &dyn ConfigPort, key: &str) -> Result<(), CandlesimError> {
    if config.get_string("strategy", key).is_none() {
        return Ok(());
    }
    let value = config.get_double("strategy", key, f64::NAN);
    if !value.is_finite() || value <= 0.0 || value > 100.0 {
        return Err(CandlesimError::ConfigInvalid {
            section: "strategy".to_string(),
            key: key.to_string(),
            reason: format!("{key} must be a percentage in (0, 100]"),
        });
    }
    Ok(())
}

fn validate_max_bars_hold(config: &dyn ConfigPort) -> Result<(), CandlesimError> {
    if config.get_string("strategy", "max_bars_hold").is_none() {
        return Ok(());
    }
    let value = config.get_int("strategy", "max_bars_hold", 0);
    if value < 1 {
        return Err(CandlesimError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "max_bars_hold".to_string(),
            reason: "max_bars_hold must be at least 1".to_string(),
        });
    }
    Ok(())
}
