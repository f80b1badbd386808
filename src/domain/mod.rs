//! Core domain types and logic.

pub mod ohlcv;
pub mod signal;
pub mod strategy;
pub mod position;
pub mod ledger;
pub mod entry;
pub mod exit;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
