//! candlesim — deterministic backtester for candlestick-pattern strategies.
//!
//! Hexagonal layout: pure simulation logic in [`domain`], collaborator traits
//! in [`ports`], file-backed implementations in [`adapters`], and the
//! command-line front end in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
