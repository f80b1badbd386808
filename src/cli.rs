//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvDataAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report::JsonReportAdapter;
use crate::adapters::text_report::TextReportAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig};
use crate::domain::config_validation::{validate_backtest_config, validate_strategy_config};
use crate::domain::error::CandlesimError;
use crate::domain::metrics::MetricsSummary;
use crate::domain::strategy::{parse_patterns, StrategyConfig, Timeframe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "candlesim", about = "Candlestick pattern backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of CSV bar files; overrides [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Symbol to simulate; overrides [data] symbol
        #[arg(short, long)]
        symbol: Option<String>,
        /// Report file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "text")]
        format: ReportFormat,
        /// Validate and print the resolved configuration without running
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show bar counts and signal coverage for a data set
    Info {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            symbol,
            output,
            format,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest_cmd(
                    &config,
                    data.as_deref(),
                    symbol.as_deref(),
                    output.as_deref(),
                    format,
                )
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info {
            config,
            data,
            symbol,
        } => run_info(config.as_deref(), data.as_deref(), symbol.as_deref()),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

/// Build and semantically validate the capital/cost configuration.
/// `validate_backtest_config` should have passed on the same adapter first.
pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, CandlesimError> {
    let config = BacktestConfig {
        initial_capital: adapter.get_double("backtest", "initial_capital", 0.0),
        commission_rate: adapter.get_double("backtest", "commission", 0.0),
        slippage_rate: adapter.get_double("backtest", "slippage", 0.0),
    };
    config.validate()?;
    Ok(config)
}

pub fn build_strategy_config(adapter: &dyn ConfigPort) -> Result<StrategyConfig, CandlesimError> {
    let patterns_raw = adapter.get_string("strategy", "patterns").ok_or_else(|| {
        CandlesimError::ConfigMissing {
            section: "strategy".to_string(),
            key: "patterns".to_string(),
        }
    })?;
    let patterns = parse_patterns(&patterns_raw).map_err(|e| CandlesimError::ConfigInvalid {
        section: "strategy".to_string(),
        key: "patterns".to_string(),
        reason: e.to_string(),
    })?;

    let entry_rule = parse_strategy_key(adapter, "entry_rule")?;
    let exit_rule = parse_strategy_key(adapter, "exit_rule")?;
    let timeframe = match adapter.get_string("strategy", "timeframe") {
        Some(raw) => raw
            .parse::<Timeframe>()
            .map_err(|reason| CandlesimError::ConfigInvalid {
                section: "strategy".to_string(),
                key: "timeframe".to_string(),
                reason,
            })?,
        None => Timeframe::D1,
    };

    let stop_loss_pct = adapter.get_double("strategy", "stop_loss", 2.0);
    let strategy = StrategyConfig {
        name: adapter
            .get_string("strategy", "name")
            .unwrap_or_else(|| "Unnamed".to_string()),
        patterns,
        entry_rule,
        exit_rule,
        timeframe,
        position_size_pct: adapter.get_double("strategy", "position_size", 10.0),
        stop_loss_pct,
        take_profit_pct: adapter.get_double("strategy", "take_profit", 4.0),
        max_bars_hold: adapter.get_int("strategy", "max_bars_hold", 20) as usize,
        // Trailing distance defaults to the stop distance.
        trailing_stop_pct: adapter.get_double("strategy", "trailing_stop", stop_loss_pct),
    };
    strategy.validate()?;
    Ok(strategy)
}

fn parse_strategy_key<T>(adapter: &dyn ConfigPort, key: &str) -> Result<T, CandlesimError>
where
    T: std::str::FromStr<Err = String>,
{
    let raw = adapter
        .get_string("strategy", key)
        .ok_or_else(|| CandlesimError::ConfigMissing {
            section: "strategy".to_string(),
            key: key.to_string(),
        })?;
    raw.parse().map_err(|reason| CandlesimError::ConfigInvalid {
        section: "strategy".to_string(),
        key: key.to_string(),
        reason,
    })
}

pub fn resolve_data_dir(override_path: Option<&Path>, adapter: &dyn ConfigPort) -> PathBuf {
    if let Some(p) = override_path {
        return p.to_path_buf();
    }
    PathBuf::from(
        adapter
            .get_string("data", "path")
            .unwrap_or_else(|| "data".to_string()),
    )
}

pub fn resolve_symbol(
    override_symbol: Option<&str>,
    adapter: &dyn ConfigPort,
) -> Result<String, CandlesimError> {
    if let Some(s) = override_symbol {
        return Ok(s.to_uppercase());
    }
    match adapter.get_string("data", "symbol") {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_uppercase()),
        _ => Err(CandlesimError::ConfigMissing {
            section: "data".to_string(),
            key: "symbol".to_string(),
        }),
    }
}

fn run_backtest_cmd(
    config_path: &Path,
    data_override: Option<&Path>,
    symbol_override: Option<&str>,
    output_path: Option<&Path>,
    format: ReportFormat,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate raw keys
    if let Err(e) = validate_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 3: Build configs
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let strategy = match build_strategy_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!(
        "Strategy: {} ({} patterns, {} entry, {} exit)",
        strategy.name,
        strategy.patterns.len(),
        strategy.entry_rule,
        strategy.exit_rule
    );

    // Stage 4: Resolve data location
    let symbol = match resolve_symbol(symbol_override, &adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let data_dir = resolve_data_dir(data_override, &adapter);
    eprintln!("Loading {} from {}", symbol, data_dir.display());

    let data_port = CsvDataAdapter::new(data_dir);
    run_backtest_pipeline(&data_port, &strategy, &bt_config, &symbol, output_path, format)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy: &StrategyConfig,
    bt_config: &BacktestConfig,
    symbol: &str,
    output_path: Option<&Path>,
    format: ReportFormat,
) -> ExitCode {
    // Stage 5: Fetch series
    let series = match data_port.fetch_series(symbol) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Loaded {} bars, {} signals", series.len(), series.signals.len());

    // Stage 6: Simulate
    let result = run_backtest(&series, strategy, bt_config);

    // Stage 7: Metrics
    let metrics = MetricsSummary::compute(&result, strategy.timeframe.periods_per_year());

    // Stage 8: Console summary
    eprintln!("\n=== Results: {} ===", result.symbol);
    eprintln!("Total Return:     {:.2}%", metrics.total_return_pct);
    eprintln!("Final Capital:    {:.2}", metrics.final_capital);
    eprintln!("Max Drawdown:     {:.2}%", metrics.max_drawdown_pct);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Total Trades:     {}", metrics.total_trades);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate_pct);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
    if !result.events.is_empty() {
        eprintln!("Events:           {}", result.events.len());
    }

    // Stage 9: Report
    let report: Box<dyn ReportPort> = match format {
        ReportFormat::Text => Box::new(TextReportAdapter::new()),
        ReportFormat::Json => Box::new(JsonReportAdapter::new()),
    };
    match output_path {
        Some(path) => match report.write(&result, &metrics, strategy, path) {
            Ok(()) => {
                eprintln!("\nReport written to: {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        },
        None => match report.render(&result, &metrics, strategy) {
            Ok(content) => {
                println!("{content}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        },
    }
}

pub fn run_dry_run(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let strategy = match build_strategy_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Config validated successfully");
    print_resolved_config(&strategy, &bt_config);
    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let strategy = match build_strategy_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_resolved_config(&strategy, &bt_config);
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn print_resolved_config(strategy: &StrategyConfig, bt_config: &BacktestConfig) {
    eprintln!("\nStrategy (resolved):");
    eprintln!("  name:          {}", strategy.name);
    eprintln!("  patterns:      {}", strategy.patterns.join(", "));
    eprintln!("  entry rule:    {}", strategy.entry_rule);
    eprintln!("  exit rule:     {}", strategy.exit_rule);
    eprintln!("  timeframe:     {}", strategy.timeframe);
    eprintln!("  position size: {}%", strategy.position_size_pct);
    eprintln!("  stop loss:     {}%", strategy.stop_loss_pct);
    eprintln!("  take profit:   {}%", strategy.take_profit_pct);
    eprintln!("  max bars hold: {}", strategy.max_bars_hold);
    eprintln!("  trailing stop: {}%", strategy.trailing_stop_pct);
    eprintln!("\nBacktest:");
    eprintln!("  initial capital: {}", bt_config.initial_capital);
    eprintln!("  commission:      {}", bt_config.commission_rate);
    eprintln!("  slippage:        {}", bt_config.slippage_rate);
}

fn run_info(
    config_path: Option<&Path>,
    data_override: Option<&Path>,
    symbol_override: Option<&str>,
) -> ExitCode {
    let adapter = match config_path {
        Some(p) => match load_config(p) {
            Ok(a) => Some(a),
            Err(code) => return code,
        },
        None => None,
    };

    let data_dir = if let Some(p) = data_override {
        p.to_path_buf()
    } else if let Some(a) = &adapter {
        resolve_data_dir(None, a)
    } else {
        PathBuf::from("data")
    };
    let port = CsvDataAdapter::new(data_dir.clone());

    let symbols: Vec<String> = match symbol_override {
        Some(s) => vec![s.to_uppercase()],
        None => {
            let configured = adapter
                .as_ref()
                .and_then(|a| a.get_string("data", "symbol"))
                .filter(|s| !s.trim().is_empty());
            match configured {
                Some(s) => vec![s.trim().to_uppercase()],
                None => match port.list_symbols() {
                    Ok(v) if !v.is_empty() => v,
                    Ok(_) => {
                        eprintln!("No data files found in {}", data_dir.display());
                        return ExitCode::from(4);
                    }
                    Err(e) => {
                        eprintln!("error: {e}");
                        return (&e).into();
                    }
                },
            }
        }
    };

    for symbol in &symbols {
        match port.fetch_series(symbol) {
            Ok(series) => {
                if let (Some(first), Some(last)) = (series.bars.first(), series.bars.last()) {
                    println!(
                        "{}: {} bars, {} to {}",
                        symbol,
                        series.len(),
                        first.timestamp.format("%Y-%m-%d %H:%M"),
                        last.timestamp.format("%Y-%m-%d %H:%M")
                    );
                }
                if series.signals.is_empty() {
                    println!("  signals: none");
                } else {
                    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                    for signal in &series.signals {
                        *counts.entry(signal.pattern.as_str()).or_default() += 1;
                    }
                    let summary = counts
                        .iter()
                        .map(|(pattern, n)| format!("{pattern} x{n}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    println!("  signals: {summary}");
                }
            }
            Err(e) => eprintln!("{symbol}: {e}"),
        }
    }
    ExitCode::SUCCESS
}
