//! CSV file data adapter.
//!
//! Reads `<dir>/<symbol>.csv` for bars and, when present,
//! `<dir>/<symbol>.signals.csv` for pattern signals keyed by timestamp.

use crate::domain::error::CandlesimError;
use crate::domain::ohlcv::{Bar, BarSeries};
use crate::domain::signal::{Direction, PatternSignal};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const SIGNALS_SUFFIX: &str = ".signals.csv";

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

impl CsvDataAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn bars_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    fn signals_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}{SIGNALS_SUFFIX}"))
    }

    fn read_bars(&self, path: &Path) -> Result<Vec<Bar>, CandlesimError> {
        let content = fs::read_to_string(path).map_err(|e| load_err(path, e))?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| load_err(path, e))?;
            bars.push(Bar {
                timestamp: timestamp_field(&record, 0, path)?,
                open: price_field(&record, 1, "open", path)?,
                high: price_field(&record, 2, "high", path)?,
                low: price_field(&record, 3, "low", path)?,
                close: price_field(&record, 4, "close", path)?,
                volume: price_field(&record, 5, "volume", path)?,
            });
        }

        Ok(bars)
    }

    fn read_signals(
        &self,
        path: &Path,
        index_by_time: &HashMap<NaiveDateTime, usize>,
    ) -> Result<Vec<PatternSignal>, CandlesimError> {
        let content = fs::read_to_string(path).map_err(|e| load_err(path, e))?;
        // Flexible: the strength column may be absent entirely.
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut signals = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| load_err(path, e))?;

            let timestamp = timestamp_field(&record, 0, path)?;
            let bar_index = *index_by_time.get(&timestamp).ok_or_else(|| {
                load_err(
                    path,
                    format!("signal timestamp {timestamp} does not match any bar"),
                )
            })?;

            let pattern = field(&record, 1, "pattern", path)?.trim().to_uppercase();
            if pattern.is_empty() {
                return Err(load_err(path, "empty pattern name"));
            }

            let direction: Direction = field(&record, 2, "direction", path)?
                .parse()
                .map_err(|e| load_err(path, e))?;

            let strength = match record.get(3) {
                None => 1.0,
                Some(s) if s.trim().is_empty() => 1.0,
                Some(s) => s
                    .trim()
                    .parse()
                    .map_err(|e| load_err(path, format!("invalid strength value: {e}")))?,
            };

            signals.push(PatternSignal {
                bar_index,
                pattern,
                direction,
                strength,
            });
        }

        Ok(signals)
    }
}

impl DataPort for CsvDataAdapter {
    fn fetch_series(&self, symbol: &str) -> Result<BarSeries, CandlesimError> {
        let bars_path = self.bars_path(symbol);
        let bars = self.read_bars(&bars_path)?;
        if bars.is_empty() {
            return Err(CandlesimError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let index_by_time: HashMap<NaiveDateTime, usize> = bars
            .iter()
            .enumerate()
            .map(|(i, b)| (b.timestamp, i))
            .collect();

        let signals_path = self.signals_path(symbol);
        let signals = if signals_path.exists() {
            self.read_signals(&signals_path, &index_by_time)?
        } else {
            Vec::new()
        };

        Ok(BarSeries::new(symbol, bars, signals)?)
    }

    fn list_symbols(&self) -> Result<Vec<String>, CandlesimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| load_err(&self.base_path, e))?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| load_err(&self.base_path, e))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if name_str.ends_with(SIGNALS_SUFFIX) {
                continue;
            }
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

fn load_err(path: &Path, reason: impl std::fmt::Display) -> CandlesimError {
    CandlesimError::DataLoad {
        file: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    name: &str,
    path: &Path,
) -> Result<&'r str, CandlesimError> {
    record
        .get(idx)
        .ok_or_else(|| load_err(path, format!("missing {name} column")))
}

fn price_field(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    path: &Path,
) -> Result<f64, CandlesimError> {
    field(record, idx, name, path)?
        .trim()
        .parse()
        .map_err(|e| load_err(path, format!("invalid {name} value: {e}")))
}

fn timestamp_field(
    record: &csv::StringRecord,
    idx: usize,
    path: &Path,
) -> Result<NaiveDateTime, CandlesimError> {
    let raw = field(record, idx, "timestamp", path)?.trim();
    parse_timestamp(raw).ok_or_else(|| load_err(path, format!("invalid timestamp: {raw}")))
}

/// `%Y-%m-%d %H:%M:%S`, with bare dates accepted for daily data.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::DataError;
    use tempfile::TempDir;

    const BARS: &str = "timestamp,open,high,low,close,volume\n\
        2024-01-15 00:00:00,100.0,110.0,90.0,105.0,50000\n\
        2024-01-16 00:00:00,105.0,115.0,100.0,110.0,60000\n\
        2024-01-17 00:00:00,110.0,120.0,105.0,115.0,55000\n";

    fn setup() -> (TempDir, CsvDataAdapter) {
        let dir = TempDir::new().unwrap();
        let adapter = CsvDataAdapter::new(dir.path().to_path_buf());
        (dir, adapter)
    }

    #[test]
    fn fetch_series_parses_bars() {
        let (dir, adapter) = setup();
        fs::write(dir.path().join("SBER.csv"), BARS).unwrap();

        let series = adapter.fetch_series("SBER").unwrap();
        assert_eq!(series.symbol, "SBER");
        assert_eq!(series.len(), 3);
        assert_eq!(series.bars[0].open, 100.0);
        assert_eq!(series.bars[0].high, 110.0);
        assert_eq!(series.bars[0].low, 90.0);
        assert_eq!(series.bars[0].close, 105.0);
        assert_eq!(series.bars[0].volume, 50000.0);
        assert_eq!(
            series.bars[2].timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 17)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert!(series.signals.is_empty());
    }

    #[test]
    fn bare_dates_accepted_for_daily_data() {
        let (dir, adapter) = setup();
        fs::write(
            dir.path().join("SBER.csv"),
            "timestamp,open,high,low,close,volume\n\
             2024-01-15,100.0,110.0,90.0,105.0,50000\n",
        )
        .unwrap();

        let series = adapter.fetch_series("SBER").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(
            series.bars[0].timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn intraday_timestamps_accepted() {
        let (dir, adapter) = setup();
        fs::write(
            dir.path().join("BTCUSD.csv"),
            "timestamp,open,high,low,close,volume\n\
             2024-01-15 09:00:00,100.0,110.0,90.0,105.0,1.5\n\
             2024-01-15 10:00:00,105.0,115.0,100.0,110.0,2.5\n",
        )
        .unwrap();

        let series = adapter.fetch_series("BTCUSD").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(
            series.bars[1].timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn signals_joined_by_timestamp() {
        let (dir, adapter) = setup();
        fs::write(dir.path().join("SBER.csv"), BARS).unwrap();
        fs::write(
            dir.path().join("SBER.signals.csv"),
            "timestamp,pattern,direction,strength\n\
             2024-01-15 00:00:00,cdlhammer,long,0.8\n\
             2024-01-17 00:00:00,CDLENGULFING,short,0.6\n",
        )
        .unwrap();

        let series = adapter.fetch_series("SBER").unwrap();
        assert_eq!(series.signals.len(), 2);
        assert_eq!(series.signals[0].bar_index, 0);
        assert_eq!(series.signals[0].pattern, "CDLHAMMER");
        assert_eq!(series.signals[0].direction, Direction::Long);
        assert_eq!(series.signals[0].strength, 0.8);
        assert_eq!(series.signals[1].bar_index, 2);
        assert_eq!(series.signals[1].direction, Direction::Short);
    }

    #[test]
    fn strength_defaults_to_one() {
        let (dir, adapter) = setup();
        fs::write(dir.path().join("SBER.csv"), BARS).unwrap();
        fs::write(
            dir.path().join("SBER.signals.csv"),
            "timestamp,pattern,direction,strength\n\
             2024-01-15 00:00:00,CDLHAMMER,long,\n\
             2024-01-16 00:00:00,CDLHAMMER,long\n",
        )
        .unwrap();

        let series = adapter.fetch_series("SBER").unwrap();
        assert_eq!(series.signals.len(), 2);
        assert_eq!(series.signals[0].strength, 1.0);
        assert_eq!(series.signals[1].strength, 1.0);
    }

    #[test]
    fn unknown_signal_timestamp_fails() {
        let (dir, adapter) = setup();
        fs::write(dir.path().join("SBER.csv"), BARS).unwrap();
        fs::write(
            dir.path().join("SBER.signals.csv"),
            "timestamp,pattern,direction,strength\n\
             2024-02-01 00:00:00,CDLHAMMER,long,0.8\n",
        )
        .unwrap();

        let err = adapter.fetch_series("SBER").unwrap_err();
        assert!(matches!(err, CandlesimError::DataLoad { .. }));
    }

    #[test]
    fn bad_direction_fails() {
        let (dir, adapter) = setup();
        fs::write(dir.path().join("SBER.csv"), BARS).unwrap();
        fs::write(
            dir.path().join("SBER.signals.csv"),
            "timestamp,pattern,direction,strength\n\
             2024-01-15 00:00:00,CDLHAMMER,sideways,0.8\n",
        )
        .unwrap();

        let err = adapter.fetch_series("SBER").unwrap_err();
        assert!(matches!(err, CandlesimError::DataLoad { .. }));
    }

    #[test]
    fn missing_bars_file_fails() {
        let (_dir, adapter) = setup();
        let err = adapter.fetch_series("MISSING").unwrap_err();
        assert!(matches!(err, CandlesimError::DataLoad { .. }));
    }

    #[test]
    fn header_only_file_yields_no_data() {
        let (dir, adapter) = setup();
        fs::write(
            dir.path().join("EMPTY.csv"),
            "timestamp,open,high,low,close,volume\n",
        )
        .unwrap();

        let err = adapter.fetch_series("EMPTY").unwrap_err();
        assert!(matches!(err, CandlesimError::NoData { symbol } if symbol == "EMPTY"));
    }

    #[test]
    fn invalid_bar_reported_with_index() {
        let (dir, adapter) = setup();
        fs::write(
            dir.path().join("BAD.csv"),
            "timestamp,open,high,low,close,volume\n\
             2024-01-15 00:00:00,100.0,110.0,90.0,105.0,50000\n\
             2024-01-16 00:00:00,105.0,95.0,100.0,98.0,60000\n",
        )
        .unwrap();

        let err = adapter.fetch_series("BAD").unwrap_err();
        assert!(matches!(
            err,
            CandlesimError::Data(DataError::HighBelowLow { index: 1, .. })
        ));
    }

    #[test]
    fn unparseable_price_fails() {
        let (dir, adapter) = setup();
        fs::write(
            dir.path().join("BAD.csv"),
            "timestamp,open,high,low,close,volume\n\
             2024-01-15 00:00:00,abc,110.0,90.0,105.0,50000\n",
        )
        .unwrap();

        let err = adapter.fetch_series("BAD").unwrap_err();
        assert!(matches!(err, CandlesimError::DataLoad { .. }));
    }

    #[test]
    fn list_symbols_skips_signal_files() {
        let (dir, adapter) = setup();
        fs::write(dir.path().join("SBER.csv"), BARS).unwrap();
        fs::write(dir.path().join("GAZP.csv"), BARS).unwrap();
        fs::write(
            dir.path().join("SBER.signals.csv"),
            "timestamp,pattern,direction,strength\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not data").unwrap();

        let symbols = adapter.list_symbols().unwrap();
        assert_eq!(symbols, vec!["GAZP", "SBER"]);
    }
}
