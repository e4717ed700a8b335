//! Data loading
//!
//! Loads OHLCV candles and daily universe snapshots from CSV files.
//! Candle files are named `{SYMBOL}_{timeframe}.csv` with a
//! `datetime,open,high,low,close,volume` header. Invalid rows are skipped
//! with a warning rather than failing the whole load.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

use crate::strategies::momentum_universe::UniverseEntry;
use crate::{Candle, Symbol};

/// Load OHLCV data from CSV file with validation
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).context("Failed to open CSV file")?;

    let mut candles = Vec::new();
    let mut invalid_count = 0;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to read row {}", row_idx + 1))?;

        let dt_str = record.get(0).context("Missing datetime column")?;
        let datetime = parse_date(dt_str).context(format!("Failed to parse datetime: {}", dt_str))?;

        let open: f64 = record
            .get(1)
            .context("Missing open column")?
            .parse()
            .context("Failed to parse open")?;
        let high: f64 = record
            .get(2)
            .context("Missing high column")?
            .parse()
            .context("Failed to parse high")?;
        let low: f64 = record
            .get(3)
            .context("Missing low column")?
            .parse()
            .context("Failed to parse low")?;
        let close: f64 = record
            .get(4)
            .context("Missing close column")?
            .parse()
            .context("Failed to parse close")?;
        let volume: f64 = record
            .get(5)
            .context("Missing volume column")?
            .parse()
            .context("Failed to parse volume")?;

        match Candle::new(datetime, open, high, low, close, volume) {
            Ok(candle) => candles.push(candle),
            Err(e) => {
                invalid_count += 1;
                warn!(
                    "Skipping invalid candle at row {} in {:?}: {}",
                    row_idx + 2, // +2 for 1-indexed and header row
                    path.file_name().unwrap_or_default(),
                    e
                );
            }
        }
    }

    if invalid_count > 0 {
        warn!(
            "Skipped {} invalid candles out of {} in {:?}",
            invalid_count,
            invalid_count + candles.len(),
            path.file_name().unwrap_or_default()
        );
    }

    Ok(candles)
}

/// Filter candles by date range
pub fn filter_candles_by_date(
    candles: Vec<Candle>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<Candle> {
    candles
        .into_iter()
        .filter(|c| {
            let after_start = start.is_none_or(|s| c.datetime >= s);
            let before_end = end.is_none_or(|e| c.datetime <= e);
            after_start && before_end
        })
        .collect()
}

/// Parse a date string (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS) to DateTime<Utc>
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    // Try full datetime format first
    if let Ok(dt) = date_str.parse::<DateTime<Utc>>() {
        return Ok(dt);
    }

    // Try YYYY-MM-DD HH:MM:SS format
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%d %H:%M:%S") {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc));
    }

    // Try YYYY-MM-DD format (assume start of day)
    if let Ok(nd) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
        if let Some(ndt) = nd.and_hms_opt(0, 0, 0) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc));
        }
    }

    anyhow::bail!(
        "Failed to parse date: {}. Use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS format",
        date_str
    )
}

/// Load data for multiple symbols from CSV files
pub fn load_multi_symbol(
    data_dir: impl AsRef<Path>,
    symbols: &[Symbol],
    timeframe: &str,
) -> Result<HashMap<Symbol, Vec<Candle>>> {
    load_multi_symbol_with_range(data_dir, symbols, timeframe, None, None)
}

/// Load data for multiple symbols from CSV files with optional date range
/// filtering. Symbols load in parallel; missing files are skipped with a
/// warning.
pub fn load_multi_symbol_with_range(
    data_dir: impl AsRef<Path>,
    symbols: &[Symbol],
    timeframe: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<HashMap<Symbol, Vec<Candle>>> {
    let data_dir = data_dir.as_ref().to_path_buf();

    let results: Vec<Option<(Symbol, Vec<Candle>)>> = symbols
        .par_iter()
        .map(|symbol| {
            let filename = format!("{}_{}.csv", symbol.as_str(), timeframe);
            let path = data_dir.join(&filename);

            if !path.exists() {
                warn!("Data file not found: {}", path.display());
                return None;
            }

            let candles = match load_csv(&path) {
                Ok(c) => c,
                Err(e) => {
                    warn!("Failed to load data for {}: {}", symbol, e);
                    return None;
                }
            };
            let original_len = candles.len();
            let candles = filter_candles_by_date(candles, start, end);

            if start.is_some() || end.is_some() {
                info!(
                    "Loaded {} candles for {} (filtered from {} total)",
                    candles.len(),
                    symbol,
                    original_len
                );
            } else {
                info!("Loaded {} candles for {}", candles.len(), symbol);
            }

            if candles.is_empty() {
                None
            } else {
                Some((symbol.clone(), candles))
            }
        })
        .collect();

    let data: HashMap<Symbol, Vec<Candle>> = results.into_iter().flatten().collect();

    if data.is_empty() {
        anyhow::bail!("No data loaded for any symbol");
    }

    Ok(data)
}

/// Load daily universe snapshots from a CSV file.
///
/// Expected header:
/// `date,symbol,price,dollar_volume,market_cap,has_fundamentals`
pub fn load_universe_snapshots(
    path: impl AsRef<Path>,
) -> Result<BTreeMap<NaiveDate, Vec<UniverseEntry>>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).context("Failed to open universe CSV")?;

    let mut snapshots: BTreeMap<NaiveDate, Vec<UniverseEntry>> = BTreeMap::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to read row {}", row_idx + 1))?;

        let date_str = record.get(0).context("Missing date column")?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .context(format!("Failed to parse date: {}", date_str))?;

        let symbol = record.get(1).context("Missing symbol column")?;
        let price: f64 = record
            .get(2)
            .context("Missing price column")?
            .parse()
            .context("Failed to parse price")?;
        let dollar_volume: f64 = record
            .get(3)
            .context("Missing dollar_volume column")?
            .parse()
            .context("Failed to parse dollar_volume")?;
        let market_cap: f64 = record
            .get(4)
            .context("Missing market_cap column")?
            .parse()
            .context("Failed to parse market_cap")?;
        let has_fundamentals: bool = record
            .get(5)
            .context("Missing has_fundamentals column")?
            .trim()
            .parse()
            .context("Failed to parse has_fundamentals")?;

        snapshots.entry(date).or_default().push(UniverseEntry {
            symbol: Symbol::new(symbol),
            price,
            dollar_volume,
            market_cap,
            has_fundamentals,
        });
    }

    info!(
        "Loaded {} universe snapshot days from {}",
        snapshots.len(),
        path.display()
    );

    Ok(snapshots)
}
