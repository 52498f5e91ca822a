//! CSV candle loading for the backtest driver.
//!
//! The wire format (which columns, which file layout) is the driver's own
//! concern, not the engine's: one row per candle, columns
//! `instrument,time,open,high,low,close,volume`.

use std::error::Error;

use csv::ReaderBuilder;
use fx_core::data::{Candlestick, CandleStore, DataFreq};

pub fn load_csv(path: &str, freq: DataFreq) -> Result<CandleStore, Box<dyn Error>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut by_instrument: std::collections::BTreeMap<String, Vec<Candlestick>> =
        std::collections::BTreeMap::new();

    for result in rdr.records() {
        let record = result?;
        let instrument = record[0].to_string();
        let candle = Candlestick {
            time: record[1].parse::<i64>()?,
            open: record[2].parse::<f64>()?,
            high: record[3].parse::<f64>()?,
            low: record[4].parse::<f64>()?,
            close: record[5].parse::<f64>()?,
            volume: record
                .get(6)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(0),
        };
        by_instrument.entry(instrument).or_default().push(candle);
    }

    let mut store = CandleStore::new();
    for (instrument, mut candles) in by_instrument {
        candles.sort_by_key(|c| c.time);
        store.insert_series(&instrument, freq, candles);
    }
    Ok(store)
}
