//! Candlestick data model and the historical data accessor.

use std::collections::BTreeMap;

use crate::error::FxError;

/// Sampling frequency for candlestick data, expressed in seconds so every
/// variant evenly divides a 24h trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum DataFreq {
    M1 = 60,
    M2 = 120,
    M4 = 240,
    M5 = 300,
    M10 = 600,
    M15 = 900,
    M30 = 1800,
    H1 = 3600,
    H2 = 7200,
    H4 = 14400,
    H6 = 21600,
    H8 = 28800,
    H12 = 43200,
    D = 86400,
}

impl DataFreq {
    pub fn seconds(self) -> i64 {
        self as i64
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataFreq::M1 => "M1",
            DataFreq::M2 => "M2",
            DataFreq::M4 => "M4",
            DataFreq::M5 => "M5",
            DataFreq::M10 => "M10",
            DataFreq::M15 => "M15",
            DataFreq::M30 => "M30",
            DataFreq::H1 => "H1",
            DataFreq::H2 => "H2",
            DataFreq::H4 => "H4",
            DataFreq::H6 => "H6",
            DataFreq::H8 => "H8",
            DataFreq::H12 => "H12",
            DataFreq::D => "D",
        }
    }

    pub fn from_str(freq: &str) -> Result<Self, FxError> {
        Ok(match freq {
            "M1" => DataFreq::M1,
            "M2" => DataFreq::M2,
            "M4" => DataFreq::M4,
            "M5" => DataFreq::M5,
            "M10" => DataFreq::M10,
            "M15" => DataFreq::M15,
            "M30" => DataFreq::M30,
            "H1" => DataFreq::H1,
            "H2" => DataFreq::H2,
            "H4" => DataFreq::H4,
            "H6" => DataFreq::H6,
            "H8" => DataFreq::H8,
            "H12" => DataFreq::H12,
            "D" => DataFreq::D,
            other => return Err(FxError::UnsupportedFrequency(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candlestick {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Snapshot of the current candle per instrument, keyed by instrument name.
/// A missing or `None` entry means no tick is available this step.
pub type TickDataMap = BTreeMap<String, Option<Candlestick>>;

/// Largest-index-with-value-<=-target binary search (`reversed = true`) or
/// smallest-index-with-value->=-target (`reversed = false`), matching the
/// original recursive search. Returns `None` if no such index exists.
pub fn binary_search(values: &[i64], target: i64, reversed: bool) -> Option<usize> {
    if values.is_empty() {
        return None;
    }
    let mut low: i64 = 0;
    let mut high: i64 = values.len() as i64 - 1;
    let mut result: Option<usize> = None;
    while low <= high {
        let mid = ((low + high) / 2) as usize;
        let v = values[mid];
        if (v < target && !reversed) || (v > target && reversed) {
            low = mid as i64 + 1;
        } else if (v > target && !reversed) || (v < target && reversed) {
            high = mid as i64 - 1;
        } else {
            return Some(mid);
        }
        if (v <= target && reversed) || (v >= target && !reversed) {
            result = Some(mid);
        }
    }
    result
}

/// In-memory historical candle store: one time-ordered candle series per
/// `(instrument, frequency)` pair, supporting lookup-as-of and the
/// fixed-count history window the strategy interface needs.
#[derive(Debug, Default)]
pub struct CandleStore {
    series: BTreeMap<(String, DataFreq), Vec<Candlestick>>,
}

impl CandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a time-ordered candle series for an instrument/frequency.
    /// Callers are responsible for supplying candles sorted by `time`.
    pub fn insert_series(&mut self, instrument: &str, freq: DataFreq, candles: Vec<Candlestick>) {
        self.series.insert((instrument.to_string(), freq), candles);
    }

    fn times(&self, instrument: &str, freq: DataFreq) -> Option<Vec<i64>> {
        self.series
            .get(&(instrument.to_string(), freq))
            .map(|v| v.iter().map(|c| c.time).collect())
    }

    /// The candle at or immediately before `time`, or `None` if the series
    /// doesn't exist or has no candle that early.
    pub fn candlestick(
        &self,
        instrument: &str,
        time: i64,
        freq: DataFreq,
    ) -> Option<Candlestick> {
        let series = self.series.get(&(instrument.to_string(), freq))?;
        let times: Vec<i64> = series.iter().map(|c| c.time).collect();
        let idx = binary_search(&times, time, true)?;
        Some(series[idx])
    }

    /// Snapshot across several instruments at the same time/frequency.
    pub fn tick_data_map(
        &self,
        instruments: &[String],
        time: i64,
        freq: DataFreq,
    ) -> TickDataMap {
        instruments
            .iter()
            .map(|name| (name.clone(), self.candlestick(name, time, freq)))
            .collect()
    }

    /// The last `count` candles at or before `end`, oldest first.
    pub fn history(
        &self,
        instrument: &str,
        end: i64,
        count: usize,
        freq: DataFreq,
    ) -> Result<Vec<Candlestick>, FxError> {
        let series = self
            .series
            .get(&(instrument.to_string(), freq))
            .ok_or_else(|| FxError::NotFound {
                instrument: instrument.to_string(),
                time: end,
            })?;
        let times = self.times(instrument, freq).unwrap_or_default();
        let idx = binary_search(&times, end, true).ok_or(FxError::NotFound {
            instrument: instrument.to_string(),
            time: end,
        })?;
        if idx + 1 < count {
            return Err(FxError::NotFound {
                instrument: instrument.to_string(),
                time: end,
            });
        }
        let start = idx + 1 - count;
        Ok(series[start..=idx].to_vec())
    }

    /// `history` across several instruments at once, keyed by instrument
    /// name. An instrument with fewer than `count` candles preceding `end`
    /// is simply omitted from the map rather than failing the whole call.
    pub fn history_many(
        &self,
        instruments: &[String],
        end: i64,
        count: usize,
        freq: DataFreq,
    ) -> BTreeMap<String, Vec<Candlestick>> {
        instruments
            .iter()
            .filter_map(|name| {
                self.history(name, end, count, freq)
                    .ok()
                    .map(|candles| (name.clone(), candles))
            })
            .collect()
    }
}

pub fn candlestick_closes(candles: &[Candlestick]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Cross-rate between `account` and `currency` read off `tick_data_map`.
///
/// Looks for the direct pair `ACCOUNT_CURRENCY` (uses its close as-is) or
/// the reversed pair `CURRENCY_ACCOUNT` (uses `1 / close`). Returns `None`
/// if neither pair is present in the map, or if the matched pair's candle
/// is itself `None` (no tick this step) — the original never triangulates
/// through a third currency, and neither does this.
pub fn account_currency_rate(
    account: &str,
    currency: &str,
    tick_data_map: &TickDataMap,
) -> Option<f64> {
    if account == currency {
        return Some(1.0);
    }
    let pair = format!("{account}_{currency}");
    let reversed_pair = format!("{currency}_{account}");
    if let Some(candle) = tick_data_map.get(&pair) {
        return candle.map(|c| c.close);
    }
    if let Some(candle) = tick_data_map.get(&reversed_pair) {
        return candle.map(|c| 1.0 / c.close);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_search_finds_largest_le_target() {
        let values = [10, 20, 30, 40];
        assert_eq!(binary_search(&values, 25, true), Some(1));
        assert_eq!(binary_search(&values, 10, true), Some(0));
        assert_eq!(binary_search(&values, 5, true), None);
        assert_eq!(binary_search(&values, 40, true), Some(3));
        assert_eq!(binary_search(&values, 100, true), Some(3));
    }

    #[test]
    fn account_currency_rate_direct_and_reversed() {
        let mut map = TickDataMap::new();
        map.insert(
            "EUR_USD".to_string(),
            Some(Candlestick {
                time: 0,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.365,
                volume: 0,
            }),
        );
        assert_eq!(account_currency_rate("EUR", "USD", &map), Some(1.365));
        let rate = account_currency_rate("USD", "EUR", &map).unwrap();
        assert!((rate - 1.0 / 1.365).abs() < 1e-9);
        assert_eq!(account_currency_rate("USD", "JPY", &map), None);
        assert_eq!(account_currency_rate("USD", "USD", &map), Some(1.0));
    }

    fn candle_at(time: i64) -> Candlestick {
        Candlestick {
            time,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 0,
        }
    }

    #[test]
    fn history_fails_when_fewer_than_count_candles_precede_end() {
        let mut store = CandleStore::new();
        store.insert_series(
            "EUR_USD",
            DataFreq::H1,
            vec![candle_at(0), candle_at(3600), candle_at(7200)],
        );
        assert!(store.history("EUR_USD", 7200, 5, DataFreq::H1).is_err());
        let window = store.history("EUR_USD", 7200, 3, DataFreq::H1).unwrap();
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn history_many_omits_instruments_without_enough_history() {
        let mut store = CandleStore::new();
        store.insert_series("EUR_USD", DataFreq::H1, vec![candle_at(0), candle_at(3600)]);
        store.insert_series("USD_JPY", DataFreq::H1, vec![candle_at(3600)]);
        let instruments = vec!["EUR_USD".to_string(), "USD_JPY".to_string()];
        let result = store.history_many(&instruments, 3600, 2, DataFreq::H1);
        assert_eq!(result.len(), 1);
        assert!(result.contains_key("EUR_USD"));
    }

    #[test]
    fn data_freq_round_trips_through_string() {
        for f in [
            DataFreq::M1,
            DataFreq::M5,
            DataFreq::H1,
            DataFreq::H12,
            DataFreq::D,
        ] {
            assert_eq!(DataFreq::from_str(f.as_str()).unwrap(), f);
        }
        assert!(DataFreq::from_str("M3").is_err());
    }
}
