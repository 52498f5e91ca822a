//! The recognized backtest configuration options, loadable from JSON.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BacktestConfig {
    pub account_currency: String,
    pub leverage: u32,
    pub capital_base: f64,
    pub spread: f64,
    pub begin_year: i32,
    pub begin_month: u32,
    pub begin_day: u32,
    pub end_year: i32,
    pub end_month: u32,
    pub end_day: u32,
    pub region: String,
    /// Frequency the clock steps at (drives `process_orders`/strategy ticks).
    pub outer_freq: String,
    /// Frequency candle history lookups use (may differ from `outer_freq`).
    pub inner_freq: String,
    pub hist_data_count: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            account_currency: "USD".to_string(),
            leverage: 50,
            capital_base: 100_000.0,
            spread: 1.5,
            begin_year: 2020,
            begin_month: 1,
            begin_day: 1,
            end_year: 2020,
            end_month: 1,
            end_day: 4,
            region: "America/New_York".to_string(),
            outer_freq: "H1".to_string(),
            inner_freq: "H1".to_string(),
            hist_data_count: 100,
        }
    }
}

impl BacktestConfig {
    pub fn from_json(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
