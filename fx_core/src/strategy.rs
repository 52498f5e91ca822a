//! The interface a trading strategy implements against the simulation
//! account and candle data. The strategy itself is out of scope here —
//! this is just the seam the backtest driver calls through.

use std::collections::BTreeMap;

use crate::account::SimulationAccount;
use crate::data::{Candlestick, CandleStore, TickDataMap};

pub trait Strategy {
    /// Called once before the first tick.
    fn init(&mut self, account: &mut SimulationAccount, data: &CandleStore);

    /// Called once per outer tick, before the account processes any of
    /// that tick's fills/triggers — all strategy calls for a tick
    /// complete before order processing begins for it. `history` carries
    /// each instrument's fixed-length lookback window ending at `time`.
    fn next(
        &mut self,
        time: i64,
        tick_data_map: &TickDataMap,
        history: &BTreeMap<String, Vec<Candlestick>>,
        account: &mut SimulationAccount,
        data: &CandleStore,
    );
}
