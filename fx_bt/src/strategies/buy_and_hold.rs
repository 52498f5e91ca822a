//! Opens a single long position on the first tick and lets it ride for the
//! rest of the run. Demonstrates the `Strategy` seam; not a serious
//! trading strategy.

use std::collections::BTreeMap;

use fx_core::account::SimulationAccount;
use fx_core::data::{Candlestick, CandleStore, TickDataMap};
use fx_core::strategy::Strategy;

pub struct BuyAndHold {
    instrument: String,
    units: i64,
    entered: bool,
}

impl BuyAndHold {
    pub fn new(instrument: &str, units: i64) -> Self {
        Self {
            instrument: instrument.to_string(),
            units,
            entered: false,
        }
    }
}

impl Strategy for BuyAndHold {
    fn init(&mut self, _account: &mut SimulationAccount, _data: &CandleStore) {
        self.entered = false;
    }

    fn next(
        &mut self,
        time: i64,
        tick_data_map: &TickDataMap,
        _history: &BTreeMap<String, Vec<Candlestick>>,
        account: &mut SimulationAccount,
        _data: &CandleStore,
    ) {
        if self.entered {
            return;
        }
        let Some(Some(candle)) = tick_data_map.get(&self.instrument) else {
            return;
        };
        account.create_limit_order(time, &self.instrument, self.units, candle.close, None, None, None);
        self.entered = true;
    }
}
