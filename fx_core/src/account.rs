//! The simulation account: balance, open trades, pending limit orders, and
//! the per-tick order-matching algorithm (`process_orders`).

use tracing::debug;
use uuid::Uuid;

use crate::data::{Candlestick, TickDataMap};
use crate::error::FxError;
use crate::forex;
use crate::instrument::Instrument;
use crate::order::{LimitOrder, OrderState};
use crate::trade::{self, Trade};

/// Bid/ask price window derived from a candle's OHLC and the account's
/// spread (in pips), used to decide whether a resting order would have
/// traded this tick.
struct MarketWindow {
    ask_low: f64,
    ask_high: f64,
    bid_low: f64,
    bid_high: f64,
    account_quote_rate: f64,
    account_base_rate: Option<f64>,
    current_price: f64,
}

pub struct SimulationAccount {
    pub account_currency: String,
    pub leverage: u32,
    pub capital_base: f64,
    balance: f64,
    spread: f64,
    trades: Vec<Trade>,
    orders: Vec<LimitOrder>,
}

impl SimulationAccount {
    pub fn new(account_currency: &str, leverage: u32, capital_base: f64, spread: f64) -> Self {
        Self {
            account_currency: account_currency.to_string(),
            leverage,
            capital_base,
            balance: capital_base,
            spread,
            trades: Vec::new(),
            orders: Vec::new(),
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn pending_orders(&self) -> impl Iterator<Item = &LimitOrder> {
        self.orders.iter().filter(|o| o.state == OrderState::Pending)
    }

    pub fn pending_limit_orders(&self, instrument: &str) -> impl Iterator<Item = &LimitOrder> {
        self.orders
            .iter()
            .filter(move |o| o.instrument == instrument && o.state == OrderState::Pending)
    }

    pub fn open_trades(&self, instrument: &str) -> Vec<&Trade> {
        self.trades
            .iter()
            .filter(|t| t.instrument.name() == instrument && t.is_open())
            .collect()
    }

    pub fn all_open_trades(&self) -> Vec<&Trade> {
        self.trades.iter().filter(|t| t.is_open()).collect()
    }

    pub fn has_open_trades(&self, instrument: &str) -> bool {
        !self.open_trades(instrument).is_empty()
    }

    pub fn has_pending_orders(&self, instrument: &str) -> bool {
        self.orders
            .iter()
            .any(|o| o.instrument == instrument && o.state == OrderState::Pending)
    }

    pub fn open_position_size(&self, instrument: &str) -> i64 {
        self.open_trades(instrument)
            .iter()
            .map(|t| t.current_units)
            .sum()
    }

    fn trade_mut(&mut self, id: Uuid) -> Result<&mut Trade, FxError> {
        self.trades
            .iter_mut()
            .find(|t| t.trade_id == id)
            .ok_or(FxError::UnknownTrade(id))
    }

    /// NAV = balance + sum of unrealized P/L across open trades, charging
    /// half the spread per spec.md's cost-policy asymmetry. Returns `None`
    /// if any open trade's instrument is missing a tick or cross-rate this
    /// step.
    pub fn net_asset_value(&self, tick_data_map: &TickDataMap) -> Option<f64> {
        let mut nav = self.balance;
        for t in self.all_open_trades() {
            let candle = tick_data_map.get(t.instrument.name())?.as_ref()?;
            let rate = crate::data::account_currency_rate(
                &self.account_currency,
                t.instrument.quote_name(),
                tick_data_map,
            )?;
            nav += trade::unrealized_profit_loss(t, rate, candle.close);
        }
        Some(nav)
    }

    /// Sum of margin used across open trades, in account currency. `None`
    /// under the same missing-data conditions as `net_asset_value`.
    pub fn margin_used(&self, tick_data_map: &TickDataMap) -> Option<f64> {
        let mut used = 0.0;
        for t in self.all_open_trades() {
            let _candle = tick_data_map.get(t.instrument.name())?.as_ref()?;
            let rate = crate::data::account_currency_rate(
                &self.account_currency,
                t.instrument.base_name(),
                tick_data_map,
            )?;
            used += trade::margin_used(t, rate, self.leverage);
        }
        Some(used)
    }

    fn market_window(
        &self,
        instrument: &Instrument,
        candle: &Candlestick,
        tick_data_map: &TickDataMap,
    ) -> Option<MarketWindow> {
        let account_quote_rate = crate::data::account_currency_rate(
            &self.account_currency,
            instrument.quote_name(),
            tick_data_map,
        )?;
        let account_base_rate = crate::data::account_currency_rate(
            &self.account_currency,
            instrument.base_name(),
            tick_data_map,
        );
        let spread_price = self.spread * 10f64.powi(-instrument.pip_point());
        Some(MarketWindow {
            ask_low: candle.low + spread_price / 2.0,
            ask_high: candle.high + spread_price / 2.0,
            bid_low: candle.low - spread_price / 2.0,
            bid_high: candle.high - spread_price / 2.0,
            account_quote_rate,
            account_base_rate,
            current_price: candle.close,
        })
    }

    /// Creates a resting limit order. REDUCE_FIRST netting: if the order
    /// would reduce or flip an existing opposite-direction position, it
    /// first closes/reduces those trades against the current tick's price
    /// before any remainder is queued or, if margin allows, opened as a
    /// new trade at the order's limit price.
    #[allow(clippy::too_many_arguments)]
    pub fn create_limit_order(
        &mut self,
        create_time: i64,
        instrument: &str,
        units: i64,
        price: f64,
        take_profit_price: Option<f64>,
        stop_loss_price: Option<f64>,
        trailing_stop_loss_distance: Option<f64>,
    ) {
        let order = LimitOrder::new(
            create_time,
            instrument,
            units,
            price,
            take_profit_price,
            stop_loss_price,
            trailing_stop_loss_distance,
        );
        debug!(instrument, units, price, "queued limit order");
        self.orders.push(order);
    }

    pub fn cancel_limit_order(&mut self, order_id: Uuid) {
        if let Some(order) = self.orders.iter_mut().find(|o| o.order_id == order_id) {
            if order.state == OrderState::Pending {
                order.state = OrderState::Cancelled;
            }
        }
    }

    pub fn update_trade_stop_loss_price(&mut self, trade_id: Uuid, price: f64, time: i64) -> Result<(), FxError> {
        self.trade_mut(trade_id)?.update_stop_loss_order(price, time);
        Ok(())
    }

    pub fn update_trade_take_profit_price(&mut self, trade_id: Uuid, price: f64, time: i64) -> Result<(), FxError> {
        self.trade_mut(trade_id)?.update_take_profit_order(price, time);
        Ok(())
    }

    pub fn update_trailing_stop_distance(&mut self, trade_id: Uuid, distance: f64, time: i64) -> Result<(), FxError> {
        self.trade_mut(trade_id)?.update_trailing_stop_loss_order(distance, time);
        Ok(())
    }

    /// Closes every open trade in `instrument` at the current tick's price.
    pub fn close_position(&mut self, instrument: &str, rate: f64, current_price: f64, time: i64) {
        for t in self.trades.iter_mut() {
            if t.instrument.name() == instrument && t.is_open() {
                let pl = t.close(rate, current_price, time);
                self.balance += pl;
            }
        }
    }

    /// Drives one tick: fills/triggers eligible limit and protective
    /// orders against the current candle for each instrument present in
    /// `tick_data_map`. Skips instruments with no tick this step.
    pub fn process_orders(&mut self, time: i64, tick_data_map: &TickDataMap) {
        self.process_limit_orders(time, tick_data_map);
        self.process_trigger_orders(time, tick_data_map);
    }

    fn process_limit_orders(&mut self, time: i64, tick_data_map: &TickDataMap) {
        let pending: Vec<(Uuid, String, i64, f64, Option<f64>, Option<f64>, Option<f64>)> = self
            .orders
            .iter()
            .filter(|o| o.state == OrderState::Pending)
            .map(|o| {
                (
                    o.order_id,
                    o.instrument.clone(),
                    o.units,
                    o.price,
                    o.take_profit_price,
                    o.stop_loss_price,
                    o.trailing_stop_loss_distance,
                )
            })
            .collect();

        for (order_id, instrument_name, units, price, tp, sl, trail) in pending {
            let instrument = match Instrument::new(&instrument_name) {
                Ok(i) => i,
                Err(_) => continue,
            };
            let candle = match tick_data_map.get(&instrument_name).and_then(|c| *c) {
                Some(c) => c,
                None => continue,
            };
            let window = match self.market_window(&instrument, &candle, tick_data_map) {
                Some(w) => w,
                None => continue,
            };
            let would_fill = if units > 0 {
                window.ask_low <= price && price <= window.ask_high
            } else {
                window.bid_low <= price && price <= window.bid_high
            };
            if !would_fill {
                continue;
            }

            let mut remaining_units = units;
            let existing: Vec<Uuid> = self
                .open_trades(&instrument_name)
                .into_iter()
                .map(|t| t.trade_id)
                .collect();
            let existing_net: i64 = self.open_position_size(&instrument_name);
            if units.signum() != existing_net.signum() && existing_net != 0 {
                for trade_id in existing {
                    let trade = match self.trades.iter_mut().find(|t| t.trade_id == trade_id) {
                        Some(t) => t,
                        None => continue,
                    };
                    if remaining_units.unsigned_abs() >= trade.current_units.unsigned_abs() {
                        remaining_units += trade.current_units;
                        let pl = trade.close(window.account_quote_rate, price, time);
                        self.balance += pl;
                    } else {
                        let pl = trade.partially_close(window.account_quote_rate, price, remaining_units);
                        self.balance += pl;
                        remaining_units = 0;
                    }
                    if remaining_units == 0 {
                        break;
                    }
                }
            }

            if remaining_units == 0 {
                if let Some(o) = self.orders.iter_mut().find(|o| o.order_id == order_id) {
                    o.state = OrderState::Filled;
                }
                continue;
            }

            let base_rate = match window.account_base_rate {
                Some(r) => r,
                None => continue,
            };
            let initial_margin = forex::margin_used(remaining_units, base_rate, self.leverage);
            let nav = self.net_asset_value(tick_data_map).unwrap_or(self.balance);
            let margin_used_now = self.margin_used(tick_data_map).unwrap_or(0.0);
            let margin_available = forex::margin_available(nav, margin_used_now);
            if margin_available >= initial_margin {
                let trade = Trade::new(
                    instrument,
                    price,
                    time,
                    remaining_units,
                    initial_margin,
                    self.spread,
                    0.0,
                    0.0,
                    tp,
                    sl,
                    trail,
                );
                debug!(instrument = %instrument_name, units = remaining_units, price, "filled limit order");
                self.trades.push(trade);
                if let Some(o) = self.orders.iter_mut().find(|o| o.order_id == order_id) {
                    o.state = OrderState::Filled;
                }
            }
        }
    }

    fn process_trigger_orders(&mut self, time: i64, tick_data_map: &TickDataMap) {
        let open_ids: Vec<Uuid> = self.all_open_trades().iter().map(|t| t.trade_id).collect();
        for trade_id in open_ids {
            let (instrument, is_short, current_units) = {
                let t = match self.trades.iter().find(|t| t.trade_id == trade_id) {
                    Some(t) => t,
                    None => continue,
                };
                (t.instrument.clone(), t.current_units < 0, t.current_units)
            };
            if current_units == 0 {
                continue;
            }
            let candle = match tick_data_map.get(instrument.name()).and_then(|c| *c) {
                Some(c) => c,
                None => continue,
            };
            let window = match self.market_window(&instrument, &candle, tick_data_map) {
                Some(w) => w,
                None => continue,
            };
            // Default trigger condition: closing a long is a sell (fills at
            // bid), closing a short is a buy (fills at ask).
            let (window_low, window_high) = if is_short {
                (window.ask_low, window.ask_high)
            } else {
                (window.bid_low, window.bid_high)
            };

            let trade = match self.trades.iter_mut().find(|t| t.trade_id == trade_id) {
                Some(t) => t,
                None => continue,
            };

            if let Some(order) = &mut trade.take_profit_order {
                if order.state == OrderState::Pending
                    && order.price >= window_low
                    && order.price <= window_high
                {
                    order.state = OrderState::Triggered;
                    let price = order.price;
                    let pl = trade.close(window.account_quote_rate, price, time);
                    self.balance += pl;
                    debug!(trade = %trade_id, price, "take-profit triggered");
                    continue;
                }
            }
            if let Some(order) = &mut trade.stop_loss_order {
                if order.state == OrderState::Pending
                    && order.price >= window_low
                    && order.price <= window_high
                {
                    order.state = OrderState::Triggered;
                    let price = order.price;
                    let pl = trade.close(window.account_quote_rate, price, time);
                    self.balance += pl;
                    debug!(trade = %trade_id, price, "stop-loss triggered");
                    continue;
                }
            }
            if let Some(order) = &mut trade.trailing_stop_loss_order {
                if order.state == OrderState::Pending {
                    let stop_price = order.trailing_stop_price();
                    if stop_price >= window_low && stop_price <= window_high {
                        order.state = OrderState::Triggered;
                        let pl = trade.close(window.account_quote_rate, stop_price, time);
                        self.balance += pl;
                        debug!(trade = %trade_id, price = stop_price, "trailing stop triggered");
                        continue;
                    }
                    let distance = order.distance;
                    let ratchets = if is_short {
                        stop_price - window.current_price > distance
                    } else {
                        window.current_price - stop_price > distance
                    };
                    if ratchets {
                        order.update(window.current_price);
                    }
                }
            }
        }
    }

    pub fn summary(&self, tick: i64, tick_data_map: &TickDataMap) -> String {
        let nav = self.net_asset_value(tick_data_map);
        let margin_used = self.margin_used(tick_data_map);
        match (nav, margin_used) {
            (Some(nav), Some(margin_used)) => {
                let margin_available = forex::margin_available(nav, margin_used);
                format!(
                    "time: {time} NAV: {nav:.2} balance: {balance:.2} margin_used: {margin_used:.2} margin_available: {margin_available:.2}",
                    time = tick,
                    balance = self.balance,
                )
            }
            _ => format!("time: {tick} NAV: unavailable (missing tick data)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Candlestick;

    fn candle(close: f64) -> Candlestick {
        Candlestick {
            time: 0,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }

    fn tick_map(pairs: &[(&str, f64)]) -> TickDataMap {
        pairs
            .iter()
            .map(|(name, close)| (name.to_string(), Some(candle(*close))))
            .collect()
    }

    #[test]
    fn margin_call_resolves_through_account_currency_rate() {
        // account=USD, base=EUR, pair EUR_USD close=1.365 -> reversed lookup
        // gives B = 1/1.365, margin_used = 500000 / B / 100 = 6825.00
        let mut account = SimulationAccount::new("USD", 100, 100_000.0, 0.0001);
        let instrument = Instrument::new("EUR_USD").unwrap();
        let trade = Trade::new(instrument, 1.365, 0, 500_000, 0.0, 0.0001, 0.0, 0.0, None, None, None);
        account.trades.push(trade);
        let map = tick_map(&[("EUR_USD", 1.365)]);
        let used = account.margin_used(&map).unwrap();
        assert!((used - 6825.00).abs() < 1e-2);
    }

    #[test]
    fn long_trade_take_profit_triggers_against_bid_window() {
        // spread = 2 pips => spread_price = 0.0002; candle low/high give
        // ask_low = 1.1000, bid_high = 1.1000, bid_low = 1.0998. A
        // take-profit price of 1.0999 sits inside the bid window (correct,
        // since closing a long is a sell) but outside the ask window.
        let mut account = SimulationAccount::new("USD", 50, 10_000.0, 2.0);
        let instrument = Instrument::new("EUR_USD").unwrap();
        let trade = Trade::new(instrument, 1.0950, 0, 1_000, 0.0, 2.0, 0.0, 0.0, Some(1.0999), None, None);
        account.trades.push(trade);
        let map = tick_map_ohlc(&[("EUR_USD", 1.0999, 1.1001, 1.0999, 1.1000)]);
        account.process_trigger_orders(0, &map);
        assert_eq!(account.trades[0].state, crate::trade::TradeState::Closed);
    }

    fn tick_map_ohlc(rows: &[(&str, f64, f64, f64, f64)]) -> TickDataMap {
        rows.iter()
            .map(|(name, low, high, _open, close)| {
                (
                    name.to_string(),
                    Some(Candlestick {
                        time: 0,
                        open: *close,
                        high: *high,
                        low: *low,
                        close: *close,
                        volume: 0,
                    }),
                )
            })
            .collect()
    }

    #[test]
    fn missing_tick_data_makes_nav_unavailable() {
        let mut account = SimulationAccount::new("USD", 50, 10_000.0, 0.0001);
        let instrument = Instrument::new("EUR_USD").unwrap();
        let trade = Trade::new(instrument, 1.2, 0, 1000, 0.0, 0.0001, 0.0, 0.0, None, None, None);
        account.trades.push(trade);
        let mut map = tick_map(&[("EUR_USD", 1.2)]);
        map.insert("EUR_USD".to_string(), None);
        assert_eq!(account.net_asset_value(&map), None);
    }
}
