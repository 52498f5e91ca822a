//! A trade is one open (or closed) position in a single instrument,
//! carrying its own protective orders.

use uuid::Uuid;

use crate::forex;
use crate::instrument::Instrument;
use crate::order::{OrderState, PriceTriggerOrder, TrailingStopOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TradeState {
    Open,
    Closed,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub instrument: Instrument,
    pub price: f64,
    pub state: TradeState,
    pub open_time: i64,
    pub initial_units: i64,
    pub initial_margin: f64,
    pub current_units: i64,
    pub realized_profit_loss: f64,
    pub close_time: Option<i64>,
    pub close_price: Option<f64>,
    pub spread: f64,
    pub financing: f64,
    pub commission: f64,
    pub take_profit_order: Option<PriceTriggerOrder>,
    pub stop_loss_order: Option<PriceTriggerOrder>,
    pub trailing_stop_loss_order: Option<TrailingStopOrder>,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instrument: Instrument,
        price: f64,
        open_time: i64,
        initial_units: i64,
        initial_margin: f64,
        spread: f64,
        financing: f64,
        commission: f64,
        take_profit_price: Option<f64>,
        stop_loss_price: Option<f64>,
        trailing_stop_distance: Option<f64>,
    ) -> Self {
        let trade_id = Uuid::new_v4();
        let is_short = initial_units < 0;
        Self {
            trade_id,
            instrument,
            price,
            state: TradeState::Open,
            open_time,
            initial_units,
            initial_margin,
            current_units: initial_units,
            realized_profit_loss: 0.0,
            close_time: None,
            close_price: None,
            spread,
            financing,
            commission,
            take_profit_order: take_profit_price
                .map(|p| PriceTriggerOrder::new(p, open_time, trade_id)),
            stop_loss_order: stop_loss_price
                .map(|p| PriceTriggerOrder::new(p, open_time, trade_id)),
            trailing_stop_loss_order: trailing_stop_distance
                .map(|d| TrailingStopOrder::new(d, open_time, trade_id, price, is_short)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == TradeState::Open
    }

    pub fn take_profit_price(&self) -> Option<f64> {
        self.take_profit_order.as_ref().map(|o| o.price)
    }

    pub fn stop_loss_price(&self) -> Option<f64> {
        self.stop_loss_order.as_ref().map(|o| o.price)
    }

    pub fn trailing_stop_distance(&self) -> Option<f64> {
        self.trailing_stop_loss_order.as_ref().map(|o| o.distance)
    }

    pub fn trailing_stop_price(&self) -> Option<f64> {
        self.trailing_stop_loss_order
            .as_ref()
            .map(|o| o.trailing_stop_price())
    }

    /// Replaces the take-profit price in place, or attaches a new order if
    /// the trade didn't have one yet.
    pub fn update_take_profit_order(&mut self, price: f64, time: i64) {
        match &mut self.take_profit_order {
            Some(order) => order.price = price,
            None => {
                self.take_profit_order = Some(PriceTriggerOrder::new(price, time, self.trade_id))
            }
        }
    }

    pub fn update_stop_loss_order(&mut self, price: f64, time: i64) {
        match &mut self.stop_loss_order {
            Some(order) => order.price = price,
            None => self.stop_loss_order = Some(PriceTriggerOrder::new(price, time, self.trade_id)),
        }
    }

    pub fn update_trailing_stop_loss_order(&mut self, distance: f64, time: i64) {
        let is_short = self.current_units < 0;
        match &mut self.trailing_stop_loss_order {
            Some(order) => order.distance = distance,
            None => {
                self.trailing_stop_loss_order = Some(TrailingStopOrder::new(
                    distance,
                    time,
                    self.trade_id,
                    self.price,
                    is_short,
                ))
            }
        }
    }

    /// Reduces the open position by `units` (same sign convention as
    /// `current_units`) at `current_price`, charging the full spread plus
    /// commission. Returns the realized P/L of this partial close, which
    /// the caller adds to account balance.
    pub fn partially_close(&mut self, rate: f64, current_price: f64, units: i64) -> f64 {
        let trading_cost = forex::gains_losses(
            self.spread,
            units.abs(),
            rate,
            self.instrument.pip_point(),
        ) + self.commission;
        let profit_loss = (current_price - self.price) * (1.0 / rate) * units as f64 - trading_cost;
        self.current_units -= units;
        self.realized_profit_loss += profit_loss;
        profit_loss
    }

    /// Fully closes the remaining position and cancels any non-triggered
    /// protective child orders. Returns the realized P/L of the closing
    /// fill.
    pub fn close(&mut self, rate: f64, current_price: f64, time: i64) -> f64 {
        let profit_loss = self.partially_close(rate, current_price, self.current_units);
        self.close_price = Some(current_price);
        self.close_time = Some(time);
        if let Some(order) = &mut self.take_profit_order {
            if order.state != OrderState::Triggered {
                order.state = OrderState::Cancelled;
            }
        }
        if let Some(order) = &mut self.stop_loss_order {
            if order.state != OrderState::Triggered {
                order.state = OrderState::Cancelled;
            }
        }
        if let Some(order) = &mut self.trailing_stop_loss_order {
            if order.state != OrderState::Triggered {
                order.state = OrderState::Cancelled;
            }
        }
        self.state = TradeState::Closed;
        profit_loss
    }
}

/// Mark-to-market P/L charging only half the spread (the other half is
/// charged on the eventual close), so a full round trip costs one spread.
pub fn unrealized_profit_loss(trade: &Trade, rate: f64, current_price: f64) -> f64 {
    let cost = forex::gains_losses(
        trade.spread / 2.0,
        trade.current_units.abs(),
        rate,
        trade.instrument.pip_point(),
    ) + trade.commission;
    (current_price - trade.price) * (1.0 / rate) * trade.current_units as f64 - cost
}

pub fn margin_used(trade: &Trade, rate: f64, leverage: u32) -> f64 {
    forex::margin_used(trade.current_units, rate, leverage)
}

pub fn trade_state_to_string(state: TradeState) -> &'static str {
    match state {
        TradeState::Open => "OPEN",
        TradeState::Closed => "CLOSED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur_usd() -> Instrument {
        Instrument::new("EUR_USD").unwrap()
    }

    #[test]
    fn partial_close_shrinks_units_and_preserves_sign() {
        let mut trade = Trade::new(eur_usd(), 1.2000, 0, 1000, 10.0, 0.0001, 0.0, 0.0, None, None, None);
        trade.partially_close(1.0, 1.2010, 400);
        assert_eq!(trade.current_units, 600);
        assert!(trade.is_open());
    }

    #[test]
    fn close_cancels_non_triggered_children_and_sets_closed() {
        let mut trade = Trade::new(
            eur_usd(), 1.2000, 0, 1000, 10.0, 0.0001, 0.0, 0.0,
            Some(1.21), Some(1.19), None,
        );
        trade.close(1.0, 1.205, 100);
        assert_eq!(trade.state, TradeState::Closed);
        assert_eq!(trade.current_units, 0);
        assert_eq!(trade.take_profit_order.unwrap().state, OrderState::Cancelled);
        assert_eq!(trade.stop_loss_order.unwrap().state, OrderState::Cancelled);
    }

    #[test]
    fn close_preserves_triggered_child_state() {
        let mut trade = Trade::new(
            eur_usd(), 1.2000, 0, 1000, 10.0, 0.0001, 0.0, 0.0,
            Some(1.21), None, None,
        );
        trade.take_profit_order.as_mut().unwrap().state = OrderState::Triggered;
        trade.close(1.0, 1.21, 100);
        assert_eq!(trade.take_profit_order.unwrap().state, OrderState::Triggered);
    }

    #[test]
    fn unrealized_pl_charges_half_spread_close_charges_full() {
        let mut trade = Trade::new(eur_usd(), 1.2000, 0, 1000, 10.0, 0.0004, 0.0, 0.0, None, None, None);
        let unrealized = unrealized_profit_loss(&trade, 1.0, 1.2000);
        let realized = trade.close(1.0, 1.2000, 10);
        assert!(realized < unrealized);
    }
}
