//! Orders: resting limit orders and the protective trigger orders
//! (stop-loss, take-profit, trailing-stop) attached to open trades.

use uuid::Uuid;

/// PENDING → {FILLED, TRIGGERED, CANCELLED}, all terminal. FILLED only
/// applies to limit orders; TRIGGERED only to price/trailing trigger orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderState {
    Pending,
    Filled,
    Triggered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TimeInForce {
    Gtc,
    Gtd,
    Gfd,
    Fok,
    Ioc,
}

impl Default for TimeInForce {
    fn default() -> Self {
        TimeInForce::Gtc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderPositionFill {
    OpenOnly,
    ReduceFirst,
    ReduceOnly,
}

impl Default for OrderPositionFill {
    fn default() -> Self {
        OrderPositionFill::ReduceFirst
    }
}

/// How a trigger order's price is compared against the current candle.
/// Only `Default` changes matching behavior today (see
/// [`crate::account::SimulationAccount::process_orders`]); the others are
/// accepted and stored for forward compatibility with the order model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderTriggerCondition {
    Default,
    Inverse,
    Bid,
    Ask,
    Mid,
}

impl Default for OrderTriggerCondition {
    fn default() -> Self {
        OrderTriggerCondition::Default
    }
}

/// A resting limit order: fills once the market trades through `price`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LimitOrder {
    pub order_id: Uuid,
    pub create_time: i64,
    pub state: OrderState,
    pub instrument: String,
    pub units: i64,
    pub price: f64,
    pub take_profit_price: Option<f64>,
    pub stop_loss_price: Option<f64>,
    pub trailing_stop_loss_distance: Option<f64>,
    pub price_bound: f64,
    pub order_position_fill: OrderPositionFill,
    pub time_in_force: TimeInForce,
}

impl LimitOrder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        create_time: i64,
        instrument: &str,
        units: i64,
        price: f64,
        take_profit_price: Option<f64>,
        stop_loss_price: Option<f64>,
        trailing_stop_loss_distance: Option<f64>,
    ) -> Self {
        Self {
            order_id: Uuid::new_v4(),
            create_time,
            state: OrderState::Pending,
            instrument: instrument.to_string(),
            units,
            price,
            take_profit_price,
            stop_loss_price,
            trailing_stop_loss_distance,
            price_bound: 0.0,
            order_position_fill: OrderPositionFill::default(),
            time_in_force: TimeInForce::default(),
        }
    }
}

/// A stop-loss or take-profit order: triggers when its price falls inside
/// the candle's low/high range.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PriceTriggerOrder {
    pub order_id: Uuid,
    pub create_time: i64,
    pub state: OrderState,
    pub trade_id: Uuid,
    pub price: f64,
    pub time_in_force: TimeInForce,
    pub order_trigger_condition: OrderTriggerCondition,
}

impl PriceTriggerOrder {
    pub fn new(price: f64, create_time: i64, trade_id: Uuid) -> Self {
        Self {
            order_id: Uuid::new_v4(),
            create_time,
            state: OrderState::Pending,
            trade_id,
            price,
            time_in_force: TimeInForce::default(),
            order_trigger_condition: OrderTriggerCondition::default(),
        }
    }
}

/// A trailing-stop order: its trigger price ratchets toward the market as
/// the trade moves in its favor, and never moves back.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrailingStopOrder {
    pub order_id: Uuid,
    pub create_time: i64,
    pub state: OrderState,
    pub trade_id: Uuid,
    pub distance: f64,
    trailing_stop_price: f64,
    is_short: bool,
    pub time_in_force: TimeInForce,
    pub order_trigger_condition: OrderTriggerCondition,
}

impl TrailingStopOrder {
    pub fn new(distance: f64, create_time: i64, trade_id: Uuid, trade_price: f64, is_short: bool) -> Self {
        let trailing_stop_price = if is_short {
            trade_price + distance
        } else {
            trade_price - distance
        };
        Self {
            order_id: Uuid::new_v4(),
            create_time,
            state: OrderState::Pending,
            trade_id,
            distance,
            trailing_stop_price,
            is_short,
            time_in_force: TimeInForce::default(),
            order_trigger_condition: OrderTriggerCondition::default(),
        }
    }

    pub fn trailing_stop_price(&self) -> f64 {
        self.trailing_stop_price
    }

    /// Ratchets the trigger price toward `current_price`. Never called
    /// conditionally on direction improving — callers check the threshold
    /// first (see account::process_orders) then call this unconditionally,
    /// matching the original engine's `UpdateTrailingStopPrice`.
    pub fn update(&mut self, current_price: f64) {
        self.trailing_stop_price = if self.is_short {
            current_price + self.distance
        } else {
            current_price - self.distance
        };
    }
}

pub fn order_state_to_string(state: OrderState) -> &'static str {
    match state {
        OrderState::Pending => "PENDING",
        OrderState::Filled => "FILLED",
        OrderState::Triggered => "TRIGGERED",
        OrderState::Cancelled => "CANCELLED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_stop_initializes_below_long_entry() {
        let order = TrailingStopOrder::new(0.0010, 0, Uuid::new_v4(), 1.2000, false);
        assert!((order.trailing_stop_price() - 1.1990).abs() < 1e-9);
    }

    #[test]
    fn trailing_stop_initializes_above_short_entry() {
        let order = TrailingStopOrder::new(0.0010, 0, Uuid::new_v4(), 1.2000, true);
        assert!((order.trailing_stop_price() - 1.2010).abs() < 1e-9);
    }

    #[test]
    fn trailing_stop_ratchets_monotonically_for_long() {
        let mut order = TrailingStopOrder::new(0.0010, 0, Uuid::new_v4(), 1.2000, false);
        order.update(1.2050);
        assert!((order.trailing_stop_price() - 1.2040).abs() < 1e-9);
        order.update(1.2100);
        assert!((order.trailing_stop_price() - 1.2090).abs() < 1e-9);
    }
}
