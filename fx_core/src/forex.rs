//! FX math kernel: pip value, gain/loss, margin, and position sizing.
//!
//! All formulas are in account-currency terms; callers supply the relevant
//! cross rate (account currency vs. quote or base currency of the traded
//! instrument) themselves, usually via [`crate::data::account_currency_rate`].

/// <https://www.fxpro.com/trading-tools/calculators/pip>
///
/// `rate` is the account-currency-vs-quote-currency rate, `decimals` the
/// instrument's pip decimals (2 for JPY quotes, 4 otherwise).
pub fn pip_value(units: i64, rate: f64, decimals: i32) -> f64 {
    units as f64 * 10f64.powi(-decimals) * (1.0 / rate)
}

/// <https://www.oanda.com/forex-trading/analysis/profit-calculator/>
pub fn gains_losses(change: f64, units: i64, rate: f64, decimals: i32) -> f64 {
    change * pip_value(units, rate, decimals)
}

/// <https://www.oanda.com/resources/legal/united-states/legal/margin-rules>
///
/// `rate` is the account-currency-vs-base-currency rate.
pub fn margin_used(units: i64, rate: f64, leverage: u32) -> f64 {
    units.unsigned_abs() as f64 * (1.0 / rate) * (1.0 / leverage as f64)
}

pub fn margin_available(nav: f64, margin_used: f64) -> f64 {
    let available = nav - margin_used;
    if available > 0.0 {
        available
    } else {
        0.0
    }
}

/// A margin closeout triggers when NAV declines to half, or less than half,
/// of margin used.
/// <https://www.oanda.com/resources/legal/australia/legal/margin-rules>
pub fn check_margin_call(nav: f64, margin_used: f64) -> bool {
    nav <= margin_used / 2.0
}

/// <https://www.babypips.com/tools/position-size-calculator>
///
/// `equity` includes all open trades; `rate` is account-vs-quote currency.
pub fn position_size(
    equity: f64,
    risk_pct: f64,
    stop_loss_pips: i32,
    rate: f64,
    pip_num: i32,
) -> i64 {
    let loss = equity * risk_pct;
    let quote_currency_loss = loss * rate;
    let pip_value = quote_currency_loss / stop_loss_pips as f64;
    (pip_value * 10f64.powi(pip_num)).floor() as i64
}

pub fn position_value(size: i64, current_price: f64, rate: f64) -> f64 {
    size.unsigned_abs() as f64 * current_price * (1.0 / rate)
}

/// Stop-loss based position sizing with risk, margin and max-exposure clamps.
///
/// Grounded on the original engine's `CalculateStopLossPositionSize`
/// (units-and-price overload): computes a raw risk-based size, then clamps
/// it so the resulting trade never exceeds available margin nor
/// `max_position_value_pct` of equity. `max_position_value_pct` of `1.0`
/// (the default used when the caller passes `f64::INFINITY`-free callers)
/// disables that second clamp, matching callers that don't ask for it.
#[allow(clippy::too_many_arguments)]
pub fn stop_loss_position_size(
    equity: f64,
    margin_available: f64,
    leverage: u32,
    risk_pct: f64,
    stop_loss_pips: i32,
    rate: f64,
    pip_num: i32,
    current_price: f64,
    max_position_value_pct: f64,
    is_short: bool,
    min_size: i64,
) -> i64 {
    let mut size = position_size(equity, risk_pct, stop_loss_pips, rate, pip_num);
    if margin_available == 0.0 || size < min_size {
        return 0;
    }
    let leverage_f = leverage as f64;
    let trade_value = position_value(size, current_price, rate);
    let margin_budget = margin_available * leverage_f;
    if trade_value >= margin_budget {
        size = (margin_budget * rate / current_price) as i64;
    }
    let equity_budget = equity * max_position_value_pct * leverage_f;
    if position_value(size, current_price, rate) >= equity_budget {
        size = (equity_budget * rate / current_price) as i64;
    }
    if size < min_size {
        return 0;
    }
    if is_short {
        -size
    } else {
        size
    }
}

/// Derives `stop_loss_pips` from a concrete stop price (rounded, plus
/// spread) and delegates to [`stop_loss_position_size`], returning the
/// sized units together with the stop price it was sized against.
#[allow(clippy::too_many_arguments)]
pub fn stop_loss_position_size_from_price(
    equity: f64,
    margin_available: f64,
    leverage: u32,
    risk_pct: f64,
    current_price: f64,
    stop_loss_price: f64,
    spread_pips: i32,
    rate: f64,
    pip_num: i32,
    max_position_value_pct: f64,
    is_short: bool,
    min_size: i64,
) -> (i64, f64) {
    let stop_loss_pips =
        ((current_price - stop_loss_price).abs() * 10f64.powi(pip_num)).round() as i32
            + spread_pips;
    let size = stop_loss_position_size(
        equity,
        margin_available,
        leverage,
        risk_pct,
        stop_loss_pips,
        rate,
        pip_num,
        current_price,
        max_position_value_pct,
        is_short,
        min_size,
    );
    (size, stop_loss_price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pip_value_matches_reference() {
        let v = pip_value(100_000, 1.3269, 4);
        assert!((v - 7.53706).abs() < 1e-3);
    }

    #[test]
    fn margin_available_floors_at_zero() {
        assert_eq!(margin_available(100.0, 200.0), 0.0);
        assert_eq!(margin_available(300.0, 200.0), 100.0);
    }

    #[test]
    fn margin_call_triggers_at_half() {
        assert!(check_margin_call(4000.0, 10000.0));
        assert!(!check_margin_call(6000.0, 10000.0));
    }

    #[test]
    fn margin_used_matches_reference() {
        let m = margin_used(500_000, 1.0 / 1.365, 100);
        assert!((m - 6825.00).abs() < 1e-2);
    }

    #[test]
    fn stop_loss_position_size_zeroes_out_when_margin_clamp_drops_below_min() {
        // A raw risk-based size comfortably above min_size, but a tiny
        // margin budget that clamps the tradeable size back under it.
        let size = stop_loss_position_size(
            100_000.0, // equity
            1.0,       // margin_available: tiny
            50,        // leverage
            0.1,       // risk_pct
            20,        // stop_loss_pips
            1.0,       // rate
            4,         // pip_num
            1.2,       // current_price
            1.0,       // max_position_value_pct
            false,     // is_short
            1_000,     // min_size
        );
        assert_eq!(size, 0);
    }
}
