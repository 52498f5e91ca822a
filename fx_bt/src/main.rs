mod config;
mod data_loader;
mod strategies;

use std::time::Instant;

use chrono::NaiveDate;
use fx_core::account::SimulationAccount;
use fx_core::calendar::Clock;
use fx_core::data::DataFreq;
use fx_core::strategy::Strategy;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use config::BacktestConfig;
use strategies::buy_and_hold::BuyAndHold;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let start = Instant::now();

    let config = BacktestConfig::default();
    let outer_freq = DataFreq::from_str(&config.outer_freq)?;
    let inner_freq = DataFreq::from_str(&config.inner_freq)?;
    let data = data_loader::load_csv("demos/data/eurusd.csv", inner_freq)?;

    let instruments = vec!["EUR_USD".to_string()];

    let begin = NaiveDate::from_ymd_opt(config.begin_year, config.begin_month, config.begin_day)
        .expect("valid begin date");
    let end = NaiveDate::from_ymd_opt(config.end_year, config.end_month, config.end_day)
        .expect("valid end date");
    let ticks: Vec<i64> = Clock::new(begin, end, outer_freq)?.all_ticks();
    let sub_ticks_per_outer = (outer_freq.seconds() / inner_freq.seconds()).max(1);

    let mut account = SimulationAccount::new(
        &config.account_currency,
        config.leverage,
        config.capital_base,
        config.spread,
    );

    let mut strategy: Box<dyn Strategy> = Box::new(BuyAndHold::new("EUR_USD", 10_000));
    strategy.init(&mut account, &data);

    let progress = ProgressBar::new(ticks.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} ticks")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for time in ticks {
        let tick_data_map = data.tick_data_map(&instruments, time, inner_freq);
        if tick_data_map.values().all(|c| c.is_none()) {
            warn!(time, "no candle data for any instrument, skipping tick");
            progress.inc(1);
            continue;
        }

        let history = data.history_many(&instruments, time, config.hist_data_count, inner_freq);

        // All strategy calls for this tick complete before any order
        // processing for it begins.
        strategy.next(time, &tick_data_map, &history, &mut account, &data);

        // Orders are matched at inner_freq resolution across the outer
        // tick's span, so a fill/trigger inside the bar isn't missed.
        for step in 0..sub_ticks_per_outer {
            let sub_time = time + step * inner_freq.seconds();
            let sub_tick_data_map = data.tick_data_map(&instruments, sub_time, inner_freq);
            account.process_orders(sub_time, &sub_tick_data_map);
        }

        info!("{}", account.summary(time, &tick_data_map));
        progress.inc(1);
    }
    progress.finish();

    info!(
        balance = account.balance(),
        trades = account.trades().len(),
        elapsed = ?start.elapsed(),
        "backtest complete"
    );

    Ok(())
}
