//! Trading-day calendar and the tick clock built on top of it.
//!
//! The FX week runs Sunday 17:00 New York time through Friday 17:00 New
//! York time; a day is a trading day unless it's a weekend, a named
//! holiday, or a Monday immediately following a holiday that fell on the
//! preceding Saturday or Sunday.

use chrono::{Datelike, NaiveDate, TimeZone, Weekday};
use chrono_tz::Tz;

use crate::data::DataFreq;
use crate::error::FxError;

const NY_TZ: Tz = chrono_tz::America::New_York;

/// (day, month) pairs treated as holidays in every year.
const HOLIDAYS: &[(u32, u32)] = &[(1, 1), (25, 12)];

fn is_holiday(date: NaiveDate) -> bool {
    HOLIDAYS.contains(&(date.day(), date.month()))
}

fn is_trading_day(date: NaiveDate) -> bool {
    if is_holiday(date) {
        return false;
    }
    match date.weekday() {
        Weekday::Sat | Weekday::Sun => return false,
        Weekday::Mon => {
            for days_back in 1..=2 {
                let before = date - chrono::Duration::days(days_back);
                if is_holiday(before) {
                    return false;
                }
            }
        }
        _ => {}
    }
    true
}

/// NY 17:00 on `date`, minus 24h, as a UTC Unix timestamp — the start of
/// the trading day that ends at NY 17:00 on `date`.
fn trade_start(date: NaiveDate) -> Result<i64, FxError> {
    let naive = date.and_hms_opt(17, 0, 0).ok_or(FxError::CalendarExhausted)?;
    let local = NY_TZ
        .from_local_datetime(&naive)
        .single()
        .ok_or(FxError::CalendarExhausted)?;
    Ok((local.with_timezone(&chrono::Utc) - chrono::Duration::hours(24)).timestamp())
}

/// Iterates trading days (in the `region` timezone's local calendar,
/// projected onto the NY FX week) between two dates, inclusive.
pub struct DayIterator {
    current: Option<NaiveDate>,
    end: NaiveDate,
}

impl DayIterator {
    pub fn new(begin: NaiveDate, end: NaiveDate) -> Self {
        let mut current = begin;
        while !is_trading_day(current) && current <= end {
            current += chrono::Duration::days(1);
        }
        let current = if current <= end { Some(current) } else { None };
        Self { current, end }
    }

    pub fn trade_start(&self) -> Result<i64, FxError> {
        let date = self.current.ok_or(FxError::CalendarExhausted)?;
        trade_start(date)
    }
}

impl Iterator for DayIterator {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let date = self.current?;
        let mut next = date + chrono::Duration::days(1);
        while next <= self.end && !is_trading_day(next) {
            next += chrono::Duration::days(1);
        }
        self.current = if next <= self.end { Some(next) } else { None };
        Some(date)
    }
}

/// Every trade-start timestamp (UTC Unix seconds) between two calendar
/// dates, one per trading day.
pub fn trade_start_times(begin: NaiveDate, end: NaiveDate) -> Result<Vec<i64>, FxError> {
    let mut out = Vec::new();
    let mut current = begin;
    while !is_trading_day(current) && current <= end {
        current += chrono::Duration::days(1);
    }
    while current <= end {
        out.push(trade_start(current)?);
        current += chrono::Duration::days(1);
        while current <= end && !is_trading_day(current) {
            current += chrono::Duration::days(1);
        }
    }
    Ok(out)
}

/// Slices each trading day's `[trade_start, trade_start + 86400)` window
/// into uniform steps of `freq`, producing the full ordered tick sequence
/// for a backtest run.
pub struct Clock {
    trade_starts: Vec<i64>,
    freq: DataFreq,
    day_index: usize,
    step_index: i64,
    steps_per_day: i64,
}

impl Clock {
    pub fn new(begin: NaiveDate, end: NaiveDate, freq: DataFreq) -> Result<Self, FxError> {
        let trade_starts = trade_start_times(begin, end)?;
        let steps_per_day = DataFreq::D.seconds() / freq.seconds();
        Ok(Self {
            trade_starts,
            freq,
            day_index: 0,
            step_index: 0,
            steps_per_day,
        })
    }

    pub fn all_ticks(&mut self) -> Vec<i64> {
        self.by_ref().collect()
    }
}

impl Iterator for Clock {
    type Item = i64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.day_index >= self.trade_starts.len() {
            return None;
        }
        let tick = self.trade_starts[self.day_index] + self.step_index * self.freq.seconds();
        self.step_index += 1;
        if self.step_index >= self.steps_per_day {
            self.step_index = 0;
            self.day_index += 1;
        }
        Some(tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekend_is_not_a_trading_day() {
        assert!(!is_trading_day(date(2026, 7, 25))); // Saturday
        assert!(!is_trading_day(date(2026, 7, 26))); // Sunday
        assert!(is_trading_day(date(2026, 7, 24))); // Friday
    }

    #[test]
    fn new_years_day_is_a_holiday_every_year() {
        assert!(!is_trading_day(date(2025, 1, 1)));
        assert!(!is_trading_day(date(2030, 1, 1)));
    }

    #[test]
    fn monday_after_holiday_weekend_is_excluded() {
        // Dec 25 2027 is a Saturday; the following Monday (Dec 27) is excluded.
        assert_eq!(date(2027, 12, 25).weekday(), Weekday::Sat);
        assert!(!is_trading_day(date(2027, 12, 27)));
    }

    #[test]
    fn clock_slices_each_day_into_freq_steps() {
        let mut clock = Clock::new(date(2026, 7, 20), date(2026, 7, 20), DataFreq::H12).unwrap();
        let ticks = clock.all_ticks();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[1] - ticks[0], DataFreq::H12.seconds());
    }
}
