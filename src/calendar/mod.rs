//! US equity market calendar gate
//!
//! Decides whether a given date is a trading day. Pure logic: no clock reads,
//! the caller injects the date. Floating holidays are derived from the year's
//! weekday layout rather than a per-year table.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;
use std::fmt;

use crate::config::CalendarConfig;

/// NYSE/NASDAQ full-day closures we track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Holiday {
    NewYearsDay,
    MartinLutherKingJrDay,
    PresidentsDay,
    MemorialDay,
    IndependenceDay,
    LaborDay,
    Thanksgiving,
    Christmas,
}

impl Holiday {
    /// Whether the date moves from year to year
    pub fn is_floating(&self) -> bool {
        !matches!(
            self,
            Holiday::NewYearsDay | Holiday::IndependenceDay | Holiday::Christmas
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Holiday::NewYearsDay => "New Year's Day",
            Holiday::MartinLutherKingJrDay => "Martin Luther King Jr. Day",
            Holiday::PresidentsDay => "Presidents' Day",
            Holiday::MemorialDay => "Memorial Day",
            Holiday::IndependenceDay => "Independence Day",
            Holiday::LaborDay => "Labor Day",
            Holiday::Thanksgiving => "Thanksgiving Day",
            Holiday::Christmas => "Christmas Day",
        }
    }
}

impl fmt::Display for Holiday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why the market is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureReason {
    Weekend(Weekday),
    Holiday(Holiday),
}

impl fmt::Display for ClosureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosureReason::Weekend(day) => write!(f, "weekend ({})", day),
            ClosureReason::Holiday(h) => write!(f, "{}", h),
        }
    }
}

/// Gate result for one date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarDecision {
    pub date: NaiveDate,
    pub is_open: bool,
    pub reason: Option<ClosureReason>,
}

impl CalendarDecision {
    fn open(date: NaiveDate) -> Self {
        Self {
            date,
            is_open: true,
            reason: None,
        }
    }

    fn closed(date: NaiveDate, reason: ClosureReason) -> Self {
        Self {
            date,
            is_open: false,
            reason: Some(reason),
        }
    }
}

impl fmt::Display for CalendarDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            None => write!(f, "{} ({}): market open", self.date, self.date.weekday()),
            Some(reason) => write!(
                f,
                "{} ({}): market closed, {}",
                self.date,
                self.date.weekday(),
                reason
            ),
        }
    }
}

/// Market calendar with optional floating holidays
#[derive(Debug, Clone, Copy)]
pub struct MarketCalendar {
    floating_holidays: bool,
}

impl Default for MarketCalendar {
    fn default() -> Self {
        Self {
            floating_holidays: true,
        }
    }
}

impl MarketCalendar {
    pub fn new(config: &CalendarConfig) -> Self {
        Self {
            floating_holidays: config.floating_holidays,
        }
    }

    /// Fixed-date holidays only
    pub fn fixed_only() -> Self {
        Self {
            floating_holidays: false,
        }
    }

    /// Decide whether `date` is a trading day
    pub fn is_market_open(&self, date: NaiveDate) -> CalendarDecision {
        let weekday = date.weekday();
        if matches!(weekday, Weekday::Sat | Weekday::Sun) {
            return CalendarDecision::closed(date, ClosureReason::Weekend(weekday));
        }

        match self.holiday_on(date) {
            Some(holiday) => CalendarDecision::closed(date, ClosureReason::Holiday(holiday)),
            None => CalendarDecision::open(date),
        }
    }

    /// Holiday falling exactly on `date`, if any
    pub fn holiday_on(&self, date: NaiveDate) -> Option<Holiday> {
        self.holidays(date.year())
            .into_iter()
            .find(|(day, _)| *day == date)
            .map(|(_, holiday)| holiday)
    }

    /// All tracked holidays for `year`, in date order
    pub fn holidays(&self, year: i32) -> Vec<(NaiveDate, Holiday)> {
        let mut days: Vec<(NaiveDate, Holiday)> = [
            (NaiveDate::from_ymd_opt(year, 1, 1), Holiday::NewYearsDay),
            (NaiveDate::from_ymd_opt(year, 7, 4), Holiday::IndependenceDay),
            (NaiveDate::from_ymd_opt(year, 12, 25), Holiday::Christmas),
        ]
        .into_iter()
        .filter_map(|(day, holiday)| day.map(|d| (d, holiday)))
        .collect();

        if self.floating_holidays {
            let floating = [
                (nth_weekday(year, 1, Weekday::Mon, 3), Holiday::MartinLutherKingJrDay),
                (nth_weekday(year, 2, Weekday::Mon, 3), Holiday::PresidentsDay),
                (last_weekday(year, 5, Weekday::Mon), Holiday::MemorialDay),
                (nth_weekday(year, 9, Weekday::Mon, 1), Holiday::LaborDay),
                (nth_weekday(year, 11, Weekday::Thu, 4), Holiday::Thanksgiving),
            ];
            days.extend(
                floating
                    .into_iter()
                    .filter_map(|(day, holiday)| day.map(|d| (d, holiday))),
            );
        }

        days.sort_by_key(|(day, _)| *day);
        days
    }
}

/// The `n`th (1-based) occurrence of `weekday` in the month
pub fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

/// The last occurrence of `weekday` in the month
pub fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let last_day = NaiveDate::from_ymd_opt(next_year, next_month, 1)? - Duration::days(1);
    let back = (7 + last_day.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    Some(last_day - Duration::days(back as i64))
}
