//! Date and time predicates
//!
//! `weekdayRange`, `dateRange` and `timeRange`. Each evaluates against the
//! library's clock, in local time unless a `"GMT"` marker is passed.
//! Field arithmetic is lenient: out-of-range days, months and hours roll
//! into the neighbouring unit instead of failing.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use super::{PredicateLibrary, ScriptArg, GMT};
use crate::error::PacError;

const DAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Argument positions of `timeRange` where a trailing GMT marker can land
const TIME_RANGE_GMT_POSITIONS: [usize; 4] = [1, 2, 4, 6];

impl PredicateLibrary {
    /// `weekdayRange(wd1, [wd2], ["GMT"])`; a range whose end precedes its start wraps over the weekend
    pub fn weekday_range(&self, day1: &str, day2: Option<&str>, gmt: Option<&str>) -> bool {
        let use_gmt = is_gmt_marker(day2) || is_gmt_marker(gmt);
        let today = self.current(use_gmt).weekday().num_days_from_sunday() as usize;

        let Some(from) = day_index(day1) else {
            return false;
        };
        let to = day2.and_then(day_index).unwrap_or(from);

        if to < from {
            today >= from || today <= to
        } else {
            (from..=to).contains(&today)
        }
    }

    /// `dateRange(...)` over a type-tagged argument list.
    ///
    /// Numbers up to 31 fill the day slots, larger numbers the year slots,
    /// month abbreviations the month slots. Only supplied fields replace the
    /// current date's; the time of day is kept.
    pub fn date_range(&self, args: &[ScriptArg]) -> bool {
        let mut fields = DateFields::default();
        for arg in args {
            fields.absorb(arg);
        }

        let current = self.current(fields.gmt);

        let Some(from) = with_date_fields(current, fields.day1, fields.month1, fields.year1) else {
            return false;
        };
        let Some(mut to) = with_date_fields(from, fields.day2, fields.month2, fields.year2) else {
            return false;
        };

        if to < from {
            match to.checked_add_months(Months::new(1)) {
                Some(next) => to = next,
                None => return false,
            }
        }
        if to < from {
            match to
                .checked_add_months(Months::new(12))
                .and_then(|next| next.checked_sub_months(Months::new(1)))
            {
                Some(next) => to = next,
                None => return false,
            }
        }

        current >= from && current <= to
    }

    /// `timeRange(...)`: the arity picks the form.
    ///
    /// - `timeRange(h)`: `h:00:00` to `h:59:59`
    /// - `timeRange(h1, h2)`: `h1:00:00` to `h2:59:59`
    /// - `timeRange(h1, m1, h2, m2)`: `h1:m1:00` to `h2:m2:59`
    /// - `timeRange(h1, m1, s1, h2, m2, s2)`
    ///
    /// A window whose end precedes its start spans midnight.
    pub fn time_range(&self, args: &[ScriptArg]) -> Result<bool, PacError> {
        let arg = |index: usize| args.get(index).unwrap_or(&ScriptArg::Missing);
        let number = |index: usize| arg(index).as_int();
        let required = |index: usize| {
            number(index).ok_or_else(|| {
                PacError::Evaluation(format!(
                    "timeRange: argument {} must be a number",
                    index + 1
                ))
            })
        };

        let use_gmt = TIME_RANGE_GMT_POSITIONS
            .iter()
            .any(|&index| arg(index).is_gmt());

        let current = self.current(use_gmt);
        let current = current.with_nanosecond(0).unwrap_or(current);
        let today = current.date();

        let (start, end) = if number(5).is_some() {
            (
                (required(0)?, required(1)?, required(2)?),
                (required(3)?, required(4)?, required(5)?),
            )
        } else if number(3).is_some() {
            (
                (required(0)?, required(1)?, 0),
                (required(2)?, required(3)?, 59),
            )
        } else if number(1).is_some() {
            ((required(0)?, 0, 0), (required(1)?, 59, 59))
        } else {
            let hour = required(0)?;
            ((hour, 0, 0), (hour, 59, 59))
        };

        let out_of_range = || PacError::Evaluation("timeRange: time out of range".to_string());
        let from = at_time_of_day(today, start).ok_or_else(out_of_range)?;
        let to = at_time_of_day(today, end).ok_or_else(out_of_range)?;

        if to < from {
            // Wraps past midnight: the window either started today or started yesterday.
            Ok(current >= from || current <= to)
        } else {
            Ok(current >= from && current <= to)
        }
    }

    fn current(&self, gmt: bool) -> NaiveDateTime {
        let now = self.now();
        if gmt {
            now.naive_utc()
        } else {
            now.naive_local()
        }
    }
}

#[derive(Debug, Default)]
struct DateFields {
    day1: Option<i64>,
    day2: Option<i64>,
    month1: Option<i64>,
    month2: Option<i64>,
    year1: Option<i64>,
    year2: Option<i64>,
    gmt: bool,
}

impl DateFields {
    fn absorb(&mut self, arg: &ScriptArg) {
        match arg {
            ScriptArg::Number(_) => {
                if let Some(n) = arg.as_int() {
                    if n <= 31 {
                        fill_slot(&mut self.day1, &mut self.day2, n);
                    } else {
                        fill_slot(&mut self.year1, &mut self.year2, n);
                    }
                }
            }
            ScriptArg::Text(text) => {
                if let Some(month) = month_index(text) {
                    fill_slot(&mut self.month1, &mut self.month2, month as i64);
                }
            }
            ScriptArg::Missing => {}
        }

        if arg.is_gmt() {
            self.gmt = true;
        }
    }
}

fn fill_slot(first: &mut Option<i64>, second: &mut Option<i64>, value: i64) {
    if first.is_none() {
        *first = Some(value);
    } else {
        *second = Some(value);
    }
}

fn is_gmt_marker(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case(GMT))
}

fn day_index(name: &str) -> Option<usize> {
    DAYS.iter().position(|day| day.eq_ignore_ascii_case(name))
}

fn month_index(name: &str) -> Option<usize> {
    MONTHS.iter().position(|month| month.eq_ignore_ascii_case(name))
}

/// Replace the supplied calendar fields of `base`, letting overflow roll over
fn with_date_fields(
    base: NaiveDateTime,
    day: Option<i64>,
    month0: Option<i64>,
    year: Option<i64>,
) -> Option<NaiveDateTime> {
    let year = year.unwrap_or(base.year() as i64);
    let month0 = month0.unwrap_or(base.month0() as i64);
    let day = day.unwrap_or(base.day() as i64);

    let year = i32::try_from(year + month0.div_euclid(12)).ok()?;
    let month = month0.rem_euclid(12) as u32 + 1;
    let first_of_month = NaiveDate::from_ymd_opt(year, month, 1)?;
    let date = first_of_month.checked_add_signed(TimeDelta::try_days(day - 1)?)?;

    Some(date.and_time(base.time()))
}

fn at_time_of_day(date: NaiveDate, (hour, minute, second): (i64, i64, i64)) -> Option<NaiveDateTime> {
    let offset = TimeDelta::try_hours(hour)?
        .checked_add(&TimeDelta::try_minutes(minute)?)?
        .checked_add(&TimeDelta::try_seconds(second)?)?;
    date.and_hms_opt(0, 0, 0)?.checked_add_signed(offset)
}
