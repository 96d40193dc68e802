// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Five-field crontab dialect
//!
//! `minute hour day-of-month month day-of-week`, evaluated in UTC with
//! minute granularity. Each field is a comma list of `*`, `n`, `a-b`,
//! `*/s`, `a-b/s` or `a/s`. Months and weekdays also accept three-letter
//! names, and weekday `7` is Sunday. When both day fields are restricted a
//! day matches if either does, as in vixie cron.

use super::{TimeFormat, TimeFormatError};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};

/// Days searched before giving up on a pattern. Eight years always
/// contains a leap day, even across a skipped century leap year.
const HORIZON_DAYS: i64 = 366 * 8;

const MONTH_NAMES: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
/// Days scanned for the shortest gap between matching days. Weekdays and
/// dates line up the same way every 28 years between 1901 and 2099.
const GAP_WINDOW_DAYS: u32 = 28 * 366;

const MINUTES_PER_DAY: u64 = 24 * 60;

const WEEKDAY_NAMES: &[&str] = &["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Bounds and aliases of one crontab field
struct Field {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
    /// Value of the first name in `names`
    names_base: u32,
}

const MINUTE: Field = Field {
    name: "minute",
    min: 0,
    max: 59,
    names: &[],
    names_base: 0,
};
const HOUR: Field = Field {
    name: "hour",
    min: 0,
    max: 23,
    names: &[],
    names_base: 0,
};
const DAY_OF_MONTH: Field = Field {
    name: "day-of-month",
    min: 1,
    max: 31,
    names: &[],
    names_base: 0,
};
const MONTH: Field = Field {
    name: "month",
    min: 1,
    max: 12,
    names: MONTH_NAMES,
    names_base: 1,
};
const DAY_OF_WEEK: Field = Field {
    name: "day-of-week",
    min: 0,
    max: 7,
    names: WEEKDAY_NAMES,
    names_base: 0,
};

/// The crontab dialect
#[derive(Clone, Copy, Debug, Default)]
pub struct Crontab;

impl Crontab {
    /// Registry name of this dialect
    pub const NAME: &'static str = "crontab";

    pub fn new() -> Self {
        Self
    }

    /// Factory suitable for [`super::TimeFormatRegistry::register`]
    pub fn boxed() -> Box<dyn TimeFormat> {
        Box::new(Self)
    }
}

impl TimeFormat for Crontab {
    fn validate(&self, pattern: &str) -> Result<(), TimeFormatError> {
        let expr = CronExpr::parse(pattern)?;
        if !expr.is_satisfiable() {
            return Err(TimeFormatError::invalid_pattern(
                pattern,
                "no calendar day matches the day-of-month and month fields",
            ));
        }
        Ok(())
    }

    fn compute_next(
        &self,
        pattern: &str,
        from: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, TimeFormatError> {
        let expr = CronExpr::parse(pattern)?;
        expr.next_after(from)
            .ok_or_else(|| TimeFormatError::HorizonExceeded {
                pattern: pattern.to_string(),
                from,
            })
    }

    fn get_interval(&self, pattern: &str) -> Result<u64, TimeFormatError> {
        let expr = CronExpr::parse(pattern)?;
        expr.shortest_gap()
            .map(|minutes| minutes * 60)
            .ok_or_else(|| TimeFormatError::HorizonExceeded {
                pattern: pattern.to_string(),
                from: DateTime::UNIX_EPOCH,
            })
    }
}

/// A parsed crontab expression, one bit per allowed value
#[derive(Debug, Clone, PartialEq, Eq)]
struct CronExpr {
    minutes: u64,
    hours: u64,
    days: u64,
    months: u64,
    /// Sunday is bit 0
    weekdays: u64,
    days_restricted: bool,
    weekdays_restricted: bool,
}

impl CronExpr {
    fn parse(pattern: &str) -> Result<Self, TimeFormatError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(TimeFormatError::missing_pattern());
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let [minute, hour, day, month, weekday] = fields.as_slice() else {
            return Err(TimeFormatError::invalid_pattern(
                pattern,
                format!("expected 5 fields, got {}", fields.len()),
            ));
        };

        let parse = |text: &str, field: &Field| {
            parse_field(text, field).map_err(|reason| TimeFormatError::invalid_pattern(pattern, reason))
        };

        let mut weekdays = parse(weekday, &DAY_OF_WEEK)?;
        // 7 is an alias for Sunday
        if weekdays & (1u64 << 7) != 0 {
            weekdays = (weekdays & !(1u64 << 7)) | 1;
        }

        Ok(Self {
            minutes: parse(minute, &MINUTE)?,
            hours: parse(hour, &HOUR)?,
            days: parse(day, &DAY_OF_MONTH)?,
            months: parse(month, &MONTH)?,
            weekdays,
            days_restricted: !day.starts_with('*'),
            weekdays_restricted: !weekday.starts_with('*'),
        })
    }

    /// Whether some calendar day can ever match
    fn is_satisfiable(&self) -> bool {
        if self.weekdays_restricted || !self.days_restricted {
            // Every month contains every weekday
            return true;
        }
        (1..=12u32)
            .filter(|m| has_bit(self.months, *m))
            .any(|m| (1..=max_days_in_month(m)).any(|d| has_bit(self.days, d)))
    }

    /// Shortest distance in minutes between two consecutive occurrences.
    ///
    /// Taken over the times within one day and over the closest pair of
    /// matching days, counted from the Unix epoch.
    fn shortest_gap(&self) -> Option<u64> {
        let times: Vec<u64> = (0..=HOUR.max)
            .filter(|h| has_bit(self.hours, *h))
            .flat_map(|h| {
                (0..=MINUTE.max)
                    .filter(|m| has_bit(self.minutes, *m))
                    .map(move |m| u64::from(h) * 60 + u64::from(m))
            })
            .collect();
        let (first, last) = (*times.first()?, *times.last()?);
        let within_day = times.windows(2).map(|pair| pair[1] - pair[0]).min();

        let mut date = NaiveDate::from_ymd_opt(1970, 1, 1)?;
        let mut previous: Option<NaiveDate> = None;
        let mut closest_days: Option<u64> = None;
        for _ in 0..GAP_WINDOW_DAYS {
            if has_bit(self.months, date.month()) && self.day_matches(date) {
                if let Some(previous) = previous {
                    let days = (date - previous).num_days().unsigned_abs();
                    closest_days = Some(closest_days.map_or(days, |d| d.min(days)));
                    if days == 1 {
                        break;
                    }
                }
                previous = Some(date);
            }
            date = date.succ_opt()?;
        }
        let across_days = closest_days.map(|days| days * MINUTES_PER_DAY - last + first);

        match (within_day, across_days) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        let dom = has_bit(self.days, date.day());
        let dow = has_bit(self.weekdays, date.weekday().num_days_from_sunday());
        if self.days_restricted && self.weekdays_restricted {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// Earliest matching minute strictly after `from`, within the horizon
    fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        // Round up to the next whole minute; an exact boundary still moves on
        let start_secs = from.timestamp().div_euclid(60) * 60 + 60;
        let start = DateTime::from_timestamp(start_secs, 0)?;
        let limit = start
            .checked_add_signed(Duration::days(HORIZON_DAYS))?
            .date_naive();

        let mut date = start.date_naive();
        let mut hour = start.hour();
        let mut minute = start.minute();

        loop {
            if date > limit {
                return None;
            }

            if !has_bit(self.months, date.month()) {
                date = first_of_next_month(date)?;
                hour = 0;
                minute = 0;
                continue;
            }

            if !self.day_matches(date) {
                date = date.succ_opt()?;
                hour = 0;
                minute = 0;
                continue;
            }

            match next_bit(self.hours, hour) {
                Some(h) if h == hour => {}
                Some(h) => {
                    hour = h;
                    minute = 0;
                }
                None => {
                    date = date.succ_opt()?;
                    hour = 0;
                    minute = 0;
                    continue;
                }
            }

            match next_bit(self.minutes, minute) {
                Some(m) => return Some(date.and_hms_opt(hour, m, 0)?.and_utc()),
                None => {
                    minute = 0;
                    hour += 1;
                    if hour > HOUR.max {
                        date = date.succ_opt()?;
                        hour = 0;
                    }
                }
            }
        }
    }
}

/// Parse one field into a bit mask of allowed values
fn parse_field(text: &str, field: &Field) -> Result<u64, String> {
    let mut mask = 0u64;

    for item in text.split(',') {
        if item.is_empty() {
            return Err(format!("empty list item in {} field '{}'", field.name, text));
        }

        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid step '{}' in {} field", step, field.name))?;
                if step == 0 {
                    return Err(format!("step must be positive in {} field", field.name));
                }
                (range, Some(step))
            }
            None => (item, None),
        };

        let (low, high) = if range == "*" {
            (field.min, field.max)
        } else if let Some((low, high)) = range.split_once('-') {
            (parse_value(low, field)?, parse_value(high, field)?)
        } else {
            let value = parse_value(range, field)?;
            // `a/s` runs from a to the end of the field
            match step {
                Some(_) => (value, field.max),
                None => (value, value),
            }
        };

        if low > high {
            return Err(format!(
                "range {}-{} is reversed in {} field",
                low, high, field.name
            ));
        }

        let step = step.unwrap_or(1) as usize;
        for value in (low..=high).step_by(step) {
            mask |= 1u64 << value;
        }
    }

    Ok(mask)
}

fn parse_value(text: &str, field: &Field) -> Result<u32, String> {
    let value = match text.parse::<u32>() {
        Ok(value) => value,
        Err(_) => {
            let lower = text.to_ascii_lowercase();
            field
                .names
                .iter()
                .position(|name| *name == lower)
                .map(|index| index as u32 + field.names_base)
                .ok_or_else(|| format!("invalid value '{}' in {} field", text, field.name))?
        }
    };

    if value < field.min || value > field.max {
        return Err(format!(
            "value {} out of range {}-{} in {} field",
            value, field.min, field.max, field.name
        ));
    }
    Ok(value)
}

fn has_bit(mask: u64, value: u32) -> bool {
    value < 64 && mask & (1u64 << value) != 0
}

/// Smallest set bit at or above `from`
fn next_bit(mask: u64, from: u32) -> Option<u32> {
    if from >= 64 {
        return None;
    }
    let shifted = mask >> from;
    if shifted == 0 {
        None
    } else {
        Some(from + shifted.trailing_zeros())
    }
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

/// Longest a month can be in any year
fn max_days_in_month(month: u32) -> u32 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}
