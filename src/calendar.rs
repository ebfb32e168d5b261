//! Shift-calendar arithmetic for the time corrector.
//!
//! Shifts come from the reference store as `HH:MM` strings. This module
//! parses them into minute-of-day spans and answers the questions the shift
//! clamping step asks: which shift contains an instant, when does the
//! current shift end, and when does the next shift start.
//!
//! Two special cases matter:
//! - `end_time = "24:00"` means midnight of the *next* day.
//! - a shift whose end is at or before its start (e.g. `22:00`–`06:00`)
//!   wraps past midnight.

use anyhow::{Context, Result, bail};
use chrono::{NaiveDateTime, TimeDelta, Timelike};

use crate::reference::Shift;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// One parsed shift: `[start, end)` in minutes of day, where `end` may be
/// `1440` (24:00) and `end <= start` marks a shift wrapping past midnight.
#[derive(Clone, Debug)]
pub struct ShiftSpan {
    pub name: String,
    start: u32,
    end: u32,
}

impl ShiftSpan {
    fn wraps(&self) -> bool {
        self.end <= self.start && self.end != MINUTES_PER_DAY
    }

    /// Half-open membership test on a minute of day.
    fn contains_minute(&self, minute: u32) -> bool {
        if self.wraps() {
            minute >= self.start || minute < self.end
        } else {
            minute >= self.start && minute < self.end
        }
    }
}

/// Parsed, ordered shift calendar.
#[derive(Clone, Debug)]
pub struct ShiftCalendar {
    spans: Vec<ShiftSpan>,
}

fn parse_hhmm(raw: &str) -> Result<u32> {
    let (h, m) = raw
        .trim()
        .split_once(':')
        .with_context(|| format!("shift time '{raw}' is not HH:MM"))?;
    let hours: u32 = h.parse().with_context(|| format!("bad hour in '{raw}'"))?;
    let minutes: u32 = m.parse().with_context(|| format!("bad minute in '{raw}'"))?;
    if hours > 24 || minutes > 59 || (hours == 24 && minutes != 0) {
        bail!("shift time '{raw}' out of range");
    }
    Ok(hours * 60 + minutes)
}

impl ShiftCalendar {
    /// Parse the configured shifts. Returns `None` for an empty list so the
    /// caller can skip shift clamping on missing data.
    pub fn from_shifts(shifts: &[Shift]) -> Result<Option<Self>> {
        if shifts.is_empty() {
            return Ok(None);
        }
        let mut spans = Vec::with_capacity(shifts.len());
        for shift in shifts {
            spans.push(ShiftSpan {
                name: shift.name.clone(),
                start: parse_hhmm(&shift.start_time)?,
                end: parse_hhmm(&shift.end_time)?,
            });
        }
        Ok(Some(Self { spans }))
    }

    fn minute_of(dt: NaiveDateTime) -> u32 {
        dt.time().hour() * 60 + dt.time().minute()
    }

    /// The shift containing `dt`, if any.
    pub fn shift_containing(&self, dt: NaiveDateTime) -> Option<&ShiftSpan> {
        let minute = Self::minute_of(dt);
        self.spans.iter().find(|s| s.contains_minute(minute))
    }

    /// The earliest shift start at or after `dt` (today, else tomorrow).
    pub fn next_shift_start(&self, dt: NaiveDateTime) -> NaiveDateTime {
        let minute = Self::minute_of(dt);
        let midnight = dt.date().and_hms_opt(0, 0, 0).expect("valid midnight");
        let today = self
            .spans
            .iter()
            .map(|s| s.start)
            .filter(|&s| s >= minute)
            .min();
        match today {
            Some(start) => midnight + TimeDelta::minutes(i64::from(start)),
            None => {
                let earliest = self.spans.iter().map(|s| s.start).min().unwrap_or(0);
                midnight + TimeDelta::days(1) + TimeDelta::minutes(i64::from(earliest))
            }
        }
    }

    /// The end of `span` for an order starting at `dt`.
    ///
    /// `24:00` and wrapped ends both resolve to the following day when the
    /// start sits in the pre-midnight part of the shift.
    pub fn shift_end_at(&self, dt: NaiveDateTime, span: &ShiftSpan) -> NaiveDateTime {
        let midnight = dt.date().and_hms_opt(0, 0, 0).expect("valid midnight");
        if span.end == MINUTES_PER_DAY {
            return midnight + TimeDelta::days(1);
        }
        let end_today = midnight + TimeDelta::minutes(i64::from(span.end));
        if span.wraps() && Self::minute_of(dt) >= span.start {
            end_today + TimeDelta::days(1)
        } else {
            end_today
        }
    }
}
