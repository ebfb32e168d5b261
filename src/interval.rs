//! Time-slot primitives and the per-feeder booking list.
//!
//! This module defines two types used by the splitter:
//!
//! - [`TimeSlot`]: a **closed–open** interval `[start, end)` over plant-local
//!   time, with total ordering so slots can be sorted deterministically.
//! - [`FeederSchedule`]: the list of intervals already booked on a feeder,
//!   used to enforce feeder exclusivity.
//!
//! Overlap uses strict semantics: two slots conflict iff
//! `!(end1 <= start2 || end2 <= start1)`, so back-to-back slots that share a
//! boundary instant do not conflict.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A closed–open window of plant-local time: `[start, end)`.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlot {
    /// Inclusive start.
    pub start: NaiveDateTime,
    /// Exclusive end.
    pub end: NaiveDateTime,
}

impl TimeSlot {
    /// Construct a slot `[start, end)`. Panics in debug builds if `end < start`.
    #[inline]
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        debug_assert!(end >= start);
        Self { start, end }
    }

    /// Strict-overlap test; adjacent slots do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.end <= other.start || other.end <= self.start)
    }

    #[inline]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

// Ord so slots can be used as sort keys.
impl Ord for TimeSlot {
    #[inline]
    fn cmp(&self, o: &Self) -> Ordering {
        self.start.cmp(&o.start).then(self.end.cmp(&o.end))
    }
}
impl PartialOrd for TimeSlot {
    #[inline]
    fn partial_cmp(&self, o: &Self) -> Option<Ordering> {
        Some(self.cmp(o))
    }
}

/// One booked interval on a feeder, with the identity of the plan holding it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Booking {
    pub slot: TimeSlot,
    pub work_order_nr: String,
    pub maker_code: String,
    pub article_nr: String,
}

/// The intervals already booked on a single feeder.
///
/// The splitter owns one schedule per feeder group, so no synchronisation is
/// needed even when groups are processed on separate workers.
#[derive(Clone, Debug, Default)]
pub struct FeederSchedule {
    bookings: Vec<Booking>,
}

impl FeederSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest end among bookings that conflict with `slot`, or `None`
    /// when the slot is free.
    pub fn latest_conflicting_end(&self, slot: &TimeSlot) -> Option<NaiveDateTime> {
        self.bookings
            .iter()
            .filter(|b| b.slot.overlaps(slot))
            .map(|b| b.slot.end)
            .max()
    }

    /// Record a booking. The caller resolves conflicts first; the schedule
    /// does not reject overlapping bookings on its own.
    pub fn book(&mut self, booking: Booking) {
        self.bookings.push(booking);
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}
