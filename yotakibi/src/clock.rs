// SPDX-License-Identifier: AGPL-3.0-or-later

//! Wall-clock access for the opening-hours gate, the rate limiter and timestamps.
use std::fmt::Debug;

use chrono::{FixedOffset, Local, NaiveDateTime, Timelike, Utc};

/// Source of the current local wall-clock time.
pub trait Clock: Debug + Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;

    /// Current local hour (0–23).
    fn hour(&self) -> u32 {
        self.now().hour()
    }
}

/// Clock reading the system time, either in the local timezone of the host or at a fixed UTC
/// offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    /// Returns a clock using the timezone of the host.
    pub fn local() -> Self {
        Self { offset: None }
    }

    /// Returns a clock at a fixed offset from UTC, ignoring the host timezone.
    ///
    /// Returns `None` when the offset is out of range (more than 23 hours).
    pub fn with_offset_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours * 3600).map(|offset| Self {
            offset: Some(offset),
        })
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset).naive_local(),
            None => Local::now().naive_local(),
        }
    }
}

/// Clock which always returns the same moment.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Returns a clock standing still on an arbitrary day at the given full hour.
    pub fn at_hour(hour: u32) -> Self {
        let moment = chrono::NaiveDate::from_ymd_opt(2024, 11, 3)
            .and_then(|date| date.and_hms_opt(hour % 24, 0, 0))
            .unwrap_or_default();
        Self(moment)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
