//! Time keeping

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::{events::TimeUnits, Error};

/// Anchors wall-clock time to a point in system uptime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeReference {
    /// Clock time (UTC)
    time: NaiveDateTime,
    /// Uptime at which `time` was valid
    uptime_ms: u64,
}

impl Default for TimeReference {
    fn default() -> Self {
        Self {
            time: NaiveDateTime::UNIX_EPOCH,
            uptime_ms: 0,
        }
    }
}

impl TimeReference {
    /// Create new time reference from NaiveDateTime
    pub fn from_datetime(time: NaiveDateTime, uptime_ms: u64) -> Self {
        Self { time, uptime_ms }
    }

    /// Create new time reference from a UNIX timestamp
    pub fn from_timestamp(secs: i64, uptime_ms: u64) -> Result<Self, Error> {
        let time = DateTime::from_timestamp(secs, 0)
            .ok_or(Error::InvalidTime)?
            .naive_utc();
        Ok(Self { time, uptime_ms })
    }

    /// Create new time reference from Current Time Service data
    pub fn from_cts_bytes(bytes: &[u8], uptime_ms: u64) -> Result<Self, Error> {
        if bytes.len() < 9 {
            return Err(Error::Malformed);
        }
        let year = u16::from_le_bytes([bytes[0], bytes[1]]) as i32;
        let month = bytes[2] as u32;
        let day = bytes[3] as u32;
        let hour = bytes[4] as u32;
        let min = bytes[5] as u32;
        let sec = bytes[6] as u32;
        // bytes[7] is the day of week, derived from the date instead
        // Convert fractions_256 to milliseconds
        let milli = bytes[8] as u32 * 1000 / 256;

        let time = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_milli_opt(hour, min, sec, milli))
            .ok_or(Error::InvalidTime)?;

        Ok(Self { time, uptime_ms })
    }

    /// Clock time at `uptime_ms`
    pub fn at(&self, uptime_ms: u64) -> NaiveDateTime {
        let elapsed = uptime_ms.saturating_sub(self.uptime_ms);
        // Elapsed time is bounded by uptime, far below chrono's range
        self.time + Duration::milliseconds(elapsed as i64)
    }
}

/// Wall clock with a fixed offset from UTC.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    reference: TimeReference,
    utc_offset_secs: i32,
}

impl Clock {
    pub fn new(reference: TimeReference, utc_offset_secs: i32) -> Self {
        Self {
            reference,
            utc_offset_secs,
        }
    }

    /// Current UTC time
    pub fn utc(&self, uptime_ms: u64) -> NaiveDateTime {
        self.reference.at(uptime_ms)
    }

    /// Current local time
    pub fn local_time(&self, uptime_ms: u64) -> NaiveDateTime {
        self.utc(uptime_ms) + Duration::seconds(self.utc_offset_secs as i64)
    }

    /// Update time reference
    pub fn set_reference(&mut self, reference: TimeReference) {
        self.reference = reference;
    }
}

/// Derives minute ticks from a clock sampled more often than once a minute.
#[derive(Debug, Default)]
pub struct MinuteTicker {
    last: Option<NaiveDateTime>,
}

impl MinuteTicker {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Feed the current local time. Returns the units that changed when a new
    /// minute started since the previous sample.
    ///
    /// The first sample only primes the ticker.
    pub fn poll(&mut self, now: NaiveDateTime) -> Option<TimeUnits> {
        let now = truncate_to_minute(now);
        let last = self.last.replace(now)?;
        if now == last {
            return None;
        }

        let mut units = TimeUnits::MINUTE;
        if now.hour() != last.hour() || now.date() != last.date() {
            units |= TimeUnits::HOUR;
        }
        if now.date() != last.date() {
            units |= TimeUnits::DAY;
        }
        if now.month() != last.month() || now.year() != last.year() {
            units |= TimeUnits::MONTH;
        }
        if now.year() != last.year() {
            units |= TimeUnits::YEAR;
        }
        Some(units)
    }
}

fn truncate_to_minute(time: NaiveDateTime) -> NaiveDateTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}
