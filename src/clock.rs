//! Injected time source
//!
//! Due-date math depends on the caller's local day boundary, so every
//! operation takes an explicit clock instead of reading global time.

use chrono::{DateTime, FixedOffset, Local, NaiveTime, TimeZone};

/// Source of the caller's local "now", carrying its UTC offset.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// System wall clock in the local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock pinned to a single instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Latest representable instant of the calendar day containing `as_of`,
/// in `as_of`'s own offset (23:59:59.999999).
pub fn end_of_day(as_of: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let last = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).expect("valid time");
    as_of
        .offset()
        .from_local_datetime(&as_of.date_naive().and_time(last))
        .single()
        .expect("fixed offsets map local times uniquely")
}
