//! Pure wall-clock computations for job alignment and match targets.

use std::time::Duration;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use jubilee_core::MonthDay;

/// Duration from `now` until the next local midnight. The daily jobs sleep
/// this long once, then tick on a fixed 24h interval.
pub fn until_next_midnight(now: NaiveDateTime) -> Duration {
    let next_day = now
        .date()
        .checked_add_days(Days::new(1))
        .unwrap_or_else(|| now.date());
    let midnight = next_day.and_time(NaiveTime::MIN);
    (midnight - now).to_std().unwrap_or(Duration::ZERO)
}

/// Month+day target for the same-day job.
pub fn target_today(today: NaiveDate) -> MonthDay {
    MonthDay::of(today)
}

/// Month+day target for the next-day job. Date arithmetic handles
/// month and year boundaries (Dec 31 → Jan 1).
pub fn target_tomorrow(today: NaiveDate) -> MonthDay {
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    MonthDay::of(tomorrow)
}
