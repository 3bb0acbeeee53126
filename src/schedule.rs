//! Installment date arithmetic.
//!
//! Month and year stepping follow plain calendar normalization: a day-of-month
//! that does not exist in the target month rolls forward into the next month
//! (Jan 31 + 1 month lands on Mar 2 or Mar 3). It is not clamped to month end.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

use crate::types::Cadence;

const HOURS_PER_WEEK: i64 = 24 * 7;

/// whole calendar months between two instants, endpoints swapped if reversed
pub fn months_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let (start, end) = if end < start { (end, start) } else { (start, end) };

    let years = i64::from(end.year() - start.year());
    let mut months = i64::from(end.month()) - i64::from(start.month());
    if end.day() < start.day() {
        months -= 1;
    }
    years * 12 + months
}

/// number of whole periods elapsed between `created` and `now`
pub fn elapsed_periods(created: DateTime<Utc>, now: DateTime<Utc>, cadence: Cadence) -> i64 {
    match cadence {
        Cadence::Monthly => months_between(created, now),
        Cadence::Yearly => months_between(created, now) / 12,
        Cadence::Weekly => (now - created).num_hours().abs() / HOURS_PER_WEEK,
    }
}

/// installments due but unpaid as of `now`
///
/// Period zero (the creation instant) already counts as one obligation, so a
/// fresh loan with no repayments has one missed period. Negative when the
/// borrower has paid ahead.
pub fn missed_periods(
    created: DateTime<Utc>,
    now: DateTime<Utc>,
    paid_count: u32,
    cadence: Cadence,
) -> i64 {
    elapsed_periods(created, now, cadence) + 1 - i64::from(paid_count)
}

/// `anchor` advanced by `periods` cadence steps
pub fn add_periods(anchor: DateTime<Utc>, periods: u32, cadence: Cadence) -> Option<DateTime<Utc>> {
    match cadence {
        Cadence::Monthly => add_months(anchor, i64::from(periods)),
        Cadence::Yearly => add_months(anchor, i64::from(periods) * 12),
        Cadence::Weekly => anchor.checked_add_signed(Duration::weeks(i64::from(periods))),
    }
}

fn add_months(anchor: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let date = anchor.date_naive();
    let total = i64::from(date.year()) * 12 + i64::from(date.month0()) + months;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;

    // overflowing day-of-month rolls into the following month
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let shifted = first.checked_add_signed(Duration::days(i64::from(date.day()) - 1))?;

    Some(Utc.from_utc_datetime(&shifted.and_time(anchor.time())))
}
