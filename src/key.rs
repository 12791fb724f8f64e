// 🔑 Match keys - equality class for the exact-match phase
//
// Format: "YYYY-MM-DD HH:MM-<signed minor units>"

use crate::money::Money;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub const KEY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Build the exact-match key for a (timestamp, signed amount) pair.
///
/// Seconds are dropped: two records share a key iff they fall in the same
/// calendar minute and carry the same signed amount.
pub fn match_key(timestamp: NaiveDateTime, amount: Money) -> String {
    format!("{}-{}", timestamp.format(KEY_TIME_FORMAT), amount.minor())
}

/// Key for a record that only carries a calendar date (midnight)
pub fn day_key(date: NaiveDate, amount: Money) -> String {
    match_key(date.and_time(NaiveTime::default()), amount)
}
