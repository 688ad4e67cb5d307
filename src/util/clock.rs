//! Millisecond clock helpers. Persistent timestamps are unix milliseconds.

use time::OffsetDateTime;

/// Current wall-clock time in unix milliseconds.
pub fn now_millis() -> i64 {
    to_millis(OffsetDateTime::now_utc())
}

pub fn to_millis(value: OffsetDateTime) -> i64 {
    (value.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Timestamp for a row last written at `prior`: `now`, or one past `prior`
/// when the clock has not moved forward since.
pub fn next_update(prior: i64, now: i64) -> i64 {
    now.max(prior.saturating_add(1))
}

/// Out-of-range values collapse to the unix epoch.
pub fn datetime_from_millis(millis: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_round_trip() {
        let millis = 1_712_345_678_901;
        assert_eq!(to_millis(datetime_from_millis(millis)), millis);
    }

    #[test]
    fn updates_always_move_forward() {
        assert_eq!(next_update(100, 250), 250);
        assert_eq!(next_update(100, 100), 101);
        assert_eq!(next_update(100, 40), 101);
    }

    #[test]
    fn out_of_range_falls_back_to_epoch() {
        assert_eq!(datetime_from_millis(i64::MAX), OffsetDateTime::UNIX_EPOCH);
    }
}
