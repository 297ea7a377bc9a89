use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};

pub const WEEKDAY_LABELS: [&str; 7] = ["Dom", "Lun", "Mar", "Mie", "Jue", "Vie", "Sab"];

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Midnight UTC of the first calendar day in a window of `window_days` days
/// ending today.
pub fn window_start(now: DateTime<Utc>, window_days: i64) -> DateTime<Utc> {
    let first_day = now.date_naive() - Duration::days(window_days.max(1) - 1);
    Utc.from_utc_datetime(&first_day.and_time(NaiveTime::MIN))
}

/// Seven buckets, oldest weekday first and today last. Timestamps inside the
/// window are counted by weekday, so windows longer than a week fold onto the
/// same seven labels. Empty days report zero.
pub fn bucket_by_weekday(
    now: DateTime<Utc>,
    timestamps: &[DateTime<Utc>],
    window_days: i64,
) -> Vec<(&'static str, usize)> {
    let start = window_start(now, window_days);
    let mut counts = [0usize; 7];
    for ts in timestamps.iter().filter(|ts| **ts >= start && **ts <= now) {
        counts[ts.weekday().num_days_from_sunday() as usize] += 1;
    }

    let today = now.date_naive();
    (0..7)
        .rev()
        .map(|offset| {
            let weekday = (today - Duration::days(offset)).weekday().num_days_from_sunday() as usize;
            (WEEKDAY_LABELS[weekday], counts[weekday])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn empty_window_still_has_seven_zero_buckets() {
        // 2026-10-19 is a Monday.
        let buckets = bucket_by_weekday(at(2026, 10, 19, 12), &[], 7);
        assert_eq!(buckets.len(), 7);
        assert!(buckets.iter().all(|(_, n)| *n == 0));
        assert_eq!(buckets.first().unwrap().0, "Mar");
        assert_eq!(buckets.last().unwrap().0, "Lun");
    }

    #[test]
    fn counts_by_calendar_day_and_drops_older_entries() {
        let now = at(2026, 10, 19, 12);
        let timestamps = [
            at(2026, 10, 19, 1),
            at(2026, 10, 19, 11),
            at(2026, 10, 13, 0), // first day of the window, Tuesday
            at(2026, 10, 12, 23), // previous Monday, outside
            at(2026, 10, 16, 9), // Friday
        ];
        let buckets = bucket_by_weekday(now, &timestamps, 7);
        let count = |label: &str| buckets.iter().find(|(l, _)| *l == label).unwrap().1;

        assert_eq!(count("Lun"), 2);
        assert_eq!(count("Mar"), 1);
        assert_eq!(count("Vie"), 1);
        assert_eq!(buckets.iter().map(|(_, n)| n).sum::<usize>(), 4);
    }

    #[test]
    fn longer_windows_fold_onto_weekdays() {
        let now = at(2026, 10, 19, 12);
        let mondays = [at(2026, 10, 19, 8), at(2026, 10, 12, 8), at(2026, 10, 5, 8)];
        let buckets = bucket_by_weekday(now, &mondays, 14);
        assert_eq!(buckets.last().unwrap(), &("Lun", 2));
        assert_eq!(window_start(now, 14), at(2026, 10, 6, 0));
    }
}
