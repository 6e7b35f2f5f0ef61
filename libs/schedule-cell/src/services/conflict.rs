use chrono::NaiveTime;

use crate::calendar::Weekday;
use crate::models::AvailabilityWindow;

/// Closed-interval overlap test on `[a_start, a_end]` and `[b_start, b_end]`.
/// Windows that only touch at a boundary count as overlapping.
pub fn windows_overlap(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    let within = |t: NaiveTime, start: NaiveTime, end: NaiveTime| start <= t && t <= end;

    within(a_start, b_start, b_end)
        || within(a_end, b_start, b_end)
        || within(b_start, a_start, a_end)
        || within(b_end, a_start, a_end)
}

/// Whether a proposed window for `doctor_id` on `day` clashes with any of
/// `existing`. Windows of other doctors or other weekdays are ignored.
pub fn has_conflict(
    doctor_id: i64,
    start: NaiveTime,
    end: NaiveTime,
    day: Weekday,
    existing: &[AvailabilityWindow],
) -> bool {
    existing
        .iter()
        .filter(|w| w.doctor_id == doctor_id && w.day == day)
        .any(|w| windows_overlap(start, end, w.start_time, w.end_time))
}
