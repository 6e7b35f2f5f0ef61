use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::{info, instrument, warn};

use slot_cell::models::{NewSlot, Slot, SlotStatus};
use slot_cell::services::SlotStore;

use crate::calendar::{minutes_since_midnight, next_occurrence, time_from_minutes};
use crate::models::AvailabilityWindow;

/// Start times from `start` in steps of `duration_minutes`, up to and
/// including `end`. The last slot may start exactly at `end`.
pub fn slot_times(start: NaiveTime, end: NaiveTime, duration_minutes: i32) -> Vec<NaiveTime> {
    let Ok(step) = u32::try_from(duration_minutes) else {
        return Vec::new();
    };
    if step == 0 {
        return Vec::new();
    }

    let end_minutes = minutes_since_midnight(end);
    let mut current = minutes_since_midnight(start);
    let mut times = Vec::new();

    while current <= end_minutes {
        match time_from_minutes(current) {
            Some(time) => times.push(time),
            None => break,
        }
        current += step;
    }

    times
}

/// The slot rows a window produces on `date`, ordered by start time.
pub fn build_slots(window: &AvailabilityWindow, date: NaiveDate) -> Vec<NewSlot> {
    slot_times(window.start_time, window.end_time, window.consultation_duration)
        .into_iter()
        .map(|slot_time| NewSlot {
            schedule_id: window.id,
            doctor_id: window.doctor_id,
            clinic_id: window.clinic_id,
            slot_time,
            slot_duration: window.consultation_duration,
            slot_date: date,
            fee: window.fee,
            status: SlotStatus::Available,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub slot_date: NaiveDate,
    pub requested: usize,
    pub inserted: usize,
    pub slots: Vec<Slot>,
}

pub struct SlotGenerator {
    slots: SlotStore,
}

impl SlotGenerator {
    pub fn new(slots: SlotStore) -> Self {
        Self { slots }
    }

    /// Materializes the window for the next occurrence of its weekday on or
    /// after `today`. Rows inserted before a failure are kept.
    #[instrument(skip(self, window), fields(schedule_id = window.id, day = %window.day))]
    pub async fn generate_on(&self, window: &AvailabilityWindow, today: NaiveDate) -> GenerationReport {
        let slot_date = next_occurrence(today, window.day);
        let slots = build_slots(window, slot_date);
        let requested = slots.len();

        let batch = self.slots.insert_batch(slots).await;

        if batch.inserted_count() < requested {
            warn!(
                "Generated {} of {} slots for schedule {} on {}",
                batch.inserted_count(), requested, window.id, slot_date
            );
        } else {
            info!("Generated {} slots for schedule {} on {}", requested, window.id, slot_date);
        }

        GenerationReport {
            slot_date,
            requested,
            inserted: batch.inserted_count(),
            slots: batch.inserted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Weekday;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn end_boundary_is_inclusive() {
        let times = slot_times(t(16, 0), t(21, 0), 15);

        assert_eq!(times.len(), 21);
        assert_eq!(times.first(), Some(&t(16, 0)));
        assert_eq!(times.last(), Some(&t(21, 0)));
    }

    #[test]
    fn last_start_stays_at_or_before_end() {
        let times = slot_times(t(9, 0), t(10, 0), 25);
        assert_eq!(times, vec![t(9, 0), t(9, 25), t(9, 50)]);
    }

    #[test]
    fn duration_longer_than_window_yields_only_start() {
        assert_eq!(slot_times(t(9, 0), t(9, 30), 60), vec![t(9, 0)]);
    }

    #[test]
    fn non_positive_duration_yields_nothing() {
        assert!(slot_times(t(9, 0), t(10, 0), 0).is_empty());
        assert!(slot_times(t(9, 0), t(10, 0), -15).is_empty());
    }

    #[test]
    fn late_window_does_not_wrap_past_midnight() {
        let times = slot_times(t(23, 0), t(23, 59), 30);
        assert_eq!(times, vec![t(23, 0), t(23, 30)]);
    }

    #[test]
    fn sequence_is_strictly_increasing_with_fixed_step() {
        for duration in [5, 10, 15, 20, 30, 45, 60, 90] {
            let times = slot_times(t(8, 0), t(18, 0), duration);

            assert!(!times.is_empty());
            for pair in times.windows(2) {
                assert_eq!(minutes_since_midnight(pair[1]) - minutes_since_midnight(pair[0]), duration as u32);
            }
            assert!(times.iter().all(|time| *time >= t(8, 0) && *time <= t(18, 0)));
        }
    }

    #[test]
    fn built_slots_inherit_window_fields() {
        let window = AvailabilityWindow {
            id: 11,
            doctor_id: 3,
            clinic_id: 2,
            day: Weekday::Tuesday,
            start_time: t(16, 0),
            end_time: t(17, 0),
            consultation_duration: 30,
            fee: 500,
        };
        let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();

        let slots = build_slots(&window, date);

        assert_eq!(slots.len(), 3);
        for slot in &slots {
            assert_eq!(slot.schedule_id, 11);
            assert_eq!(slot.doctor_id, 3);
            assert_eq!(slot.clinic_id, 2);
            assert_eq!(slot.slot_duration, 30);
            assert_eq!(slot.fee, 500);
            assert_eq!(slot.slot_date, date);
            assert_eq!(slot.status, SlotStatus::Available);
        }
    }
}
