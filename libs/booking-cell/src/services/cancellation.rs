use std::sync::Arc;

use chrono::{Duration, Local, NaiveDateTime, Utc};
use serde_json::json;
use tracing::{info, instrument, warn};

use shared_config::{AppConfig, MAX_CANCELLATION_NOTICE_MINUTES};
use shared_database::{Query, RowStore};
use slot_cell::models::SlotStatus;
use slot_cell::services::SlotStore;

use crate::models::{BookingError, BookingStatus, CancellationOutcome, BOOKINGS_TABLE};
use crate::services::booking::parse_bookings;

pub struct CancellationPolicy {
    store: Arc<dyn RowStore>,
    slots: SlotStore,
    notice: Duration,
}

/// Rejects cancelling an appointment that has already started, or one later
/// today that is less than `notice` away. Appointments on a later date are
/// always cancellable.
pub fn check_notice(appointment: NaiveDateTime, now: NaiveDateTime, notice: Duration) -> Result<(), String> {
    if now > appointment {
        return Err("Appointment time has already passed".to_string());
    }

    // A notice reaching past the earliest representable time covers the whole day.
    let too_late = match appointment.checked_sub_signed(notice) {
        Some(deadline) => now > deadline,
        None => true,
    };
    if appointment.date() == now.date() && too_late {
        return Err(format!(
            "Appointments today can only be cancelled at least {} before they start",
            describe(notice)
        ));
    }

    Ok(())
}

fn describe(notice: Duration) -> String {
    let minutes = notice.num_minutes();
    match minutes {
        60 => "1 hour".to_string(),
        m if m % 60 == 0 => format!("{} hours", m / 60),
        m => format!("{} minutes", m),
    }
}

impl CancellationPolicy {
    pub fn new(store: Arc<dyn RowStore>, notice: Duration) -> Self {
        Self {
            slots: SlotStore::new(Arc::clone(&store)),
            store,
            notice,
        }
    }

    pub fn from_config(store: Arc<dyn RowStore>, config: &AppConfig) -> Self {
        let minutes = config.cancellation_notice_minutes.clamp(0, MAX_CANCELLATION_NOTICE_MINUTES);
        Self::new(store, Duration::minutes(minutes))
    }

    pub async fn cancel(&self, booking_id: i64) -> Result<CancellationOutcome, BookingError> {
        self.cancel_at(booking_id, Local::now().naive_local()).await
    }

    /// Cancels an active booking as of `now`, then marks its slot cancelled.
    /// A failed slot update leaves the booking cancelled and is reported in
    /// the outcome rather than as an error.
    #[instrument(skip(self))]
    pub async fn cancel_at(&self, booking_id: i64, now: NaiveDateTime) -> Result<CancellationOutcome, BookingError> {
        let active = Query::table(BOOKINGS_TABLE)
            .eq("id", booking_id)
            .eq("status", BookingStatus::Booked.as_str());

        let booking = parse_bookings(self.store.select_rows(&active).await?)?
            .into_iter()
            .next()
            .ok_or(BookingError::NotFound(booking_id))?;

        if let Err(reason) = check_notice(booking.appointment_at(), now, self.notice) {
            warn!("Refusing to cancel booking {}: {}", booking_id, reason);
            return Err(BookingError::TooLate(reason));
        }

        let updated = self.store.update_rows(&active, json!({
            "status": BookingStatus::Cancelled,
            "updated_at": Utc::now(),
        })).await?;
        let booking = parse_bookings(updated)?
            .into_iter()
            .next()
            .ok_or(BookingError::NotFound(booking_id))?;
        info!("Cancelled booking {}", booking_id);

        let slot_released = match self.slots.update_status(booking.slot_id, SlotStatus::Cancelled).await {
            Ok(true) => true,
            Ok(false) => {
                warn!("Slot {} for cancelled booking {} no longer exists", booking.slot_id, booking_id);
                false
            }
            Err(e) => {
                warn!("Booking {} cancelled but slot {} was not updated: {}", booking_id, booking.slot_id, e);
                false
            }
        };

        let message = if slot_released {
            "Booking cancelled successfully".to_string()
        } else {
            "Booking cancelled; the slot could not be updated".to_string()
        };

        Ok(CancellationOutcome { booking, slot_released, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn two_hours() -> Duration {
        Duration::hours(2)
    }

    #[test]
    fn later_today_with_enough_notice_is_allowed() {
        assert!(check_notice(at(20, 16, 0), at(20, 13, 0), two_hours()).is_ok());
    }

    #[test]
    fn exactly_the_notice_period_is_allowed() {
        assert!(check_notice(at(20, 16, 0), at(20, 14, 0), two_hours()).is_ok());
    }

    #[test]
    fn inside_the_notice_period_is_rejected() {
        let reason = check_notice(at(20, 16, 0), at(20, 14, 1), two_hours()).unwrap_err();
        assert!(reason.contains("2 hours"));
    }

    #[test]
    fn elapsed_appointment_is_rejected() {
        let reason = check_notice(at(20, 16, 0), at(20, 16, 1), two_hours()).unwrap_err();
        assert!(reason.contains("already passed"));

        assert!(check_notice(at(19, 16, 0), at(20, 9, 0), two_hours()).is_err());
    }

    #[test]
    fn notice_only_applies_on_the_same_calendar_day() {
        // Half an hour away, but across midnight.
        assert!(check_notice(at(21, 0, 15), at(20, 23, 45), two_hours()).is_ok());
    }

    #[test]
    fn zero_notice_allows_cancelling_up_to_the_start() {
        assert!(check_notice(at(20, 16, 0), at(20, 16, 0), Duration::zero()).is_ok());
    }

    #[test]
    fn oversized_notice_rejects_same_day_without_overflow() {
        let huge = Duration::days(280_000 * 365);

        assert!(check_notice(at(20, 16, 0), at(20, 9, 0), huge).is_err());
        assert!(check_notice(at(21, 9, 0), at(20, 9, 0), huge).is_ok());
    }

    #[test]
    fn describes_notice_in_readable_units() {
        assert_eq!(describe(Duration::minutes(60)), "1 hour");
        assert_eq!(describe(Duration::minutes(120)), "2 hours");
        assert_eq!(describe(Duration::minutes(90)), "90 minutes");
    }
}
