use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::{AppError, FailureClass};
use shared_models::time::hhmm;
use slot_cell::models::SlotStatus;

pub const BOOKINGS_TABLE: &str = "booked_appointment_slots";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Booked,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "booked",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub slot_id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub clinic_id: i64,
    #[serde(with = "hhmm")]
    pub appointment_time: NaiveTime,
    pub appointment_date: NaiveDate,
    pub fee: i64,
    pub status: BookingStatus,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn appointment_at(&self) -> NaiveDateTime {
        self.appointment_date.and_time(self.appointment_time)
    }

    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Booked
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewBooking {
    pub slot_id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub clinic_id: i64,
    #[serde(with = "hhmm")]
    pub appointment_time: NaiveTime,
    pub appointment_date: NaiveDate,
    pub fee: i64,
    pub status: BookingStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationOutcome {
    pub booking: Booking,
    /// False when the booking was cancelled but its slot could not be updated.
    pub slot_released: bool,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Slot {slot_id} is not available for booking")]
    SlotUnavailable {
        slot_id: i64,
        /// `None` when the slot does not exist.
        status: Option<SlotStatus>,
    },

    #[error("Booking failed: {0}")]
    BookingFailed(String),

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Booking could not be saved: {0}")]
    BookingPersistenceFailed(String),

    #[error("No active booking {0}")]
    NotFound(i64),

    #[error("{0}")]
    TooLate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl BookingError {
    pub fn class(&self) -> FailureClass {
        match self {
            BookingError::SlotUnavailable { status: None, .. } => FailureClass::ValidationRejection,
            BookingError::SlotUnavailable { status: Some(_), .. } => FailureClass::StateConflict,
            BookingError::NotFound(_) => FailureClass::ValidationRejection,
            BookingError::TooLate(_) => FailureClass::StateConflict,
            BookingError::PaymentFailed(_) => FailureClass::ValidationRejection,
            BookingError::BookingFailed(_)
            | BookingError::BookingPersistenceFailed(_)
            | BookingError::DatabaseError(_) => FailureClass::TransientPersistenceFailure,
        }
    }
}

impl From<anyhow::Error> for BookingError {
    fn from(e: anyhow::Error) -> Self {
        BookingError::DatabaseError(e.to_string())
    }
}

impl From<BookingError> for AppError {
    fn from(e: BookingError) -> Self {
        let message = e.to_string();
        match e {
            BookingError::SlotUnavailable { status: None, .. } => AppError::NotFound(message),
            BookingError::SlotUnavailable { .. } => AppError::Conflict(message),
            BookingError::NotFound(_) => AppError::NotFound(message),
            BookingError::TooLate(_) => AppError::Conflict(message),
            BookingError::PaymentFailed(_) => AppError::ExternalService(message),
            BookingError::BookingFailed(_)
            | BookingError::BookingPersistenceFailed(_)
            | BookingError::DatabaseError(_) => AppError::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_taken_slots_classify_differently() {
        let missing = BookingError::SlotUnavailable { slot_id: 1, status: None };
        let taken = BookingError::SlotUnavailable { slot_id: 1, status: Some(SlotStatus::Booked) };

        assert_eq!(missing.class(), FailureClass::ValidationRejection);
        assert_eq!(taken.class(), FailureClass::StateConflict);
        assert!(matches!(AppError::from(missing), AppError::NotFound(_)));
        assert!(matches!(AppError::from(taken), AppError::Conflict(_)));
    }

    #[test]
    fn write_failures_are_transient() {
        for e in [
            BookingError::BookingFailed("x".into()),
            BookingError::BookingPersistenceFailed("x".into()),
            BookingError::DatabaseError("x".into()),
        ] {
            assert_eq!(e.class(), FailureClass::TransientPersistenceFailure);
        }
    }

    #[test]
    fn booking_row_uses_store_column_names() {
        let booking: Booking = serde_json::from_value(serde_json::json!({
            "id": 1,
            "slot_id": 4,
            "doctor_id": 3,
            "patient_id": 7,
            "clinic_id": 1,
            "appointment_time": "16:00:00",
            "appointment_date": "2026-10-20",
            "fee": 500,
            "status": "booked",
            "updated_at": "2026-10-16T09:00:00Z"
        }))
        .unwrap();

        assert!(booking.is_active());
        assert_eq!(booking.appointment_at().to_string(), "2026-10-20 16:00:00");
    }
}
