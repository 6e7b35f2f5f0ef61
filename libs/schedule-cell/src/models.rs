use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::{AppError, FailureClass};
use shared_models::time::hhmm;
use slot_cell::models::Slot;

use crate::calendar::Weekday;

pub const SCHEDULES_TABLE: &str = "doctor_schedule";

/// A weekly availability window for one doctor at one clinic on one weekday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityWindow {
    pub id: i64,
    pub doctor_id: i64,
    pub clinic_id: i64,
    pub day: Weekday,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub consultation_duration: i32,
    pub fee: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateWindowRequest {
    pub doctor_id: i64,
    pub clinic_id: i64,
    pub day: Weekday,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub consultation_duration: i32,
    pub fee: i64,
}

impl CreateWindowRequest {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.start_time >= self.end_time {
            return Err(ScheduleError::ValidationError("Start time must be earlier than end time".to_string()));
        }
        if self.consultation_duration <= 0 {
            return Err(ScheduleError::ValidationError("Consultation duration must be a positive number of minutes".to_string()));
        }
        if self.fee < 0 {
            return Err(ScheduleError::ValidationError("Fee cannot be negative".to_string()));
        }
        Ok(())
    }
}

/// A newly created window together with the slots materialized from it.
#[derive(Debug, Clone, Serialize)]
pub struct WindowCreated {
    pub window: AvailabilityWindow,
    pub slots: Vec<Slot>,
    pub slots_requested: usize,
    pub slots_created: usize,
}

impl WindowCreated {
    pub fn is_partial(&self) -> bool {
        self.slots_created < self.slots_requested
    }

    /// `PartialBatchFailure` when some of the window's slots were not stored.
    pub fn class(&self) -> Option<FailureClass> {
        self.is_partial().then_some(FailureClass::PartialBatchFailure)
    }
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Schedule not found")]
    NotFound,

    #[error("Schedule conflict detected with an existing {0} window. Please adjust your times.")]
    Conflict(Weekday),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl ScheduleError {
    pub fn class(&self) -> FailureClass {
        match self {
            ScheduleError::NotFound | ScheduleError::ValidationError(_) | ScheduleError::Conflict(_) => {
                FailureClass::ValidationRejection
            }
            ScheduleError::DatabaseError(_) => FailureClass::TransientPersistenceFailure,
        }
    }
}

impl From<anyhow::Error> for ScheduleError {
    fn from(e: anyhow::Error) -> Self {
        ScheduleError::DatabaseError(e.to_string())
    }
}

impl From<ScheduleError> for AppError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::NotFound => AppError::NotFound(e.to_string()),
            ScheduleError::Conflict(_) => AppError::Conflict(e.to_string()),
            ScheduleError::ValidationError(msg) => AppError::ValidationError(msg),
            ScheduleError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
