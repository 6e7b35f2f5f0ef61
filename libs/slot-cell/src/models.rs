use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use shared_models::time::hhmm;

pub const SLOTS_TABLE: &str = "slots_availability";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Booked,
    Cancelled,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Booked => "booked",
            SlotStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bookable time instance materialized from a weekly schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    pub id: i64,
    pub schedule_id: i64,
    pub doctor_id: i64,
    pub clinic_id: i64,
    #[serde(with = "hhmm")]
    pub slot_time: NaiveTime,
    pub slot_duration: i32,
    pub slot_date: NaiveDate,
    pub fee: i64,
    pub status: SlotStatus,
}

/// A slot row before the store has assigned it an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewSlot {
    pub schedule_id: i64,
    pub doctor_id: i64,
    pub clinic_id: i64,
    #[serde(with = "hhmm")]
    pub slot_time: NaiveTime,
    pub slot_duration: i32,
    pub slot_date: NaiveDate,
    pub fee: i64,
    pub status: SlotStatus,
}

/// Outcome of a non-transactional batch insert: rows that made it in and how
/// many did not. Already-inserted rows are never rolled back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchInsertReport {
    pub inserted: Vec<Slot>,
    pub failed: usize,
}

impl BatchInsertReport {
    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }

    pub fn requested(&self) -> usize {
        self.inserted.len() + self.failed
    }

    pub fn is_partial(&self) -> bool {
        self.failed > 0 && !self.inserted.is_empty()
    }
}
