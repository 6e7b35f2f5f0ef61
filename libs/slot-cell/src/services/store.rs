use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_database::{Query, RowStore};

use crate::models::{BatchInsertReport, NewSlot, Slot, SlotStatus, SLOTS_TABLE};

/// Persistence facade for slot rows. It never judges whether a status change
/// is legal; callers own the state machine.
#[derive(Clone)]
pub struct SlotStore {
    store: Arc<dyn RowStore>,
}

fn parse_slots(rows: Vec<Value>) -> Result<Vec<Slot>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| anyhow!("Failed to parse slot: {}", e)))
        .collect()
}

impl SlotStore {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// Inserts slots one row at a time. A failed row is logged and counted;
    /// rows inserted before it stay.
    pub async fn insert_batch(&self, slots: Vec<NewSlot>) -> BatchInsertReport {
        debug!("Inserting batch of {} slots", slots.len());
        let mut report = BatchInsertReport::default();

        for slot in slots {
            let stored = match serde_json::to_value(&slot) {
                Ok(row) => self.store.insert_row(SLOTS_TABLE, row).await,
                Err(e) => Err(e.into()),
            };

            match stored.and_then(|row| Ok(serde_json::from_value::<Slot>(row)?)) {
                Ok(slot) => report.inserted.push(slot),
                Err(e) => {
                    warn!("Failed to insert slot at {} on {}: {}", slot.slot_time, slot.slot_date, e);
                    report.failed += 1;
                }
            }
        }

        if report.failed > 0 {
            warn!("Slot batch incomplete: {} of {} inserted", report.inserted_count(), report.requested());
        }

        report
    }

    /// Unconditional status write. Returns whether a row was updated.
    pub async fn update_status(&self, slot_id: i64, status: SlotStatus) -> Result<bool> {
        debug!("Setting slot {} to {}", slot_id, status);

        let query = Query::table(SLOTS_TABLE).eq("id", slot_id);
        let updated = self.store.update_rows(&query, json!({ "status": status })).await?;

        Ok(!updated.is_empty())
    }

    /// Moves a slot from `from` to `to` only if it is still in `from`. Exactly
    /// one of any number of concurrent callers sees `true`.
    pub async fn transition(&self, slot_id: i64, from: SlotStatus, to: SlotStatus) -> Result<bool> {
        debug!("Transitioning slot {} from {} to {}", slot_id, from, to);

        let query = Query::table(SLOTS_TABLE)
            .eq("id", slot_id)
            .eq("status", from.as_str());
        let updated = self.store.update_rows(&query, json!({ "status": to })).await?;

        Ok(!updated.is_empty())
    }

    pub async fn get(&self, slot_id: i64) -> Result<Option<Slot>> {
        let query = Query::table(SLOTS_TABLE).eq("id", slot_id).limit(1);
        let rows = self.store.select_rows(&query).await?;

        Ok(parse_slots(rows)?.into_iter().next())
    }

    pub async fn list_all(&self) -> Result<Vec<Slot>> {
        let query = Query::table(SLOTS_TABLE)
            .order_by("slot_date")
            .order_by("slot_time");

        parse_slots(self.store.select_rows(&query).await?)
    }

    pub async fn list_by_doctor(&self, doctor_id: i64) -> Result<Vec<Slot>> {
        let query = Query::table(SLOTS_TABLE)
            .eq("doctor_id", doctor_id)
            .order_by("slot_date")
            .order_by("slot_time");

        parse_slots(self.store.select_rows(&query).await?)
    }

    pub async fn list_by_schedule(&self, schedule_id: i64) -> Result<Vec<Slot>> {
        let query = Query::table(SLOTS_TABLE)
            .eq("schedule_id", schedule_id)
            .order_by("slot_date")
            .order_by("slot_time");

        parse_slots(self.store.select_rows(&query).await?)
    }

    /// Slots whose status is available or cancelled.
    pub async fn list_open(&self) -> Result<Vec<Slot>> {
        let query = Query::table(SLOTS_TABLE)
            .in_list("status", [SlotStatus::Available.as_str(), SlotStatus::Cancelled.as_str()])
            .order_by("slot_date")
            .order_by("slot_time");

        parse_slots(self.store.select_rows(&query).await?)
    }

    /// Re-dates every slot on `from` to `to` and reopens it, whatever its
    /// current status. Returns the number of slots moved.
    pub async fn reopen_on_date(&self, from: NaiveDate, to: NaiveDate) -> Result<usize> {
        debug!("Reopening slots dated {} as {}", from, to);

        let query = Query::table(SLOTS_TABLE).eq("slot_date", from.to_string());
        let updated = self.store.update_rows(&query, json!({
            "slot_date": to,
            "status": SlotStatus::Available,
        })).await?;

        Ok(updated.len())
    }
}
