use std::sync::Arc;

use anyhow::anyhow;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info, warn};

use shared_database::{Query, RowStore};
use slot_cell::services::SlotStore;

use crate::calendar::Weekday;
use crate::models::{
    AvailabilityWindow, CreateWindowRequest, ScheduleError, WindowCreated, SCHEDULES_TABLE,
};
use crate::services::conflict::has_conflict;
use crate::services::generator::SlotGenerator;

pub struct ScheduleService {
    store: Arc<dyn RowStore>,
    generator: SlotGenerator,
}

fn parse_windows(rows: Vec<Value>) -> Result<Vec<AvailabilityWindow>, ScheduleError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| ScheduleError::DatabaseError(format!("Failed to parse schedule: {}", e)))
        })
        .collect()
}

impl ScheduleService {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        let generator = SlotGenerator::new(SlotStore::new(Arc::clone(&store)));
        Self { store, generator }
    }

    pub async fn create_window(&self, request: CreateWindowRequest) -> Result<WindowCreated, ScheduleError> {
        self.create_window_on(request, chrono::Local::now().date_naive()).await
    }

    /// Validates the window, rejects it if it clashes with one of the doctor's
    /// windows on the same weekday, persists it, then materializes its slots
    /// for the next occurrence of that weekday on or after `today`.
    pub async fn create_window_on(
        &self,
        request: CreateWindowRequest,
        today: NaiveDate,
    ) -> Result<WindowCreated, ScheduleError> {
        debug!("Creating {} window for doctor {}", request.day, request.doctor_id);
        request.validate()?;

        let existing = self.list_for_day(request.doctor_id, request.day).await?;
        if has_conflict(request.doctor_id, request.start_time, request.end_time, request.day, &existing) {
            warn!(
                "Rejected {} {}-{} window for doctor {}: overlaps an existing window",
                request.day, request.start_time, request.end_time, request.doctor_id
            );
            return Err(ScheduleError::Conflict(request.day));
        }

        let row = serde_json::to_value(&request).map_err(|e| anyhow!(e))?;
        let created = self.store.insert_row(SCHEDULES_TABLE, row).await?;
        let window: AvailabilityWindow = serde_json::from_value(created)
            .map_err(|e| ScheduleError::DatabaseError(format!("Failed to parse schedule: {}", e)))?;
        info!("Created schedule {} for doctor {}", window.id, window.doctor_id);

        let report = self.generator.generate_on(&window, today).await;

        Ok(WindowCreated {
            window,
            slots_requested: report.requested,
            slots_created: report.inserted,
            slots: report.slots,
        })
    }

    async fn list_for_day(
        &self,
        doctor_id: i64,
        day: Weekday,
    ) -> Result<Vec<AvailabilityWindow>, ScheduleError> {
        let query = Query::table(SCHEDULES_TABLE)
            .eq("doctor_id", doctor_id)
            .eq("day", day.as_str());

        parse_windows(self.store.select_rows(&query).await?)
    }

    pub async fn get_window(&self, window_id: i64) -> Result<AvailabilityWindow, ScheduleError> {
        let query = Query::table(SCHEDULES_TABLE).eq("id", window_id).limit(1);
        let rows = self.store.select_rows(&query).await?;

        parse_windows(rows)?.into_iter().next().ok_or(ScheduleError::NotFound)
    }

    pub async fn list_all(&self) -> Result<Vec<AvailabilityWindow>, ScheduleError> {
        let query = Query::table(SCHEDULES_TABLE)
            .order_by("doctor_id")
            .order_by("day")
            .order_by("start_time");

        parse_windows(self.store.select_rows(&query).await?)
    }

    pub async fn list_by_doctor(&self, doctor_id: i64) -> Result<Vec<AvailabilityWindow>, ScheduleError> {
        let query = Query::table(SCHEDULES_TABLE)
            .eq("doctor_id", doctor_id)
            .order_by("day")
            .order_by("start_time");

        parse_windows(self.store.select_rows(&query).await?)
    }

    /// Removes the window only. Slots already generated from it are left alone.
    pub async fn delete_window(&self, window_id: i64) -> Result<(), ScheduleError> {
        debug!("Deleting schedule {}", window_id);

        let query = Query::table(SCHEDULES_TABLE).eq("id", window_id);
        let deleted = self.store.delete_rows(&query).await?;
        if deleted == 0 {
            return Err(ScheduleError::NotFound);
        }

        info!("Deleted schedule {}", window_id);
        Ok(())
    }
}
