use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use shared_database::{Query, RowStore};
use slot_cell::models::{Slot, SlotStatus};
use slot_cell::services::SlotStore;

use crate::models::{Booking, BookingError, BookingStatus, NewBooking, BOOKINGS_TABLE};
use crate::services::payment::{PaymentGateway, PaymentRequest, SimulatedPayment};

pub(crate) fn parse_bookings(rows: Vec<Value>) -> Result<Vec<Booking>, BookingError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| BookingError::DatabaseError(format!("Failed to parse booking: {}", e)))
        })
        .collect()
}

pub struct BookingEngine {
    store: Arc<dyn RowStore>,
    slots: SlotStore,
    payments: Arc<dyn PaymentGateway>,
}

impl BookingEngine {
    pub fn new(store: Arc<dyn RowStore>, payments: Arc<dyn PaymentGateway>) -> Self {
        Self {
            slots: SlotStore::new(Arc::clone(&store)),
            store,
            payments,
        }
    }

    pub fn with_simulated_payment(store: Arc<dyn RowStore>) -> Self {
        Self::new(store, Arc::new(SimulatedPayment))
    }

    /// Holds the slot, charges the patient, then records the booking. Any
    /// failure after the hold puts the slot back to available before the error
    /// is returned.
    #[instrument(skip(self))]
    pub async fn book(&self, slot_id: i64, patient_id: i64) -> Result<Booking, BookingError> {
        let slot = self.slots.get(slot_id).await?
            .ok_or(BookingError::SlotUnavailable { slot_id, status: None })?;

        if slot.status != SlotStatus::Available {
            warn!("Slot {} is {}, refusing booking", slot_id, slot.status);
            return Err(BookingError::SlotUnavailable { slot_id, status: Some(slot.status) });
        }

        let held = self.slots
            .transition(slot_id, SlotStatus::Available, SlotStatus::Booked)
            .await
            .map_err(|e| BookingError::BookingFailed(e.to_string()))?;
        if !held {
            warn!("Slot {} was taken by a concurrent booking", slot_id);
            return Err(BookingError::SlotUnavailable { slot_id, status: Some(SlotStatus::Booked) });
        }
        debug!("Holding slot {} for patient {}", slot_id, patient_id);

        let payment = PaymentRequest {
            slot_id,
            doctor_id: slot.doctor_id,
            patient_id,
            amount: slot.fee,
        };
        let receipt = match self.payments.charge(&payment).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.release(slot_id).await;
                return Err(BookingError::PaymentFailed(e.to_string()));
            }
        };
        debug!("Payment {} accepted for slot {}", receipt.reference, slot_id);

        let booking = match self.insert_booking(&slot, patient_id).await {
            Ok(booking) => booking,
            Err(e) => {
                self.release(slot_id).await;
                return Err(BookingError::BookingPersistenceFailed(e.to_string()));
            }
        };

        info!("Booked slot {} for patient {} as booking {}", slot_id, patient_id, booking.id);
        Ok(booking)
    }

    async fn insert_booking(&self, slot: &Slot, patient_id: i64) -> anyhow::Result<Booking> {
        let row = serde_json::to_value(NewBooking {
            slot_id: slot.id,
            doctor_id: slot.doctor_id,
            patient_id,
            clinic_id: slot.clinic_id,
            appointment_time: slot.slot_time,
            appointment_date: slot.slot_date,
            fee: slot.fee,
            status: BookingStatus::Booked,
            updated_at: Utc::now(),
        })?;

        let created = self.store.insert_row(BOOKINGS_TABLE, row).await?;
        Ok(serde_json::from_value(created)?)
    }

    async fn release(&self, slot_id: i64) {
        match self.slots.transition(slot_id, SlotStatus::Booked, SlotStatus::Available).await {
            Ok(true) => info!("Released slot {} after failed booking", slot_id),
            Ok(false) => error!("Slot {} was no longer held when releasing it", slot_id),
            Err(e) => error!("Failed to release slot {}: {}", slot_id, e),
        }
    }

    pub async fn get(&self, booking_id: i64) -> Result<Booking, BookingError> {
        let query = Query::table(BOOKINGS_TABLE).eq("id", booking_id).limit(1);
        let rows = self.store.select_rows(&query).await?;

        parse_bookings(rows)?.into_iter().next().ok_or(BookingError::NotFound(booking_id))
    }

    pub async fn list_all(&self) -> Result<Vec<Booking>, BookingError> {
        let query = Query::table(BOOKINGS_TABLE).order_by_desc("updated_at");
        parse_bookings(self.store.select_rows(&query).await?)
    }

    pub async fn list_by_doctor(&self, doctor_id: i64) -> Result<Vec<Booking>, BookingError> {
        let query = Query::table(BOOKINGS_TABLE)
            .eq("doctor_id", doctor_id)
            .order_by_desc("updated_at");

        parse_bookings(self.store.select_rows(&query).await?)
    }

    pub async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<Booking>, BookingError> {
        let query = Query::table(BOOKINGS_TABLE)
            .eq("patient_id", patient_id)
            .order_by_desc("updated_at");

        parse_bookings(self.store.select_rows(&query).await?)
    }
}
