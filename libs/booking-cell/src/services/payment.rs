use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    pub slot_id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub reference: String,
    pub amount: i64,
}

/// Charges the requester for a slot. Called after the slot is held and before
/// the booking row exists; an error here releases the slot.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentReceipt>;
}

/// Accepts every charge.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedPayment;

#[async_trait]
impl PaymentGateway for SimulatedPayment {
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentReceipt> {
        debug!("Simulated charge of {} for slot {}", request.amount, request.slot_id);

        Ok(PaymentReceipt {
            reference: format!("sim-{}-{}", request.slot_id, request.patient_id),
            amount: request.amount,
        })
    }
}
