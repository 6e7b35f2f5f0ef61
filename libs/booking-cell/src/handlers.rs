use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::AppState;
use shared_utils::extractor::require_role;

use crate::models::Booking;
use crate::services::{BookingEngine, CancellationPolicy};

fn booking_engine(state: &AppState) -> BookingEngine {
    BookingEngine::with_simulated_payment(Arc::clone(&state.store))
}

fn can_cancel(user: &User, booking: &Booking) -> bool {
    user.acts_for(Role::Patient, booking.patient_id) || user.acts_for(Role::Doctor, booking.doctor_id)
}

/// Books a slot for the calling patient.
pub async fn book_slot(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Patient])?;

    let booking = booking_engine(&state).book(slot_id, user.id).await?;

    Ok(Json(json!({
        "booking": booking,
        "message": "Slot booked successfully"
    })))
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let booking = booking_engine(&state).get(booking_id).await?;
    if !can_cancel(&user, &booking) {
        return Err(AppError::Forbidden("Not authorized to cancel this booking".to_string()));
    }

    let policy = CancellationPolicy::from_config(Arc::clone(&state.store), &state.config);
    let outcome = policy.cancel(booking_id).await?;

    Ok(Json(json!({
        "success": true,
        "booking": outcome.booking,
        "slot_released": outcome.slot_released,
        "message": outcome.message
    })))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let booking = booking_engine(&state).get(booking_id).await?;

    Ok(Json(json!(booking)))
}

pub async fn get_all_bookings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;

    let bookings = booking_engine(&state).list_all().await?;

    Ok(Json(json!({
        "bookings": bookings,
        "total": bookings.len()
    })))
}

pub async fn get_bookings_by_doctor(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if !user.acts_for(Role::Doctor, doctor_id) {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let bookings = booking_engine(&state).list_by_doctor(doctor_id).await?;

    Ok(Json(json!({
        "bookings": bookings,
        "doctor_id": doctor_id,
        "total": bookings.len()
    })))
}

pub async fn get_bookings_by_patient(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if !user.acts_for(Role::Patient, patient_id) {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let bookings = booking_engine(&state).list_by_patient(patient_id).await?;

    Ok(Json(json!({
        "bookings": bookings,
        "patient_id": patient_id,
        "total": bookings.len()
    })))
}
