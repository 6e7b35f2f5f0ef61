use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    Json,
};
use serde_json::{json, Value};

use shared_database::RowStore;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::AppState;
use shared_utils::extractor::require_role;

use crate::services::{RolloverConfig, RolloverScheduler, SlotStore};

fn slot_store(store: &Arc<dyn RowStore>) -> SlotStore {
    SlotStore::new(Arc::clone(store))
}

pub async fn get_all_slots(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;

    let slots = slot_store(&state.store).list_all().await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({
        "slots": slots,
        "total": slots.len()
    })))
}

pub async fn get_slot(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let slot = slot_store(&state.store).get(slot_id).await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("Slot {} not found", slot_id)))?;

    Ok(Json(json!(slot)))
}

pub async fn get_slots_by_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let slots = slot_store(&state.store).list_by_doctor(doctor_id).await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({
        "slots": slots,
        "doctor_id": doctor_id,
        "total": slots.len()
    })))
}

pub async fn get_open_slots(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let slots = slot_store(&state.store).list_open().await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({
        "slots": slots,
        "total": slots.len()
    })))
}

/// Runs one rollover pass immediately.
pub async fn run_rollover(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;

    let scheduler = RolloverScheduler::new(
        slot_store(&state.store),
        RolloverConfig::from(state.config.as_ref()),
    );

    let report = scheduler.tick().await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(report)))
}
