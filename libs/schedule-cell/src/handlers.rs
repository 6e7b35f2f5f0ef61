use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    Json,
};
use serde_json::{json, Value};
use tracing::warn;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::AppState;
use shared_utils::extractor::require_role;

use crate::models::CreateWindowRequest;
use crate::services::ScheduleService;

fn ensure_owner_or_admin(user: &User, doctor_id: i64) -> Result<(), AppError> {
    if user.acts_for(Role::Doctor, doctor_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized to manage this doctor's schedule".to_string()))
    }
}

pub async fn create_window(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateWindowRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_owner_or_admin(&user, request.doctor_id)?;

    let service = ScheduleService::new(Arc::clone(&state.store));
    let created = service.create_window(request).await?;

    let failure_class = created.class();
    if failure_class.is_some() {
        warn!(
            "Schedule {} created with {} of {} slots",
            created.window.id, created.slots_created, created.slots_requested
        );
    }

    Ok(Json(json!({
        "schedule": created.window,
        "slots": created.slots,
        "slots_requested": created.slots_requested,
        "slots_created": created.slots_created,
        "partial": failure_class.is_some(),
        "failure_class": failure_class
    })))
}

pub async fn get_all_windows(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;

    let windows = ScheduleService::new(Arc::clone(&state.store)).list_all().await?;

    Ok(Json(json!({
        "schedules": windows,
        "total": windows.len()
    })))
}

pub async fn get_window(
    State(state): State<Arc<AppState>>,
    Path(schedule_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let window = ScheduleService::new(Arc::clone(&state.store)).get_window(schedule_id).await?;

    Ok(Json(json!(window)))
}

pub async fn get_windows_by_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let windows = ScheduleService::new(Arc::clone(&state.store)).list_by_doctor(doctor_id).await?;

    Ok(Json(json!({
        "schedules": windows,
        "doctor_id": doctor_id,
        "total": windows.len()
    })))
}

pub async fn delete_window(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(schedule_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(Arc::clone(&state.store));

    let window = service.get_window(schedule_id).await?;
    ensure_owner_or_admin(&user, window.doctor_id)?;

    service.delete_window(schedule_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Schedule deleted successfully"
    })))
}
