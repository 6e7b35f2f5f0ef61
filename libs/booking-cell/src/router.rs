use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_utils::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn booking_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::get_all_bookings))
        .route("/slots/{slot_id}", post(handlers::book_slot))
        .route("/doctors/{doctor_id}", get(handlers::get_bookings_by_doctor))
        .route("/patients/{patient_id}", get(handlers::get_bookings_by_patient))
        .route("/{booking_id}", get(handlers::get_booking))
        .route("/{booking_id}/cancel", post(handlers::cancel_booking).patch(handlers::cancel_booking))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
