use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, header, query_param};

use shared_config::{AppConfig, DatabaseBackend, default_rollover_run_at};
use shared_database::{Query, RowStore, SupabaseClient};

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        database_backend: DatabaseBackend::Supabase,
        supabase_url: server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_service_role_key: "test-service-key".to_string(),
        jwt_secret: "test-secret".to_string(),
        server_port: 3000,
        rollover_run_at: default_rollover_run_at(),
        cancellation_notice_minutes: 120,
    }
}

#[tokio::test]
async fn select_sends_filters_as_query_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/slots_availability"))
        .and(query_param("doctor_id", "eq.3"))
        .and(query_param("status", "in.(available,cancelled)"))
        .and(query_param("order", "slot_date.asc"))
        .and(header("apikey", "test-anon-key"))
        .and(header("authorization", "Bearer test-service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "doctor_id": 3, "status": "available"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let query = Query::table("slots_availability")
        .eq("doctor_id", 3)
        .in_list("status", ["available", "cancelled"])
        .order_by("slot_date");

    let rows = client.select_rows(&query).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["doctor_id"], 3);
}

#[tokio::test]
async fn conditional_patch_returns_no_rows_when_filter_misses() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots_availability"))
        .and(query_param("id", "eq.9"))
        .and(query_param("status", "eq.available"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let claim = Query::table("slots_availability").eq("id", 9).eq("status", "available");

    let updated = client.update_rows(&claim, json!({"status": "booked"})).await.unwrap();

    assert!(updated.is_empty());
}

#[tokio::test]
async fn insert_returns_stored_representation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_schedule"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": 6, "doctor_id": 3, "day": "Tuesday"}
        ])))
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let stored = client.insert_row("doctor_schedule", json!({"doctor_id": 3, "day": "Tuesday"}))
        .await
        .unwrap();

    assert_eq!(stored["id"], 6);
}

#[tokio::test]
async fn server_errors_surface_as_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/booked_appointment_slots"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let result = client.insert_row("booked_appointment_slots", json!({"slot_id": 1})).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn unfiltered_updates_are_refused_locally() {
    let server = MockServer::start().await;
    let client = SupabaseClient::new(&config_for(&server));

    let result = client.update_rows(&Query::table("slots_availability"), json!({"status": "available"})).await;

    assert!(result.is_err());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
