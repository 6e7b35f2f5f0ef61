use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tokio::sync::Barrier;

use shared_config::{AppConfig, DatabaseBackend, default_rollover_run_at};
use shared_database::{MemoryStore, Query, RowStore};
use shared_models::auth::{Role, User};

use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_backend: DatabaseBackend::Memory,
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: String::new(),
            jwt_secret: self.jwt_secret.clone(),
            server_port: 3000,
            rollover_run_at: default_rollover_run_at(),
            cancellation_notice_minutes: 120,
        }
    }

    /// Handler state over the given store.
    pub fn to_state(&self, store: Arc<dyn RowStore>) -> Arc<AppState> {
        Arc::new(AppState::new(self.to_app_config(), store))
    }
}

pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl TestUser {
    pub fn new(id: i64, role: Role) -> Self {
        Self {
            id,
            email: format!("{}{}@example.com", role, id),
            role,
        }
    }

    pub fn doctor(id: i64) -> Self {
        Self::new(id, Role::Doctor)
    }

    pub fn patient(id: i64) -> Self {
        Self::new(id, Role::Patient)
    }

    pub fn admin(id: i64) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: Some(self.email.clone()),
            role: self.role,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        Self::create_token_with_claims(json!({
            "sub": user.id.to_string(),
            "email": user.email,
            "role": user.role.to_string(),
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        }), secret)
    }

    pub fn create_token_with_claims(payload: Value, secret: &str) -> String {
        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

struct SelectGate {
    table: &'static str,
    barrier: Arc<Barrier>,
    remaining: usize,
}

/// A `MemoryStore` that fails writes on demand, for exercising rollback and
/// partial-batch paths. It can also hold reads back until a number of
/// callers have all read, so concurrent read-then-write races interleave.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    insert_budget: Mutex<HashMap<&'static str, usize>>,
    failing_updates: Mutex<HashSet<&'static str>>,
    select_gate: Mutex<Option<SelectGate>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Allows `successes` more inserts into `table`, then fails the rest.
    pub fn fail_inserts_after(&self, table: &'static str, successes: usize) {
        if let Ok(mut budget) = self.insert_budget.lock() {
            budget.insert(table, successes);
        }
    }

    pub fn fail_inserts(&self, table: &'static str) {
        self.fail_inserts_after(table, 0);
    }

    pub fn fail_updates(&self, table: &'static str) {
        if let Ok(mut failing) = self.failing_updates.lock() {
            failing.insert(table);
        }
    }

    /// The next `parties` selects on `table` each return only once all of
    /// them have read. Later selects pass straight through.
    pub fn gate_selects(&self, table: &'static str, parties: usize) {
        if let Ok(mut gate) = self.select_gate.lock() {
            *gate = Some(SelectGate {
                table,
                barrier: Arc::new(Barrier::new(parties)),
                remaining: parties,
            });
        }
    }

    fn take_gate_pass(&self, table: &'static str) -> Option<Arc<Barrier>> {
        let mut guard = self.select_gate.lock().ok()?;
        let gate = guard.as_mut().filter(|gate| gate.table == table)?;

        gate.remaining -= 1;
        let barrier = Arc::clone(&gate.barrier);
        if gate.remaining == 0 {
            *guard = None;
        }
        Some(barrier)
    }

    pub fn heal(&self) {
        if let Ok(mut budget) = self.insert_budget.lock() {
            budget.clear();
        }
        if let Ok(mut failing) = self.failing_updates.lock() {
            failing.clear();
        }
    }
}

#[async_trait]
impl RowStore for FlakyStore {
    async fn insert_row(&self, table: &'static str, row: Value) -> Result<Value> {
        let allowed = match self.insert_budget.lock() {
            Ok(mut budget) => match budget.get_mut(table) {
                Some(0) => false,
                Some(remaining) => {
                    *remaining -= 1;
                    true
                }
                None => true,
            },
            Err(_) => true,
        };

        if !allowed {
            return Err(anyhow!("Injected insert failure on {}", table));
        }
        self.inner.insert_row(table, row).await
    }

    async fn update_rows(&self, query: &Query, fields: Value) -> Result<Vec<Value>> {
        let failing = self.failing_updates.lock()
            .map(|failing| failing.contains(query.table_name()))
            .unwrap_or(false);

        if failing {
            return Err(anyhow!("Injected update failure on {}", query.table_name()));
        }
        self.inner.update_rows(query, fields).await
    }

    async fn select_rows(&self, query: &Query) -> Result<Vec<Value>> {
        let rows = self.inner.select_rows(query).await?;

        if let Some(barrier) = self.take_gate_pass(query.table_name()) {
            barrier.wait().await;
        }
        Ok(rows)
    }

    async fn delete_rows(&self, query: &Query) -> Result<usize> {
        self.inner.delete_rows(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.database_backend, DatabaseBackend::Memory);
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor(3);
        assert_eq!(user.email, "doctor3@example.com");
        assert_eq!(user.role, Role::Doctor);

        let user_model = user.to_user();
        assert_eq!(user_model.id, 3);
        assert_eq!(user_model.role, Role::Doctor);
    }

    #[test]
    fn test_jwt_token_creation() {
        let token = JwtTestUtils::create_test_token(&TestUser::patient(7), "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
    }

    #[tokio::test]
    async fn flaky_store_fails_after_budget_then_heals() {
        let store = FlakyStore::new();
        store.fail_inserts_after("t", 1);

        assert!(store.insert_row("t", json!({})).await.is_ok());
        assert_matches!(store.insert_row("t", json!({})).await, Err(_));
        assert!(store.insert_row("other", json!({})).await.is_ok());

        store.heal();
        assert!(store.insert_row("t", json!({})).await.is_ok());
        assert_eq!(store.inner().row_count("t").await, 2);
    }

    #[tokio::test]
    async fn flaky_store_fails_updates_for_marked_tables() {
        let store = FlakyStore::new();
        store.insert_row("t", json!({"k": 1})).await.unwrap();
        store.fail_updates("t");

        let result = store.update_rows(&Query::table("t").eq("k", 1), json!({"k": 2})).await;
        assert!(result.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn gated_selects_wait_for_every_party() {
        let store = Arc::new(FlakyStore::new());
        store.insert_row("t", json!({"k": 1})).await.unwrap();
        store.gate_selects("t", 2);

        let first = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.select_rows(&Query::table("t")).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!first.is_finished());

        let second = store.select_rows(&Query::table("t")).await.unwrap();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first, second);

        // Spent gates let later reads through.
        assert_eq!(store.select_rows(&Query::table("t")).await.unwrap().len(), 1);
    }
}
