//! Common test utilities for kazi-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use tempfile::TempDir;

use kazi_core::{AccountEmail, Entitlement, PlanId, TrialLedgerEntry};
use kazi_service::{create_router, AppState, ServiceConfig};
use kazi_store::{RocksStore, Store};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct store access for seeding and inspecting records.
    pub store: Arc<RocksStore>,
    /// Shared state (events, drafts) backing the server.
    pub state: Arc<AppState>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test account for authenticated requests.
    pub test_email: AccountEmail,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and no settlement
    /// delay.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            settle_delay_ms: 0,
            sweep_interval_seconds: 60,
        };

        let state = Arc::new(AppState::new(Arc::clone(&store) as Arc<dyn Store>, config));
        let router: Router = create_router(state.as_ref().clone());

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_email: AccountEmail = "a@x.com".parse().unwrap();

        Self {
            server,
            store,
            state,
            _temp_dir: temp_dir,
            test_email,
        }
    }

    /// Get the authorization header for the default test account.
    pub fn auth_header(&self) -> String {
        Self::auth_header_for(self.test_email.as_str())
    }

    /// Get the authorization header for a specific account.
    pub fn auth_header_for(email: &str) -> String {
        format!("Bearer test-token:{email}")
    }

    /// Seed a trial that started in the past, backdating both the record
    /// and its ledger entry (the clock cannot be advanced, so the record
    /// is moved instead).
    pub fn seed_backdated_trial(&self, plan: PlanId, days_ago: i64) -> Entitlement {
        let started = Utc::now() - Duration::days(days_ago);
        let record = Entitlement::trial(self.test_email.clone(), plan, started);
        let ledger = TrialLedgerEntry::open(self.test_email.clone(), plan, started);
        self.store
            .start_trial(&record, &ledger)
            .expect("Failed to seed trial");
        record
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
