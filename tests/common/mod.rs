#![allow(dead_code)]

use async_trait::async_trait;
use attendx::api::Dashboard;
use attendx::gate::AdminSession;
use attendx::notify::RecordingNotifier;
use attendx::store::{DataStore, MemoryStore, Select, Table};
use attendx::{Error, Result};
use attendx_auth::User;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub fn admin() -> AdminSession {
    let user: User = serde_json::from_value(json!({
        "id": "7f0c6f7e-0000-4000-8000-000000000001",
        "email": "admin@college.edu"
    }))
    .unwrap();
    AdminSession {
        user,
        access_token: "test-token".to_string(),
    }
}

pub fn dashboard_over(store: Arc<dyn DataStore>) -> (Dashboard, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let dashboard = Dashboard::new(store, admin()).with_notifier(notifier.clone());
    (dashboard, notifier)
}

/// Passes everything through to a [`MemoryStore`] until writes are switched
/// off, after which every write fails like a dropped connection.
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::service("connection reset by peer"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DataStore for FlakyStore {
    async fn select(&self, table: Table, query: &Select) -> Result<Vec<Value>> {
        self.inner.select(table, query).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        self.check()?;
        self.inner.insert(table, row).await
    }

    async fn upsert(&self, table: Table, rows: Value, on_conflict: &str) -> Result<Vec<Value>> {
        self.check()?;
        self.inner.upsert(table, rows, on_conflict).await
    }

    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<Value> {
        self.check()?;
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<()> {
        self.check()?;
        self.inner.delete(table, id).await
    }

    async fn rpc(&self, function: &str, params: Value) -> Result<Value> {
        self.inner.rpc(function, params).await
    }
}

/// A [`MemoryStore`] whose selects take `delay` to come back, after the rows
/// have been read
pub struct SlowReads {
    pub inner: MemoryStore,
    delay: Duration,
}

impl SlowReads {
    pub fn new(inner: MemoryStore, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl DataStore for SlowReads {
    async fn select(&self, table: Table, query: &Select) -> Result<Vec<Value>> {
        let rows = self.inner.select(table, query).await;
        tokio::time::sleep(self.delay).await;
        rows
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        self.inner.insert(table, row).await
    }

    async fn upsert(&self, table: Table, rows: Value, on_conflict: &str) -> Result<Vec<Value>> {
        self.inner.upsert(table, rows, on_conflict).await
    }

    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<Value> {
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<()> {
        self.inner.delete(table, id).await
    }

    async fn rpc(&self, function: &str, params: Value) -> Result<Value> {
        self.inner.rpc(function, params).await
    }
}
