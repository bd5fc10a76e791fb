//! The boundary to the remote data service
//!
//! [`DataStore`] names the six calls the dashboard makes: select with
//! filter/order, insert, upsert with a conflict target, update by id, delete
//! by id, and stored procedure calls. Rows cross the boundary as JSON so the
//! same seam serves tables, views and procedures.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;

mod memory;
mod postgrest;

pub use self::memory::MemoryStore;
pub use self::postgrest::PostgrestStore;
pub use attendx_postgrest::SortOrder;

/// Procedure returning [`crate::models::DashboardStats`]
pub const DASHBOARD_STATS_RPC: &str = "get_dashboard_stats";

/// Tables and views exposed by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Students,
    Classes,
    Attendance,
    Messages,
    StudentAttendanceStats,
    LowAttendanceWarnings,
    UserRoles,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Students => "students",
            Table::Classes => "classes",
            Table::Attendance => "attendance",
            Table::Messages => "messages",
            Table::StudentAttendanceStats => "student_attendance_stats",
            Table::LowAttendanceWarnings => "low_attendance_warnings",
            Table::UserRoles => "user_roles",
        }
    }

    /// Views are computed by the service and cannot be written
    pub fn is_view(&self) -> bool {
        matches!(
            self,
            Table::StudentAttendanceStats | Table::LowAttendanceWarnings
        )
    }
}

/// Equality filters and sort keys for a select
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    pub filters: Vec<(String, String)>,
    pub order: Vec<(String, SortOrder)>,
    pub limit: Option<u32>,
}

impl Select {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.order.push((column.to_string(), order));
        self
    }

    pub fn limit(mut self, count: u32) -> Self {
        self.limit = Some(count);
        self
    }
}

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Rows of a table or view matching `query`
    async fn select(&self, table: Table, query: &Select) -> Result<Vec<Value>>;

    /// Insert one row and return it as stored
    async fn insert(&self, table: Table, row: Value) -> Result<Value>;

    /// Insert an array of rows in one request, merging rows that collide on
    /// the comma-separated `on_conflict` columns
    async fn upsert(&self, table: Table, rows: Value, on_conflict: &str) -> Result<Vec<Value>>;

    /// Apply a partial update to the row with `id`
    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<Value>;

    async fn delete(&self, table: Table, id: Uuid) -> Result<()>;

    async fn rpc(&self, function: &str, params: Value) -> Result<Value>;
}

/// Select and decode rows
pub(crate) async fn fetch_rows<T: DeserializeOwned>(
    store: &dyn DataStore,
    table: Table,
    query: Select,
) -> Result<Vec<T>> {
    store
        .select(table, &query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(Into::into))
        .collect()
}

pub(crate) fn decode<T: DeserializeOwned>(row: Value) -> Result<T> {
    Ok(serde_json::from_value(row)?)
}

// PostgREST answers writes with an array, a single object, or nothing.
pub(crate) fn into_rows(value: Value) -> Vec<Value> {
    match value {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_builder_accumulates() {
        let query = Select::all()
            .eq("class_id", "c-1")
            .order("class_date", SortOrder::Descending)
            .order("start_time", SortOrder::Ascending)
            .limit(5);
        assert_eq!(query.filters, vec![("class_id".to_string(), "c-1".to_string())]);
        assert_eq!(query.order.len(), 2);
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn write_responses_become_rows() {
        assert!(into_rows(Value::Null).is_empty());
        assert_eq!(into_rows(serde_json::json!({"id": 1})).len(), 1);
        assert_eq!(into_rows(serde_json::json!([{"id": 1}, {"id": 2}])).len(), 2);
    }

    #[test]
    fn views_are_read_only() {
        assert!(Table::LowAttendanceWarnings.is_view());
        assert!(!Table::Attendance.is_view());
        assert_eq!(Table::StudentAttendanceStats.as_str(), "student_attendance_stats");
    }
}
