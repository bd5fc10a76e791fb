use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;
use uuid::Uuid;

use super::{DataStore, Select, SortOrder, Table, DASHBOARD_STATS_RPC};
use crate::error::{Error, Result};
use crate::models::{
    Attendance, AttendanceStatus, Class, DashboardStats, Message, Student,
    StudentAttendanceStats, LOW_ATTENDANCE_THRESHOLD,
};

/// In-process [`DataStore`] with the observable behavior of the hosted
/// service.
///
/// Roll numbers are unique, attendance is unique per
/// `(student_id, class_id, date)`, deleting a student or class removes its
/// attendance rows, and the statistics views and `get_dashboard_stats` are
/// computed from the stored rows. Every call counts as one request.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<Table, Vec<Value>>>,
    today: Option<NaiveDate>,
    requests: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Date used for `classes_today`; defaults to the current UTC date
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Give `user_id` the admin role
    pub fn grant_admin(&self, user_id: &str) {
        let mut role = Map::new();
        role.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        role.insert("user_id".to_string(), Value::String(user_id.to_string()));
        role.insert("role".to_string(), Value::String("admin".to_string()));
        self.lock()
            .entry(Table::UserRoles)
            .or_default()
            .push(Value::Object(role));
    }

    /// Calls made against this store so far
    pub fn request_count(&self) -> usize {
        self.requests.load(AtomicOrdering::SeqCst)
    }

    /// Current contents of a table or view
    pub fn rows(&self, table: Table) -> Vec<Value> {
        let tables = self.lock();
        self.read(&tables, table)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<Table, Vec<Value>>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn count_request(&self, operation: &str, target: &str) {
        let n = self.requests.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        trace!(operation, target, request = n, "memory store request");
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn read(&self, tables: &BTreeMap<Table, Vec<Value>>, table: Table) -> Vec<Value> {
        match table {
            Table::StudentAttendanceStats => student_stats(tables)
                .iter()
                .filter_map(|stats| serde_json::to_value(stats).ok())
                .collect(),
            Table::LowAttendanceWarnings => student_stats(tables)
                .iter()
                .filter(|stats| is_low(stats))
                .filter_map(|stats| serde_json::to_value(stats).ok())
                .collect(),
            _ => tables.get(&table).cloned().unwrap_or_default(),
        }
    }

    fn dashboard_stats(&self, tables: &BTreeMap<Table, Vec<Value>>) -> DashboardStats {
        let today = self.today();
        let classes: Vec<Class> = typed(tables, Table::Classes);
        let stats = student_stats(tables);
        let counted: Vec<f64> = stats
            .iter()
            .filter(|s| s.total_classes > 0)
            .map(|s| s.attendance_percentage)
            .collect();
        let average_attendance = if counted.is_empty() {
            0.0
        } else {
            round2(counted.iter().sum::<f64>() / counted.len() as f64)
        };

        DashboardStats {
            total_students: tables.get(&Table::Students).map_or(0, Vec::len) as i64,
            total_classes: classes.len() as i64,
            classes_today: classes.iter().filter(|c| c.class_date == today).count() as i64,
            low_attendance_count: stats.iter().filter(|s| is_low(s)).count() as i64,
            average_attendance,
        }
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, table: Table, query: &Select) -> Result<Vec<Value>> {
        self.count_request("select", table.as_str());
        let tables = self.lock();
        let mut rows: Vec<Value> = self
            .read(&tables, table)
            .into_iter()
            .filter(|row| {
                query
                    .filters
                    .iter()
                    .all(|(column, value)| text(&row[column.as_str()]) == *value)
            })
            .collect();

        rows.sort_by(|a, b| {
            query
                .order
                .iter()
                .map(|(column, order)| {
                    let ordering = compare(&a[column.as_str()], &b[column.as_str()]);
                    match order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        self.count_request("insert", table.as_str());
        writable(table)?;
        let mut tables = self.lock();
        let rows = tables.entry(table).or_default();
        insert_row(rows, table, row)
    }

    async fn upsert(&self, table: Table, rows: Value, on_conflict: &str) -> Result<Vec<Value>> {
        self.count_request("upsert", table.as_str());
        writable(table)?;
        let incoming = match rows {
            Value::Array(rows) => rows,
            row => vec![row],
        };
        let columns: Vec<&str> = on_conflict.split(',').map(str::trim).collect();

        let mut tables = self.lock();
        // Work on a copy so a rejected row leaves the table untouched
        let mut working = tables.get(&table).cloned().unwrap_or_default();
        let mut stored = Vec::with_capacity(incoming.len());

        for row in incoming {
            let existing = working.iter().position(|current| {
                columns
                    .iter()
                    .all(|column| text(&current[*column]) == text(&row[*column]))
            });
            let row = match existing {
                Some(index) => {
                    let merged = merge(working[index].clone(), row, table)?;
                    check_unique(&working, table, &merged)?;
                    working[index] = merged.clone();
                    merged
                }
                None => insert_row(&mut working, table, row)?,
            };
            stored.push(row);
        }

        tables.insert(table, working);
        Ok(stored)
    }

    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<Value> {
        self.count_request("update", table.as_str());
        writable(table)?;
        let mut tables = self.lock();
        let rows = tables.entry(table).or_default();
        let index = position(rows, id).ok_or_else(|| missing(table, id))?;

        let merged = merge(rows[index].clone(), patch, table)?;
        check_unique(rows, table, &merged)?;
        rows[index] = merged.clone();
        Ok(merged)
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<()> {
        self.count_request("delete", table.as_str());
        writable(table)?;
        let mut tables = self.lock();
        let rows = tables.entry(table).or_default();
        let index = position(rows, id).ok_or_else(|| missing(table, id))?;
        rows.remove(index);

        let cascade = match table {
            Table::Students => Some("student_id"),
            Table::Classes => Some("class_id"),
            _ => None,
        };
        if let Some(column) = cascade {
            let id = id.to_string();
            if let Some(attendance) = tables.get_mut(&Table::Attendance) {
                attendance.retain(|row| text(&row[column]) != id);
            }
        }
        Ok(())
    }

    async fn rpc(&self, function: &str, _params: Value) -> Result<Value> {
        self.count_request("rpc", function);
        if function != DASHBOARD_STATS_RPC {
            return Err(Error::service(format!(
                "Could not find the function public.{}",
                function
            )));
        }
        let tables = self.lock();
        Ok(serde_json::to_value(self.dashboard_stats(&tables))?)
    }
}

fn writable(table: Table) -> Result<()> {
    if table.is_view() {
        return Err(Error::service(format!(
            "cannot write to view \"{}\"",
            table.as_str()
        )));
    }
    Ok(())
}

fn insert_row(rows: &mut Vec<Value>, table: Table, row: Value) -> Result<Value> {
    let mut object = match row {
        Value::Object(object) => object,
        other => {
            return Err(Error::service(format!(
                "expected a JSON object for {}, got {}",
                table.as_str(),
                other
            )))
        }
    };

    let now = Value::String(Utc::now().to_rfc3339());
    object
        .entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    for column in created_columns(table) {
        object.entry(*column).or_insert_with(|| now.clone());
    }

    let row = Value::Object(object);
    check_shape(table, &row)?;
    check_unique(rows, table, &row)?;
    rows.push(row.clone());
    Ok(row)
}

// Applies `patch` over `row`, keeping the id and refreshing the write stamp.
fn merge(row: Value, patch: Value, table: Table) -> Result<Value> {
    let (mut row, patch) = match (row, patch) {
        (Value::Object(row), Value::Object(patch)) => (row, patch),
        _ => {
            return Err(Error::service(format!(
                "expected a JSON object patch for {}",
                table.as_str()
            )))
        }
    };

    let id = row.get("id").cloned();
    row.extend(patch);
    if let Some(id) = id {
        row.insert("id".to_string(), id);
    }
    if let Some(column) = touched_column(table) {
        row.insert(column.to_string(), Value::String(Utc::now().to_rfc3339()));
    }

    let row = Value::Object(row);
    check_shape(table, &row)?;
    Ok(row)
}

fn created_columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::Students | Table::Classes => &["created_at", "updated_at"],
        Table::Attendance => &["marked_at"],
        Table::Messages => &["sent_at"],
        _ => &[],
    }
}

fn touched_column(table: Table) -> Option<&'static str> {
    match table {
        Table::Students | Table::Classes => Some("updated_at"),
        Table::Attendance => Some("marked_at"),
        _ => None,
    }
}

// NOT NULL and type checks the database would apply
fn check_shape(table: Table, row: &Value) -> Result<()> {
    let checked = match table {
        Table::Students => serde_json::from_value::<Student>(row.clone()).map(drop),
        Table::Classes => serde_json::from_value::<Class>(row.clone()).map(drop),
        Table::Attendance => serde_json::from_value::<Attendance>(row.clone()).map(drop),
        Table::Messages => serde_json::from_value::<Message>(row.clone()).map(drop),
        _ => Ok(()),
    };
    checked.map_err(|e| Error::service(format!("{} row rejected: {}", table.as_str(), e)))
}

fn check_unique(rows: &[Value], table: Table, row: &Value) -> Result<()> {
    let (constraint, columns): (&str, &[&str]) = match table {
        Table::Students => ("students_roll_number_key", &["roll_number"]),
        Table::Attendance => (
            "attendance_student_id_class_id_date_key",
            &["student_id", "class_id", "date"],
        ),
        _ => return Ok(()),
    };

    let id = text(&row["id"]);
    let duplicate = rows.iter().any(|other| {
        text(&other["id"]) != id
            && columns
                .iter()
                .all(|column| text(&other[*column]) == text(&row[*column]))
    });
    if duplicate {
        return Err(Error::conflict(format!(
            "duplicate key value violates unique constraint \"{}\"",
            constraint
        )));
    }
    Ok(())
}

fn position(rows: &[Value], id: Uuid) -> Option<usize> {
    let id = id.to_string();
    rows.iter().position(|row| text(&row["id"]) == id)
}

fn missing(table: Table, id: Uuid) -> Error {
    Error::not_found(format!("No row with id {} in {}", id, table.as_str()))
}

fn typed<T: DeserializeOwned>(tables: &BTreeMap<Table, Vec<Value>>, table: Table) -> Vec<T> {
    tables
        .get(&table)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| serde_json::from_value(row.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

// The `student_attendance_stats` view: classes scheduled for the student's
// department and semester, and how many of those they were present for.
fn student_stats(tables: &BTreeMap<Table, Vec<Value>>) -> Vec<StudentAttendanceStats> {
    let students: Vec<Student> = typed(tables, Table::Students);
    let classes: Vec<Class> = typed(tables, Table::Classes);
    let attendance: Vec<Attendance> = typed(tables, Table::Attendance);

    students
        .into_iter()
        .map(|student| {
            let eligible: Vec<Uuid> = classes
                .iter()
                .filter(|c| c.department == student.department && c.semester == student.semester)
                .map(|c| c.id)
                .collect();
            let attended = attendance
                .iter()
                .filter(|a| {
                    a.student_id == student.id
                        && a.status == AttendanceStatus::Present
                        && eligible.contains(&a.class_id)
                })
                .count() as i64;
            let total = eligible.len() as i64;
            let percentage = if total == 0 {
                0.0
            } else {
                round2(attended as f64 * 100.0 / total as f64)
            };

            StudentAttendanceStats {
                student_id: student.id,
                student_name: student.name,
                roll_number: student.roll_number,
                department: student.department,
                semester: student.semester,
                total_classes: total,
                classes_attended: attended,
                attendance_percentage: percentage,
            }
        })
        .collect()
}

fn is_low(stats: &StudentAttendanceStats) -> bool {
    stats.total_classes > 0 && stats.attendance_percentage < LOW_ATTENDANCE_THRESHOLD
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// Filter operand text, matching how PostgREST compares `eq.` values
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        // nulls sort last
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (x, y) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn student(roll: &str, department: &str, semester: i32) -> Value {
        json!({
            "name": format!("Student {}", roll),
            "roll_number": roll,
            "department": department,
            "semester": semester
        })
    }

    fn class(department: &str, semester: i32, date: &str) -> Value {
        json!({
            "subject_name": "Data Structures",
            "department": department,
            "semester": semester,
            "class_date": date,
            "start_time": "09:00:00",
            "end_time": "10:00:00"
        })
    }

    fn id_of(row: &Value) -> Uuid {
        row["id"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn insert_stamps_id_and_timestamps() {
        let store = MemoryStore::new();
        let row = store
            .insert(Table::Students, student("CS01", "Computer Science", 3))
            .await
            .unwrap();
        assert!(row["id"].is_string());
        assert!(row["created_at"].is_string());
        assert_eq!(store.request_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_roll_number_conflicts() {
        let store = MemoryStore::new();
        store
            .insert(Table::Students, student("CS01", "Computer Science", 3))
            .await
            .unwrap();
        let err = store
            .insert(Table::Students, student("CS01", "Civil", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.rows(Table::Students).len(), 1);
    }

    #[tokio::test]
    async fn missing_required_column_is_rejected() {
        let store = MemoryStore::new();
        let err = store
            .insert(Table::Messages, json!({ "title": "No body" }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Service(_)));
    }

    #[tokio::test]
    async fn select_filters_and_orders() {
        let store = MemoryStore::new();
        store.insert(Table::Classes, class("Civil", 1, "2024-03-02")).await.unwrap();
        store.insert(Table::Classes, class("Civil", 1, "2024-03-01")).await.unwrap();
        store.insert(Table::Classes, class("Civil", 2, "2024-03-03")).await.unwrap();

        let rows = store
            .select(
                Table::Classes,
                &Select::all()
                    .eq("semester", 1)
                    .order("class_date", SortOrder::Ascending),
            )
            .await
            .unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| r["class_date"].as_str().unwrap()).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-03-02"]);
    }

    #[tokio::test]
    async fn upsert_merges_on_conflict_key() {
        let store = MemoryStore::new();
        let s = store
            .insert(Table::Students, student("CS01", "Computer Science", 3))
            .await
            .unwrap();
        let c = store
            .insert(Table::Classes, class("Computer Science", 3, "2024-03-01"))
            .await
            .unwrap();
        let record = |status: &str| {
            json!([{
                "student_id": s["id"],
                "class_id": c["id"],
                "status": status,
                "date": "2024-03-01"
            }])
        };

        let first = store
            .upsert(Table::Attendance, record("Absent"), "student_id,class_id,date")
            .await
            .unwrap();
        let second = store
            .upsert(Table::Attendance, record("Present"), "student_id,class_id,date")
            .await
            .unwrap();

        let rows = store.rows(Table::Attendance);
        assert_eq!(rows.len(), 1);
        assert_eq!(first[0]["id"], second[0]["id"]);
        assert_eq!(rows[0]["status"], "Present");

        let stats = store.rows(Table::StudentAttendanceStats);
        assert_eq!(stats[0]["attendance_percentage"], json!(100.0));
    }

    #[tokio::test]
    async fn delete_cascades_to_attendance() {
        let store = MemoryStore::new();
        let s = store
            .insert(Table::Students, student("CS01", "Computer Science", 3))
            .await
            .unwrap();
        let c = store
            .insert(Table::Classes, class("Computer Science", 3, "2024-03-01"))
            .await
            .unwrap();
        store
            .upsert(
                Table::Attendance,
                json!([{ "student_id": s["id"], "class_id": c["id"], "status": "Present", "date": "2024-03-01" }]),
                "student_id,class_id,date",
            )
            .await
            .unwrap();

        store.delete(Table::Classes, id_of(&c)).await.unwrap();
        assert!(store.rows(Table::Attendance).is_empty());

        let err = store.delete(Table::Classes, id_of(&c)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update(Table::Students, Uuid::new_v4(), json!({ "name": "Nobody" }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn dashboard_stats_procedure() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let store = MemoryStore::new().with_today(today);
        let s = store
            .insert(Table::Students, student("CS01", "Computer Science", 3))
            .await
            .unwrap();
        store.insert(Table::Students, student("CS02", "Civil", 3)).await.unwrap();
        let c1 = store
            .insert(Table::Classes, class("Computer Science", 3, "2024-03-01"))
            .await
            .unwrap();
        store
            .insert(Table::Classes, class("Computer Science", 3, "2024-02-28"))
            .await
            .unwrap();
        store
            .upsert(
                Table::Attendance,
                json!([{ "student_id": s["id"], "class_id": c1["id"], "status": "Present", "date": "2024-03-01" }]),
                "student_id,class_id,date",
            )
            .await
            .unwrap();

        let stats: DashboardStats =
            serde_json::from_value(store.rpc(DASHBOARD_STATS_RPC, json!({})).await.unwrap())
                .unwrap();
        assert_eq!(stats.total_students, 2);
        assert_eq!(stats.total_classes, 2);
        assert_eq!(stats.classes_today, 1);
        assert_eq!(stats.low_attendance_count, 1);
        assert_eq!(stats.average_attendance, 50.0);

        assert!(store.rpc("unknown_fn", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn views_reject_writes() {
        let store = MemoryStore::new();
        let err = store
            .insert(Table::LowAttendanceWarnings, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Service(_)));
    }
}
