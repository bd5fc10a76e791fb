use tracing::{debug, instrument};
use uuid::Uuid;

use super::Dashboard;
use crate::cache::{Entity, QueryKey};
use crate::error::Result;
use crate::models::{
    Attendance, AttendanceRecord, LowAttendanceWarning, StudentAttendanceStats,
    ATTENDANCE_CONFLICT_KEY,
};
use crate::sheet::AttendanceSheet;
use crate::store::{decode, fetch_rows, Select, SortOrder, Table};

pub struct AttendanceApi<'a> {
    dashboard: &'a Dashboard,
}

impl<'a> AttendanceApi<'a> {
    pub(super) fn new(dashboard: &'a Dashboard) -> Self {
        Self { dashboard }
    }

    /// Stored rows for one class
    pub async fn by_class(&self, class_id: Uuid) -> Result<Vec<Attendance>> {
        let store = self.dashboard.store();
        self.dashboard
            .cache()
            .get_or_fetch(QueryKey::AttendanceByClass(class_id), || {
                fetch_rows(store, Table::Attendance, Select::all().eq("class_id", class_id))
            })
            .await
    }

    /// Per-student statistics, lowest percentage first
    pub async fn stats(&self) -> Result<Vec<StudentAttendanceStats>> {
        let store = self.dashboard.store();
        self.dashboard
            .cache()
            .get_or_fetch(QueryKey::StudentStats, || {
                fetch_rows(
                    store,
                    Table::StudentAttendanceStats,
                    Select::all().order("attendance_percentage", SortOrder::Ascending),
                )
            })
            .await
    }

    /// Students below the threshold, lowest percentage first
    pub async fn low_attendance(&self) -> Result<Vec<LowAttendanceWarning>> {
        let store = self.dashboard.store();
        self.dashboard
            .cache()
            .get_or_fetch(QueryKey::LowAttendance, || {
                fetch_rows(
                    store,
                    Table::LowAttendanceWarnings,
                    Select::all().order("attendance_percentage", SortOrder::Ascending),
                )
            })
            .await
    }

    /// Load the class, the roster and stored rows, and build the sheet
    #[instrument(skip(self))]
    pub async fn open(&self, class_id: Uuid) -> Result<AttendanceSheet> {
        let class = self.dashboard.classes().find(class_id).await?;
        let roster = self.dashboard.students().list().await?;
        let persisted = self.by_class(class_id).await?;
        let sheet = AttendanceSheet::new(class, &roster, &persisted);
        debug!(eligible = sheet.len(), present = sheet.present_count(), "opened sheet");
        Ok(sheet)
    }

    /// Upsert `records` in one request keyed by (student, class, date).
    /// An empty batch sends nothing.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn mark(&self, records: &[AttendanceRecord]) -> Result<Vec<Attendance>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let store = self.dashboard.store();
        self.dashboard
            .mutate(
                Entity::Attendance,
                "Attendance marked successfully",
                "Failed to mark attendance",
                async move {
                    store
                        .upsert(
                            Table::Attendance,
                            serde_json::to_value(records)?,
                            ATTENDANCE_CONFLICT_KEY,
                        )
                        .await?
                        .into_iter()
                        .map(decode::<Attendance>)
                        .collect::<Result<Vec<_>>>()
                },
            )
            .await
    }

    /// Save every eligible student's status. The sheet is only read, so a
    /// failed save leaves it as it was.
    pub async fn save(&self, sheet: &AttendanceSheet) -> Result<Vec<Attendance>> {
        self.mark(&sheet.records()).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let store = self.dashboard.store();
        self.dashboard
            .mutate(
                Entity::Attendance,
                "Attendance record deleted",
                "Failed to delete attendance record",
                store.delete(Table::Attendance, id),
            )
            .await
    }
}
