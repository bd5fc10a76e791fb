use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Students below this attendance percentage get a warning
pub const LOW_ATTENDANCE_THRESHOLD: f64 = 75.0;

/// One row of the `student_attendance_stats` view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentAttendanceStats {
    pub student_id: Uuid,
    pub student_name: String,
    pub roll_number: String,
    pub department: String,
    pub semester: i32,
    pub total_classes: i64,
    pub classes_attended: i64,
    pub attendance_percentage: f64,
}

impl StudentAttendanceStats {
    pub fn standing(&self) -> Standing {
        Standing::of(self.attendance_percentage)
    }
}

/// Rows of the `low_attendance_warnings` view share the stats shape
pub type LowAttendanceWarning = StudentAttendanceStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Good,
    Low,
}

impl Standing {
    pub fn of(percentage: f64) -> Self {
        if percentage >= LOW_ATTENDANCE_THRESHOLD {
            Standing::Good
        } else {
            Standing::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Standing::Good => "Good Standing",
            Standing::Low => "Low Attendance",
        }
    }
}

impl fmt::Display for Standing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of the `get_dashboard_stats` procedure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub total_students: i64,
    pub total_classes: i64,
    pub classes_today: i64,
    pub low_attendance_count: i64,
    pub average_attendance: f64,
}
