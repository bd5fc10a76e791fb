//! Report filters, summaries and warning labels
//!
//! The service decides who is below the threshold; everything here is
//! display arithmetic over rows it already returned.

use std::fmt;
use std::str::FromStr;

use crate::models::{LowAttendanceWarning, StudentAttendanceStats, LOW_ATTENDANCE_THRESHOLD};

/// Department selector of the reports page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DepartmentFilter {
    #[default]
    All,
    Only(String),
}

impl DepartmentFilter {
    pub fn matches(&self, department: &str) -> bool {
        match self {
            DepartmentFilter::All => true,
            DepartmentFilter::Only(wanted) => wanted == department,
        }
    }
}

impl FromStr for DepartmentFilter {
    type Err = std::convert::Infallible;

    /// `All` (any case) or an exact department name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(DepartmentFilter::All)
        } else {
            Ok(DepartmentFilter::Only(s.to_string()))
        }
    }
}

impl fmt::Display for DepartmentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepartmentFilter::All => f.write_str("All"),
            DepartmentFilter::Only(department) => f.write_str(department),
        }
    }
}

pub fn filter_stats(
    stats: &[StudentAttendanceStats],
    filter: &DepartmentFilter,
) -> Vec<StudentAttendanceStats> {
    stats
        .iter()
        .filter(|s| filter.matches(&s.department))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportSummary {
    pub students: usize,
    /// Mean percentage, one decimal; 0 with no rows
    pub average_attendance: f64,
    pub low_attendance: usize,
}

impl ReportSummary {
    pub fn from_stats(stats: &[StudentAttendanceStats]) -> Self {
        let average_attendance = if stats.is_empty() {
            0.0
        } else {
            let sum: f64 = stats.iter().map(|s| s.attendance_percentage).sum();
            (sum / stats.len() as f64 * 10.0).round() / 10.0
        };
        Self {
            students: stats.len(),
            average_attendance,
            low_attendance: stats
                .iter()
                .filter(|s| s.attendance_percentage < LOW_ATTENDANCE_THRESHOLD)
                .count(),
        }
    }
}

/// A warning with its distance below the threshold
#[derive(Debug, Clone, PartialEq)]
pub struct WarningEntry {
    pub warning: LowAttendanceWarning,
    pub gap: f64,
}

impl WarningEntry {
    pub fn new(warning: LowAttendanceWarning) -> Self {
        let gap = LOW_ATTENDANCE_THRESHOLD - warning.attendance_percentage;
        Self { warning, gap }
    }

    /// `12.5% below threshold`
    pub fn label(&self) -> String {
        format!("{:.1}% below threshold", self.gap)
    }
}

/// Largest gap first; equal gaps keep their input order
pub fn rank_warnings(warnings: Vec<LowAttendanceWarning>) -> Vec<WarningEntry> {
    let mut entries: Vec<WarningEntry> = warnings.into_iter().map(WarningEntry::new).collect();
    entries.sort_by(|a, b| b.gap.total_cmp(&a.gap));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn stats(name: &str, department: &str, percentage: f64) -> StudentAttendanceStats {
        StudentAttendanceStats {
            student_id: Uuid::new_v4(),
            student_name: name.to_string(),
            roll_number: name.to_uppercase(),
            department: department.to_string(),
            semester: 3,
            total_classes: 10,
            classes_attended: (percentage / 10.0) as i64,
            attendance_percentage: percentage,
        }
    }

    #[test]
    fn parse_department_filter() {
        assert_eq!("All".parse::<DepartmentFilter>().unwrap(), DepartmentFilter::All);
        assert_eq!("".parse::<DepartmentFilter>().unwrap(), DepartmentFilter::All);
        assert_eq!(
            "Civil".parse::<DepartmentFilter>().unwrap(),
            DepartmentFilter::Only("Civil".to_string())
        );
    }

    #[test]
    fn filter_is_exact() {
        let rows = vec![
            stats("a", "Civil", 80.0),
            stats("b", "Civil Engineering", 80.0),
            stats("c", "Electronics", 80.0),
        ];
        let filtered = filter_stats(&rows, &DepartmentFilter::Only("Civil".to_string()));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filter_stats(&rows, &DepartmentFilter::All).len(), 3);
    }

    #[test]
    fn summary_rounds_to_one_decimal() {
        let rows = vec![
            stats("a", "Civil", 90.0),
            stats("b", "Civil", 66.67),
            stats("c", "Civil", 75.0),
        ];
        let summary = ReportSummary::from_stats(&rows);
        assert_eq!(summary.students, 3);
        assert_eq!(summary.average_attendance, 77.2);
        assert_eq!(summary.low_attendance, 1);

        assert_eq!(ReportSummary::from_stats(&[]).average_attendance, 0.0);
    }

    #[test]
    fn warnings_rank_by_gap() {
        let ranked = rank_warnings(vec![
            stats("a", "Civil", 70.0),
            stats("b", "Civil", 40.0),
            stats("c", "Civil", 62.5),
        ]);
        let names: Vec<&str> = ranked.iter().map(|w| w.warning.student_name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
        assert_eq!(ranked[1].label(), "12.5% below threshold");
        assert_eq!(ranked[0].gap, 35.0);
    }
}
