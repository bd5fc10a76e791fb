//! Report exports
//!
//! Two encodings of the filtered statistics table:
//!
//! - CSV: plain comma-joined fields, no quoting.
//! - Spreadsheet: a UTF-8 byte-order mark, an unquoted header and every data
//!   field double-quoted, plus a Status column. Spreadsheet apps open it from
//!   an `.xls` name.

use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::StudentAttendanceStats;

pub const CSV_HEADER: [&str; 7] = [
    "Name",
    "Roll Number",
    "Department",
    "Semester",
    "Total Classes",
    "Classes Attended",
    "Attendance %",
];

pub const SPREADSHEET_HEADER: [&str; 8] = [
    "Student Name",
    "Roll Number",
    "Department",
    "Semester",
    "Total Classes",
    "Classes Attended",
    "Attendance Percentage",
    "Status",
];

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Spreadsheet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Spreadsheet => "xls",
        }
    }

    pub fn encode(&self, stats: &[StudentAttendanceStats]) -> String {
        match self {
            ExportFormat::Csv => to_csv(stats),
            ExportFormat::Spreadsheet => to_spreadsheet(stats),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xls" | "excel" | "spreadsheet" => Ok(ExportFormat::Spreadsheet),
            other => Err(Error::config(format!("Unknown export format: {}", other))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

fn fields(s: &StudentAttendanceStats) -> [String; 7] {
    [
        s.student_name.clone(),
        s.roll_number.clone(),
        s.department.clone(),
        s.semester.to_string(),
        s.total_classes.to_string(),
        s.classes_attended.to_string(),
        s.attendance_percentage.to_string(),
    ]
}

pub fn to_csv(stats: &[StudentAttendanceStats]) -> String {
    let mut lines = vec![CSV_HEADER.join(",")];
    lines.extend(stats.iter().map(|s| fields(s).join(",")));
    lines.join("\n")
}

pub fn to_spreadsheet(stats: &[StudentAttendanceStats]) -> String {
    let mut lines = vec![SPREADSHEET_HEADER.join(",")];
    lines.extend(stats.iter().map(|s| {
        let [name, roll, department, semester, total, attended, percentage] = fields(s);
        [
            name,
            roll,
            department,
            semester,
            total,
            attended,
            format!("{}%", percentage),
            s.standing().label().to_string(),
        ]
        .iter()
        .map(|cell| quote(cell))
        .collect::<Vec<_>>()
        .join(",")
    }));

    let mut out = String::from(BOM);
    out.push_str(&lines.join("\n"));
    out
}

// Inner quotes are doubled so a name with `"` stays one cell
fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// `attendance_report_2024-03-01.csv`
pub fn file_name(format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "attendance_report_{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// A rendered export, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

impl ExportFile {
    pub fn new(format: ExportFormat, stats: &[StudentAttendanceStats], date: NaiveDate) -> Self {
        Self {
            file_name: file_name(format, date),
            contents: format.encode(stats),
        }
    }

    /// Write into `dir` and return the full path
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, self.contents.as_bytes())?;
        info!(path = %path.display(), bytes = self.contents.len(), "wrote export");
        Ok(path)
    }
}
