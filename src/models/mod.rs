//! Rows as the dashboard consumes them from the data service

mod attendance;
mod class;
mod message;
mod stats;
mod student;

pub use attendance::*;
pub use class::*;
pub use message::*;
pub use stats::*;
pub use student::*;

/// Departments offered by the student and class forms
pub const DEPARTMENTS: [&str; 6] = [
    "Computer Science",
    "Electronics",
    "Mechanical",
    "Civil",
    "Electrical",
    "Information Technology",
];

/// Semesters are numbered 1 through 10
pub const SEMESTERS: std::ops::RangeInclusive<i32> = 1..=10;

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
