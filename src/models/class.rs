use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::contains_ignore_case;

/// A scheduled class session for one department and semester
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Class {
    pub id: Uuid,
    pub subject_name: String,
    pub department: String,
    pub semester: i32,
    pub class_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Class {
    /// `09:00 - 10:30`
    pub fn time_range(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }

    /// Case-insensitive match on subject or department
    pub fn matches_search(&self, term: &str) -> bool {
        contains_ignore_case(&self.subject_name, term)
            || contains_ignore_case(&self.department, term)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewClass {
    pub subject_name: String,
    pub department: String,
    pub semester: i32,
    pub class_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClassPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
}

impl From<NewClass> for ClassPatch {
    fn from(class: NewClass) -> Self {
        Self {
            subject_name: Some(class.subject_name),
            department: Some(class.department),
            semester: Some(class.semester),
            class_date: Some(class.class_date),
            start_time: Some(class.start_time),
            end_time: Some(class.end_time),
        }
    }
}
