use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::contains_ignore_case;

/// A registered student. `roll_number` is unique across the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub roll_number: String,
    pub department: String,
    pub semester: i32,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    /// Case-insensitive match on name, roll number or department
    pub fn matches_search(&self, term: &str) -> bool {
        contains_ignore_case(&self.name, term)
            || contains_ignore_case(&self.roll_number, term)
            || contains_ignore_case(&self.department, term)
    }
}

/// Insert payload, produced by validating a [`crate::validation::StudentForm`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewStudent {
    pub name: String,
    pub roll_number: String,
    pub department: String,
    pub semester: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Partial update as entered; absent fields are left alone. An empty email
/// or phone clears the stored value once validated into [`StudentChanges`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StudentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl From<NewStudent> for StudentPatch {
    fn from(student: NewStudent) -> Self {
        Self {
            name: Some(student.name),
            roll_number: Some(student.roll_number),
            department: Some(student.department),
            semester: Some(student.semester),
            email: student.email,
            phone: student.phone,
        }
    }
}

/// Normalized update payload, produced by [`StudentPatch::validate`].
/// `Some(None)` writes a null.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StudentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
}
