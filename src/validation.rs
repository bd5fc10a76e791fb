//! Form validation
//!
//! Forms hold raw input the way a user typed it. `validate` either returns the
//! typed payload for the data service or a [`FieldErrors`] map keyed by field
//! name.

use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{
    ClassPatch, NewClass, NewMessage, NewStudent, StudentChanges, StudentPatch, SEMESTERS,
};

/// Validation messages per field, in field-name order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// The message shown under a field
    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .filter_map(|(field, messages)| {
                messages.first().map(|message| format!("{}: {}", field, message))
            })
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentForm {
    pub name: String,
    pub roll_number: String,
    pub department: String,
    pub semester: i32,
    pub email: String,
    pub phone: String,
}

impl StudentForm {
    pub fn validate(&self) -> Result<NewStudent, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, &self.name);
        check_roll_number(&mut errors, &self.roll_number);
        check_department(&mut errors, &self.department);
        check_semester(&mut errors, self.semester);
        check_email(&mut errors, &self.email);
        check_phone(&mut errors, &self.phone);

        errors.into_result(NewStudent {
            name: self.name.trim().to_string(),
            roll_number: self.roll_number.trim().to_string(),
            department: self.department.clone(),
            semester: self.semester,
            email: non_empty(&self.email),
            phone: non_empty(&self.phone),
        })
    }
}

impl StudentPatch {
    /// Checks the fields that are present and normalizes them the way
    /// [`StudentForm::validate`] does
    pub fn validate(&self) -> Result<StudentChanges, FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        if let Some(roll_number) = &self.roll_number {
            check_roll_number(&mut errors, roll_number);
        }
        if let Some(department) = &self.department {
            check_department(&mut errors, department);
        }
        if let Some(semester) = self.semester {
            check_semester(&mut errors, semester);
        }
        if let Some(email) = &self.email {
            check_email(&mut errors, email);
        }
        if let Some(phone) = &self.phone {
            check_phone(&mut errors, phone);
        }
        errors.into_result(StudentChanges {
            name: self.name.as_deref().map(|name| name.trim().to_string()),
            roll_number: self.roll_number.as_deref().map(|roll| roll.trim().to_string()),
            department: self.department.clone(),
            semester: self.semester,
            email: self.email.as_deref().map(non_empty),
            phone: self.phone.as_deref().map(non_empty),
        })
    }
}

/// Class form input; date and times are the raw `YYYY-MM-DD` / `HH:MM` text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassForm {
    pub subject_name: String,
    pub department: String,
    pub semester: i32,
    pub class_date: String,
    pub start_time: String,
    pub end_time: String,
}

impl ClassForm {
    pub fn validate(&self) -> Result<NewClass, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_subject(&mut errors, &self.subject_name);
        check_department(&mut errors, &self.department);
        check_semester(&mut errors, self.semester);
        let class_date = parse_date(&mut errors, &self.class_date);
        let start_time = parse_time(&mut errors, "start_time", "Start time", &self.start_time);
        let end_time = parse_time(&mut errors, "end_time", "End time", &self.end_time);

        match (class_date, start_time, end_time) {
            (Some(class_date), Some(start_time), Some(end_time)) if errors.is_empty() => {
                Ok(NewClass {
                    subject_name: self.subject_name.trim().to_string(),
                    department: self.department.clone(),
                    semester: self.semester,
                    class_date,
                    start_time,
                    end_time,
                })
            }
            _ => Err(errors),
        }
    }
}

impl ClassPatch {
    /// Checks the fields that are present; the subject is trimmed
    pub fn validate(&self) -> Result<ClassPatch, FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(subject) = &self.subject_name {
            check_subject(&mut errors, subject);
        }
        if let Some(department) = &self.department {
            check_department(&mut errors, department);
        }
        if let Some(semester) = self.semester {
            check_semester(&mut errors, semester);
        }
        errors.into_result(ClassPatch {
            subject_name: self
                .subject_name
                .as_deref()
                .map(|subject| subject.trim().to_string()),
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageForm {
    pub title: String,
    pub message: String,
}

impl MessageForm {
    pub fn validate(&self) -> Result<NewMessage, FieldErrors> {
        let mut errors = FieldErrors::new();
        if char_len(&self.title) < 2 {
            errors.add("title", "Title must be at least 2 characters");
        }
        if char_len(&self.message) < 5 {
            errors.add("message", "Message must be at least 5 characters");
        }
        errors.into_result(NewMessage {
            title: self.title.trim().to_string(),
            message: self.message.trim().to_string(),
        })
    }
}

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn check_name(errors: &mut FieldErrors, name: &str) {
    let len = char_len(name);
    if len < 2 {
        errors.add("name", "Name must be at least 2 characters");
    } else if len > 100 {
        errors.add("name", "Name must be at most 100 characters");
    }
}

fn check_roll_number(errors: &mut FieldErrors, roll_number: &str) {
    let len = char_len(roll_number);
    if len == 0 {
        errors.add("roll_number", "Roll number is required");
    } else if len > 50 {
        errors.add("roll_number", "Roll number must be at most 50 characters");
    }
}

fn check_department(errors: &mut FieldErrors, department: &str) {
    if department.trim().is_empty() {
        errors.add("department", "Department is required");
    }
}

fn check_semester(errors: &mut FieldErrors, semester: i32) {
    if !SEMESTERS.contains(&semester) {
        errors.add("semester", "Semester must be between 1 and 10");
    }
}

fn check_subject(errors: &mut FieldErrors, subject: &str) {
    if char_len(subject) < 2 {
        errors.add("subject_name", "Subject name must be at least 2 characters");
    }
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    let email = email.trim();
    if !email.is_empty() && !looks_like_email(email) {
        errors.add("email", "Invalid email");
    }
}

fn check_phone(errors: &mut FieldErrors, phone: &str) {
    if char_len(phone) > 15 {
        errors.add("phone", "Phone must be at most 15 characters");
    }
}

// local@domain.tld with no whitespace
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn parse_date(errors: &mut FieldErrors, value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        errors.add("class_date", "Date is required");
        return None;
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add("class_date", "Date must be YYYY-MM-DD");
            None
        }
    }
}

fn parse_time(
    errors: &mut FieldErrors,
    field: &'static str,
    label: &str,
    value: &str,
) -> Option<NaiveTime> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, format!("{} is required", label));
        return None;
    }
    let parsed = NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"));
    match parsed {
        Ok(time) => Some(time),
        Err(_) => {
            errors.add(field, format!("{} must be HH:MM", label));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student_form() -> StudentForm {
        StudentForm {
            name: "Asha Rao".to_string(),
            roll_number: "CS01".to_string(),
            department: "Computer Science".to_string(),
            semester: 3,
            email: String::new(),
            phone: String::new(),
        }
    }

    #[test]
    fn valid_student_drops_empty_optionals() {
        let student = student_form().validate().unwrap();
        assert_eq!(student.roll_number, "CS01");
        assert_eq!(student.email, None);
        assert_eq!(student.phone, None);
    }

    #[test]
    fn student_errors_are_field_scoped() {
        let form = StudentForm {
            name: "A".to_string(),
            roll_number: "  ".to_string(),
            department: String::new(),
            semester: 11,
            email: "asha@".to_string(),
            phone: "0123456789012345".to_string(),
        };
        let errors = form.validate().unwrap_err();

        assert_eq!(errors.first("name"), Some("Name must be at least 2 characters"));
        assert_eq!(errors.first("roll_number"), Some("Roll number is required"));
        assert_eq!(errors.first("department"), Some("Department is required"));
        assert_eq!(errors.first("email"), Some("Invalid email"));
        assert!(errors.get("semester").is_some());
        assert!(errors.get("phone").is_some());
        assert_eq!(errors.fields().count(), 6);
    }

    #[test]
    fn email_shapes() {
        assert!(looks_like_email("asha@college.edu"));
        assert!(!looks_like_email("asha@college"));
        assert!(!looks_like_email("@college.edu"));
        assert!(!looks_like_email("asha @college.edu"));
        assert!(!looks_like_email("asha@college."));
    }

    #[test]
    fn patch_checks_only_present_fields() {
        assert!(StudentPatch::default().validate().is_ok());

        let patch = StudentPatch {
            semester: Some(0),
            ..Default::default()
        };
        let errors = patch.validate().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["semester"]);
    }

    #[test]
    fn patch_is_normalized_like_the_form() {
        let patch = StudentPatch {
            name: Some("  Ravi Kumar ".to_string()),
            roll_number: Some(" CS01 ".to_string()),
            email: Some(String::new()),
            phone: Some("   ".to_string()),
            ..Default::default()
        };
        let changes = patch.validate().unwrap();
        assert_eq!(changes.name.as_deref(), Some("Ravi Kumar"));
        assert_eq!(changes.roll_number.as_deref(), Some("CS01"));
        assert_eq!(changes.email, Some(None));
        assert_eq!(changes.phone, Some(None));
        assert_eq!(changes.department, None);

        let body = serde_json::to_value(&changes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "Ravi Kumar",
                "roll_number": "CS01",
                "email": null,
                "phone": null
            })
        );

        let class = ClassPatch {
            subject_name: Some(" Compilers  ".to_string()),
            semester: Some(4),
            ..Default::default()
        };
        let class = class.validate().unwrap();
        assert_eq!(class.subject_name.as_deref(), Some("Compilers"));
        assert_eq!(class.semester, Some(4));
    }

    #[test]
    fn class_form_parses_date_and_times() {
        let form = ClassForm {
            subject_name: "Data Structures".to_string(),
            department: "Computer Science".to_string(),
            semester: 3,
            class_date: "2024-03-01".to_string(),
            start_time: "09:00".to_string(),
            end_time: "10:30:00".to_string(),
        };
        let class = form.validate().unwrap();
        assert_eq!(class.class_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(class.end_time, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
    }

    #[test]
    fn class_form_requires_schedule() {
        let form = ClassForm {
            subject_name: "DS".to_string(),
            department: "Civil".to_string(),
            semester: 1,
            ..Default::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.first("class_date"), Some("Date is required"));
        assert_eq!(errors.first("start_time"), Some("Start time is required"));
        assert_eq!(errors.first("end_time"), Some("End time is required"));
    }

    #[test]
    fn message_form_lengths() {
        let errors = MessageForm {
            title: "X".to_string(),
            message: "Hi".to_string(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.first("title"), Some("Title must be at least 2 characters"));
        assert_eq!(errors.first("message"), Some("Message must be at least 5 characters"));
        assert_eq!(
            errors.to_string(),
            "message: Message must be at least 5 characters; title: Title must be at least 2 characters"
        );
    }
}
