//! Attendance marking for one class
//!
//! An [`AttendanceSheet`] is the editable present/absent map shown while a
//! class is selected. It is built from three inputs:
//!
//! 1. the class, whose department and semester decide who is eligible,
//! 2. the full student roster,
//! 3. attendance rows already stored for the class.
//!
//! Eligible students start out Absent and stored rows overlay that default.
//! Rows for students who are no longer eligible are ignored. Saving produces
//! one record per eligible student, all stamped with the class date, so a
//! repeated save overwrites rather than duplicates.

use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Attendance, AttendanceRecord, AttendanceStatus, Class, Student};

/// A student may be marked for a class only when both department and
/// semester match exactly.
pub fn is_eligible(student: &Student, class: &Class) -> bool {
    student.department == class.department && student.semester == class.semester
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceSheet {
    class: Class,
    students: Vec<Student>,
    statuses: HashMap<Uuid, AttendanceStatus>,
}

impl AttendanceSheet {
    pub fn new(class: Class, roster: &[Student], persisted: &[Attendance]) -> Self {
        let students: Vec<Student> = roster
            .iter()
            .filter(|student| is_eligible(student, &class))
            .cloned()
            .collect();

        let mut statuses: HashMap<Uuid, AttendanceStatus> = students
            .iter()
            .map(|student| (student.id, AttendanceStatus::default()))
            .collect();

        for row in persisted.iter().filter(|row| row.class_id == class.id) {
            if let Some(status) = statuses.get_mut(&row.student_id) {
                *status = row.status;
            }
        }

        Self {
            class,
            students,
            statuses,
        }
    }

    pub fn class(&self) -> &Class {
        &self.class
    }

    /// Eligible students in roster order
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    /// `None` for students who are not on this sheet
    pub fn status(&self, student_id: Uuid) -> Option<AttendanceStatus> {
        self.statuses.get(&student_id).copied()
    }

    /// Flip one student between Present and Absent and return the new
    /// status. Ids not on the sheet are left alone.
    pub fn toggle(&mut self, student_id: Uuid) -> Option<AttendanceStatus> {
        let status = self.statuses.get_mut(&student_id)?;
        *status = status.toggled();
        Some(*status)
    }

    /// Returns false when the student is not on this sheet
    pub fn set(&mut self, student_id: Uuid, status: AttendanceStatus) -> bool {
        match self.statuses.get_mut(&student_id) {
            Some(current) => {
                *current = status;
                true
            }
            None => false,
        }
    }

    pub fn mark_all(&mut self, status: AttendanceStatus) {
        for current in self.statuses.values_mut() {
            *current = status;
        }
    }

    pub fn mark_all_present(&mut self) {
        self.mark_all(AttendanceStatus::Present);
    }

    pub fn mark_all_absent(&mut self) {
        self.mark_all(AttendanceStatus::Absent);
    }

    pub fn present_count(&self) -> usize {
        self.statuses
            .values()
            .filter(|status| **status == AttendanceStatus::Present)
            .count()
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Students with their current status, in roster order
    pub fn rows(&self) -> impl Iterator<Item = (&Student, AttendanceStatus)> + '_ {
        self.students.iter().map(move |student| {
            let status = self.status(student.id).unwrap_or_default();
            (student, status)
        })
    }

    /// The upsert payload: every eligible student, changed or not
    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.rows()
            .map(|(student, status)| AttendanceRecord {
                student_id: student.id,
                class_id: self.class.id,
                status,
                date: self.class.class_date,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};

    fn class(department: &str, semester: i32) -> Class {
        Class {
            id: Uuid::new_v4(),
            subject_name: "Data Structures".to_string(),
            department: department.to_string(),
            semester,
            class_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn student(name: &str, department: &str, semester: i32) -> Student {
        Student {
            id: Uuid::new_v4(),
            name: name.to_string(),
            roll_number: name.to_uppercase(),
            department: department.to_string(),
            semester,
            email: None,
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn stored(student: &Student, class: &Class, status: AttendanceStatus) -> Attendance {
        Attendance {
            id: Uuid::new_v4(),
            student_id: student.id,
            class_id: class.id,
            status,
            date: class.class_date,
            marked_at: Utc::now(),
        }
    }

    fn roster() -> Vec<Student> {
        vec![
            student("asha", "Computer Science", 3),
            student("bilal", "Computer Science", 3),
            student("chen", "Computer Science", 3),
            student("dara", "Computer Science", 4),
        ]
    }

    #[test]
    fn eligibility_needs_department_and_semester() {
        let class = class("Computer Science", 3);
        assert!(is_eligible(&student("a", "Computer Science", 3), &class));
        assert!(!is_eligible(&student("b", "Computer Science", 4), &class));
        assert!(!is_eligible(&student("c", "Electronics", 3), &class));
    }

    #[test]
    fn three_of_four_students_are_eligible() {
        let class = class("Computer Science", 3);
        let roster = roster();
        let sheet = AttendanceSheet::new(class, &roster, &[]);

        assert_eq!(sheet.len(), 3);
        let payload = sheet.records();
        assert_eq!(payload.len(), 3);
        assert!(payload.iter().all(|r| r.student_id != roster[3].id));
    }

    #[test]
    fn defaults_to_absent() {
        let sheet = AttendanceSheet::new(class("Computer Science", 3), &roster(), &[]);
        assert!(sheet.rows().all(|(_, status)| status == AttendanceStatus::Absent));
        assert_eq!(sheet.present_count(), 0);
    }

    #[test]
    fn stored_rows_overlay_defaults() {
        let class = class("Computer Science", 3);
        let roster = roster();
        let other_class = self::class("Computer Science", 3);
        let persisted = vec![
            stored(&roster[0], &class, AttendanceStatus::Present),
            // no longer eligible
            stored(&roster[3], &class, AttendanceStatus::Present),
            // a different class
            stored(&roster[1], &other_class, AttendanceStatus::Present),
        ];

        let sheet = AttendanceSheet::new(class, &roster, &persisted);

        assert_eq!(sheet.status(roster[0].id), Some(AttendanceStatus::Present));
        assert_eq!(sheet.status(roster[1].id), Some(AttendanceStatus::Absent));
        assert_eq!(sheet.status(roster[3].id), None);
        assert_eq!(sheet.present_count(), 1);
    }

    #[test]
    fn toggle_twice_restores() {
        let roster = roster();
        let mut sheet = AttendanceSheet::new(class("Computer Science", 3), &roster, &[]);
        let id = roster[1].id;

        assert_eq!(sheet.toggle(id), Some(AttendanceStatus::Present));
        assert_eq!(sheet.status(roster[0].id), Some(AttendanceStatus::Absent));
        assert_eq!(sheet.toggle(id), Some(AttendanceStatus::Absent));
    }

    #[test]
    fn toggle_ignores_ineligible_students() {
        let roster = roster();
        let mut sheet = AttendanceSheet::new(class("Computer Science", 3), &roster, &[]);
        let before = sheet.clone();

        assert_eq!(sheet.toggle(roster[3].id), None);
        assert!(!sheet.set(Uuid::new_v4(), AttendanceStatus::Present));
        assert_eq!(sheet, before);
    }

    #[test]
    fn bulk_marks_overwrite_everything() {
        let class = class("Computer Science", 3);
        let roster = roster();
        let persisted = vec![stored(&roster[2], &class, AttendanceStatus::Absent)];
        let mut sheet = AttendanceSheet::new(class, &roster, &persisted);
        sheet.toggle(roster[0].id);

        sheet.mark_all_present();
        assert_eq!(sheet.present_count(), 3);
        assert!(sheet
            .records()
            .iter()
            .all(|r| r.status == AttendanceStatus::Present));

        sheet.mark_all_absent();
        assert_eq!(sheet.present_count(), 0);
    }

    #[test]
    fn records_carry_class_and_date() {
        let class = class("Computer Science", 3);
        let class_id = class.id;
        let date = class.class_date;
        let roster = roster();
        let mut sheet = AttendanceSheet::new(class, &roster, &[]);
        sheet.set(roster[2].id, AttendanceStatus::Present);

        let records = sheet.records();
        assert_eq!(
            records.iter().map(|r| r.student_id).collect::<Vec<_>>(),
            vec![roster[0].id, roster[1].id, roster[2].id]
        );
        assert!(records.iter().all(|r| r.class_id == class_id && r.date == date));
        assert_eq!(records[2].status, AttendanceStatus::Present);
    }

    #[test]
    fn empty_roster_gives_empty_sheet() {
        let sheet = AttendanceSheet::new(class("Civil", 1), &roster(), &[]);
        assert!(sheet.is_empty());
        assert!(sheet.records().is_empty());
    }
}
