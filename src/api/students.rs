use tracing::instrument;
use uuid::Uuid;

use super::Dashboard;
use crate::cache::{Entity, QueryKey};
use crate::error::{Error, Result};
use crate::models::{Student, StudentPatch};
use crate::store::{decode, fetch_rows, Select, SortOrder, Table};
use crate::validation::StudentForm;

/// Shown when a roll number is already taken
pub const DUPLICATE_ROLL_NUMBER: &str = "A student with this roll number already exists";

pub struct StudentsApi<'a> {
    dashboard: &'a Dashboard,
}

impl<'a> StudentsApi<'a> {
    pub(super) fn new(dashboard: &'a Dashboard) -> Self {
        Self { dashboard }
    }

    /// Newest first
    pub async fn list(&self) -> Result<Vec<Student>> {
        let store = self.dashboard.store();
        self.dashboard
            .cache()
            .get_or_fetch(QueryKey::Students, || {
                fetch_rows(
                    store,
                    Table::Students,
                    Select::all().order("created_at", SortOrder::Descending),
                )
            })
            .await
    }

    /// Name, roll number or department containing `term`, ignoring case
    pub async fn search(&self, term: &str) -> Result<Vec<Student>> {
        let students = self.list().await?;
        let term = term.trim();
        Ok(students
            .into_iter()
            .filter(|s| term.is_empty() || s.matches_search(term))
            .collect())
    }

    #[instrument(skip_all, fields(roll_number = %form.roll_number))]
    pub async fn create(&self, form: &StudentForm) -> Result<Student> {
        let student = form.validate().map_err(Error::Validation)?;
        let store = self.dashboard.store();
        self.dashboard
            .mutate(
                Entity::Student,
                "Student registered successfully",
                "Failed to register student",
                async move {
                    let row = store
                        .insert(Table::Students, serde_json::to_value(&student)?)
                        .await
                        .map_err(roll_number_taken)?;
                    decode::<Student>(row)
                },
            )
            .await
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: &StudentPatch) -> Result<Student> {
        let changes = patch.validate().map_err(Error::Validation)?;
        let store = self.dashboard.store();
        self.dashboard
            .mutate(
                Entity::Student,
                "Student updated successfully",
                "Failed to update student",
                async move {
                    let row = store
                        .update(Table::Students, id, serde_json::to_value(&changes)?)
                        .await
                        .map_err(roll_number_taken)?;
                    decode::<Student>(row)
                },
            )
            .await
    }

    /// Stored attendance rows of the student go with it
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let store = self.dashboard.store();
        self.dashboard
            .mutate(
                Entity::Student,
                "Student deleted successfully",
                "Failed to delete student",
                store.delete(Table::Students, id),
            )
            .await
    }
}

fn roll_number_taken(err: Error) -> Error {
    match err {
        Error::Conflict(_) => Error::conflict(DUPLICATE_ROLL_NUMBER),
        other => other,
    }
}
