use chrono::NaiveDate;
use tracing::instrument;
use uuid::Uuid;

use super::Dashboard;
use crate::cache::{Entity, QueryKey};
use crate::error::{Error, Result};
use crate::models::{Class, ClassPatch};
use crate::store::{decode, fetch_rows, Select, SortOrder, Table};
use crate::validation::ClassForm;

pub struct ClassesApi<'a> {
    dashboard: &'a Dashboard,
}

impl<'a> ClassesApi<'a> {
    pub(super) fn new(dashboard: &'a Dashboard) -> Self {
        Self { dashboard }
    }

    /// Latest date first, then by start time
    pub async fn list(&self) -> Result<Vec<Class>> {
        let store = self.dashboard.store();
        self.dashboard
            .cache()
            .get_or_fetch(QueryKey::Classes, || {
                fetch_rows(
                    store,
                    Table::Classes,
                    Select::all()
                        .order("class_date", SortOrder::Descending)
                        .order("start_time", SortOrder::Ascending),
                )
            })
            .await
    }

    /// Classes held on `date`, by start time
    pub async fn on(&self, date: NaiveDate) -> Result<Vec<Class>> {
        let store = self.dashboard.store();
        self.dashboard
            .cache()
            .get_or_fetch(QueryKey::ClassesOn(date), || {
                fetch_rows(
                    store,
                    Table::Classes,
                    Select::all()
                        .eq("class_date", date.format("%Y-%m-%d"))
                        .order("start_time", SortOrder::Ascending),
                )
            })
            .await
    }

    pub async fn today(&self, today: NaiveDate) -> Result<Vec<Class>> {
        self.on(today).await
    }

    /// Subject or department containing `term`, ignoring case
    pub async fn search(&self, term: &str) -> Result<Vec<Class>> {
        let classes = self.list().await?;
        let term = term.trim();
        Ok(classes
            .into_iter()
            .filter(|c| term.is_empty() || c.matches_search(term))
            .collect())
    }

    pub async fn find(&self, id: Uuid) -> Result<Class> {
        self.list()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::not_found(format!("Class {} not found", id)))
    }

    #[instrument(skip_all, fields(subject = %form.subject_name))]
    pub async fn create(&self, form: &ClassForm) -> Result<Class> {
        let class = form.validate().map_err(Error::Validation)?;
        let store = self.dashboard.store();
        self.dashboard
            .mutate(
                Entity::Class,
                "Class scheduled successfully",
                "Failed to schedule class",
                async move {
                    let row = store
                        .insert(Table::Classes, serde_json::to_value(&class)?)
                        .await?;
                    decode::<Class>(row)
                },
            )
            .await
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: &ClassPatch) -> Result<Class> {
        let changes = patch.validate().map_err(Error::Validation)?;
        let store = self.dashboard.store();
        self.dashboard
            .mutate(
                Entity::Class,
                "Class updated successfully",
                "Failed to update class",
                async move {
                    let row = store
                        .update(Table::Classes, id, serde_json::to_value(&changes)?)
                        .await?;
                    decode::<Class>(row)
                },
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let store = self.dashboard.store();
        self.dashboard
            .mutate(
                Entity::Class,
                "Class deleted successfully",
                "Failed to delete class",
                store.delete(Table::Classes, id),
            )
            .await
    }
}
