use tracing::instrument;
use uuid::Uuid;

use super::Dashboard;
use crate::cache::{Entity, QueryKey};
use crate::error::{Error, Result};
use crate::models::Message;
use crate::store::{decode, fetch_rows, Select, SortOrder, Table};
use crate::validation::MessageForm;

pub struct MessagesApi<'a> {
    dashboard: &'a Dashboard,
}

impl<'a> MessagesApi<'a> {
    pub(super) fn new(dashboard: &'a Dashboard) -> Self {
        Self { dashboard }
    }

    /// Most recent first
    pub async fn list(&self) -> Result<Vec<Message>> {
        let store = self.dashboard.store();
        self.dashboard
            .cache()
            .get_or_fetch(QueryKey::Messages, || {
                fetch_rows(
                    store,
                    Table::Messages,
                    Select::all().order("sent_at", SortOrder::Descending),
                )
            })
            .await
    }

    #[instrument(skip_all, fields(title = %form.title))]
    pub async fn send(&self, form: &MessageForm) -> Result<Message> {
        let message = form.validate().map_err(Error::Validation)?;
        let store = self.dashboard.store();
        self.dashboard
            .mutate(
                Entity::Message,
                "Message sent successfully",
                "Failed to send message",
                async move {
                    let row = store
                        .insert(Table::Messages, serde_json::to_value(&message)?)
                        .await?;
                    decode::<Message>(row)
                },
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let store = self.dashboard.store();
        self.dashboard
            .mutate(
                Entity::Message,
                "Message deleted successfully",
                "Failed to delete message",
                store.delete(Table::Messages, id),
            )
            .await
    }
}
