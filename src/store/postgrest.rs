use async_trait::async_trait;
use attendx_postgrest::PostgrestClient;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::{into_rows, DataStore, Select, Table};
use crate::config::AppConfig;
use crate::error::{Error, Result};

/// [`DataStore`] backed by the project's PostgREST endpoint
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    base_url: String,
    api_key: String,
    http_client: Client,
    access_token: Option<String>,
    schema: String,
}

impl PostgrestStore {
    pub fn new(config: &AppConfig, http_client: Client) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            api_key: config.anon_key.clone(),
            http_client,
            access_token: None,
            schema: config.options.db_schema.clone(),
        }
    }

    /// Send requests as the signed-in user so row-level security applies
    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    fn from(&self, table: Table) -> Result<PostgrestClient> {
        let client = PostgrestClient::new(
            &self.base_url,
            &self.api_key,
            table.as_str(),
            self.http_client.clone(),
        );
        self.authorize(client)
    }

    fn authorize(&self, mut client: PostgrestClient) -> Result<PostgrestClient> {
        if let Some(token) = &self.access_token {
            client = client.with_auth(token)?;
        }
        if self.schema != "public" {
            client = client
                .with_header("Accept-Profile", &self.schema)?
                .with_header("Content-Profile", &self.schema)?;
        }
        Ok(client)
    }
}

#[async_trait]
impl DataStore for PostgrestStore {
    async fn select(&self, table: Table, query: &Select) -> Result<Vec<Value>> {
        let mut client = self.from(table)?.select("*");
        for (column, value) in &query.filters {
            client = client.eq(column, value);
        }
        for (column, order) in &query.order {
            client = client.order(column, *order);
        }
        if let Some(limit) = query.limit {
            client = client.limit(limit);
        }
        Ok(client.execute::<Value>().await?)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let inserted = self.from(table)?.insert(row).await?;
        into_rows(inserted)
            .into_iter()
            .next()
            .ok_or_else(|| Error::service(format!("Insert into {} returned no row", table.as_str())))
    }

    async fn upsert(&self, table: Table, rows: Value, on_conflict: &str) -> Result<Vec<Value>> {
        debug!(table = table.as_str(), on_conflict, "upsert");
        let stored = self
            .from(table)?
            .on_conflict(on_conflict)
            .upsert(rows)
            .await?;
        Ok(into_rows(stored))
    }

    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<Value> {
        let updated = self
            .from(table)?
            .eq("id", &id.to_string())
            .update(patch)
            .await?;
        into_rows(updated)
            .into_iter()
            .next()
            .ok_or_else(|| missing(table, id))
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<()> {
        let deleted = self.from(table)?.eq("id", &id.to_string()).delete().await?;
        match deleted {
            Value::Array(rows) if rows.is_empty() => Err(missing(table, id)),
            _ => Ok(()),
        }
    }

    async fn rpc(&self, function: &str, params: Value) -> Result<Value> {
        let client = PostgrestClient::rpc(
            &self.base_url,
            &self.api_key,
            function,
            params,
            self.http_client.clone(),
        );
        Ok(self.authorize(client)?.call_rpc::<Value>().await?)
    }
}

fn missing(table: Table, id: Uuid) -> Error {
    Error::not_found(format!("No row with id {} in {}", id, table.as_str()))
}
