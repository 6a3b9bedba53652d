//! Database operations through the PostgREST API

mod filter;
mod query;
mod types;

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::fetch::{Fetch, FetchBuilder};

pub use filter::*;
pub use query::*;
pub use types::*;

/// Client for one table or view.
///
/// Filters are chained by value; the terminal methods issue the request.
#[derive(Clone)]
pub struct PostgrestClient {
    /// The base URL for the backend project
    url: String,

    /// The anonymous API key
    key: String,

    /// The table or view name
    table: String,

    /// HTTP client
    client: Client,

    /// Access token of the signed-in identity
    token: Option<String>,

    /// The database schema
    schema: String,

    timeout: Option<Duration>,

    query: QueryBuilder,
}

impl PostgrestClient {
    /// Create a new PostgrestClient
    pub(crate) fn new(url: &str, key: &str, table: &str, client: Client) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            table: table.to_string(),
            client,
            token: None,
            schema: "public".to_string(),
            timeout: None,
            query: QueryBuilder::new(),
        }
    }

    /// Send requests as the identity owning `token`
    pub fn with_auth(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Target another schema
    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = schema.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The table this client targets
    pub fn table(&self) -> &str {
        &self.table
    }

    fn get_url(&self) -> String {
        format!("{}/rest/v1/{}", self.url, self.table)
    }

    fn prepare<'a>(&'a self, fetch: FetchBuilder<'a>) -> FetchBuilder<'a> {
        let token = self.token.as_deref().unwrap_or(&self.key);
        fetch
            .api_key(&self.key)
            .bearer_auth(token)
            .header("Accept-Profile", &self.schema)
            .header("Content-Profile", &self.schema)
            .timeout(self.timeout)
            .query(&self.query.params())
    }

    /// Select specific columns from the table
    pub fn select(mut self, columns: &str) -> Self {
        self.query.set_select(columns);
        self
    }

    /// Filter rows where column equals a value
    pub fn eq<T: ToString>(mut self, column: &str, value: T) -> Self {
        self.query.add_filter(Filter::new(column, FilterOperator::Eq, value));
        self
    }

    /// Filter rows where column does not equal a value
    pub fn neq<T: ToString>(mut self, column: &str, value: T) -> Self {
        self.query.add_filter(Filter::new(column, FilterOperator::Neq, value));
        self
    }

    /// Filter rows where column is null
    pub fn is_null(mut self, column: &str) -> Self {
        self.query.add_filter(query::is_null(column));
        self
    }

    /// Filter rows where column is not null
    pub fn not_null(mut self, column: &str) -> Self {
        self.query.add_filter(query::is_null(column).not());
        self
    }

    /// Order the results by a column
    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.query.set_order(column, order);
        self
    }

    /// Limit the number of rows returned
    pub fn limit(mut self, count: usize) -> Self {
        self.query.set_limit(count);
        self
    }

    /// Execute a SELECT and return the rows
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let fetch = self.prepare(Fetch::get(&self.client, &self.get_url()));
        fetch.execute::<Vec<T>>().await
    }

    /// Execute a SELECT and return the first row
    pub async fn execute_one<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let rows = self.clone().limit(1).execute::<T>().await?;
        Ok(rows.into_iter().next())
    }

    /// Insert rows and return their representation
    pub async fn insert<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        values: &T,
    ) -> Result<Vec<R>> {
        let fetch = self
            .prepare(Fetch::post(&self.client, &self.get_url()))
            .header("Prefer", ReturnOption::Representation.as_prefer())
            .json(values)?;
        fetch.execute::<Vec<R>>().await
    }

    /// Insert rows without reading them back
    pub async fn insert_minimal<T: Serialize + ?Sized>(&self, values: &T) -> Result<()> {
        let fetch = self
            .prepare(Fetch::post(&self.client, &self.get_url()))
            .header("Prefer", ReturnOption::Minimal.as_prefer())
            .json(values)?;
        fetch.execute_empty().await
    }

    /// Insert or merge rows that collide on `on_conflict`
    pub async fn upsert<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        values: &T,
        on_conflict: &str,
    ) -> Result<Vec<R>> {
        let mut this = self.clone();
        this.query.set_on_conflict(on_conflict);

        let fetch = this
            .prepare(Fetch::post(&this.client, &this.get_url()))
            .header(
                "Prefer",
                &format!(
                    "resolution=merge-duplicates,{}",
                    ReturnOption::Representation.as_prefer()
                ),
            )
            .json(values)?;
        fetch.execute::<Vec<R>>().await
    }

    /// Update the filtered rows and return them.
    ///
    /// Refuses to run without a filter, which would touch every row.
    pub async fn update<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        values: &T,
    ) -> Result<Vec<R>> {
        self.require_filters("update")?;
        let fetch = self
            .prepare(Fetch::patch(&self.client, &self.get_url()))
            .header("Prefer", ReturnOption::Representation.as_prefer())
            .json(values)?;
        fetch.execute::<Vec<R>>().await
    }

    /// Update the filtered rows without reading them back
    pub async fn update_minimal<T: Serialize + ?Sized>(&self, values: &T) -> Result<()> {
        self.require_filters("update")?;
        let fetch = self
            .prepare(Fetch::patch(&self.client, &self.get_url()))
            .header("Prefer", ReturnOption::Minimal.as_prefer())
            .json(values)?;
        fetch.execute_empty().await
    }

    /// Delete the filtered rows
    pub async fn delete(&self) -> Result<()> {
        self.require_filters("delete")?;
        let fetch = self
            .prepare(Fetch::delete(&self.client, &self.get_url()))
            .header("Prefer", ReturnOption::Minimal.as_prefer());
        fetch.execute_empty().await
    }

    fn require_filters(&self, operation: &str) -> Result<()> {
        if self.query.has_filters() {
            Ok(())
        } else {
            Err(Error::general(format!(
                "refusing to {} every row of {}",
                operation, self.table
            )))
        }
    }
}

/// Call to a stored procedure
pub struct RpcBuilder<T: Serialize> {
    url: String,
    key: String,
    params: T,
    client: Client,
    token: Option<String>,
}

impl<T: Serialize> RpcBuilder<T> {
    /// Create a new RpcBuilder
    pub(crate) fn new(base_url: &str, key: &str, function: &str, params: T, client: Client) -> Self {
        Self {
            url: format!("{}/rest/v1/rpc/{}", base_url, function),
            key: key.to_string(),
            params,
            client,
            token: None,
        }
    }

    /// Call as the identity owning `token`
    pub fn with_auth(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Execute the RPC call and return the result
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<R> {
        let token = self.token.as_deref().unwrap_or(&self.key);
        Fetch::post(&self.client, &self.url)
            .api_key(&self.key)
            .bearer_auth(token)
            .json(&self.params)?
            .execute::<R>()
            .await
    }
}
