use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use super::{PollStore, StoreError, StoreFuture};

/// Postgres `unique_violation`, as reported in PostgREST error bodies.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgREST-style client (`/rest/v1/{table}`, `/rest/v1/rpc/{function}`).
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    rest_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.rest_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT || body.contains(UNIQUE_VIOLATION) {
            return Err(StoreError::Conflict(body));
        }

        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn json_body(response: Response) -> Result<Value, StoreError> {
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("rest_url", &self.rest_url)
            .finish_non_exhaustive()
    }
}

impl PollStore for RestStore {
    fn select_eq<'a>(
        &'a self,
        table: &'a str,
        columns: &'a str,
        filters: &'a [(&'a str, &'a str)],
    ) -> StoreFuture<'a, Vec<Value>> {
        Box::pin(async move {
            let mut builder = self
                .request(Method::GET, table)
                .query(&[("select", columns)]);
            for (column, value) in filters {
                builder = builder.query(&[(*column, format!("eq.{value}"))]);
            }

            let response = Self::send(builder).await?;
            let rows = Self::json_body(response).await?;
            Ok(serde_json::from_value(rows)?)
        })
    }

    fn insert<'a>(&'a self, table: &'a str, record: Value) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let builder = self
                .request(Method::POST, table)
                .header("Prefer", "return=minimal")
                .json(&record);
            Self::send(builder).await?;
            Ok(())
        })
    }

    fn rpc<'a>(&'a self, function: &'a str, args: Value) -> StoreFuture<'a, Value> {
        Box::pin(async move {
            let builder = self
                .request(Method::POST, &format!("rpc/{function}"))
                .header(header::ACCEPT, "application/json")
                .json(&args);
            let response = Self::send(builder).await?;
            Self::json_body(response).await
        })
    }
}
