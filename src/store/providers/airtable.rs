//! Airtable REST API provider.
//!
//! Records are addressed as `{endpoint}/v0/{base_id}/{table}[/{record_id}]`.
//! Lookups read only the first page of results, which is plenty for an exact
//! match on a session identifier.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::StoreError;
use crate::store::{Fields, Filter, Record, RecordStore};

/// Default Airtable API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.airtable.com";

#[derive(Deserialize)]
struct RecordPage {
    records: Vec<Record>,
}

#[derive(Clone)]
pub struct AirtableStore {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    base_id: String,
}

impl std::fmt::Debug for AirtableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("base_id", &self.base_id)
            .finish_non_exhaustive()
    }
}

impl AirtableStore {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        base_id: impl Into<String>,
    ) -> Result<Self, StoreError> {
        Self::with_client(endpoint, api_key, base_id, reqwest::Client::new())
    }

    pub fn with_client(
        endpoint: &str,
        api_key: impl Into<String>,
        base_id: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            http,
            endpoint: Url::parse(endpoint)?,
            api_key: api_key.into(),
            base_id: base_id.into(),
        })
    }

    fn table_url(&self, table: &str, record_id: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.pop_if_empty().push("v0").push(&self.base_id).push(table);
            if let Some(id) = record_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, rb: reqwest::RequestBuilder) -> Result<T, StoreError> {
        let response = rb.bearer_auth(&self.api_key).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(StoreError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn find(&self, table: &str, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        let mut url = self.table_url(table, None)?;
        url.query_pairs_mut()
            .append_pair("filterByFormula", &filter.to_formula());
        let page: RecordPage = self.send(self.http.request(Method::GET, url)).await?;
        Ok(page.records)
    }

    async fn create(&self, table: &str, fields: Fields) -> Result<Record, StoreError> {
        let url = self.table_url(table, None)?;
        let body = serde_json::json!({ "fields": fields });
        self.send(self.http.request(Method::POST, url).json(&body))
            .await
    }

    async fn update(
        &self,
        table: &str,
        record_id: &str,
        fields: Fields,
    ) -> Result<Record, StoreError> {
        let url = self.table_url(table, Some(record_id))?;
        let body = serde_json::json!({ "fields": fields });
        match self
            .send(self.http.request(Method::PATCH, url).json(&body))
            .await
        {
            Err(StoreError::Api { status: 404, .. }) => Err(StoreError::NotFound {
                table: table.to_string(),
                id: record_id.to_string(),
            }),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_url_encodes_segments() {
        let store = AirtableStore::new(DEFAULT_ENDPOINT, "key", "appBase").unwrap();
        let url = store.table_url("Chat Threads", None).unwrap();
        assert_eq!(url.as_str(), "https://api.airtable.com/v0/appBase/Chat%20Threads");

        let url = store.table_url("Threads", Some("rec1")).unwrap();
        assert_eq!(url.as_str(), "https://api.airtable.com/v0/appBase/Threads/rec1");
    }

    #[test]
    fn debug_hides_api_key() {
        let store = AirtableStore::new(DEFAULT_ENDPOINT, "patSecret", "appBase").unwrap();
        assert!(!format!("{store:?}").contains("patSecret"));
    }
}
