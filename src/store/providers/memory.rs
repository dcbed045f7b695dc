//! Process-local record store.
//!
//! Same contract as the remote store, including the lack of isolation
//! between a `find` and a following `create`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{Fields, Filter, Record, RecordStore};

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record in `table`, in insertion order.
    pub async fn records(&self, table: &str) -> Vec<Record> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

fn record_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("rec{}", &simple[..14])
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find(&self, table: &str, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        let guard = self.tables.read().await;
        Ok(guard
            .get(table)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.matches(&r.fields))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, table: &str, fields: Fields) -> Result<Record, StoreError> {
        let record = Record {
            id: record_id(),
            created_time: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            fields,
        };
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        table: &str,
        record_id: &str,
        fields: Fields,
    ) -> Result<Record, StoreError> {
        let mut guard = self.tables.write().await;
        let record = guard
            .get_mut(table)
            .and_then(|records| records.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                id: record_id.to_string(),
            })?;
        record.fields.extend(fields);
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), json!(v)))
            .collect()
    }

    #[tokio::test]
    async fn find_returns_matches_in_insertion_order() {
        let store = MemoryRecordStore::new();
        let first = store
            .create("Threads", fields(&[("SessionID", "s1"), ("ThreadID", "t1")]))
            .await
            .unwrap();
        store
            .create("Threads", fields(&[("SessionID", "s2"), ("ThreadID", "t2")]))
            .await
            .unwrap();
        let third = store
            .create("Threads", fields(&[("SessionID", "s1"), ("ThreadID", "t3")]))
            .await
            .unwrap();

        let found = store
            .find("Threads", &Filter::field_equals("SessionID", "s1"))
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), third.id.as_str()]);
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryRecordStore::new();
        let created = store
            .create("Threads", fields(&[("SessionID", "s1"), ("ThreadID", "t1")]))
            .await
            .unwrap();

        let updated = store
            .update("Threads", &created.id, fields(&[("Timestamp", "now")]))
            .await
            .unwrap();
        assert_eq!(updated.text("ThreadID"), Some("t1"));
        assert_eq!(updated.text("Timestamp"), Some("now"));
    }

    #[tokio::test]
    async fn update_unknown_record_fails() {
        let store = MemoryRecordStore::new();
        let err = store
            .update("Threads", "recMissing", Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn tables_are_isolated() {
        let store = MemoryRecordStore::new();
        store
            .create("Threads", fields(&[("SessionID", "s1")]))
            .await
            .unwrap();
        let found = store
            .find("Archive", &Filter::field_equals("SessionID", "s1"))
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
