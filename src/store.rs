//! 文档存储抽象：过滤查询与原子批量更新。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;

use crate::document::{DocumentRef, DocumentSnapshot, Fields, Filter, WriteBatch};
use crate::error::StoreError;

/// The capabilities the sweep needs from a document database.
pub trait DocumentStore: Send + Sync {
    /// Returns every document of `collection` matching `filter`, in no particular order.
    fn query(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<DocumentSnapshot>, StoreError>> + Send;

    /// Applies the whole batch or nothing, returning the number of documents written.
    fn commit(&self, batch: &WriteBatch) -> impl Future<Output = Result<usize, StoreError>> + Send;
}

/// Collection name -> document id -> fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collections(BTreeMap<String, BTreeMap<String, Fields>>);

impl Collections {
    pub fn query(&self, collection: &str, filter: &Filter) -> Vec<DocumentSnapshot> {
        let Some(documents) = self.0.get(collection) else {
            return Vec::new();
        };
        documents
            .iter()
            .filter(|(_, fields)| filter.matches(fields))
            .map(|(id, fields)| DocumentSnapshot {
                reference: DocumentRef::new(collection, id.clone()),
                fields: fields.clone(),
            })
            .collect()
    }

    /// 先校验所有目标文档存在，再统一合并字段。
    pub fn apply(&mut self, batch: &WriteBatch) -> Result<usize, StoreError> {
        if let Some((missing, _)) = batch
            .updates()
            .find(|(reference, _)| self.get(reference).is_none())
        {
            return Err(StoreError::MissingDocument(missing.clone()));
        }

        for (reference, fields) in batch.updates() {
            if let Some(document) = self
                .0
                .get_mut(reference.collection())
                .and_then(|documents| documents.get_mut(reference.id()))
            {
                for (key, value) in fields {
                    document.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(batch.len())
    }

    pub fn get(&self, reference: &DocumentRef) -> Option<&Fields> {
        self.0
            .get(reference.collection())
            .and_then(|documents| documents.get(reference.id()))
    }

    #[cfg(test)]
    pub fn insert(&mut self, reference: DocumentRef, fields: Fields) {
        self.0
            .entry(reference.collection().to_string())
            .or_default()
            .insert(reference.id().to_string(), fields);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde_json::{Value, json};

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn seeded() -> Collections {
        let mut collections = Collections::default();
        collections.insert(
            DocumentRef::new("users", "a"),
            fields(json!({
                "updateDateTime": "2024-01-01T00:00:00Z",
                "status": "active",
                "name": "a"
            })),
        );
        collections.insert(
            DocumentRef::new("users", "b"),
            fields(json!({ "updateDateTime": "2024-01-02T00:00:00Z", "status": "active" })),
        );
        collections.insert(
            DocumentRef::new("others", "a"),
            fields(json!({ "updateDateTime": "2024-01-01T00:00:00Z" })),
        );
        collections
    }

    #[test]
    fn query_is_scoped_to_collection() {
        let bound: DateTime<Utc> = "2024-01-01T12:00:00Z".parse().expect("timestamp");
        let found = seeded().query("users", &Filter::at_or_before("updateDateTime", bound));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reference, DocumentRef::new("users", "a"));
        let elsewhere = seeded().query("missing", &Filter::at_or_before("updateDateTime", bound));
        assert!(elsewhere.is_empty());
    }

    #[test]
    fn apply_merges_only_given_fields() {
        let mut collections = seeded();
        let mut batch = WriteBatch::new();
        batch.update(
            DocumentRef::new("users", "a"),
            fields(json!({ "status": "inactive" })),
        );

        assert_eq!(collections.apply(&batch).expect("apply"), 1);
        let document = collections
            .get(&DocumentRef::new("users", "a"))
            .expect("document");
        assert_eq!(
            Value::Object(document.clone()),
            json!({ "updateDateTime": "2024-01-01T00:00:00Z", "status": "inactive", "name": "a" })
        );
    }

    #[test]
    fn apply_rejects_whole_batch_on_missing_document() {
        let mut collections = seeded();
        let before = collections.clone();
        let mut batch = WriteBatch::new();
        batch
            .update(
                DocumentRef::new("users", "a"),
                fields(json!({ "status": "inactive" })),
            )
            .update(
                DocumentRef::new("users", "ghost"),
                fields(json!({ "status": "inactive" })),
            );

        let result = collections.apply(&batch);
        assert!(matches!(result, Err(StoreError::MissingDocument(r)) if r.id() == "ghost"));
        assert_eq!(collections, before);
    }
}
