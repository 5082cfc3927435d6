use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::collection::Collection;
use super::manager::DatabaseError;
use super::store::{now, Document, DocumentStore, NewDocument, Scope};
use crate::filter::filter_order::FilterOrder;
use crate::filter::{matcher, FilterData, FilterError};

/// In-process document store for development and tests
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<Uuid, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching<'a>(
        documents: &'a HashMap<Uuid, Document>,
        collection: Collection,
        scope: Scope,
        where_clause: Option<&Value>,
    ) -> Result<Vec<&'a Document>, DatabaseError> {
        let mut out = Vec::new();
        for doc in documents.values() {
            if doc.collection != collection || !scope.admits(doc.organization_id) {
                continue;
            }
            let keep = match where_clause {
                Some(w) => matcher::matches(w, &doc.flatten())?,
                None => true,
            };
            if keep {
                out.push(doc);
            }
        }
        Ok(out)
    }

    /// Mirrors the case-insensitive unique index on user emails
    fn check_unique_email(
        documents: &HashMap<Uuid, Document>,
        collection: Collection,
        id: Uuid,
        body: &Map<String, Value>,
    ) -> Result<(), DatabaseError> {
        if collection != Collection::Users {
            return Ok(());
        }
        let Some(email) = body.get("email").and_then(Value::as_str) else {
            return Ok(());
        };
        let taken = documents.values().any(|d| {
            d.collection == Collection::Users
                && d.id != id
                && d.get_str("email").is_some_and(|e| e.eq_ignore_ascii_case(email))
        });
        if taken {
            return Err(DatabaseError::UniqueViolation("documents_users_email_idx".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: Collection, document: NewDocument) -> Result<Document, DatabaseError> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(&document.id) {
            return Err(DatabaseError::UniqueViolation("documents_pkey".to_string()));
        }
        Self::check_unique_email(&documents, collection, document.id, &document.body)?;

        let ts = now();
        let stored = Document {
            id: document.id,
            collection,
            organization_id: document.organization_id,
            body: document.body,
            created_at: ts,
            updated_at: ts,
        };
        documents.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find(&self, collection: Collection, scope: Scope, data: &FilterData) -> Result<Vec<Document>, DatabaseError> {
        if data.limit.is_some_and(|l| l < 0) {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()).into());
        }
        if data.offset.is_some_and(|o| o < 0) {
            return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()).into());
        }
        let order = match &data.order {
            Some(order) => FilterOrder::validate_and_parse(order)?,
            None => vec![],
        };

        let documents = self.documents.read().await;
        let mut found = Self::matching(&documents, collection, scope, data.where_clause.as_ref())?
            .into_iter()
            .map(|d| (d.flatten(), d))
            .collect::<Vec<_>>();
        found.sort_by(|(a, _), (b, _)| matcher::compare_records(a, b, &order));

        let offset = data.offset.unwrap_or(0) as usize;
        let limit = data.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(found.into_iter().skip(offset).take(limit).map(|(_, d)| d.clone()).collect())
    }

    async fn find_by_id(&self, collection: Collection, scope: Scope, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(&id)
            .filter(|d| d.collection == collection && scope.admits(d.organization_id))
            .cloned())
    }

    async fn update(
        &self,
        collection: Collection,
        scope: Scope,
        id: Uuid,
        changes: Map<String, Value>,
    ) -> Result<Option<Document>, DatabaseError> {
        let mut documents = self.documents.write().await;
        let visible = documents
            .get(&id)
            .is_some_and(|d| d.collection == collection && scope.admits(d.organization_id));
        if !visible {
            return Ok(None);
        }
        Self::check_unique_email(&documents, collection, id, &changes)?;

        let Some(doc) = documents.get_mut(&id) else {
            return Ok(None);
        };
        doc.body.extend(changes);
        doc.updated_at = now();
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: Collection, scope: Scope, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let mut documents = self.documents.write().await;
        let visible = documents
            .get(&id)
            .is_some_and(|d| d.collection == collection && scope.admits(d.organization_id));
        if !visible {
            return Ok(None);
        }
        Ok(documents.remove(&id))
    }

    async fn count(&self, collection: Collection, scope: Scope, where_clause: Option<Value>) -> Result<u64, DatabaseError> {
        let documents = self.documents.read().await;
        Ok(Self::matching(&documents, collection, scope, where_clause.as_ref())?.len() as u64)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
