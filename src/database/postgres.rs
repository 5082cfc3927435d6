use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use super::collection::Collection;
use super::manager::{DatabaseError, DatabaseManager};
use super::store::{now, Document, DocumentStore, NewDocument, Scope};
use crate::filter::filter::{DOCUMENTS_TABLE, DOCUMENT_COLUMNS};
use crate::filter::{Filter, FilterData, SqlParam, SqlResult};

/// Document store over the Postgres `documents` table
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn id_filter(collection: Collection, scope: Scope, id: Uuid) -> Result<SqlResult, DatabaseError> {
        let mut filter = Filter::new(collection, scope);
        filter.where_clause(json!({ "id": id.to_string() }))?;
        Ok(filter.to_where_sql()?)
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: Vec<SqlParam>,
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Json(value) => query.bind(sqlx::types::Json(value)),
            SqlParam::Text(text) => query.bind(text),
            SqlParam::TextArray(values) => query.bind(values),
            SqlParam::Int(n) => query.bind(n),
            SqlParam::Uuid(id) => query.bind(id),
        };
    }
    query
}

fn row_to_document(row: &PgRow) -> Result<Document, DatabaseError> {
    let collection: String = row.try_get("collection")?;
    let collection = collection.parse::<Collection>().map_err(DatabaseError::QueryError)?;
    let body = match row.try_get::<Value, _>("body")? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Ok(Document {
        id: row.try_get("id")?,
        collection,
        organization_id: row.try_get("organization_id")?,
        body,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_write_error(err: sqlx::Error) -> DatabaseError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            return DatabaseError::UniqueViolation(db.constraint().unwrap_or("documents").to_string());
        }
    }
    DatabaseError::Sqlx(err)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: Collection, document: NewDocument) -> Result<Document, DatabaseError> {
        let sql = format!(
            "INSERT INTO \"{}\" (\"id\", \"collection\", \"organization_id\", \"body\", \"created_at\", \"updated_at\") \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING {}",
            DOCUMENTS_TABLE, DOCUMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(document.id)
            .bind(collection.as_str())
            .bind(document.organization_id)
            .bind(sqlx::types::Json(Value::Object(document.body)))
            .bind(now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;
        row_to_document(&row)
    }

    async fn find(&self, collection: Collection, scope: Scope, data: &FilterData) -> Result<Vec<Document>, DatabaseError> {
        let mut filter = Filter::new(collection, scope);
        filter.assign(data, None)?;
        let SqlResult { query, params } = filter.to_sql()?;
        debug!(collection = %collection, sql = %query, "find");

        let rows = bind_params(sqlx::query(&query), params).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_document).collect()
    }

    async fn find_by_id(&self, collection: Collection, scope: Scope, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let SqlResult { query, params } = Self::id_filter(collection, scope, id)?;
        let sql = format!("SELECT {} FROM \"{}\" WHERE {}", DOCUMENT_COLUMNS, DOCUMENTS_TABLE, query);
        let row = bind_params(sqlx::query(&sql), params).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn update(
        &self,
        collection: Collection,
        scope: Scope,
        id: Uuid,
        changes: Map<String, Value>,
    ) -> Result<Option<Document>, DatabaseError> {
        let SqlResult { query, mut params } = Self::id_filter(collection, scope, id)?;
        params.push(SqlParam::Json(Value::Object(changes)));
        let body_param = params.len();
        let sql = format!(
            "UPDATE \"{}\" SET \"body\" = \"body\" || ${}::jsonb, \"updated_at\" = now() WHERE {} RETURNING {}",
            DOCUMENTS_TABLE, body_param, query, DOCUMENT_COLUMNS
        );
        let row = bind_params(sqlx::query(&sql), params)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn delete(&self, collection: Collection, scope: Scope, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let SqlResult { query, params } = Self::id_filter(collection, scope, id)?;
        let sql = format!("DELETE FROM \"{}\" WHERE {} RETURNING {}", DOCUMENTS_TABLE, query, DOCUMENT_COLUMNS);
        let row = bind_params(sqlx::query(&sql), params).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn count(&self, collection: Collection, scope: Scope, where_clause: Option<Value>) -> Result<u64, DatabaseError> {
        let mut filter = Filter::new(collection, scope);
        if let Some(where_clause) = where_clause {
            filter.where_clause(where_clause)?;
        }
        let SqlResult { query, params } = filter.to_count_sql()?;
        let row = bind_params(sqlx::query(&query), params).fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
