use axum::extract::{Extension, Path, Query, State};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::filter::FilterData;
use crate::handlers::extract::parse_id;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, OrganizationContext, ValidatedUser};
use crate::services::GenericService;
use crate::state::AppState;

/// Query string of a list request; `where` and `order` hold JSON
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl ListQuery {
    pub fn into_filter(self) -> Result<FilterData, ApiError> {
        let where_clause = match self.where_clause.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                serde_json::from_str::<Value>(raw)
                    .map_err(|e| ApiError::invalid_json(format!("Invalid where parameter: {}", e)))?,
            ),
        };
        // `order` is either a JSON array/string or a plain "field dir" list
        let order = self.order.filter(|o| !o.trim().is_empty()).map(|raw| {
            serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw))
        });

        Ok(FilterData {
            where_clause,
            order,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

/// GET /api/data/:collection
pub async fn collection_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(collection): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Value>> {
    let collection = GenericService::collection(&collection)?;
    let records = GenericService::new(&state)
        .list(&user.actor(), collection, query.into_filter()?)
        .await?;
    Ok(ApiResponse::success(records.iter().map(|r| r.to_json()).collect()))
}

/// POST /api/data/:collection - quota-checked by the route layer
pub async fn collection_post(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Extension(organization): Extension<OrganizationContext>,
    Path(collection): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Value> {
    let collection = GenericService::collection(&collection)?;
    let record = GenericService::new(&state)
        .create(&user.actor(), organization.plan, collection, body)
        .await?;
    Ok(ApiResponse::created(record.to_json()))
}

/// GET /api/data/:collection/:id
pub async fn record_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path((collection, id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let collection = GenericService::collection(&collection)?;
    let id = parse_id(&id, || collection.not_found_message())?;
    let record = GenericService::new(&state).get(&user.actor(), collection, id).await?;
    Ok(ApiResponse::success(record.to_json()))
}

/// PUT/PATCH /api/data/:collection/:id - shallow merge of the body into the record
pub async fn record_put(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Extension(organization): Extension<OrganizationContext>,
    Path((collection, id)): Path<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Value> {
    let collection = GenericService::collection(&collection)?;
    let id = parse_id(&id, || collection.not_found_message())?;
    let record = GenericService::new(&state)
        .update(&user.actor(), organization.plan, collection, id, body)
        .await?;
    Ok(ApiResponse::success(record.to_json()))
}

/// DELETE /api/data/:collection/:id - returns the deleted record
pub async fn record_delete(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Extension(organization): Extension<OrganizationContext>,
    Path((collection, id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let collection = GenericService::collection(&collection)?;
    let id = parse_id(&id, || collection.not_found_message())?;
    let record = GenericService::new(&state)
        .delete(&user.actor(), organization.plan, collection, id)
        .await?;
    Ok(ApiResponse::success(record.to_json()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_query_parses_json_where_and_plain_order() {
        let query = ListQuery {
            where_clause: Some(r#"{"status":"vacant"}"#.to_string()),
            order: Some("suite_number desc".to_string()),
            limit: Some(5),
            offset: None,
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(filter.where_clause, Some(json!({"status": "vacant"})));
        assert_eq!(filter.order, Some(json!("suite_number desc")));
        assert_eq!(filter.limit, Some(5));
    }

    #[test]
    fn malformed_where_is_invalid_json() {
        let query = ListQuery {
            where_clause: Some("{status".to_string()),
            ..Default::default()
        };
        assert_eq!(query.into_filter().unwrap_err().error_code(), "INVALID_JSON");
    }
}
