use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, SqlParam, SqlResult};
use crate::database::{Collection, Scope};

pub const DOCUMENTS_TABLE: &str = "documents";
pub const DOCUMENT_COLUMNS: &str = "\"id\", \"collection\", \"organization_id\", \"body\", \"created_at\", \"updated_at\"";

/// Query over one collection of the `documents` table, restricted to a scope
pub struct Filter {
    collection: Collection,
    scope: Scope,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
}

impl Filter {
    pub fn new(collection: Collection, scope: Scope) -> Self {
        Self {
            collection,
            scope,
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
        }
    }

    pub fn assign(&mut self, data: &FilterData, max_limit: Option<i32>) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = &data.where_clause {
            self.where_clause(where_clause.clone())?;
        }
        if let Some(order) = &data.order {
            self.order(order)?;
        }
        if data.limit.is_some() || data.offset.is_some() {
            self.limit(data.limit, data.offset, max_limit)?;
        }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: &Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: Option<i32>, offset: Option<i32>, max_limit: Option<i32>) -> Result<&mut Self, FilterError> {
        if let Some(l) = limit {
            if l < 0 {
                return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
            }
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
        }

        let applied_limit = match (limit, max_limit) {
            (Some(l), Some(max)) if l > max => {
                tracing::debug!("Limit {} exceeds max {}, capping to max", l, max);
                Some(max)
            }
            (None, Some(max)) => Some(max),
            (l, _) => l,
        };

        self.limit = applied_limit;
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {}", DOCUMENT_COLUMNS),
            format!("FROM \"{}\"", DOCUMENTS_TABLE),
            format!("WHERE {}", where_result.query),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    /// Scope predicate followed by the user filter
    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let mut params = vec![SqlParam::Text(self.collection.as_str().to_string())];
        let mut conditions = vec!["\"collection\" = $1".to_string()];

        if let Scope::Organization(organization_id) = self.scope {
            params.push(SqlParam::Uuid(organization_id));
            conditions.push(format!("\"organization_id\" = ${}", params.len()));
        }

        if let Some(where_data) = &self.where_data {
            let (where_sql, where_params) = FilterWhere::generate(where_data, params.len())?;
            if where_sql != "1=1" {
                conditions.push(format!("({})", where_sql));
            }
            params.extend(where_params);
        }

        Ok(SqlResult {
            query: conditions.join(" AND "),
            params,
        })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        Ok(SqlResult {
            query: format!(
                "SELECT COUNT(*) AS count FROM \"{}\" WHERE {}",
                DOCUMENTS_TABLE, where_result.query
            ),
            params: where_result.params,
        })
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn organization_scope_precedes_user_filter() {
        let org = Uuid::new_v4();
        let mut filter = Filter::new(Collection::Suites, Scope::Organization(org));
        filter
            .assign(&FilterData::with_where(json!({"status": "vacant"})).paginate(Some(10), Some(20)), Some(100))
            .unwrap();
        let sql = filter.to_sql().unwrap();

        assert_eq!(
            sql.query,
            "SELECT \"id\", \"collection\", \"organization_id\", \"body\", \"created_at\", \"updated_at\" \
             FROM \"documents\" WHERE \"collection\" = $1 AND \"organization_id\" = $2 \
             AND ((\"body\" -> 'status') = $3) ORDER BY \"created_at\" ASC, \"id\" ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params[0], SqlParam::Text("suites".into()));
        assert_eq!(sql.params[1], SqlParam::Uuid(org));
        assert_eq!(sql.params[2], SqlParam::Json(json!("vacant")));
    }

    #[test]
    fn global_scope_skips_organization_predicate() {
        let mut filter = Filter::new(Collection::Users, Scope::Global);
        filter.where_clause(json!({"email": "a@b.co"})).unwrap();
        let sql = filter.to_count_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT COUNT(*) AS count FROM \"documents\" WHERE \"collection\" = $1 AND ((\"body\" -> 'email') = $2)"
        );
    }

    #[test]
    fn limit_is_capped_and_validated() {
        let mut filter = Filter::new(Collection::Tickets, Scope::Global);
        filter.limit(Some(5000), None, Some(100)).unwrap();
        assert!(filter.to_sql().unwrap().query.ends_with("LIMIT 100"));
        assert!(filter.limit(Some(-1), None, None).is_err());
        assert!(filter.limit(None, Some(-1), None).is_err());
    }
}
