use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FilterError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
    NIn,
    Any,
    All,
    Size,
    Between,
    Exists,
}

impl FilterOp {
    pub fn parse(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$any" => FilterOp::Any,
            "$all" => FilterOp::All,
            "$size" => FilterOp::Size,
            "$between" => FilterOp::Between,
            "$exists" => FilterOp::Exists,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }
}

/// Query input accepted by list and find endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    #[serde(rename = "where", alias = "where_clause", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i32>,
}

impl FilterData {
    pub fn with_where(where_clause: Value) -> Self {
        Self {
            where_clause: Some(where_clause),
            ..Default::default()
        }
    }

    pub fn order_by(mut self, order: &str) -> Self {
        self.order = Some(Value::String(order.to_string()));
        self
    }

    pub fn paginate(mut self, limit: Option<i32>, offset: Option<i32>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

/// Document fields stored as real columns rather than inside the JSONB body
pub const SYSTEM_FIELDS: [&str; 4] = ["id", "organization_id", "created_at", "updated_at"];

/// A validated field reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    /// Column with the Postgres type its JSON parameters are cast to
    Column { name: &'static str, cast: &'static str },
    Body(String),
}

impl FieldRef {
    pub fn parse(field: &str) -> Result<FieldRef, FilterError> {
        match field {
            "id" => Ok(FieldRef::Column { name: "id", cast: "uuid" }),
            "organization_id" => Ok(FieldRef::Column { name: "organization_id", cast: "uuid" }),
            "created_at" => Ok(FieldRef::Column { name: "created_at", cast: "timestamptz" }),
            "updated_at" => Ok(FieldRef::Column { name: "updated_at", cast: "timestamptz" }),
            _ => {
                validate_field_name(field)?;
                Ok(FieldRef::Body(field.to_string()))
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FieldRef::Column { name, .. } => name,
            FieldRef::Body(name) => name,
        }
    }
}

pub fn validate_field_name(name: &str) -> Result<(), FilterError> {
    let mut chars = name.chars();
    let first_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if !first_ok || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(FilterError::InvalidColumn(format!("Invalid field name: {}", name)));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub field: FieldRef,
    pub operator: FilterOp,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub field: FieldRef,
    pub sort: SortDirection,
}

/// Bind parameter produced while compiling a filter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Json(Value),
    Text(String),
    TextArray(Vec<String>),
    Int(i64),
    Uuid(uuid::Uuid),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}
