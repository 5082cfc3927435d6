use serde_json::Value;

use super::error::FilterError;
use super::types::{FieldRef, FilterOp, FilterWhereInfo, SqlParam};

/// Compiles a Mongo-style WHERE document into a parameterised Postgres predicate
/// over the `documents` table (JSONB `body` plus system columns).
pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    starting_param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            starting_param_index,
        }
    }

    /// Returns the predicate and the parameters it references. Placeholders are
    /// numbered after `starting_param_index` parameters already bound by the caller.
    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<SqlParam>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build_clause(where_data)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build_clause(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok("1=1".to_string()),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        let mut sql_conditions = vec![];
        for (key, value) in obj {
            if key.starts_with('$') {
                sql_conditions.push(self.build_logical_operator(key, value)?);
            } else {
                for condition in Self::parse_field_condition(key, value)? {
                    sql_conditions.push(self.build_sql_condition(&condition)?);
                }
            }
        }

        if sql_conditions.is_empty() {
            Ok("1=1".to_string())
        } else {
            Ok(sql_conditions.join(" AND "))
        }
    }

    fn build_logical_operator(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    return Ok(if op == "$and" { "1=1" } else { "1=0" }.to_string());
                }
                let mut sql_parts = Vec::with_capacity(arr.len());
                for v in arr {
                    sql_parts.push(format!("({})", self.build_clause(v)?));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", sql_parts.join(joiner)))
            }
            "$not" => Ok(format!("NOT ({})", self.build_clause(value)?)),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    /// `{ field: value }` is implicit equality; `{ field: { "$op": data, ... } }` lists operators
    pub fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        let field_ref = FieldRef::parse(field)?;
        match value {
            Value::Object(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) => obj
                .iter()
                .map(|(op_key, op_val)| {
                    Ok(FilterWhereInfo {
                        field: field_ref.clone(),
                        operator: FilterOp::parse(op_key)?,
                        data: op_val.clone(),
                    })
                })
                .collect(),
            _ => Ok(vec![FilterWhereInfo {
                field: field_ref,
                operator: FilterOp::Eq,
                data: value.clone(),
            }]),
        }
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let field = &condition.field;
        let data = &condition.data;
        let expr = json_expr(field);

        match condition.operator {
            FilterOp::Eq => match (field, data) {
                (FieldRef::Body(_), Value::Null) => Ok(format!("({expr} IS NULL OR {expr} = 'null'::jsonb)")),
                (FieldRef::Column { .. }, Value::Null) => Ok(format!("{expr} IS NULL")),
                _ => Ok(format!("{} = {}", expr, self.value_param(field, data)?)),
            },
            FilterOp::Ne => match (field, data) {
                (FieldRef::Body(_), Value::Null) => Ok(format!("({expr} IS NOT NULL AND {expr} <> 'null'::jsonb)")),
                (FieldRef::Column { .. }, Value::Null) => Ok(format!("{expr} IS NOT NULL")),
                _ => Ok(format!("({} IS NULL OR {} <> {})", expr, expr, self.value_param(field, data)?)),
            },
            FilterOp::Gt => self.comparison(field, ">", data),
            FilterOp::Gte => self.comparison(field, ">=", data),
            FilterOp::Lt => self.comparison(field, "<", data),
            FilterOp::Lte => self.comparison(field, "<=", data),
            FilterOp::Like | FilterOp::ILike => {
                let pattern = data
                    .as_str()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$like/$ilike require a string pattern".to_string()))?;
                let keyword = if condition.operator == FilterOp::Like { "LIKE" } else { "ILIKE" };
                let placeholder = self.param(SqlParam::Text(pattern.to_string()));
                Ok(format!("{} {} {}", text_expr(field), keyword, placeholder))
            }
            FilterOp::In => {
                if let Value::Array(values) = data {
                    if values.is_empty() {
                        return Ok("1=0".to_string());
                    }
                    let params = self.value_params(field, values)?;
                    Ok(format!("{} IN ({})", expr, params.join(", ")))
                } else {
                    Ok(format!("{} = {}", expr, self.value_param(field, data)?))
                }
            }
            FilterOp::NIn => {
                let values = data
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$nin requires array".to_string()))?;
                if values.is_empty() {
                    return Ok("1=1".to_string());
                }
                let params = self.value_params(field, values)?;
                Ok(format!("({} IS NULL OR {} NOT IN ({}))", expr, expr, params.join(", ")))
            }
            FilterOp::Between => {
                let values = match data {
                    Value::Array(values) if values.len() == 2 => values,
                    _ => return Err(FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string())),
                };
                let low = self.value_param(field, &values[0])?;
                let high = self.value_param(field, &values[1])?;
                match field {
                    FieldRef::Body(_) => Ok(format!(
                        "(jsonb_typeof({expr}) = jsonb_typeof({low}) AND {expr} BETWEEN {low} AND {high})"
                    )),
                    FieldRef::Column { .. } => Ok(format!("{expr} BETWEEN {low} AND {high}")),
                }
            }
            FilterOp::All => {
                Self::require_body(field, "$all")?;
                let array = match data {
                    Value::Array(_) => data.clone(),
                    other => Value::Array(vec![other.clone()]),
                };
                let placeholder = self.param(SqlParam::Json(array));
                Ok(format!("{} @> {}", expr, placeholder))
            }
            FilterOp::Any => {
                Self::require_body(field, "$any")?;
                let values = match data {
                    Value::Array(values) => values.clone(),
                    other => vec![other.clone()],
                };
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let strings = values
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<String>>>()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$any requires string values".to_string()))?;
                let placeholder = self.param(SqlParam::TextArray(strings));
                Ok(format!("{} ?| {}", expr, placeholder))
            }
            FilterOp::Size => {
                Self::require_body(field, "$size")?;
                let size = data
                    .as_i64()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$size requires an integer".to_string()))?;
                let placeholder = self.param(SqlParam::Int(size));
                Ok(format!(
                    "(CASE WHEN jsonb_typeof({expr}) = 'array' THEN jsonb_array_length({expr}) END) = {placeholder}"
                ))
            }
            FilterOp::Exists => {
                let should_exist = data
                    .as_bool()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$exists requires a boolean".to_string()))?;
                match field {
                    FieldRef::Body(name) => {
                        let placeholder = self.param(SqlParam::Text(name.clone()));
                        if should_exist {
                            Ok(format!("jsonb_exists(\"body\", {})", placeholder))
                        } else {
                            Ok(format!("NOT jsonb_exists(\"body\", {})", placeholder))
                        }
                    }
                    FieldRef::Column { .. } => Ok(if should_exist {
                        format!("{expr} IS NOT NULL")
                    } else {
                        format!("{expr} IS NULL")
                    }),
                }
            }
        }
    }

    fn comparison(&mut self, field: &FieldRef, sql_op: &str, data: &Value) -> Result<String, FilterError> {
        let expr = json_expr(field);
        let placeholder = self.value_param(field, data)?;
        match field {
            // jsonb orders across types; restrict to same-typed values
            FieldRef::Body(_) => Ok(format!(
                "(jsonb_typeof({expr}) = jsonb_typeof({placeholder}) AND {expr} {sql_op} {placeholder})"
            )),
            FieldRef::Column { .. } => Ok(format!("{expr} {sql_op} {placeholder}")),
        }
    }

    fn require_body(field: &FieldRef, op: &str) -> Result<(), FilterError> {
        match field {
            FieldRef::Body(_) => Ok(()),
            FieldRef::Column { name, .. } => Err(FilterError::InvalidOperatorData(format!(
                "{} is not supported on system field '{}'",
                op, name
            ))),
        }
    }

    fn value_params(&mut self, field: &FieldRef, values: &[Value]) -> Result<Vec<String>, FilterError> {
        values.iter().map(|v| self.value_param(field, v)).collect()
    }

    /// Body fields compare as jsonb; system columns cast a text parameter to the column type
    fn value_param(&mut self, field: &FieldRef, value: &Value) -> Result<String, FilterError> {
        match field {
            FieldRef::Body(_) => Ok(self.param(SqlParam::Json(value.clone()))),
            FieldRef::Column { name, cast } => {
                let text = value.as_str().ok_or_else(|| {
                    FilterError::InvalidOperatorData(format!("'{}' must be compared with a string", name))
                })?;
                let placeholder = self.param(SqlParam::Text(text.to_string()));
                Ok(format!("{}::{}", placeholder, cast))
            }
        }
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        format!("${}", self.starting_param_index + self.param_values.len())
    }
}

pub fn json_expr(field: &FieldRef) -> String {
    match field {
        FieldRef::Column { name, .. } => format!("\"{}\"", name),
        FieldRef::Body(name) => format!("(\"body\" -> '{}')", name),
    }
}

pub fn text_expr(field: &FieldRef) -> String {
    match field {
        FieldRef::Column { name, .. } => format!("\"{}\"::text", name),
        FieldRef::Body(name) => format!("(\"body\" ->> '{}')", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn implicit_equality_binds_json() {
        let (sql, params) = FilterWhere::generate(&json!({"status": "open"}), 0).unwrap();
        assert_eq!(sql, "(\"body\" -> 'status') = $1");
        assert_eq!(params, vec![SqlParam::Json(json!("open"))]);
    }

    #[test]
    fn numbering_continues_after_existing_params() {
        let (sql, params) = FilterWhere::generate(&json!({"floor_id": "f1", "suite_number": {"$in": ["101", 101]}}), 2).unwrap();
        assert!(sql.contains("(\"body\" -> 'floor_id') = $3"), "{}", sql);
        assert!(sql.contains("IN ($4, $5)"), "{}", sql);
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn system_columns_cast_text_params() {
        let id = "6f1c2f8e-3a4b-4c5d-8e9f-0a1b2c3d4e5f";
        let (sql, params) = FilterWhere::generate(&json!({"id": {"$ne": id}}), 0).unwrap();
        assert_eq!(sql, "(\"id\" IS NULL OR \"id\" <> $1::uuid)");
        assert_eq!(params, vec![SqlParam::Text(id.to_string())]);
    }

    #[test]
    fn comparisons_guard_json_types() {
        let (sql, _) = FilterWhere::generate(&json!({"amount": {"$gt": 100}}), 0).unwrap();
        assert_eq!(
            sql,
            "(jsonb_typeof((\"body\" -> 'amount')) = jsonb_typeof($1) AND (\"body\" -> 'amount') > $1)"
        );
    }

    #[test]
    fn logical_operators_nest() {
        let (sql, params) = FilterWhere::generate(
            &json!({"$or": [{"sender_id": "a"}, {"recipient_id": "a"}], "$not": {"status": "closed"}}),
            0,
        )
        .unwrap();
        // keys are visited in sorted order: "$not" before "$or"
        assert!(sql.contains("NOT ((\"body\" -> 'status') = $1)"), "{}", sql);
        assert!(sql.contains("((\"body\" -> 'sender_id') = $2) OR ((\"body\" -> 'recipient_id') = $3)"), "{}", sql);
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let (sql, params) = FilterWhere::generate(&json!({"status": {"$in": []}}), 0).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn array_operators_use_jsonb_containment() {
        let (sql, params) = FilterWhere::generate(&json!({"recipients": {"$all": ["u1"]}}), 0).unwrap();
        assert_eq!(sql, "(\"body\" -> 'recipients') @> $1");
        assert_eq!(params, vec![SqlParam::Json(json!(["u1"]))]);

        let (sql, params) = FilterWhere::generate(&json!({"tags": {"$any": ["a", "b"]}}), 0).unwrap();
        assert_eq!(sql, "(\"body\" -> 'tags') ?| $1");
        assert_eq!(params, vec![SqlParam::TextArray(vec!["a".into(), "b".into()])]);
    }

    #[test]
    fn rejects_unsafe_field_names_and_unknown_operators() {
        assert!(FilterWhere::generate(&json!({"name'; DROP TABLE documents; --": 1}), 0).is_err());
        assert!(FilterWhere::generate(&json!({"name": {"$regex": "x"}}), 0).is_err());
        assert!(FilterWhere::generate(&json!({"created_at": {"$all": ["x"]}}), 0).is_err());
    }

    #[test]
    fn nested_plain_objects_are_equality() {
        let (sql, params) = FilterWhere::generate(&json!({"address": {"city": "Austin"}}), 0).unwrap();
        assert_eq!(sql, "(\"body\" -> 'address') = $1");
        assert_eq!(params, vec![SqlParam::Json(json!({"city": "Austin"}))]);
    }
}
