//! In-process evaluation of WHERE documents, used by the memory store.
//!
//! Mirrors the semantics of [`FilterWhere`](super::filter_where::FilterWhere):
//! comparisons only match values of the same JSON type, `$ne`/`$nin` match
//! missing fields, and system columns compare as uuids or timestamps.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::FilterError;
use super::filter_where::FilterWhere;
use super::types::{FieldRef, FilterOp, FilterOrderInfo, FilterWhereInfo, SortDirection};

/// Evaluate `where_data` against a flattened record (system fields plus body)
pub fn matches(where_data: &Value, record: &Map<String, Value>) -> Result<bool, FilterError> {
    let obj = match where_data {
        Value::Null => return Ok(true),
        Value::Object(obj) => obj,
        _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
    };

    for (key, value) in obj {
        let ok = if key.starts_with('$') {
            matches_logical(key, value, record)?
        } else {
            let mut all = true;
            for condition in FilterWhere::parse_field_condition(key, value)? {
                if !matches_condition(&condition, record)? {
                    all = false;
                    break;
                }
            }
            all
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_logical(op: &str, value: &Value, record: &Map<String, Value>) -> Result<bool, FilterError> {
    match op {
        "$and" | "$or" => {
            let arr = value
                .as_array()
                .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
            if op == "$and" {
                for v in arr {
                    if !matches(v, record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            } else {
                for v in arr {
                    if matches(v, record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
        "$not" => Ok(!matches(value, record)?),
        _ => Err(FilterError::UnsupportedOperator(op.to_string())),
    }
}

fn matches_condition(condition: &FilterWhereInfo, record: &Map<String, Value>) -> Result<bool, FilterError> {
    let field = &condition.field;
    let data = &condition.data;
    let actual = record.get(field.name()).filter(|v| !matches!(field, FieldRef::Column { .. }) || !v.is_null());

    Ok(match condition.operator {
        FilterOp::Eq => match (actual, data) {
            (None, Value::Null) => true,
            (Some(Value::Null), Value::Null) => true,
            (Some(a), d) => values_equal(field, a, d)?,
            (None, _) => false,
        },
        FilterOp::Ne => match (actual, data) {
            (None, Value::Null) | (Some(Value::Null), Value::Null) => false,
            (Some(a), d) => !values_equal(field, a, d)?,
            (None, _) => true,
        },
        FilterOp::Gt => compare(field, actual, data)? == Some(Ordering::Greater),
        FilterOp::Gte => matches!(compare(field, actual, data)?, Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Lt => compare(field, actual, data)? == Some(Ordering::Less),
        FilterOp::Lte => matches!(compare(field, actual, data)?, Some(Ordering::Less | Ordering::Equal)),
        FilterOp::Like | FilterOp::ILike => {
            let pattern = data
                .as_str()
                .ok_or_else(|| FilterError::InvalidOperatorData("$like/$ilike require a string pattern".to_string()))?;
            match actual.and_then(as_text) {
                Some(text) if condition.operator == FilterOp::ILike => {
                    like(&text.to_lowercase(), &pattern.to_lowercase())
                }
                Some(text) => like(&text, pattern),
                None => false,
            }
        }
        FilterOp::In => match data {
            Value::Array(values) => match actual {
                Some(a) => any_equal(field, a, values)?,
                None => false,
            },
            single => match actual {
                Some(a) => values_equal(field, a, single)?,
                None => false,
            },
        },
        FilterOp::NIn => {
            let values = data
                .as_array()
                .ok_or_else(|| FilterError::InvalidOperatorData("$nin requires array".to_string()))?;
            match actual {
                Some(a) => !any_equal(field, a, values)?,
                None => true,
            }
        }
        FilterOp::Between => {
            let values = match data {
                Value::Array(values) if values.len() == 2 => values,
                _ => return Err(FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string())),
            };
            let low = compare(field, actual, &values[0])?;
            let high = compare(field, actual, &values[1])?;
            matches!(low, Some(Ordering::Greater | Ordering::Equal)) && matches!(high, Some(Ordering::Less | Ordering::Equal))
        }
        FilterOp::All => {
            require_body(field, "$all")?;
            let wanted = match data {
                Value::Array(_) => data.clone(),
                other => Value::Array(vec![other.clone()]),
            };
            actual.map(|a| contains(a, &wanted)).unwrap_or(false)
        }
        FilterOp::Any => {
            require_body(field, "$any")?;
            let values = match data {
                Value::Array(values) => values.clone(),
                other => vec![other.clone()],
            };
            let wanted = values
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<String>>>()
                .ok_or_else(|| FilterError::InvalidOperatorData("$any requires string values".to_string()))?;
            match actual {
                Some(Value::Array(items)) => items.iter().any(|i| i.as_str().map(|s| wanted.iter().any(|w| w == s)).unwrap_or(false)),
                Some(Value::Object(obj)) => wanted.iter().any(|w| obj.contains_key(w)),
                Some(Value::String(s)) => wanted.iter().any(|w| w == s),
                _ => false,
            }
        }
        FilterOp::Size => {
            require_body(field, "$size")?;
            let size = data
                .as_i64()
                .ok_or_else(|| FilterError::InvalidOperatorData("$size requires an integer".to_string()))?;
            matches!(actual, Some(Value::Array(items)) if items.len() as i64 == size)
        }
        FilterOp::Exists => {
            let should_exist = data
                .as_bool()
                .ok_or_else(|| FilterError::InvalidOperatorData("$exists requires a boolean".to_string()))?;
            record.get(field.name()).is_some_and(|v| !v.is_null() || matches!(field, FieldRef::Body(_))) == should_exist
        }
    })
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

fn any_equal(field: &FieldRef, actual: &Value, values: &[Value]) -> Result<bool, FilterError> {
    for v in values {
        if values_equal(field, actual, v)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn values_equal(field: &FieldRef, actual: &Value, expected: &Value) -> Result<bool, FilterError> {
    match field {
        FieldRef::Body(_) => Ok(json_equal(actual, expected)),
        FieldRef::Column { .. } => Ok(compare_column(field, actual, expected)? == Some(Ordering::Equal)),
    }
}

/// jsonb equality: numbers compare by value, everything else structurally
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_equal(l, r)),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| json_equal(v, w)))
        }
        _ => a == b,
    }
}

/// jsonb containment (`@>`)
fn contains(container: &Value, wanted: &Value) -> bool {
    match (container, wanted) {
        (Value::Object(c), Value::Object(w)) => w.iter().all(|(k, v)| c.get(k).is_some_and(|cv| contains(cv, v))),
        (Value::Array(c), Value::Array(w)) => w.iter().all(|wv| c.iter().any(|cv| contains(cv, wv))),
        (Value::Array(c), scalar) if !scalar.is_object() && !scalar.is_array() => c.iter().any(|cv| json_equal(cv, scalar)),
        _ => json_equal(container, wanted),
    }
}

fn compare(field: &FieldRef, actual: Option<&Value>, expected: &Value) -> Result<Option<Ordering>, FilterError> {
    let Some(actual) = actual else {
        return Ok(None);
    };
    match field {
        FieldRef::Body(_) => Ok(compare_same_type(actual, expected)),
        FieldRef::Column { .. } => compare_column(field, actual, expected),
    }
}

fn compare_same_type(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn compare_column(field: &FieldRef, actual: &Value, expected: &Value) -> Result<Option<Ordering>, FilterError> {
    let FieldRef::Column { name, cast } = field else {
        return Ok(compare_same_type(actual, expected));
    };
    let expected = expected
        .as_str()
        .ok_or_else(|| FilterError::InvalidOperatorData(format!("'{}' must be compared with a string", name)))?;
    let Some(actual) = actual.as_str() else {
        return Ok(None);
    };
    match *cast {
        "uuid" => {
            let expected = Uuid::parse_str(expected)
                .map_err(|_| FilterError::InvalidOperatorData(format!("'{}' is not a valid uuid", expected)))?;
            Ok(Uuid::parse_str(actual).ok().map(|a| a.cmp(&expected)))
        }
        "timestamptz" => {
            let expected = parse_timestamp(expected)
                .ok_or_else(|| FilterError::InvalidOperatorData(format!("'{}' is not a valid timestamp", expected)))?;
            Ok(parse_timestamp(actual).map(|a| a.cmp(&expected)))
        }
        _ => Ok(Some(actual.cmp(expected))),
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

/// The `->>` text rendering of a value
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// SQL LIKE with `%` and `_` wildcards and `\` escapes
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => tokens.push(LikeToken::Literal(chars.next().unwrap_or('\\'))),
            '%' => tokens.push(LikeToken::Many),
            '_' => tokens.push(LikeToken::One),
            c => tokens.push(LikeToken::Literal(c)),
        }
    }

    // dp[j]: pattern prefix of length j matches the text consumed so far
    let mut dp = vec![false; tokens.len() + 1];
    dp[0] = true;
    for j in 1..=tokens.len() {
        dp[j] = dp[j - 1] && tokens[j - 1] == LikeToken::Many;
    }
    for &ch in &text {
        let mut next = vec![false; tokens.len() + 1];
        for j in 1..=tokens.len() {
            next[j] = match tokens[j - 1] {
                LikeToken::Many => next[j - 1] || dp[j],
                LikeToken::One => dp[j - 1],
                LikeToken::Literal(l) => dp[j - 1] && l == ch,
            };
        }
        dp = next;
    }
    dp[tokens.len()]
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LikeToken {
    Literal(char),
    One,
    Many,
}

/// Sort order matching the SQL `ORDER BY` emitted for the same order
pub fn compare_records(a: &Map<String, Value>, b: &Map<String, Value>, order: &[FilterOrderInfo]) -> Ordering {
    for info in order {
        let ord = compare_for_order(a.get(info.field.name()), b.get(info.field.name()));
        let ord = match info.sort {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    let tail = ["created_at", "id"];
    for key in tail {
        let ord = compare_for_order(a.get(key), b.get(key));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// jsonb ordering: null < string < number < boolean < array < object, missing last
fn compare_for_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::String(_) => 1,
            Value::Number(_) => 2,
            Value::Bool(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => match rank(x).cmp(&rank(y)) {
            Ordering::Equal => compare_same_type(x, y).unwrap_or(Ordering::Equal),
            other => other,
        },
    }
}
