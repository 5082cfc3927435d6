use serde_json::Value;

use super::error::FilterError;
use super::filter_where::json_expr;
use super::types::{FieldRef, FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match order {
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                // Expect array of strings like ["created_at desc", "name asc"]
                let mut out = Vec::new();
                for v in arr {
                    if let Value::String(s) = v {
                        out.extend(Self::parse_order_string(s)?);
                    }
                }
                Ok(out)
            }
            Value::Object(obj) => {
                // { "created_at": "desc", "name": "asc" }
                let mut out = Vec::new();
                for (k, v) in obj {
                    let sort = match v.as_str().unwrap_or("asc").to_ascii_lowercase().as_str() {
                        "desc" => SortDirection::Desc,
                        _ => SortDirection::Asc,
                    };
                    out.push(FilterOrderInfo { field: FieldRef::parse(k)?, sort });
                }
                Ok(out)
            }
            _ => Ok(vec![]),
        }
    }

    fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        // split on commas, then each token into field and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let dir = it.next().unwrap_or("asc");
                let sort = if dir.eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc };
                out.push(FilterOrderInfo { field: FieldRef::parse(col)?, sort });
            }
        }
        Ok(out)
    }

    /// Always ends with `created_at, id` so pages are stable
    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        let mut parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{} {}", json_expr(&i.field), i.sort.to_sql()))
            .collect();
        if !infos.iter().any(|i| i.field.name() == "created_at") {
            parts.push("\"created_at\" ASC".to_string());
        }
        parts.push("\"id\" ASC".to_string());
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_strings_arrays_and_objects() {
        let from_string = FilterOrder::validate_and_parse(&json!("due_date desc, amount")).unwrap();
        assert_eq!(from_string.len(), 2);
        assert_eq!(from_string[0].sort, SortDirection::Desc);
        assert_eq!(from_string[1].field.name(), "amount");

        let from_array = FilterOrder::validate_and_parse(&json!(["created_at desc"])).unwrap();
        assert_eq!(from_array[0].field.name(), "created_at");

        let from_object = FilterOrder::validate_and_parse(&json!({"name": "DESC"})).unwrap();
        assert_eq!(from_object[0].sort, SortDirection::Desc);
    }

    #[test]
    fn generated_order_is_stable() {
        let infos = FilterOrder::validate_and_parse(&json!("suite_number")).unwrap();
        assert_eq!(
            FilterOrder::generate(&infos),
            "ORDER BY (\"body\" -> 'suite_number') ASC, \"created_at\" ASC, \"id\" ASC"
        );
        assert_eq!(FilterOrder::generate(&[]), "ORDER BY \"created_at\" ASC, \"id\" ASC");
    }

    #[test]
    fn rejects_injection_in_order() {
        assert!(FilterOrder::validate_and_parse(&json!("name; DROP TABLE documents")).is_err());
    }
}
