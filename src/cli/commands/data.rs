use clap::Subcommand;
use serde_json::Value;

use crate::cli::client::ApiClient;
use crate::cli::config::load_session;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum DataCommands {
    #[command(about = "List records with optional filtering")]
    List {
        #[arg(help = "Collection name (buildings, suites, leases, ...)")]
        collection: String,
        #[arg(long = "where", help = "JSON where clause, e.g. '{\"status\":\"vacant\"}'")]
        where_clause: Option<String>,
        #[arg(long, help = "Sort order, e.g. 'created_at desc'")]
        order: Option<String>,
        #[arg(long)]
        limit: Option<i32>,
        #[arg(long)]
        offset: Option<i32>,
    },

    #[command(about = "Show one record")]
    Get {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Record ID")]
        id: String,
    },

    #[command(about = "Create record from stdin JSON")]
    Create {
        #[arg(help = "Collection name")]
        collection: String,
    },

    #[command(about = "Merge stdin JSON into a record")]
    Update {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Record ID to update")]
        id: String,
    },

    #[command(about = "Delete a record")]
    Delete {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Record ID to delete")]
        id: String,
    },
}

/// `/api/data/<collection>` with the list parameters encoded as a query string
pub fn list_path(
    collection: &str,
    where_clause: Option<&str>,
    order: Option<&str>,
    limit: Option<i32>,
    offset: Option<i32>,
) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Some(where_clause) = where_clause {
        query.append_pair("where", where_clause);
    }
    if let Some(order) = order {
        query.append_pair("order", order);
    }
    if let Some(limit) = limit {
        query.append_pair("limit", &limit.to_string());
    }
    if let Some(offset) = offset {
        query.append_pair("offset", &offset.to_string());
    }

    let query = query.finish();
    if query.is_empty() {
        format!("/api/data/{}", collection)
    } else {
        format!("/api/data/{}?{}", collection, query)
    }
}

fn record_path(collection: &str, id: &str) -> String {
    format!("/api/data/{}/{}", collection, id)
}

pub async fn handle(cmd: DataCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let session = load_session()?;
    let client = ApiClient::authenticated(&session)?;

    match cmd {
        DataCommands::List { collection, where_clause, order, limit, offset } => {
            if let Some(raw) = &where_clause {
                serde_json::from_str::<Value>(raw).map_err(|e| anyhow::anyhow!("--where is not valid JSON: {}", e))?;
            }
            let path = list_path(&collection, where_clause.as_deref(), order.as_deref(), limit, offset);
            let records = client.get(&path).await?;
            output_records(&output_format, &collection, &records)
        }
        DataCommands::Get { collection, id } => {
            let record = client.get(&record_path(&collection, &id)).await?;
            output_value(&output_format, &record)
        }
        DataCommands::Create { collection } => {
            let body = read_json_stdin()?;
            let record = client.post(&format!("/api/data/{}", collection), &body).await?;
            let id = record.get("id").and_then(Value::as_str).unwrap_or("-");
            output_success(&output_format, &format!("Created {} record {}", collection, id), Some(record.clone()))
        }
        DataCommands::Update { collection, id } => {
            let body = read_json_stdin()?;
            let record = client.put(&record_path(&collection, &id), &body).await?;
            output_success(&output_format, &format!("Updated {} record {}", collection, id), Some(record))
        }
        DataCommands::Delete { collection, id } => {
            client.delete(&record_path(&collection, &id)).await?;
            output_success(&output_format, &format!("Deleted {} record {}", collection, id), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_parameters_are_url_encoded() {
        assert_eq!(list_path("suites", None, None, None, None), "/api/data/suites");
        assert_eq!(
            list_path("suites", Some(r#"{"status":"vacant"}"#), Some("created_at desc"), Some(5), None),
            "/api/data/suites?where=%7B%22status%22%3A%22vacant%22%7D&order=created_at+desc&limit=5"
        );
    }
}
