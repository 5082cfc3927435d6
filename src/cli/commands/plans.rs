use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::plans::{Plan, QuotaResource};

fn limit_text(limit: Option<u64>) -> String {
    limit.map(|l| l.to_string()).unwrap_or_else(|| "unlimited".to_string())
}

/// Plan catalogue as JSON: limits per resource and enabled features
pub fn catalogue() -> Value {
    Value::Array(
        Plan::ALL
            .iter()
            .map(|plan| {
                json!({
                    "plan": plan,
                    "limits": plan.limits(),
                    "features": plan.features(),
                })
            })
            .collect(),
    )
}

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "plans": catalogue() }))?);
        }
        OutputFormat::Text => {
            print!("{:<12}", "PLAN");
            for resource in QuotaResource::ALL {
                print!("{:>11}", resource.as_str().to_uppercase());
            }
            println!("  FEATURES");
            println!("{}", "-".repeat(90));

            for plan in Plan::ALL {
                print!("{:<12}", plan.as_str());
                for resource in QuotaResource::ALL {
                    print!("{:>11}", limit_text(plan.limit(resource)));
                }
                let features: Vec<&str> = plan.features().iter().map(|f| f.as_str()).collect();
                println!("  {}", features.join(", "));
            }
        }
    }
    Ok(())
}
