// Ring 1: Input Validation - required fields per collection
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::database::Collection;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

pub fn required_fields(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Buildings => &["name"],
        Collection::Floors => &["building_id", "floor_number"],
        Collection::Suites => &["floor_id", "suite_number"],
        Collection::Tenants => &["name"],
        Collection::Leases => &["tenant_id", "suite_id", "start_date", "end_date", "monthly_rent"],
        Collection::Payments => &["lease_id", "amount", "due_date"],
        Collection::Tickets => &["title"],
        Collection::Messages => &["recipient_id", "body"],
        _ => &[],
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Creates must supply every required field; updates may not clear one
#[derive(Default)]
pub struct RequiredFields;

#[async_trait]
impl Observer for RequiredFields {
    fn name(&self) -> &'static str {
        "RequiredFields"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        !required_fields(collection).is_empty()
    }

    fn priority(&self) -> u8 {
        10
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let mut field_errors = HashMap::new();

        for field in required_fields(ctx.collection) {
            let missing = match ctx.operation {
                Operation::Create => is_blank(ctx.changes.get(*field)),
                _ => ctx.changes.contains_key(*field) && is_blank(ctx.changes.get(*field)),
            };
            if missing {
                field_errors.insert(field.to_string(), "This field is required".to_string());
            }
        }

        if field_errors.is_empty() {
            return Ok(());
        }
        Err(ObserverError::InvalidFields {
            message: "Missing required fields".to_string(),
            field_errors,
        })
    }
}
