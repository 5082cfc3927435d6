// Ring 1: Input Validation - formats, enumerations, money and references
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::Collection;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

pub const SUITE_STATUSES: [&str; 3] = ["vacant", "occupied", "maintenance"];
pub const LEASE_STATUSES: [&str; 4] = ["pending", "active", "ended", "terminated"];
pub const PAYMENT_STATUSES: [&str; 5] = ["pending", "paid", "overdue", "failed", "refunded"];
pub const TICKET_STATUSES: [&str; 4] = ["open", "in_progress", "resolved", "closed"];
pub const TICKET_PRIORITIES: [&str; 4] = ["low", "medium", "high", "urgent"];

const REFERENCE_FIELDS: [&str; 8] = [
    "building_id",
    "floor_id",
    "suite_id",
    "tenant_id",
    "lease_id",
    "recipient_id",
    "assigned_to",
    "user_id",
];

const TEXT_FIELDS: [&str; 6] = ["name", "title", "body", "description", "phone", "notes"];

pub fn enum_values(collection: Collection, field: &str) -> Option<&'static [&'static str]> {
    match (collection, field) {
        (Collection::Suites, "status") => Some(&SUITE_STATUSES),
        (Collection::Leases, "status") => Some(&LEASE_STATUSES),
        (Collection::Payments, "status") => Some(&PAYMENT_STATUSES),
        (Collection::Tickets, "status") => Some(&TICKET_STATUSES),
        (Collection::Tickets, "priority") => Some(&TICKET_PRIORITIES),
        _ => None,
    }
}

fn date_fields(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Leases => &["start_date", "end_date"],
        Collection::Payments => &["due_date"],
        _ => &[],
    }
}

fn money_fields(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Leases => &["monthly_rent", "deposit"],
        Collection::Payments => &["amount"],
        _ => &[],
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Checks the shape of every field present in the change set
pub fn validate_fields(collection: Collection, changes: &serde_json::Map<String, Value>) -> HashMap<String, String> {
    let mut errors = HashMap::new();

    for (field, value) in changes {
        if value.is_null() {
            continue;
        }
        let field = field.as_str();

        if let Some(allowed) = enum_values(collection, field) {
            if !value.as_str().is_some_and(|v| allowed.contains(&v)) {
                errors.insert(field.to_string(), format!("Must be one of: {}", allowed.join(", ")));
            }
        } else if date_fields(collection).contains(&field) {
            if !value.as_str().is_some_and(|v| parse_date(v).is_some()) {
                errors.insert(field.to_string(), "Must be a date in YYYY-MM-DD format".to_string());
            }
        } else if money_fields(collection).contains(&field) {
            if !value.as_f64().is_some_and(|n| n > 0.0) {
                errors.insert(field.to_string(), "Must be a positive number".to_string());
            }
        } else if REFERENCE_FIELDS.contains(&field) {
            if !value.as_str().is_some_and(|v| Uuid::parse_str(v).is_ok()) {
                errors.insert(field.to_string(), "Must be a valid id".to_string());
            }
        } else if TEXT_FIELDS.contains(&field) {
            if !value.is_string() {
                errors.insert(field.to_string(), "Must be a string".to_string());
            }
        } else if matches!(field, "floor_number" | "suite_number") {
            if !(value.is_string() || value.is_number()) {
                errors.insert(field.to_string(), "Must be a number or string".to_string());
            }
        } else if field == "email" {
            if !value.as_str().is_some_and(|v| v.contains('@')) {
                errors.insert(field.to_string(), "Must be a valid email address".to_string());
            }
        }
    }

    errors
}

#[derive(Default)]
pub struct FieldValidation;

#[async_trait]
impl Observer for FieldValidation {
    fn name(&self) -> &'static str {
        "FieldValidation"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        collection.is_generic()
    }

    fn priority(&self) -> u8 {
        20
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let field_errors = validate_fields(ctx.collection, &ctx.changes);
        if field_errors.is_empty() {
            return Ok(());
        }
        Err(ObserverError::InvalidFields {
            message: "Invalid field values".to_string(),
            field_errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(collection: Collection, body: Value) -> HashMap<String, String> {
        validate_fields(collection, body.as_object().unwrap())
    }

    #[test]
    fn accepts_well_formed_lease() {
        let errors = check(
            Collection::Leases,
            json!({
                "tenant_id": Uuid::new_v4().to_string(),
                "suite_id": Uuid::new_v4().to_string(),
                "start_date": "2026-01-01",
                "end_date": "2026-12-31",
                "monthly_rent": 1450.5,
                "status": "active"
            }),
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn reports_each_bad_field() {
        let errors = check(
            Collection::Payments,
            json!({"lease_id": "nope", "amount": -5, "due_date": "01/02/2026", "status": "lost"}),
        );
        assert_eq!(errors.len(), 4);
        assert!(errors["status"].contains("pending"));
    }

    #[test]
    fn tenant_email_needs_at_sign() {
        assert!(check(Collection::Tenants, json!({"email": "renter.example.com"})).contains_key("email"));
        assert!(check(Collection::Tenants, json!({"email": "renter@example.com"})).is_empty());
        assert!(check(Collection::Tenants, json!({"email": null})).is_empty());
    }
}
