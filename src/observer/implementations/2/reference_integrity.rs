// Ring 2: Security - referenced records must exist in the same organization
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::database::Collection;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

/// `(field, referenced collection)` pairs checked for each collection
pub fn references(collection: Collection) -> &'static [(&'static str, Collection)] {
    match collection {
        Collection::Floors => &[("building_id", Collection::Buildings)],
        Collection::Suites => &[("floor_id", Collection::Floors)],
        Collection::Leases => &[("tenant_id", Collection::Tenants), ("suite_id", Collection::Suites)],
        Collection::Payments => &[("lease_id", Collection::Leases)],
        Collection::Tickets => &[
            ("suite_id", Collection::Suites),
            ("tenant_id", Collection::Tenants),
            ("assigned_to", Collection::Users),
        ],
        Collection::Messages => &[("recipient_id", Collection::Users)],
        _ => &[],
    }
}

#[derive(Default)]
pub struct ReferenceIntegrity;

#[async_trait]
impl Observer for ReferenceIntegrity {
    fn name(&self) -> &'static str {
        "ReferenceIntegrity"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Security
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        !references(collection).is_empty()
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        for (field, target) in references(ctx.collection) {
            let Some(id) = ctx.changes.get(*field).and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok()) else {
                continue;
            };

            let referenced = ctx.store.find_by_id(*target, ctx.scope(), id).await?;
            let usable = match (&referenced, target) {
                // Deactivated users cannot be assigned work or receive messages
                (Some(user), Collection::Users) => user.get_bool("active").unwrap_or(true),
                (Some(_), _) => true,
                (None, _) => false,
            };

            if !usable {
                return Err(ObserverError::field(field, target.not_found_message()));
            }
        }
        Ok(())
    }
}
