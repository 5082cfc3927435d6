// Ring 3: Business - records that others still depend on cannot be deleted
use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::Collection;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

/// The dependent collection, its filter and the refusal message for a delete
pub fn dependents(collection: Collection, id: Uuid) -> Option<(Collection, Value, &'static str)> {
    let id = id.to_string();
    match collection {
        Collection::Buildings => Some((
            Collection::Floors,
            json!({ "building_id": id }),
            "Cannot delete a building that still has floors",
        )),
        Collection::Floors => Some((
            Collection::Suites,
            json!({ "floor_id": id }),
            "Cannot delete a floor that still has suites",
        )),
        Collection::Suites => Some((
            Collection::Leases,
            json!({ "suite_id": id, "status": "active" }),
            "Cannot delete a suite with an active lease",
        )),
        Collection::Tenants => Some((
            Collection::Leases,
            json!({ "tenant_id": id, "status": "active" }),
            "Cannot delete a tenant with an active lease",
        )),
        Collection::Leases => Some((
            Collection::Payments,
            json!({ "lease_id": id }),
            "Cannot delete a lease that has payments",
        )),
        _ => None,
    }
}

#[derive(Default)]
pub struct DependencyGuard;

#[async_trait]
impl Observer for DependencyGuard {
    fn name(&self) -> &'static str {
        "DependencyGuard"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Business
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        op == Operation::Delete
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        dependents(collection, Uuid::nil()).is_some()
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let Some(id) = ctx.record_id else {
            return Ok(());
        };
        let Some((dependent, filter, message)) = dependents(ctx.collection, id) else {
            return Ok(());
        };

        let count = ctx.store.count(dependent, ctx.scope(), Some(filter)).await?;
        if count > 0 {
            tracing::debug!(collection = %ctx.collection, %id, dependents = count, "Delete blocked by dependents");
            return Err(ObserverError::Conflict(message.to_string()));
        }
        Ok(())
    }
}
