// Ring 2: Security - tickets opened by tenant users belong to their tenant
use async_trait::async_trait;
use serde_json::Value;

use crate::database::Collection;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::{Operation, Role};

#[derive(Default)]
pub struct TenantOwnership;

#[async_trait]
impl Observer for TenantOwnership {
    fn name(&self) -> &'static str {
        "TenantOwnership"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Security
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        op == Operation::Create
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        collection == Collection::Tickets
    }

    fn priority(&self) -> u8 {
        20
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        if ctx.actor.role != Role::Tenant {
            return Ok(());
        }

        let tenant_id = ctx
            .actor
            .tenant_id
            .ok_or_else(|| ObserverError::SecurityError("Your account is not linked to a tenant".to_string()))?;

        ctx.changes.insert("tenant_id".to_string(), Value::String(tenant_id.to_string()));
        // Staff decide who works the ticket
        ctx.changes.remove("assigned_to");
        Ok(())
    }
}
