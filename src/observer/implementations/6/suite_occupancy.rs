// Ring 6: Post-Database - a suite is occupied while it has an active lease
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::database::Collection;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

#[derive(Default)]
pub struct SuiteOccupancy;

impl SuiteOccupancy {
    async fn set_status(ctx: &ObserverContext, suite_id: Uuid, status: &str) -> Result<(), ObserverError> {
        let mut changes = Map::new();
        changes.insert("status".to_string(), Value::String(status.to_string()));
        ctx.store.update(Collection::Suites, ctx.scope(), suite_id, changes).await?;
        tracing::debug!(suite_id = %suite_id, status, "Suite occupancy updated");
        Ok(())
    }

    /// Marks a suite vacant unless another active lease still covers it
    async fn release(ctx: &ObserverContext, suite_id: Uuid, lease_id: Uuid) -> Result<(), ObserverError> {
        let others = json!({
            "suite_id": suite_id.to_string(),
            "status": "active",
            "id": { "$ne": lease_id.to_string() }
        });
        if ctx.store.count(Collection::Leases, ctx.scope(), Some(others)).await? == 0 {
            Self::set_status(ctx, suite_id, "vacant").await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Observer for SuiteOccupancy {
    fn name(&self) -> &'static str {
        "SuiteOccupancy"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::PostDatabase
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        collection == Collection::Leases
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        if ctx.operation == Operation::Update && !ctx.changed("status") && !ctx.changed("suite_id") {
            return Ok(());
        }
        let Some(lease) = ctx.result.as_ref() else {
            return Ok(());
        };
        let lease_id = lease.id;
        let active = lease.get_str("status") == Some("active");
        let suite_id = lease.get_uuid("suite_id");
        let previous_suite = ctx.existing.as_ref().and_then(|d| d.get_uuid("suite_id"));

        // A lease moved to another suite frees the old one
        if let Some(previous) = previous_suite.filter(|p| Some(*p) != suite_id) {
            Self::release(ctx, previous, lease_id).await?;
        }

        let Some(suite_id) = suite_id else {
            return Ok(());
        };
        if active && ctx.operation != Operation::Delete {
            Self::set_status(ctx, suite_id, "occupied").await
        } else {
            Self::release(ctx, suite_id, lease_id).await
        }
    }
}
