// Ring 4: Enrichment - fields copied from parent records
use async_trait::async_trait;
use serde_json::Value;

use crate::database::{store, Collection};
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

#[derive(Default)]
pub struct DerivedFields;

impl DerivedFields {
    /// Copies `field` from the parent record referenced by `reference`
    async fn copy_from_parent(
        ctx: &mut ObserverContext,
        reference: &str,
        parent: Collection,
        field: &str,
    ) -> Result<(), ObserverError> {
        if !ctx.changed(reference) {
            return Ok(());
        }
        let Some(parent_id) = ctx.field_uuid(reference) else {
            return Ok(());
        };

        let value = ctx
            .store
            .find_by_id(parent, ctx.scope(), parent_id)
            .await?
            .and_then(|doc| doc.get(field).cloned())
            .unwrap_or(Value::Null);
        ctx.changes.insert(field.to_string(), value);
        Ok(())
    }
}

#[async_trait]
impl Observer for DerivedFields {
    fn name(&self) -> &'static str {
        "DerivedFields"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Enrichment
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        matches!(collection, Collection::Suites | Collection::Payments)
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        match ctx.collection {
            Collection::Suites => Self::copy_from_parent(ctx, "floor_id", Collection::Floors, "building_id").await?,
            Collection::Payments => {
                Self::copy_from_parent(ctx, "lease_id", Collection::Leases, "tenant_id").await?;

                if ctx.changed("status") && ctx.field_str("status") == Some("paid") && !ctx.changes.contains_key("paid_at") {
                    let paid_at = store::format_timestamp(&store::now());
                    ctx.changes.insert("paid_at".to_string(), Value::String(paid_at));
                }
            }
            _ => {}
        }
        Ok(())
    }
}
