// Ring 1: Input Validation - rejects duplicate buildings, floors and suites
use async_trait::async_trait;

use crate::database::Collection;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::services::generic_service::duplicate_filter;
use crate::types::Operation;

/// Fields that identify a record within its parent
fn identity_fields(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Buildings => &["name"],
        Collection::Floors => &["building_id", "floor_number"],
        Collection::Suites => &["floor_id", "suite_number"],
        _ => &[],
    }
}

#[derive(Default)]
pub struct DuplicateDetection;

#[async_trait]
impl Observer for DuplicateDetection {
    fn name(&self) -> &'static str {
        "DuplicateDetection"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        !identity_fields(collection).is_empty()
    }

    fn priority(&self) -> u8 {
        90
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        // Earlier validation already failed; its error is more useful
        if ctx.has_errors() {
            return Ok(());
        }
        if ctx.operation == Operation::Update && !identity_fields(ctx.collection).iter().any(|f| ctx.changed(f)) {
            return Ok(());
        }

        let exclude = ctx.existing.as_ref().map(|d| d.id);
        let Some(filter) = duplicate_filter(ctx.collection, &ctx.merged(), exclude) else {
            return Ok(());
        };

        if ctx.store.find_one(ctx.collection, ctx.scope(), filter).await?.is_some() {
            let message = match ctx.collection {
                Collection::Buildings => "A building with this name already exists",
                Collection::Floors => "This floor number already exists in the building",
                _ => "This suite number already exists on the floor",
            };
            return Err(ObserverError::Conflict(message.to_string()));
        }
        Ok(())
    }
}
