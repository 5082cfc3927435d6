// Ring 0: Data Preparation - loads the stored record targeted by update/delete
use async_trait::async_trait;

use crate::database::Collection;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

#[derive(Default)]
pub struct RecordLoader;

#[async_trait]
impl Observer for RecordLoader {
    fn name(&self) -> &'static str {
        "RecordLoader"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::DataPreparation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Update | Operation::Delete)
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        collection.is_generic()
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let id = ctx
            .record_id
            .ok_or_else(|| ObserverError::ValidationError(format!("{} requires a record id", ctx.operation.as_str())))?;

        let existing = ctx
            .store
            .find_by_id(ctx.collection, ctx.scope(), id)
            .await?
            .ok_or_else(|| ObserverError::NotFound(ctx.collection.not_found_message()))?;

        ctx.existing = Some(existing);
        Ok(())
    }
}
