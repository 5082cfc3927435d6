// Ring 5: Database - persists the prepared change set
use async_trait::async_trait;

use crate::database::{Collection, NewDocument};
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

#[derive(Default)]
pub struct DocumentWriter;

#[async_trait]
impl Observer for DocumentWriter {
    fn name(&self) -> &'static str {
        "DocumentWriter"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Database
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        collection.is_generic()
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let scope = ctx.scope();
        let missing = || ObserverError::NotFound(ctx.collection.not_found_message());

        let document = match ctx.operation {
            Operation::Create => {
                let document = NewDocument::new(ctx.actor.organization_id, ctx.changes.clone());
                ctx.store.insert(ctx.collection, document).await?
            }
            Operation::Update => {
                let id = ctx.record_id.ok_or_else(missing)?;
                ctx.store
                    .update(ctx.collection, scope, id, ctx.changes.clone())
                    .await?
                    .ok_or_else(missing)?
            }
            Operation::Delete => {
                let id = ctx.record_id.ok_or_else(missing)?;
                ctx.store.delete(ctx.collection, scope, id).await?.ok_or_else(missing)?
            }
        };

        tracing::info!(
            operation = ctx.operation.as_str(),
            collection = %ctx.collection,
            id = %document.id,
            "Record written"
        );
        ctx.result = Some(document);
        Ok(())
    }
}
