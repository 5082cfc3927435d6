// Ring 4: Enrichment - server-owned fields and default values on create
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::database::Collection;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

pub fn default_values(collection: Collection) -> &'static [(&'static str, &'static str)] {
    match collection {
        Collection::Suites => &[("status", "vacant")],
        Collection::Leases => &[("status", "active")],
        Collection::Payments => &[("status", "pending")],
        Collection::Tickets => &[("status", "open"), ("priority", "medium")],
        _ => &[],
    }
}

#[derive(Default)]
pub struct Defaults;

#[async_trait]
impl Observer for Defaults {
    fn name(&self) -> &'static str {
        "Defaults"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Enrichment
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        op == Operation::Create
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        collection.is_generic()
    }

    fn priority(&self) -> u8 {
        10
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let actor = ctx.actor.user_id.to_string();
        ctx.changes.insert("created_by".to_string(), json!(actor));

        for (field, value) in default_values(ctx.collection) {
            ctx.set_default(field, Value::String(value.to_string()));
        }

        if ctx.collection == Collection::Messages {
            ctx.changes.insert("sender_id".to_string(), json!(actor));
            ctx.changes.insert("read".to_string(), Value::Bool(false));
        }
        Ok(())
    }
}
