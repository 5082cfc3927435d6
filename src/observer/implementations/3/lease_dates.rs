// Ring 3: Business - a lease must end after it starts
use async_trait::async_trait;

use crate::database::Collection;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

use super::field_validation::parse_date;

#[derive(Default)]
pub struct LeaseDates;

#[async_trait]
impl Observer for LeaseDates {
    fn name(&self) -> &'static str {
        "LeaseDates"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Business
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        collection == Collection::Leases
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        if !ctx.changed("start_date") && !ctx.changed("end_date") {
            return Ok(());
        }

        let start = ctx.field_str("start_date").and_then(parse_date);
        let end = ctx.field_str("end_date").and_then(parse_date);

        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                return Err(ObserverError::field("end_date", "End date must be after the start date"));
            }
        }
        Ok(())
    }
}
