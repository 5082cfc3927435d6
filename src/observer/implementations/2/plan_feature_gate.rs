// Ring 2: Security - collections that only some plans include
use async_trait::async_trait;

use crate::database::Collection;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::plans::Feature;

pub fn required_feature(collection: Collection) -> Option<Feature> {
    match collection {
        Collection::Messages => Some(Feature::Messaging),
        _ => None,
    }
}

#[derive(Default)]
pub struct PlanFeatureGate;

#[async_trait]
impl Observer for PlanFeatureGate {
    fn name(&self) -> &'static str {
        "PlanFeatureGate"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Security
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        required_feature(collection).is_some()
    }

    fn priority(&self) -> u8 {
        10
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        match required_feature(ctx.collection) {
            Some(feature) if !ctx.plan.allows(feature) => Err(ObserverError::PlanUpgradeRequired {
                feature,
                plan: ctx.plan,
            }),
            _ => Ok(()),
        }
    }
}
