//! Plan quota accounting.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::database::{DocumentStore, Scope};
use crate::error::ApiError;
use crate::plans::{Plan, QuotaResource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceUsage {
    pub used: u64,
    /// `None` is unlimited
    pub limit: Option<u64>,
}

pub type Usage = BTreeMap<&'static str, ResourceUsage>;

/// Resources whose current usage is above what `plan` allows
pub fn over_limit(usage: &BTreeMap<QuotaResource, u64>, plan: Plan) -> Vec<(QuotaResource, u64, u64)> {
    usage
        .iter()
        .filter_map(|(resource, used)| match plan.limit(*resource) {
            Some(limit) if *used > limit => Some((*resource, *used, limit)),
            _ => None,
        })
        .collect()
}

#[derive(Clone)]
pub struct QuotaService {
    store: Arc<dyn DocumentStore>,
}

impl QuotaService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn used(&self, organization_id: Uuid, resource: QuotaResource) -> Result<u64, ApiError> {
        Ok(self
            .store
            .count(resource.collection(), Scope::Organization(organization_id), None)
            .await?)
    }

    async fn counts(&self, organization_id: Uuid) -> Result<BTreeMap<QuotaResource, u64>, ApiError> {
        let mut counts = BTreeMap::new();
        for resource in QuotaResource::ALL {
            counts.insert(resource, self.used(organization_id, resource).await?);
        }
        Ok(counts)
    }

    pub async fn usage(&self, organization_id: Uuid, plan: Plan) -> Result<Usage, ApiError> {
        Ok(self
            .counts(organization_id)
            .await?
            .into_iter()
            .map(|(resource, used)| {
                (
                    resource.as_str(),
                    ResourceUsage {
                        used,
                        limit: plan.limit(resource),
                    },
                )
            })
            .collect())
    }

    /// Fails when one more `resource` would exceed the plan
    pub async fn check(&self, organization_id: Uuid, plan: Plan, resource: QuotaResource) -> Result<(), ApiError> {
        let Some(limit) = plan.limit(resource) else {
            return Ok(());
        };

        let used = self.used(organization_id, resource).await?;
        if used >= limit {
            tracing::info!(
                organization_id = %organization_id,
                resource = resource.as_str(),
                plan = plan.as_str(),
                used,
                limit,
                "Quota exceeded"
            );
            return Err(ApiError::QuotaExceeded {
                resource,
                plan,
                limit,
                used,
            });
        }
        Ok(())
    }

    /// Fails when current usage does not fit in `target`
    pub async fn can_downgrade(&self, organization_id: Uuid, target: Plan) -> Result<(), ApiError> {
        let exceeded = over_limit(&self.counts(organization_id).await?, target);
        if exceeded.is_empty() {
            return Ok(());
        }

        let details: Vec<String> = exceeded
            .iter()
            .map(|(resource, used, limit)| format!("{} ({} of {})", resource, used, limit))
            .collect();
        Err(ApiError::conflict(format!(
            "Current usage exceeds the {} plan: {}",
            target,
            details.join(", ")
        )))
    }
}
