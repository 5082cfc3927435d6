//! Portfolio summary for the dashboard.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};

use crate::database::{Collection, Document, DocumentStore, Scope};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::state::AppState;
use crate::types::{Actor, Role};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteSummary {
    pub total: u64,
    pub occupied: u64,
    pub vacant: u64,
    /// Percentage of suites occupied, one decimal place
    pub occupancy_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSummary {
    pub pending: u64,
    pub overdue: u64,
    pub collected: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub buildings: u64,
    pub floors: u64,
    pub suites: SuiteSummary,
    pub tenants: u64,
    pub active_leases: u64,
    pub payments: PaymentSummary,
    pub open_tickets: u64,
}

pub fn occupancy_rate(occupied: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (occupied as f64 * 1000.0 / total as f64).round() / 10.0
}

/// Exact sum of the `amount` field; non-numeric amounts are skipped
pub fn sum_amounts(payments: &[Document]) -> Decimal {
    payments
        .iter()
        .filter_map(|p| match p.get("amount") {
            Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .ok(),
            _ => None,
        })
        .sum()
}

pub struct DashboardService {
    store: Arc<dyn DocumentStore>,
}

impl DashboardService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    async fn count(&self, scope: Scope, collection: Collection, filter: Option<Value>) -> Result<u64, ApiError> {
        Ok(self.store.count(collection, scope, filter).await?)
    }

    pub async fn summary(&self, actor: &Actor) -> Result<Dashboard, ApiError> {
        if actor.role == Role::Tenant {
            return Err(ApiError::forbidden("Tenant accounts cannot view the dashboard"));
        }
        let scope = Scope::Organization(actor.organization_id);
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();

        let total_suites = self.count(scope, Collection::Suites, None).await?;
        let occupied = self.count(scope, Collection::Suites, Some(json!({ "status": "occupied" }))).await?;
        let vacant = self.count(scope, Collection::Suites, Some(json!({ "status": "vacant" }))).await?;

        let overdue_filter = json!({
            "$or": [
                { "status": "overdue" },
                { "status": "pending", "due_date": { "$lt": today } }
            ]
        });

        let paid = self
            .store
            .find(Collection::Payments, scope, &FilterData::with_where(json!({ "status": "paid" })))
            .await?;

        Ok(Dashboard {
            buildings: self.count(scope, Collection::Buildings, None).await?,
            floors: self.count(scope, Collection::Floors, None).await?,
            suites: SuiteSummary {
                total: total_suites,
                occupied,
                vacant,
                occupancy_rate: occupancy_rate(occupied, total_suites),
            },
            tenants: self.count(scope, Collection::Tenants, None).await?,
            active_leases: self.count(scope, Collection::Leases, Some(json!({ "status": "active" }))).await?,
            payments: PaymentSummary {
                pending: self.count(scope, Collection::Payments, Some(json!({ "status": "pending" }))).await?,
                overdue: self.count(scope, Collection::Payments, Some(overdue_filter)).await?,
                collected: sum_amounts(&paid),
            },
            open_tickets: self
                .count(
                    scope,
                    Collection::Tickets,
                    Some(json!({ "status": { "$in": ["open", "in_progress"] } })),
                )
                .await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn payment(amount: Value) -> Document {
        let mut body = serde_json::Map::new();
        body.insert("amount".to_string(), amount);
        Document {
            id: Uuid::new_v4(),
            collection: Collection::Payments,
            organization_id: None,
            body,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn amounts_sum_exactly() {
        let payments = vec![payment(json!(0.1)), payment(json!(0.2)), payment(json!("oops")), payment(json!(1200))];
        assert_eq!(sum_amounts(&payments), Decimal::from_str("1200.3").unwrap());
    }

    #[test]
    fn occupancy_is_a_rounded_percentage() {
        assert_eq!(occupancy_rate(0, 0), 0.0);
        assert_eq!(occupancy_rate(1, 3), 33.3);
        assert_eq!(occupancy_rate(2, 2), 100.0);
    }
}
