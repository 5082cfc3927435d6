// Observer implementations organized by rings
// Each ring handles a specific phase of a record write

use std::sync::Arc;

use crate::observer::pipeline::ObserverPipeline;
use crate::services::notification_service::NotificationService;

// Ring 0: Data Preparation - load the targeted record
#[path = "0/record_loader.rs"]
pub mod record_loader;

// Ring 1: Input Validation - required fields, formats, duplicates
#[path = "1/duplicate_detection.rs"]
pub mod duplicate_detection;
#[path = "1/field_validation.rs"]
pub mod field_validation;
#[path = "1/required_fields.rs"]
pub mod required_fields;

// Ring 2: Security - plan gates, ownership, references
#[path = "2/plan_feature_gate.rs"]
pub mod plan_feature_gate;
#[path = "2/reference_integrity.rs"]
pub mod reference_integrity;
#[path = "2/tenant_ownership.rs"]
pub mod tenant_ownership;

// Ring 3: Business rules
#[path = "3/dependency_guard.rs"]
pub mod dependency_guard;
#[path = "3/lease_dates.rs"]
pub mod lease_dates;

// Ring 4: Enrichment - defaults and derived fields
#[path = "4/defaults.rs"]
pub mod defaults;
#[path = "4/derived_fields.rs"]
pub mod derived_fields;

// Ring 5: Database
#[path = "5/document_writer.rs"]
pub mod document_writer;

// Ring 6: Post-Database - related record upkeep
#[path = "6/suite_occupancy.rs"]
pub mod suite_occupancy;

// Ring 9: Notification
#[path = "9/notification_fanout.rs"]
pub mod notification_fanout;

pub use defaults::Defaults;
pub use dependency_guard::DependencyGuard;
pub use derived_fields::DerivedFields;
pub use document_writer::DocumentWriter;
pub use duplicate_detection::DuplicateDetection;
pub use field_validation::FieldValidation;
pub use lease_dates::LeaseDates;
pub use notification_fanout::NotificationFanout;
pub use plan_feature_gate::PlanFeatureGate;
pub use record_loader::RecordLoader;
pub use reference_integrity::ReferenceIntegrity;
pub use required_fields::RequiredFields;
pub use suite_occupancy::SuiteOccupancy;
pub use tenant_ownership::TenantOwnership;

/// Every observer the generic controller runs, registered by ring
pub fn default_pipeline(notifications: Arc<NotificationService>) -> ObserverPipeline {
    let mut pipeline = ObserverPipeline::new();
    pipeline.register_observer(Box::new(RecordLoader));
    pipeline.register_observer(Box::new(RequiredFields));
    pipeline.register_observer(Box::new(FieldValidation));
    pipeline.register_observer(Box::new(DuplicateDetection));
    pipeline.register_observer(Box::new(PlanFeatureGate));
    pipeline.register_observer(Box::new(TenantOwnership));
    pipeline.register_observer(Box::new(ReferenceIntegrity));
    pipeline.register_observer(Box::new(LeaseDates));
    pipeline.register_observer(Box::new(DependencyGuard));
    pipeline.register_observer(Box::new(Defaults));
    pipeline.register_observer(Box::new(DerivedFields));
    pipeline.register_observer(Box::new(DocumentWriter));
    pipeline.register_observer(Box::new(SuiteOccupancy));
    pipeline.register_observer(Box::new(NotificationFanout::new(notifications)));
    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::database::{Collection, Document, DocumentStore, MemoryDocumentStore, NewDocument};
    use crate::observer::context::ObserverContext;
    use crate::observer::error::ObserverError;
    use crate::plans::Plan;
    use crate::types::{Actor, Operation, Role};
    use serde_json::{json, Value};
    use uuid::Uuid;

    struct Harness {
        store: Arc<MemoryDocumentStore>,
        pipeline: ObserverPipeline,
        actor: Actor,
    }

    impl Harness {
        async fn new() -> Self {
            let store = Arc::new(MemoryDocumentStore::new());
            let notifications = Arc::new(NotificationService::new(store.clone(), Arc::new(MemoryCache::new())));
            let org = Uuid::new_v4();
            let owner = store
                .insert(
                    Collection::Users,
                    NewDocument::new(org, obj(json!({"name": "Olive", "email": "olive@example.com", "role": "owner", "active": true}))),
                )
                .await
                .unwrap();
            Self {
                store,
                pipeline: default_pipeline(notifications),
                actor: Actor {
                    user_id: owner.id,
                    organization_id: org,
                    role: Role::Owner,
                    tenant_id: None,
                },
            }
        }

        fn ctx(&self, op: Operation, collection: Collection, plan: Plan) -> ObserverContext {
            ObserverContext::new(op, collection, self.actor, plan, self.store.clone())
        }

        async fn create(&self, collection: Collection, body: Value) -> Result<Document, ObserverError> {
            let ctx = self.ctx(Operation::Create, collection, Plan::Pro).with_changes(obj(body));
            self.pipeline.execute(ctx).await
        }

        async fn update(&self, collection: Collection, id: Uuid, body: Value) -> Result<Document, ObserverError> {
            let ctx = self
                .ctx(Operation::Update, collection, Plan::Pro)
                .with_record(id)
                .with_changes(obj(body));
            self.pipeline.execute(ctx).await
        }

        async fn delete(&self, collection: Collection, id: Uuid) -> Result<Document, ObserverError> {
            let ctx = self.ctx(Operation::Delete, collection, Plan::Pro).with_record(id);
            self.pipeline.execute(ctx).await
        }

        async fn suite(&self) -> (Document, Document, Document) {
            let building = self.create(Collection::Buildings, json!({"name": "Harbor Point"})).await.unwrap();
            let floor = self
                .create(Collection::Floors, json!({"building_id": building.id.to_string(), "floor_number": 1}))
                .await
                .unwrap();
            let suite = self
                .create(Collection::Suites, json!({"floor_id": floor.id.to_string(), "suite_number": "101"}))
                .await
                .unwrap();
            (building, floor, suite)
        }
    }

    fn obj(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn create_applies_defaults_and_derived_fields() {
        let h = Harness::new().await;
        let (building, _, suite) = h.suite().await;

        assert_eq!(suite.get_str("status"), Some("vacant"));
        assert_eq!(suite.get_uuid("building_id"), Some(building.id));
        assert_eq!(suite.get_uuid("created_by"), Some(h.actor.user_id));
    }

    #[tokio::test]
    async fn missing_required_fields_abort_before_write() {
        let h = Harness::new().await;
        let err = h.create(Collection::Floors, json!({"floor_number": 2})).await.unwrap_err();
        match err {
            ObserverError::InvalidFields { field_errors, .. } => assert!(field_errors.contains_key("building_id")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(h.store.count(Collection::Floors, h.ctx(Operation::Create, Collection::Floors, Plan::Pro).scope(), None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicates_are_conflicts_across_number_types() {
        let h = Harness::new().await;
        let (_, floor, suite) = h.suite().await;

        let err = h
            .create(Collection::Suites, json!({"floor_id": floor.id.to_string(), "suite_number": 101}))
            .await
            .unwrap_err();
        assert!(matches!(err, ObserverError::Conflict(_)));

        let err = h.create(Collection::Buildings, json!({"name": "harbor point"})).await.unwrap_err();
        assert!(matches!(err, ObserverError::Conflict(_)));

        // Updating a suite without touching its number is not a duplicate of itself
        h.update(Collection::Suites, suite.id, json!({"suite_number": "101", "notes": "corner"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn references_must_exist_in_the_organization() {
        let h = Harness::new().await;
        let err = h
            .create(Collection::Floors, json!({"building_id": Uuid::new_v4().to_string(), "floor_number": 1}))
            .await
            .unwrap_err();
        match err {
            ObserverError::InvalidFields { field_errors, .. } => {
                assert_eq!(field_errors["building_id"], "Building not found")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn lease_lifecycle_drives_suite_occupancy() {
        let h = Harness::new().await;
        let (_, _, suite) = h.suite().await;
        let tenant = h.create(Collection::Tenants, json!({"name": "Acme Dental"})).await.unwrap();

        let bad = h
            .create(
                Collection::Leases,
                json!({
                    "tenant_id": tenant.id.to_string(),
                    "suite_id": suite.id.to_string(),
                    "start_date": "2026-06-01",
                    "end_date": "2026-01-01",
                    "monthly_rent": 2000
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(bad, ObserverError::InvalidFields { .. }));

        let lease = h
            .create(
                Collection::Leases,
                json!({
                    "tenant_id": tenant.id.to_string(),
                    "suite_id": suite.id.to_string(),
                    "start_date": "2026-01-01",
                    "end_date": "2026-12-31",
                    "monthly_rent": 2000
                }),
            )
            .await
            .unwrap();
        assert_eq!(lease.get_str("status"), Some("active"));

        let scope = h.ctx(Operation::Create, Collection::Suites, Plan::Pro).scope();
        let occupied = h.store.find_by_id(Collection::Suites, scope, suite.id).await.unwrap().unwrap();
        assert_eq!(occupied.get_str("status"), Some("occupied"));

        // Active lease blocks deleting the suite and the tenant
        assert!(matches!(h.delete(Collection::Suites, suite.id).await, Err(ObserverError::Conflict(_))));
        assert!(matches!(h.delete(Collection::Tenants, tenant.id).await, Err(ObserverError::Conflict(_))));

        h.update(Collection::Leases, lease.id, json!({"status": "ended"})).await.unwrap();
        let vacant = h.store.find_by_id(Collection::Suites, scope, suite.id).await.unwrap().unwrap();
        assert_eq!(vacant.get_str("status"), Some("vacant"));
    }

    #[tokio::test]
    async fn payments_copy_tenant_and_stamp_paid_at() {
        let h = Harness::new().await;
        let (_, _, suite) = h.suite().await;
        let tenant = h.create(Collection::Tenants, json!({"name": "Acme Dental"})).await.unwrap();
        let lease = h
            .create(
                Collection::Leases,
                json!({
                    "tenant_id": tenant.id.to_string(),
                    "suite_id": suite.id.to_string(),
                    "start_date": "2026-01-01",
                    "end_date": "2026-12-31",
                    "monthly_rent": 2000
                }),
            )
            .await
            .unwrap();

        let payment = h
            .create(
                Collection::Payments,
                json!({"lease_id": lease.id.to_string(), "amount": 2000, "due_date": "2026-02-01"}),
            )
            .await
            .unwrap();
        assert_eq!(payment.get_uuid("tenant_id"), Some(tenant.id));
        assert_eq!(payment.get_str("status"), Some("pending"));
        assert!(payment.get("paid_at").is_none());

        let paid = h.update(Collection::Payments, payment.id, json!({"status": "paid"})).await.unwrap();
        assert!(paid.get_str("paid_at").is_some());

        // The lease now has payments
        assert!(matches!(h.delete(Collection::Leases, lease.id).await, Err(ObserverError::Conflict(_))));
    }

    #[tokio::test]
    async fn messages_require_a_plan_with_messaging() {
        let h = Harness::new().await;
        let ctx = h
            .ctx(Operation::Create, Collection::Messages, Plan::Free)
            .with_changes(obj(json!({"recipient_id": h.actor.user_id.to_string(), "body": "hi"})));
        let err = h.pipeline.execute(ctx).await.unwrap_err();
        assert!(matches!(
            err,
            ObserverError::PlanUpgradeRequired { plan: Plan::Free, .. }
        ));
    }

    #[tokio::test]
    async fn ticket_creation_notifies_managers() {
        let h = Harness::new().await;
        let org = h.actor.organization_id;
        let staff = h
            .store
            .insert(
                Collection::Users,
                NewDocument::new(org, obj(json!({"name": "Sam", "email": "sam@example.com", "role": "staff", "active": true}))),
            )
            .await
            .unwrap();

        let ticket = h
            .create(Collection::Tickets, json!({"title": "Leaking tap", "assigned_to": staff.id.to_string()}))
            .await
            .unwrap();
        assert_eq!(ticket.get_str("priority"), Some("medium"));

        let scope = h.ctx(Operation::Create, Collection::Notifications, Plan::Pro).scope();
        let notes = h.store.find(Collection::Notifications, scope, &Default::default()).await.unwrap();
        assert_eq!(notes.len(), 1);
        // The owner created it, so only the assignee hears about it
        assert_eq!(notes[0].get("recipients"), Some(&json!([staff.id.to_string()])));
    }

    #[tokio::test]
    async fn updates_and_deletes_need_an_existing_record() {
        let h = Harness::new().await;
        let err = h.update(Collection::Buildings, Uuid::new_v4(), json!({"name": "x"})).await.unwrap_err();
        assert!(matches!(err, ObserverError::NotFound(ref m) if m == "Building not found"));
    }
}
