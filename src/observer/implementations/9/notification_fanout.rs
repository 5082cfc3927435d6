// Ring 9: Notification - tells the right members about tickets, payments, leases and messages
use async_trait::async_trait;
use std::sync::Arc;

use crate::database::{Collection, Document};
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::services::notification_service::{NotificationEvent, NotificationKind, NotificationService};
use crate::types::Operation;

pub struct NotificationFanout {
    notifications: Arc<NotificationService>,
}

impl NotificationFanout {
    pub fn new(notifications: Arc<NotificationService>) -> Self {
        Self { notifications }
    }

    /// The event a completed write produces, if any
    pub fn event_for(ctx: &ObserverContext, doc: &Document) -> Option<NotificationEvent> {
        let title = doc.get_str("title").unwrap_or("Untitled").to_string();

        let (kind, title, message, direct, tenant_id) = match (ctx.collection, ctx.operation) {
            (Collection::Tickets, Operation::Create) => (
                NotificationKind::TicketCreated,
                "New ticket".to_string(),
                title,
                vec![doc.get_uuid("assigned_to")],
                None,
            ),
            (Collection::Tickets, Operation::Update) if ctx.changed("status") => (
                NotificationKind::TicketUpdated,
                "Ticket updated".to_string(),
                format!("{} is now {}", title, doc.get_str("status").unwrap_or("updated")),
                vec![doc.get_uuid("created_by"), doc.get_uuid("assigned_to")],
                None,
            ),
            (Collection::Payments, Operation::Create) => (
                NotificationKind::PaymentCreated,
                "New payment".to_string(),
                format!("Payment due {}", doc.get_str("due_date").unwrap_or("")),
                Vec::new(),
                doc.get_uuid("tenant_id"),
            ),
            (Collection::Leases, Operation::Create) => (
                NotificationKind::LeaseCreated,
                "New lease".to_string(),
                format!(
                    "Lease from {} to {}",
                    doc.get_str("start_date").unwrap_or(""),
                    doc.get_str("end_date").unwrap_or("")
                ),
                Vec::new(),
                doc.get_uuid("tenant_id"),
            ),
            (Collection::Messages, Operation::Create) => (
                NotificationKind::MessageCreated,
                "New message".to_string(),
                doc.get_str("body").unwrap_or("").chars().take(140).collect(),
                vec![doc.get_uuid("recipient_id")],
                None,
            ),
            _ => return None,
        };

        Some(NotificationEvent {
            kind,
            organization_id: ctx.actor.organization_id,
            actor: ctx.actor.user_id,
            resource: ctx.collection,
            resource_id: doc.id,
            title,
            message,
            direct: direct.into_iter().flatten().collect(),
            tenant_id,
        })
    }
}

#[async_trait]
impl Observer for NotificationFanout {
    fn name(&self) -> &'static str {
        "NotificationFanout"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Notification
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_collection(&self, collection: Collection) -> bool {
        matches!(
            collection,
            Collection::Tickets | Collection::Payments | Collection::Leases | Collection::Messages
        )
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let Some(event) = ctx.result.as_ref().and_then(|doc| Self::event_for(ctx, doc)) else {
            return Ok(());
        };

        self.notifications
            .notify(event)
            .await
            .map_err(|e| ObserverError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}
