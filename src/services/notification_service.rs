//! In-app notifications: recipient resolution, persistence, inbox and relay.
//!
//! One notification document is written per event, listing every recipient.
//! The serialized notification is then published on the organization channel
//! so that connected `/api/notifications/stream` clients receive it.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::cache::{CacheError, EventBus};
use crate::database::{Collection, DatabaseError, Document, DocumentStore, NewDocument, Scope};
use crate::filter::FilterData;
use crate::types::Role;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Notification not found")]
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    TicketCreated,
    TicketUpdated,
    PaymentCreated,
    LeaseCreated,
    MessageCreated,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TicketCreated => "ticket_created",
            NotificationKind::TicketUpdated => "ticket_updated",
            NotificationKind::PaymentCreated => "payment_created",
            NotificationKind::LeaseCreated => "lease_created",
            NotificationKind::MessageCreated => "message_created",
        }
    }

    /// Roles notified regardless of who is directly involved
    pub fn role_targets(&self) -> &'static [Role] {
        match self {
            NotificationKind::TicketCreated | NotificationKind::LeaseCreated => {
                &[Role::Owner, Role::Admin, Role::Manager]
            }
            NotificationKind::PaymentCreated => &[Role::Owner, Role::Admin],
            NotificationKind::TicketUpdated | NotificationKind::MessageCreated => &[],
        }
    }
}

/// The slice of a user record recipient resolution needs
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: Uuid,
    pub role: Role,
    pub active: bool,
    pub tenant_id: Option<Uuid>,
}

impl Member {
    pub fn from_document(doc: &Document) -> Option<Self> {
        Some(Self {
            id: doc.id,
            role: doc.get_str("role")?.parse().ok()?,
            active: doc.get_bool("active").unwrap_or(true),
            tenant_id: doc.get_uuid("tenant_id"),
        })
    }
}

/// Recipients of one event: role targets in member order, then direct
/// recipients. Inactive members and the actor are skipped; each user appears once.
pub fn resolve_recipients(kind: NotificationKind, members: &[Member], actor: Uuid, direct: &[Uuid]) -> Vec<Uuid> {
    let active: HashSet<Uuid> = members.iter().filter(|m| m.active).map(|m| m.id).collect();

    let by_role = members
        .iter()
        .filter(|m| m.active && m.role.is_one_of(kind.role_targets()))
        .map(|m| m.id);

    let mut seen = HashSet::new();
    by_role
        .chain(direct.iter().copied())
        .filter(|id| *id != actor && active.contains(id))
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Users whose accounts are linked to `tenant_id`
pub fn linked_users(members: &[Member], tenant_id: Uuid) -> Vec<Uuid> {
    members
        .iter()
        .filter(|m| m.tenant_id == Some(tenant_id))
        .map(|m| m.id)
        .collect()
}

/// Something that happened in an organization that members should hear about
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub organization_id: Uuid,
    pub actor: Uuid,
    pub resource: Collection,
    pub resource_id: Uuid,
    pub title: String,
    pub message: String,
    pub direct: Vec<Uuid>,
    /// Users linked to this tenant are added to the direct recipients
    pub tenant_id: Option<Uuid>,
}

/// Client view of a notification for one user
pub fn present(doc: &Document, user: Uuid) -> Value {
    let mut value = doc.to_json();
    let read = doc
        .get("read_by")
        .and_then(Value::as_array)
        .is_some_and(|ids| {
            let user = user.to_string();
            ids.iter().any(|id| id.as_str() == Some(user.as_str()))
        });
    if let Some(obj) = value.as_object_mut() {
        obj.insert("read".to_string(), Value::Bool(read));
    }
    value
}

fn inbox_where(user: Uuid, unread_only: bool) -> Value {
    let mine = json!({ "recipients": { "$all": [user.to_string()] } });
    if unread_only {
        json!({ "$and": [mine, { "$not": { "read_by": { "$all": [user.to_string()] } } }] })
    } else {
        mine
    }
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn DocumentStore>,
    events: Arc<dyn EventBus>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn DocumentStore>, events: Arc<dyn EventBus>) -> Self {
        Self { store, events }
    }

    pub async fn members(&self, organization_id: Uuid) -> Result<Vec<Member>, NotificationError> {
        let users = self
            .store
            .find(Collection::Users, Scope::Organization(organization_id), &FilterData::default())
            .await?;
        Ok(users.iter().filter_map(Member::from_document).collect())
    }

    /// Stores and publishes one notification; `None` when nobody should receive it
    pub async fn notify(&self, event: NotificationEvent) -> Result<Option<Document>, NotificationError> {
        let members = self.members(event.organization_id).await?;

        let mut direct = event.direct.clone();
        if let Some(tenant_id) = event.tenant_id {
            direct.extend(linked_users(&members, tenant_id));
        }

        let recipients = resolve_recipients(event.kind, &members, event.actor, &direct);
        if recipients.is_empty() {
            tracing::debug!(kind = event.kind.as_str(), "Notification has no recipients");
            return Ok(None);
        }

        let mut body = Map::new();
        body.insert("kind".to_string(), json!(event.kind.as_str()));
        body.insert("title".to_string(), json!(event.title));
        body.insert("message".to_string(), json!(event.message));
        body.insert("resource".to_string(), json!(event.resource.as_str()));
        body.insert("resource_id".to_string(), json!(event.resource_id.to_string()));
        body.insert(
            "recipients".to_string(),
            Value::Array(recipients.iter().map(|id| json!(id.to_string())).collect()),
        );
        body.insert("read_by".to_string(), json!([]));
        body.insert("created_by".to_string(), json!(event.actor.to_string()));

        let doc = self
            .store
            .insert(Collection::Notifications, NewDocument::new(event.organization_id, body))
            .await?;

        tracing::info!(
            kind = event.kind.as_str(),
            organization_id = %event.organization_id,
            recipients = recipients.len(),
            "Notification stored"
        );

        // The document is the source of truth; a missed publish only delays clients
        let payload = serde_json::to_string(&doc.to_json())?;
        if let Err(e) = self.events.publish(&event.organization_id.to_string(), payload).await {
            tracing::warn!("Failed to publish notification {}: {}", doc.id, e);
        }

        Ok(Some(doc))
    }

    pub async fn inbox(
        &self,
        organization_id: Uuid,
        user: Uuid,
        unread_only: bool,
        limit: i32,
        offset: Option<i32>,
    ) -> Result<Vec<Document>, NotificationError> {
        let filter = FilterData::with_where(inbox_where(user, unread_only))
            .order_by("created_at desc")
            .paginate(Some(limit), offset);
        Ok(self
            .store
            .find(Collection::Notifications, Scope::Organization(organization_id), &filter)
            .await?)
    }

    pub async fn unread_count(&self, organization_id: Uuid, user: Uuid) -> Result<u64, NotificationError> {
        Ok(self
            .store
            .count(
                Collection::Notifications,
                Scope::Organization(organization_id),
                Some(inbox_where(user, true)),
            )
            .await?)
    }

    pub async fn mark_read(&self, organization_id: Uuid, user: Uuid, id: Uuid) -> Result<Document, NotificationError> {
        let scope = Scope::Organization(organization_id);
        let doc = self
            .store
            .find_by_id(Collection::Notifications, scope, id)
            .await?
            .ok_or(NotificationError::NotFound)?;

        let user_str = user.to_string();
        let is_recipient = doc
            .get("recipients")
            .and_then(Value::as_array)
            .is_some_and(|ids| ids.iter().any(|v| v.as_str() == Some(user_str.as_str())));
        if !is_recipient {
            return Err(NotificationError::NotFound);
        }

        self.add_reader(scope, doc, &user_str).await
    }

    /// Marks every unread notification of `user` as read; returns how many changed
    pub async fn mark_all_read(&self, organization_id: Uuid, user: Uuid) -> Result<u64, NotificationError> {
        let scope = Scope::Organization(organization_id);
        let unread = self
            .store
            .find(Collection::Notifications, scope, &FilterData::with_where(inbox_where(user, true)))
            .await?;

        let user_str = user.to_string();
        let mut updated = 0;
        for doc in unread {
            self.add_reader(scope, doc, &user_str).await?;
            updated += 1;
        }
        Ok(updated)
    }

    async fn add_reader(&self, scope: Scope, doc: Document, user: &str) -> Result<Document, NotificationError> {
        let mut read_by = doc.get("read_by").and_then(Value::as_array).cloned().unwrap_or_default();
        if read_by.iter().any(|v| v.as_str() == Some(user)) {
            return Ok(doc);
        }
        read_by.push(json!(user));

        let mut changes = Map::new();
        changes.insert("read_by".to_string(), Value::Array(read_by));
        self.store
            .update(Collection::Notifications, scope, doc.id, changes)
            .await?
            .ok_or(NotificationError::NotFound)
    }

    /// Live notifications addressed to `user`, as serialized JSON
    pub async fn subscribe(&self, organization_id: Uuid, user: Uuid) -> Result<BoxStream<'static, Value>, NotificationError> {
        let stream = self.events.subscribe(&organization_id.to_string()).await?;
        let user = user.to_string();

        Ok(stream
            .filter_map(move |payload| {
                let user = user.clone();
                async move {
                    let value: Value = serde_json::from_str(&payload).ok()?;
                    let addressed = value
                        .get("recipients")
                        .and_then(Value::as_array)
                        .is_some_and(|ids| ids.iter().any(|v| v.as_str() == Some(user.as_str())));
                    addressed.then_some(value)
                }
            })
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryCache;
    use crate::database::MemoryDocumentStore;

    fn member(role: Role) -> Member {
        Member {
            id: Uuid::new_v4(),
            role,
            active: true,
            tenant_id: None,
        }
    }

    #[test]
    fn ticket_created_targets_managers_and_assignee() {
        let owner = member(Role::Owner);
        let manager = member(Role::Manager);
        let staff = member(Role::Staff);
        let tenant = member(Role::Tenant);
        let members = vec![owner.clone(), manager.clone(), staff.clone(), tenant.clone()];

        let recipients = resolve_recipients(NotificationKind::TicketCreated, &members, tenant.id, &[staff.id]);
        assert_eq!(recipients, vec![owner.id, manager.id, staff.id]);
    }

    #[test]
    fn actor_inactive_and_duplicates_are_dropped() {
        let owner = member(Role::Owner);
        let mut admin = member(Role::Admin);
        admin.active = false;
        let manager = member(Role::Manager);
        let members = vec![owner.clone(), admin.clone(), manager.clone()];

        let recipients = resolve_recipients(
            NotificationKind::LeaseCreated,
            &members,
            owner.id,
            &[manager.id, admin.id, Uuid::new_v4()],
        );
        assert_eq!(recipients, vec![manager.id]);
    }

    #[test]
    fn direct_only_kinds_ignore_roles() {
        let owner = member(Role::Owner);
        let staff = member(Role::Staff);
        let members = vec![owner.clone(), staff.clone()];

        assert_eq!(
            resolve_recipients(NotificationKind::MessageCreated, &members, owner.id, &[staff.id]),
            vec![staff.id]
        );
        assert!(resolve_recipients(NotificationKind::TicketUpdated, &members, owner.id, &[]).is_empty());
    }

    #[test]
    fn linked_users_follow_tenant_id() {
        let tenant_id = Uuid::new_v4();
        let mut renter = member(Role::Tenant);
        renter.tenant_id = Some(tenant_id);
        let members = vec![member(Role::Owner), renter.clone()];
        assert_eq!(linked_users(&members, tenant_id), vec![renter.id]);
    }

    async fn seeded() -> (NotificationService, Uuid, Uuid, Uuid) {
        let store = Arc::new(MemoryDocumentStore::new());
        let service = NotificationService::new(store.clone(), Arc::new(MemoryCache::new()));
        let org = Uuid::new_v4();

        let mut ids = Vec::new();
        for role in ["owner", "staff"] {
            let body = json!({ "name": role, "email": format!("{}@example.com", role), "role": role, "active": true });
            let doc = store
                .insert(Collection::Users, NewDocument::new(org, body.as_object().unwrap().clone()))
                .await
                .unwrap();
            ids.push(doc.id);
        }
        (service, org, ids[0], ids[1])
    }

    fn event(org: Uuid, actor: Uuid, direct: Vec<Uuid>) -> NotificationEvent {
        NotificationEvent {
            kind: NotificationKind::MessageCreated,
            organization_id: org,
            actor,
            resource: Collection::Messages,
            resource_id: Uuid::new_v4(),
            title: "New message".to_string(),
            message: "hello".to_string(),
            direct,
            tenant_id: None,
        }
    }

    #[tokio::test]
    async fn notify_then_read_lifecycle() {
        let (service, org, owner, staff) = seeded().await;

        let doc = service.notify(event(org, owner, vec![staff])).await.unwrap().unwrap();
        assert_eq!(service.unread_count(org, staff).await.unwrap(), 1);
        assert_eq!(service.unread_count(org, owner).await.unwrap(), 0);

        // Only recipients may mark it read
        assert!(matches!(
            service.mark_read(org, owner, doc.id).await,
            Err(NotificationError::NotFound)
        ));

        let read = service.mark_read(org, staff, doc.id).await.unwrap();
        assert_eq!(present(&read, staff)["read"], json!(true));
        assert_eq!(service.unread_count(org, staff).await.unwrap(), 0);
        assert_eq!(service.inbox(org, staff, false, 10, None).await.unwrap().len(), 1);
        assert!(service.inbox(org, staff, true, 10, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_recipient_list_writes_nothing() {
        let (service, org, owner, _) = seeded().await;
        assert!(service.notify(event(org, owner, vec![owner])).await.unwrap().is_none());
        assert_eq!(service.inbox(org, owner, false, 10, None).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn mark_all_read_counts_changes() {
        let (service, org, owner, staff) = seeded().await;
        service.notify(event(org, owner, vec![staff])).await.unwrap();
        service.notify(event(org, owner, vec![staff])).await.unwrap();

        assert_eq!(service.mark_all_read(org, staff).await.unwrap(), 2);
        assert_eq!(service.mark_all_read(org, staff).await.unwrap(), 0);
    }
}
