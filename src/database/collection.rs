use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document collections stored by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Organizations,
    Users,
    Buildings,
    Floors,
    Suites,
    Tenants,
    Leases,
    Payments,
    Tickets,
    Messages,
    Notifications,
    ActivityLogs,
}

impl Collection {
    /// Collections served by the generic `/api/data/:collection` controller
    pub const GENERIC: [Collection; 8] = [
        Collection::Buildings,
        Collection::Floors,
        Collection::Suites,
        Collection::Tenants,
        Collection::Leases,
        Collection::Payments,
        Collection::Tickets,
        Collection::Messages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Organizations => "organizations",
            Collection::Users => "users",
            Collection::Buildings => "buildings",
            Collection::Floors => "floors",
            Collection::Suites => "suites",
            Collection::Tenants => "tenants",
            Collection::Leases => "leases",
            Collection::Payments => "payments",
            Collection::Tickets => "tickets",
            Collection::Messages => "messages",
            Collection::Notifications => "notifications",
            Collection::ActivityLogs => "activity_logs",
        }
    }

    pub fn is_generic(&self) -> bool {
        Self::GENERIC.contains(self)
    }

    /// Singular noun used in client-facing messages
    pub fn singular(&self) -> &'static str {
        match self {
            Collection::Organizations => "organization",
            Collection::Users => "user",
            Collection::Buildings => "building",
            Collection::Floors => "floor",
            Collection::Suites => "suite",
            Collection::Tenants => "tenant",
            Collection::Leases => "lease",
            Collection::Payments => "payment",
            Collection::Tickets => "ticket",
            Collection::Messages => "message",
            Collection::Notifications => "notification",
            Collection::ActivityLogs => "activity log",
        }
    }

    /// "Building not found" and friends
    pub fn not_found_message(&self) -> String {
        let singular = self.singular();
        let mut chars = singular.chars();
        match chars.next() {
            Some(first) => format!("{}{} not found", first.to_ascii_uppercase(), chars.as_str()),
            None => "Record not found".to_string(),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "organizations" => Collection::Organizations,
            "users" => Collection::Users,
            "buildings" => Collection::Buildings,
            "floors" => Collection::Floors,
            "suites" => Collection::Suites,
            "tenants" => Collection::Tenants,
            "leases" => Collection::Leases,
            "payments" => Collection::Payments,
            "tickets" => Collection::Tickets,
            "messages" => Collection::Messages,
            "notifications" => Collection::Notifications,
            "activity_logs" => Collection::ActivityLogs,
            other => return Err(format!("Unknown collection '{}'", other)),
        })
    }
}
