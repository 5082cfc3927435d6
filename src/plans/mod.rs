//! Subscription plans and the quotas/features they unlock.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::database::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Starter,
    Pro,
    Business,
    Enterprise,
}

/// Countable resources limited per plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaResource {
    Buildings,
    Floors,
    Suites,
    Tenants,
    Users,
}

/// Plan-gated capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Messaging,
    ActivityLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    pub buildings: Option<u64>,
    pub floors: Option<u64>,
    pub suites: Option<u64>,
    pub tenants: Option<u64>,
    pub users: Option<u64>,
}

impl Plan {
    pub const ALL: [Plan; 5] = [Plan::Free, Plan::Starter, Plan::Pro, Plan::Business, Plan::Enterprise];

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Starter => "starter",
            Plan::Pro => "pro",
            Plan::Business => "business",
            Plan::Enterprise => "enterprise",
        }
    }

    pub fn limits(&self) -> PlanLimits {
        match self {
            Plan::Free => PlanLimits {
                buildings: Some(1),
                floors: Some(5),
                suites: Some(10),
                tenants: Some(10),
                users: Some(2),
            },
            Plan::Starter => PlanLimits {
                buildings: Some(3),
                floors: Some(30),
                suites: Some(50),
                tenants: Some(50),
                users: Some(5),
            },
            Plan::Pro => PlanLimits {
                buildings: Some(10),
                floors: Some(150),
                suites: Some(250),
                tenants: Some(250),
                users: Some(15),
            },
            Plan::Business => PlanLimits {
                buildings: Some(50),
                floors: Some(1000),
                suites: Some(1000),
                tenants: Some(1000),
                users: Some(50),
            },
            Plan::Enterprise => PlanLimits {
                buildings: None,
                floors: None,
                suites: None,
                tenants: None,
                users: None,
            },
        }
    }

    /// Maximum number of documents of `resource`; `None` is unlimited
    pub fn limit(&self, resource: QuotaResource) -> Option<u64> {
        let limits = self.limits();
        match resource {
            QuotaResource::Buildings => limits.buildings,
            QuotaResource::Floors => limits.floors,
            QuotaResource::Suites => limits.suites,
            QuotaResource::Tenants => limits.tenants,
            QuotaResource::Users => limits.users,
        }
    }

    pub fn allows(&self, feature: Feature) -> bool {
        match feature {
            Feature::Messaging => *self >= Plan::Starter,
            Feature::ActivityLog => *self >= Plan::Pro,
        }
    }

    pub fn features(&self) -> Vec<Feature> {
        [Feature::Messaging, Feature::ActivityLog]
            .into_iter()
            .filter(|f| self.allows(*f))
            .collect()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "starter" => Ok(Plan::Starter),
            "pro" => Ok(Plan::Pro),
            "business" => Ok(Plan::Business),
            "enterprise" => Ok(Plan::Enterprise),
            other => Err(format!("Unknown plan '{}'", other)),
        }
    }
}

impl QuotaResource {
    pub const ALL: [QuotaResource; 5] = [
        QuotaResource::Buildings,
        QuotaResource::Floors,
        QuotaResource::Suites,
        QuotaResource::Tenants,
        QuotaResource::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaResource::Buildings => "buildings",
            QuotaResource::Floors => "floors",
            QuotaResource::Suites => "suites",
            QuotaResource::Tenants => "tenants",
            QuotaResource::Users => "users",
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            QuotaResource::Buildings => Collection::Buildings,
            QuotaResource::Floors => Collection::Floors,
            QuotaResource::Suites => Collection::Suites,
            QuotaResource::Tenants => Collection::Tenants,
            QuotaResource::Users => Collection::Users,
        }
    }

    pub fn for_collection(collection: Collection) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.collection() == collection)
    }
}

impl fmt::Display for QuotaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Messaging => "messaging",
            Feature::ActivityLog => "activity_log",
        }
    }
}
