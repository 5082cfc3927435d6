use async_trait::async_trait;
use std::time::Duration;

use crate::database::Collection;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::types::Operation;

/// Observer rings with semantic meaning - pre-database (0-4), database (5), post-database (6-9)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ObserverRing {
    DataPreparation = 0, // Load existing record
    InputValidation = 1, // Required fields, formats, duplicates
    Security = 2,        // Plan gates, ownership, references
    Business = 3,        // Domain rules
    Enrichment = 4,      // Defaults, derived fields
    Database = 5,        // Store write
    PostDatabase = 6,    // Follow-up writes on related records
    Audit = 7,
    Integration = 8,
    Notification = 9, // Fan-out to members
}

impl ObserverRing {
    pub const ALL: [ObserverRing; 10] = [
        ObserverRing::DataPreparation,
        ObserverRing::InputValidation,
        ObserverRing::Security,
        ObserverRing::Business,
        ObserverRing::Enrichment,
        ObserverRing::Database,
        ObserverRing::PostDatabase,
        ObserverRing::Audit,
        ObserverRing::Integration,
        ObserverRing::Notification,
    ];

    /// Failures in these rings abort the operation before anything is written
    pub fn is_pre_database(&self) -> bool {
        (*self as u8) < 5
    }

    /// Rings after the write; failures are logged, not returned
    pub fn is_best_effort(&self) -> bool {
        (*self as u8) > 5
    }
}

/// A step in the record lifecycle
#[async_trait]
pub trait Observer: Send + Sync {
    /// Observer name for logging and debugging
    fn name(&self) -> &'static str;

    /// Which ring this observer belongs to
    fn ring(&self) -> ObserverRing;

    /// Check if observer applies to this operation
    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    /// Check if observer applies to this collection
    fn applies_to_collection(&self, collection: Collection) -> bool;

    /// Execution timeout (default 5 seconds)
    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Priority within ring (lower numbers execute first)
    fn priority(&self) -> u8 {
        50
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError>;
}
