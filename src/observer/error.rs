use std::collections::HashMap;
use thiserror::Error;

use crate::database::DatabaseError;
use crate::plans::{Feature, Plan};

/// Observer system errors with structured error types
#[derive(Debug, Error, Clone)]
pub enum ObserverError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid fields: {message}")]
    InvalidFields {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Security error: {0}")]
    SecurityError(String),

    #[error("The {plan} plan does not include {}", .feature.as_str())]
    PlanUpgradeRequired { feature: Feature, plan: Plan },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl ObserverError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), message.into());
        ObserverError::InvalidFields {
            message: "Invalid field values".to_string(),
            field_errors,
        }
    }
}

/// Observer warnings (non-fatal issues)
#[derive(Debug, Clone)]
pub struct ObserverWarning {
    pub observer: String,
    pub ring: u8,
    pub message: String,
}

impl ObserverWarning {
    pub fn new(observer: &str, ring: u8, message: String) -> Self {
        Self {
            observer: observer.to_string(),
            ring,
            message,
        }
    }
}

impl From<DatabaseError> for ObserverError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::UniqueViolation(_) => ObserverError::Conflict("A record with these values already exists".to_string()),
            DatabaseError::NotFound(msg) => ObserverError::NotFound(msg),
            other => ObserverError::DatabaseError(other.to_string()),
        }
    }
}
