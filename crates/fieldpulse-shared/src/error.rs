//! Error types for the fieldpulse engine.

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::AssignmentId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    /// Malformed or inconsistent records, rejected before any computation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Visit already recorded for assignment {assignment_id} on {date}")]
    DuplicateVisit {
        assignment_id: AssignmentId,
        date: NaiveDate,
    },

    #[error("Monthly quota of {quota} visit(s) already reached for assignment {assignment_id} in month {month}")]
    QuotaExceeded {
        assignment_id: AssignmentId,
        month: u32,
        quota: u32,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Persistence failure passed through from a `VisitStore`. Not an engine condition.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl MetricsError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        MetricsError::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        MetricsError::NotFound(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            MetricsError::InvalidInput(_) => "invalid_input",
            MetricsError::DuplicateVisit { .. } => "duplicate_visit",
            MetricsError::QuotaExceeded { .. } => "quota_exceeded",
            MetricsError::NotFound(_) => "not_found",
            MetricsError::Storage(_) => "storage",
        }
    }

    /// True for the engine's own error classes; the caller re-renders with current state.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, MetricsError::Storage(_))
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;
