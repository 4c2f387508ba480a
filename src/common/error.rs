// src/common/error.rs

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

use crate::models::plan::PlanStatus;

/// Every failure the core can report. All variants are recoverable: a rejected
/// operation leaves the store unchanged and the caller decides whether to
/// retry, prompt or abandon.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("customer {customer_id} already has a visit recorded on {date}")]
    DuplicateVisit { customer_id: Uuid, date: NaiveDate },

    #[error("customer {customer_id} already has a pending plan for {date} at {time:?}")]
    DuplicatePlan {
        customer_id: Uuid,
        date: NaiveDate,
        time: Option<NaiveTime>,
    },

    #[error("daily visit limit reached for customer {customer_id} on {date}")]
    DailyLimitExceeded { customer_id: Uuid, date: NaiveDate },

    #[error("plan {id} is already {status}")]
    PlanClosed { id: Uuid, status: PlanStatus },

    #[error("current location is unavailable")]
    LocationUnavailable,

    #[error("no pending plans to optimize for {date}")]
    NothingToOptimize { date: NaiveDate },

    #[error("coordinate is not a finite number")]
    InvalidCoordinate,

    #[error("storage serialization failed")]
    Storage(#[from] serde_json::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Single-field validation error for checks the derive can't express
    /// (foreign keys, slot membership, field-name uniqueness).
    pub fn validation(field: &'static str, code: &'static str) -> Self {
        let mut errors = validator::ValidationErrors::new();
        errors.add(field, validator::ValidationError::new(code));
        AppError::Validation(errors)
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        AppError::NotFound { entity, id }
    }
}
