use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::model::leave_request::LeaveCategory;

pub type LeaveResult<T> = Result<T, LeaveError>;

/// Every failure the leave core can report to a caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LeaveError {
    /// Missing or malformed input; carries the offending field name.
    #[error("invalid or missing field: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("employee not found")]
    EmployeeNotFound,

    #[error("employee is not approved yet")]
    EmployeeNotApproved,

    #[error("{0}")]
    InvalidState(String),

    #[error("insufficient {category} balance: requested {requested}, available {available}")]
    InsufficientBalance {
        category: LeaveCategory,
        requested: u32,
        available: u32,
    },

    #[error("unknown leave category '{0}', use sick|medical|privileged")]
    UnknownCategory(String),

    #[error("invalid leave type on record: '{0}'")]
    InvalidLeaveType(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    /// Infrastructure failure; always safe for the caller to retry.
    #[error("storage unavailable")]
    StorageUnavailable,
}

impl LeaveError {
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation(field.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

impl From<sqlx::Error> for LeaveError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            // 23000: integrity constraint violation (duplicate key)
            if db_err.code().as_deref() == Some("23000") {
                return LeaveError::Conflict("record already exists".to_string());
            }
        }
        tracing::error!(error = %e, "Record store failure");
        LeaveError::StorageUnavailable
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation(_)
            | LeaveError::InvalidState(_)
            | LeaveError::InsufficientBalance { .. }
            | LeaveError::UnknownCategory(_)
            | LeaveError::InvalidLeaveType(_) => StatusCode::BAD_REQUEST,
            LeaveError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            LeaveError::EmployeeNotApproved | LeaveError::Forbidden(_) => StatusCode::FORBIDDEN,
            LeaveError::NotFound(_) | LeaveError::EmployeeNotFound => StatusCode::NOT_FOUND,
            LeaveError::Conflict(_) => StatusCode::CONFLICT,
            LeaveError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string()
        }))
    }
}
