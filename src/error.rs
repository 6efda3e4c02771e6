use actix_web::{body, http::{header::ContentType, StatusCode}, HttpResponse};
use chrono::NaiveDate;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::entity::sea_orm_active_enums::LeaveStatus;

/// Which guarded state machine rejected a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Attendance,
    SalarySheet,
    PayrollRun,
}

impl LockKind {
    pub fn entity_name(&self) -> &'static str {
        match self {
            LockKind::Attendance => "attendance record",
            LockKind::SalarySheet => "salary sheet",
            LockKind::PayrollRun => "payroll run",
        }
    }
}

#[derive(Debug, Error)]
pub enum HrError {
    #[error("employee {employee_id} already has attendance recorded for {date}")]
    DuplicateCheckIn { employee_id: Uuid, date: NaiveDate },

    #[error("employee {employee_id} has no open check-in for {date}")]
    NoOpenCheckIn { employee_id: Uuid, date: NaiveDate },

    #[error("{} {id} is locked: {reason}", kind.entity_name())]
    LockedRecord { kind: LockKind, id: Uuid, reason: String },

    #[error("leave {id} cannot change status: it is already {status}")]
    InvalidLeaveTransition { id: Uuid, status: LeaveStatus },

    #[error("leave {id} already started on {from_date} and can no longer be cancelled")]
    LeaveAlreadyStarted { id: Uuid, from_date: NaiveDate },

    #[error("employee {employee_id} has no active salary setup")]
    SalarySetupMissing { employee_id: Uuid },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{0}")]
    InvalidInput(String),

    #[error("database error")]
    Database(#[from] DbErr),
}

impl HrError {
    pub(crate) fn locked(kind: LockKind, id: Uuid, reason: impl Into<String>) -> Self {
        HrError::LockedRecord { kind, id, reason: reason.into() }
    }

    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        HrError::NotFound { entity, id }
    }
}

impl actix_web::error::ResponseError for HrError {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        if let HrError::Database(err) = self {
            tracing::error!(error = %err, "database failure");
        }

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            HrError::DuplicateCheckIn { .. } => StatusCode::CONFLICT,
            HrError::NoOpenCheckIn { .. } => StatusCode::BAD_REQUEST,
            HrError::LockedRecord { .. } => StatusCode::CONFLICT,
            HrError::InvalidLeaveTransition { .. } => StatusCode::CONFLICT,
            HrError::LeaveAlreadyStarted { .. } => StatusCode::BAD_REQUEST,
            HrError::SalarySetupMissing { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            HrError::NotFound { .. } => StatusCode::NOT_FOUND,
            HrError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            HrError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::ResponseError as _;

    use super::*;

    #[test]
    fn test_locked_record_message_names_status() {
        let id = Uuid::new_v4();
        let err = HrError::locked(LockKind::SalarySheet, id, "current status is Paid");

        assert_eq!(err.to_string(), format!("salary sheet {id} is locked: current status is Paid"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_database_error_is_not_leaked() {
        let err = HrError::from(DbErr::Custom("password authentication failed".to_owned()));

        assert_eq!(err.to_string(), "database error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
