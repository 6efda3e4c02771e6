//! Leave applications, their approval lifecycle and balances.

use chrono::{DateTime, FixedOffset, NaiveDate};
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait,
    IntoActiveModel as _, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction, AuditEvent},
    directory,
    entity::{
        leave, prelude::*,
        sea_orm_active_enums::{EntitlementKind, LeaveStatus, LeaveType},
    },
    error::HrError,
    guard,
    policy::{PolicyResolver, PolicySource, ResolvedEntitlement},
    utils,
};

const MODULE: &str = "leave";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLeave {
    pub employee_id: Uuid,
    pub leave_type: LeaveType,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    /// Defaults to the inclusive length of the date range
    pub number_of_days: Option<f64>,
    /// Defaults to unpaid for loss of pay, paid otherwise
    pub entitlement: Option<EntitlementKind>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaveBalance {
    pub employee_id: Uuid,
    pub leave_type: LeaveType,
    pub year: i32,
    pub total_days: f64,
    pub used_days: f64,
    pub available_days: f64,
    pub source: PolicySource,
}

async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<leave::Model, HrError> {
    Leave::find_by_id(id)
        .one(db).await?
        .ok_or_else(|| HrError::not_found("leave", id))
}

/// Creates an application in `Applied`.
///
/// Overlap with the employee's other applications is not checked.
pub async fn apply_leave<C: ConnectionTrait>(
    db: &C,
    data: NewLeave,
    actor: Option<Uuid>,
    now: DateTime<FixedOffset>,
) -> Result<leave::Model, HrError> {
    if data.to_date < data.from_date {
        return Err(HrError::InvalidInput("leave ends before it starts".to_owned()))
    }

    let range_days = utils::days_between(data.from_date, data.to_date).count() as f64;
    let number_of_days = data.number_of_days.unwrap_or(range_days);
    if number_of_days <= 0.0 {
        return Err(HrError::InvalidInput("number of leave days must be positive".to_owned()))
    }

    let entitlement = data.entitlement.unwrap_or(match data.leave_type {
        LeaveType::LossOfPay => EntitlementKind::Unpaid,
        _ => EntitlementKind::Paid,
    });

    let model = leave::ActiveModel {
        created_at: Set(now),
        updated_at: Set(now),
        employee_id: Set(data.employee_id),
        leave_type: Set(data.leave_type),
        from_date: Set(data.from_date),
        to_date: Set(data.to_date),
        number_of_days: Set(number_of_days),
        entitlement: Set(entitlement),
        status: Set(LeaveStatus::Applied),
        reason: Set(data.reason),
        applied_on: Set(now),
        approved_by: Set(None),
        approved_at: Set(None),
        remarks: Set(None),
        rejection_reason: Set(None),
        ..Default::default()
    };

    let leave = Leave::insert(model).exec_with_returning(db).await?;
    info!(employee_id = %leave.employee_id, leave_id = %leave.id, leave_type = %leave.leave_type, "leave applied");

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Create, "leave", Some(leave.id))
        .after(&leave)
        .actor(actor.or(Some(leave.employee_id)))
    ).await;

    Ok(leave)
}

pub async fn approve_leave<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    approver: Uuid,
    remarks: Option<String>,
    now: DateTime<FixedOffset>,
) -> Result<leave::Model, HrError> {
    let before = find_by_id(db, id).await?;
    guard::ensure_leave_transition(&before, LeaveStatus::Approved)?;

    let mut active = before.clone().into_active_model();
    active.status = Set(LeaveStatus::Approved);
    active.approved_by = Set(Some(approver));
    active.approved_at = Set(Some(now));
    active.remarks = Set(remarks);
    active.updated_at = Set(now);

    let leave = active.update(db).await?;

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Approve, "leave", Some(leave.id))
        .before(&before)
        .after(&leave)
        .actor(Some(approver))
    ).await;

    Ok(leave)
}

pub async fn reject_leave<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    actor: Uuid,
    reason: Option<String>,
    now: DateTime<FixedOffset>,
) -> Result<leave::Model, HrError> {
    let before = find_by_id(db, id).await?;
    guard::ensure_leave_transition(&before, LeaveStatus::Rejected)?;

    let mut active = before.clone().into_active_model();
    active.status = Set(LeaveStatus::Rejected);
    active.rejection_reason = Set(reason.clone());
    active.updated_at = Set(now);

    let leave = active.update(db).await?;

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Reject, "leave", Some(leave.id))
        .before(&before)
        .after(&leave)
        .actor(Some(actor))
        .reason(reason)
    ).await;

    Ok(leave)
}

pub async fn cancel_leave<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    actor: Uuid,
    now: DateTime<FixedOffset>,
) -> Result<leave::Model, HrError> {
    let before = find_by_id(db, id).await?;
    guard::ensure_leave_transition(&before, LeaveStatus::Cancelled)?;

    if before.from_date < now.date_naive() {
        return Err(HrError::LeaveAlreadyStarted { id, from_date: before.from_date })
    }

    let mut active = before.clone().into_active_model();
    active.status = Set(LeaveStatus::Cancelled);
    active.updated_at = Set(now);

    let leave = active.update(db).await?;

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Cancel, "leave", Some(leave.id))
        .before(&before)
        .after(&leave)
        .actor(Some(actor))
    ).await;

    Ok(leave)
}

pub async fn list_leaves<C: ConnectionTrait>(db: &C, employee_id: Uuid, year: i32) -> Result<Vec<leave::Model>, HrError> {
    let (first, _) = utils::month_range(year, 1)?;
    let (_, last) = utils::month_range(year, 12)?;

    let leaves = Leave::find()
        .filter(leave::Column::EmployeeId.eq(employee_id))
        .filter(leave::Column::FromDate.between(first, last))
        .order_by_asc(leave::Column::FromDate)
        .all(db).await?;

    Ok(leaves)
}

/// Approved leaves starting within the month
pub async fn approved_leaves_in_month<C: ConnectionTrait>(db: &C, employee_id: Uuid, month: u32, year: i32) -> Result<Vec<leave::Model>, HrError> {
    let (first, last) = utils::month_range(year, month)?;

    let leaves = Leave::find()
        .filter(leave::Column::EmployeeId.eq(employee_id))
        .filter(leave::Column::Status.eq(LeaveStatus::Approved))
        .filter(leave::Column::FromDate.between(first, last))
        .order_by_asc(leave::Column::FromDate)
        .all(db).await?;

    Ok(leaves)
}

pub fn compute_balance(employee_id: Uuid, year: i32, entitlement: ResolvedEntitlement, leaves: &[leave::Model]) -> LeaveBalance {
    let used_days = leaves
        .iter()
        .filter(|l| l.status == LeaveStatus::Approved && l.leave_type == entitlement.leave_type)
        .map(|l| l.number_of_days)
        .sum::<f64>();

    // Loss of pay is unlimited and never tracked as a balance
    let (total_days, available_days) = match entitlement.leave_type {
        LeaveType::LossOfPay => (0.0, 0.0),
        _ => (entitlement.total_days, (entitlement.total_days - used_days).max(0.0)),
    };

    LeaveBalance {
        employee_id,
        leave_type: entitlement.leave_type,
        year,
        total_days,
        used_days,
        available_days,
        source: entitlement.source,
    }
}

pub async fn get_leave_balance<C: ConnectionTrait>(db: &C, employee_id: Uuid, leave_type: LeaveType, year: i32) -> Result<LeaveBalance, HrError> {
    let employee = directory::find_employee(db, employee_id).await?;

    let entitlement = match leave_type {
        LeaveType::LossOfPay => ResolvedEntitlement {
            leave_type,
            total_days: 0.0,
            source: PolicySource::Default,
        },
        _ => PolicyResolver::new(db)
            .entitlement_for(leave_type, year, employee.branch_id, &employee.category).await?,
    };

    let (first, _) = utils::month_range(year, 1)?;
    let (_, last) = utils::month_range(year, 12)?;

    let approved = Leave::find()
        .filter(leave::Column::EmployeeId.eq(employee_id))
        .filter(leave::Column::LeaveType.eq(leave_type))
        .filter(leave::Column::Status.eq(LeaveStatus::Approved))
        .filter(leave::Column::FromDate.between(first, last))
        .all(db).await?;

    Ok(compute_balance(employee_id, year, entitlement, &approved))
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone as _};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use crate::{
        attendance::tests::employee,
        entity::leave_policy,
        guard::tests::leave_with,
    };

    use super::*;

    fn now() -> DateTime<FixedOffset> {
        Local.with_ymd_and_hms(2025, 4, 10, 10, 0, 0).unwrap().fixed_offset()
    }

    fn audit_ok() -> MockExecResult {
        MockExecResult { last_insert_id: 0, rows_affected: 1 }
    }

    fn approved(days: f64) -> leave::Model {
        let mut leave = leave_with(LeaveStatus::Approved);
        leave.number_of_days = days;
        leave
    }

    #[actix_web::test]
    async fn test_apply_leave() {
        let applied = leave_with(LeaveStatus::Applied);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![applied.clone()]])
            .append_exec_results([audit_ok()])
            .into_connection();

        let data = NewLeave {
            employee_id: applied.employee_id,
            leave_type: LeaveType::Casual,
            from_date: applied.from_date,
            to_date: applied.to_date,
            number_of_days: None,
            entitlement: None,
            reason: Some("family".to_owned()),
        };

        let returned = apply_leave(&db, data, None, now()).await.unwrap();
        assert_eq!(returned.status, LeaveStatus::Applied);
    }

    #[actix_web::test]
    async fn test_apply_leave_rejects_inverted_range() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let data = NewLeave {
            employee_id: Uuid::new_v4(),
            leave_type: LeaveType::Sick,
            from_date: NaiveDate::from_ymd_opt(2025, 4, 15).unwrap(),
            to_date: NaiveDate::from_ymd_opt(2025, 4, 14).unwrap(),
            number_of_days: None,
            entitlement: None,
            reason: None,
        };

        assert!(matches!(apply_leave(&db, data, None, now()).await, Err(HrError::InvalidInput(_))));
    }

    #[actix_web::test]
    async fn test_approve_leave() {
        let applied = leave_with(LeaveStatus::Applied);
        let mut done = applied.clone();
        done.status = LeaveStatus::Approved;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![applied.clone()],
                vec![done.clone()],
            ])
            .append_exec_results([audit_ok()])
            .into_connection();

        let returned = approve_leave(&db, applied.id, Uuid::new_v4(), None, now()).await.unwrap();
        assert_eq!(returned.status, LeaveStatus::Approved);
    }

    #[actix_web::test]
    async fn test_terminal_leave_cannot_change() {
        for status in [LeaveStatus::Approved, LeaveStatus::Rejected, LeaveStatus::Cancelled] {
            let leave = leave_with(status);

            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([
                    vec![leave.clone()],
                    vec![leave.clone()],
                    vec![leave.clone()],
                ])
                .into_connection();

            let actor = Uuid::new_v4();
            assert!(matches!(
                approve_leave(&db, leave.id, actor, None, now()).await,
                Err(HrError::InvalidLeaveTransition { .. })
            ));
            assert!(matches!(
                reject_leave(&db, leave.id, actor, None, now()).await,
                Err(HrError::InvalidLeaveTransition { .. })
            ));
            assert!(matches!(
                cancel_leave(&db, leave.id, actor, now()).await,
                Err(HrError::InvalidLeaveTransition { .. })
            ));
        }
    }

    #[actix_web::test]
    async fn test_cancel_started_leave() {
        let mut leave = leave_with(LeaveStatus::Applied);
        leave.from_date = NaiveDate::from_ymd_opt(2025, 4, 9).unwrap();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![leave.clone()]])
            .into_connection();

        let err = cancel_leave(&db, leave.id, Uuid::new_v4(), now()).await.unwrap_err();
        assert!(matches!(err, HrError::LeaveAlreadyStarted { id, .. } if id == leave.id));
    }

    #[test]
    fn test_compute_balance() {
        let employee_id = Uuid::new_v4();
        let casual = ResolvedEntitlement {
            leave_type: LeaveType::Casual,
            total_days: 12.0,
            source: PolicySource::Default,
        };

        let balance = compute_balance(employee_id, 2025, casual, &[approved(2.0), approved(1.5)]);
        assert_eq!(balance.used_days, 3.5);
        assert_eq!(balance.available_days, 8.5);

        let balance = compute_balance(employee_id, 2025, casual, &[approved(10.0), approved(5.0)]);
        assert_eq!(balance.available_days, 0.0);
    }

    #[test]
    fn test_loss_of_pay_balance_is_always_zero() {
        let lop = ResolvedEntitlement {
            leave_type: LeaveType::LossOfPay,
            total_days: 30.0,
            source: PolicySource::Default,
        };

        let mut taken = approved(4.0);
        taken.leave_type = LeaveType::LossOfPay;

        let balance = compute_balance(Uuid::new_v4(), 2025, lop, &[taken]);
        assert_eq!(balance.total_days, 0.0);
        assert_eq!(balance.available_days, 0.0);
        assert_eq!(balance.used_days, 4.0);
    }

    #[actix_web::test]
    async fn test_get_leave_balance_falls_back_to_default_table() {
        let employee = employee(1);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![employee.clone()]])
            .append_query_results([Vec::<leave_policy::Model>::new()])
            .append_query_results([vec![approved(3.0)]])
            .into_connection();

        let balance = get_leave_balance(&db, employee.id, LeaveType::Casual, 2025).await.unwrap();

        assert_eq!(balance.total_days, 12.0);
        assert_eq!(balance.used_days, 3.0);
        assert_eq!(balance.available_days, 9.0);
        assert!(balance.source.is_fallback());
    }
}
