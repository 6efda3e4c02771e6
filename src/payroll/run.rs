//! Payroll runs: one batch per (branch, year, month) with its own
//! Draft → Reviewed → Locked → Paid → Archived lifecycle.
//!
//! Run status never cascades into sheet status and vice versa. The run only
//! checks its members before moving forward.

use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait,
    IntoActiveModel as _, QueryFilter,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction, AuditEvent},
    directory,
    entity::{
        payroll_run, prelude::*, salary_sheet,
        sea_orm_active_enums::{PayrollRunStatus, SalarySheetStatus},
    },
    error::{HrError, LockKind},
    guard,
    hash::HashProvider,
    utils::{self, round2},
};

use super::{
    calculation::{compute_salary_sheet, load_payroll_inputs},
    sheet::{save_salary_sheet, sheets_for_run},
    MODULE,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayrollRun {
    pub branch_id: i32,
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub run: payroll_run::Model,
    pub generated: Vec<Uuid>,
    pub already_present: Vec<Uuid>,
    pub missing_salary_setup: Vec<Uuid>,
}

/// Member count and total net pay over a set of sheets
pub fn aggregate(sheets: &[salary_sheet::Model]) -> (i32, f64) {
    let total = sheets.iter().map(|s| s.net_salary).sum::<f64>();

    (sheets.len() as i32, round2(total))
}

async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<payroll_run::Model, HrError> {
    PayrollRun::find_by_id(id)
        .one(db).await?
        .ok_or_else(|| HrError::not_found("payroll run", id))
}

pub async fn find_payroll_run<C: ConnectionTrait>(db: &C, branch_id: i32, month: u32, year: i32) -> Result<Option<payroll_run::Model>, HrError> {
    let run = PayrollRun::find()
        .filter(payroll_run::Column::BranchId.eq(branch_id))
        .filter(payroll_run::Column::Year.eq(year))
        .filter(payroll_run::Column::Month.eq(month as i32))
        .one(db).await?;

    Ok(run)
}

pub async fn create_payroll_run<C: ConnectionTrait>(
    db: &C,
    data: NewPayrollRun,
    actor: Option<Uuid>,
    now: DateTime<FixedOffset>,
) -> Result<payroll_run::Model, HrError> {
    utils::month_range(data.year, data.month)?;

    if let Some(run) = find_payroll_run(db, data.branch_id, data.month, data.year).await? {
        return Ok(run)
    }

    let model = payroll_run::ActiveModel {
        created_at: Set(now),
        updated_at: Set(now),
        branch_id: Set(data.branch_id),
        month: Set(data.month as i32),
        year: Set(data.year),
        status: Set(PayrollRunStatus::Draft),
        employee_count: Set(0),
        total_net_pay: Set(0.0),
        generated_at: Set(None),
        ..Default::default()
    };
    let run = PayrollRun::insert(model).exec_with_returning(db).await?;

    info!(run_id = %run.id, branch_id = run.branch_id, month = run.month, year = run.year, "payroll run created");

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Create, "payroll_run", Some(run.id))
        .after(&run)
        .actor(actor)
        .branch(Some(run.branch_id))
    ).await;

    Ok(run)
}

/// Computes and stores a sheet for every active employee of the run's branch
/// that has none for the period yet.
pub async fn generate_payroll_run<C: ConnectionTrait>(
    db: &C,
    run_id: Uuid,
    hasher: &dyn HashProvider,
    actor: Option<Uuid>,
    now: DateTime<FixedOffset>,
) -> Result<GenerationReport, HrError> {
    let run = find_by_id(db, run_id).await?;
    guard::ensure_run_mutable(&run)?;

    let month = run.month as u32;
    let employees = directory::active_employees_in_branch(db, run.branch_id).await?;

    let existing = SalarySheet::find()
        .filter(salary_sheet::Column::BranchId.eq(run.branch_id))
        .filter(salary_sheet::Column::Year.eq(run.year))
        .filter(salary_sheet::Column::Month.eq(run.month))
        .all(db).await?;

    let mut generated = Vec::new();
    let mut already_present = Vec::new();
    let mut missing_salary_setup = Vec::new();

    for employee in employees {
        let employee_id = employee.id;

        if existing.iter().any(|s| s.employee_id == employee_id) {
            already_present.push(employee_id);
            continue
        }

        let inputs = match load_payroll_inputs(db, employee, month, run.year).await {
            Ok(inputs) => inputs,
            Err(HrError::SalarySetupMissing { .. }) => {
                warn!(%employee_id, run_id = %run.id, "no salary setup, employee skipped");
                missing_salary_setup.push(employee_id);
                continue
            },
            Err(err) => return Err(err),
        };

        let draft = compute_salary_sheet(&inputs);
        save_salary_sheet(db, &run, draft, hasher, actor, now).await?;
        generated.push(employee_id);
    }

    let sheets = sheets_for_run(db, run.id).await?;
    let (employee_count, total_net_pay) = aggregate(&sheets);

    let mut active = run.clone().into_active_model();
    active.employee_count = Set(employee_count);
    active.total_net_pay = Set(total_net_pay);
    active.generated_at = Set(Some(now));
    active.updated_at = Set(now);
    let updated = active.update(db).await?;

    info!(
        run_id = %updated.id,
        generated = generated.len(),
        skipped = already_present.len(),
        missing_setup = missing_salary_setup.len(),
        "payroll run generated"
    );

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Update, "payroll_run", Some(updated.id))
        .before(&run)
        .after(&updated)
        .actor(actor)
        .branch(Some(updated.branch_id))
    ).await;

    Ok(GenerationReport { run: updated, generated, already_present, missing_salary_setup })
}

async fn transition<C: ConnectionTrait>(
    db: &C,
    run: payroll_run::Model,
    to: PayrollRunStatus,
    action: AuditAction,
    actor: Option<Uuid>,
    now: DateTime<FixedOffset>,
) -> Result<payroll_run::Model, HrError> {
    let mut active = run.clone().into_active_model();
    active.status = Set(to);
    active.updated_at = Set(now);
    let updated = active.update(db).await?;

    info!(run_id = %updated.id, from = %run.status, to = %updated.status, "payroll run status changed");

    audit::log_event(db, AuditEvent::new(MODULE, action, "payroll_run", Some(updated.id))
        .before(&run)
        .after(&updated)
        .actor(actor)
        .branch(Some(updated.branch_id))
    ).await;

    Ok(updated)
}

pub async fn review_payroll_run<C: ConnectionTrait>(db: &C, id: Uuid, actor: Option<Uuid>, now: DateTime<FixedOffset>) -> Result<payroll_run::Model, HrError> {
    let run = find_by_id(db, id).await?;
    guard::ensure_run_transition(&run, PayrollRunStatus::Reviewed)?;

    transition(db, run, PayrollRunStatus::Reviewed, AuditAction::Review, actor, now).await
}

pub async fn lock_payroll_run<C: ConnectionTrait>(db: &C, id: Uuid, actor: Option<Uuid>, now: DateTime<FixedOffset>) -> Result<payroll_run::Model, HrError> {
    let run = find_by_id(db, id).await?;
    if run.status == PayrollRunStatus::Locked {
        return Ok(run)
    }
    guard::ensure_run_lockable(&run)?;

    let sheets = sheets_for_run(db, run.id).await?;
    let pending = sheets
        .iter()
        .filter(|s| !s.status.at_least(SalarySheetStatus::Approved))
        .count();
    if pending > 0 {
        return Err(HrError::locked(
            LockKind::PayrollRun,
            run.id,
            format!("{pending} salary sheet(s) are not approved yet"),
        ))
    }

    transition(db, run, PayrollRunStatus::Locked, AuditAction::Lock, actor, now).await
}

pub async fn mark_payroll_run_paid<C: ConnectionTrait>(db: &C, id: Uuid, actor: Option<Uuid>, now: DateTime<FixedOffset>) -> Result<payroll_run::Model, HrError> {
    let run = find_by_id(db, id).await?;
    guard::ensure_run_transition(&run, PayrollRunStatus::Paid)?;

    let sheets = sheets_for_run(db, run.id).await?;
    let unpaid = sheets
        .iter()
        .filter(|s| s.status != SalarySheetStatus::Paid)
        .count();
    if unpaid > 0 {
        return Err(HrError::locked(
            LockKind::PayrollRun,
            run.id,
            format!("{unpaid} salary sheet(s) are not paid yet"),
        ))
    }

    transition(db, run, PayrollRunStatus::Paid, AuditAction::Pay, actor, now).await
}

pub async fn archive_payroll_run<C: ConnectionTrait>(db: &C, id: Uuid, actor: Option<Uuid>, now: DateTime<FixedOffset>) -> Result<payroll_run::Model, HrError> {
    let run = find_by_id(db, id).await?;
    guard::ensure_run_transition(&run, PayrollRunStatus::Archived)?;

    transition(db, run, PayrollRunStatus::Archived, AuditAction::Archive, actor, now).await
}

#[cfg(test)]
mod tests {
    use chrono::Local;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use crate::{
        attendance::tests::employee,
        guard::tests::{run_with, sheet_with},
        hash::IntegrityHasher,
    };

    use super::*;

    fn audit_ok() -> MockExecResult {
        MockExecResult { last_insert_id: 0, rows_affected: 1 }
    }

    #[test]
    fn test_aggregate() {
        let mut a = sheet_with(SalarySheetStatus::Approved);
        a.net_salary = 27692.31;
        let mut b = sheet_with(SalarySheetStatus::Calculated);
        b.net_salary = 12000.12;

        assert_eq!(aggregate(&[a, b]), (2, 39692.43));
        assert_eq!(aggregate(&[]), (0, 0.0));
    }

    #[actix_web::test]
    async fn test_create_returns_existing_run() {
        let existing = run_with(PayrollRunStatus::Reviewed);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]])
            .into_connection();

        let data = NewPayrollRun { branch_id: 1, month: 3, year: 2024 };
        let run = create_payroll_run(&db, data, None, Local::now().fixed_offset()).await.unwrap();

        assert_eq!(run.id, existing.id);
        assert_eq!(run.status, PayrollRunStatus::Reviewed);
    }

    #[actix_web::test]
    async fn test_lock_requires_approved_sheets() {
        let run = run_with(PayrollRunStatus::Reviewed);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![run.clone()]])
            .append_query_results([vec![
                sheet_with(SalarySheetStatus::Approved),
                sheet_with(SalarySheetStatus::Calculated),
            ]])
            .into_connection();

        let err = lock_payroll_run(&db, run.id, None, Local::now().fixed_offset()).await.unwrap_err();

        assert!(matches!(err, HrError::LockedRecord { kind: LockKind::PayrollRun, .. }));
        assert!(err.to_string().contains("1 salary sheet(s)"));
    }

    #[actix_web::test]
    async fn test_lock_is_idempotent() {
        let run = run_with(PayrollRunStatus::Locked);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![run.clone()]])
            .into_connection();

        let locked = lock_payroll_run(&db, run.id, None, Local::now().fixed_offset()).await.unwrap();
        assert_eq!(locked, run);
    }

    #[actix_web::test]
    async fn test_lock_paid_run_fails() {
        let run = run_with(PayrollRunStatus::Paid);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![run.clone()]])
            .into_connection();

        let err = lock_payroll_run(&db, run.id, None, Local::now().fixed_offset()).await.unwrap_err();
        assert!(matches!(err, HrError::LockedRecord { .. }));
    }

    #[actix_web::test]
    async fn test_lock_does_not_touch_sheets() {
        let run = run_with(PayrollRunStatus::Draft);
        let mut locked = run.clone();
        locked.status = PayrollRunStatus::Locked;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![run.clone()]])
            .append_query_results([vec![
                sheet_with(SalarySheetStatus::Approved),
                sheet_with(SalarySheetStatus::Paid),
            ]])
            .append_query_results([vec![locked.clone()]])
            .append_exec_results([audit_ok()])
            .into_connection();

        let updated = lock_payroll_run(&db, run.id, None, Local::now().fixed_offset()).await.unwrap();
        assert_eq!(updated.status, PayrollRunStatus::Locked);

        // select run, select sheets, update run, audit insert
        assert_eq!(db.into_transaction_log().len(), 4);
    }

    #[actix_web::test]
    async fn test_mark_paid_requires_paid_sheets() {
        let run = run_with(PayrollRunStatus::Locked);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![run.clone()]])
            .append_query_results([vec![
                sheet_with(SalarySheetStatus::Paid),
                sheet_with(SalarySheetStatus::Approved),
            ]])
            .into_connection();

        let err = mark_payroll_run_paid(&db, run.id, None, Local::now().fixed_offset()).await.unwrap_err();
        assert!(err.to_string().contains("not paid yet"));
    }

    #[actix_web::test]
    async fn test_archive_requires_paid_run() {
        let run = run_with(PayrollRunStatus::Locked);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![run.clone()]])
            .into_connection();

        let err = archive_payroll_run(&db, run.id, None, Local::now().fixed_offset()).await.unwrap_err();
        assert!(matches!(err, HrError::LockedRecord { kind: LockKind::PayrollRun, .. }));
    }

    #[actix_web::test]
    async fn test_generate_reports_missing_setup() {
        let run = run_with(PayrollRunStatus::Draft);
        let staff = employee(1);
        let mut generated = run.clone();
        generated.generated_at = Some(Local::now().into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![run.clone()]])
            .append_query_results([vec![staff.clone()]])
            .append_query_results([Vec::<salary_sheet::Model>::new()])
            .append_query_results([Vec::<crate::entity::salary_setup::Model>::new()])
            .append_query_results([Vec::<salary_sheet::Model>::new()])
            .append_query_results([vec![generated.clone()]])
            .append_exec_results([audit_ok()])
            .into_connection();

        let report = generate_payroll_run(&db, run.id, &IntegrityHasher::default(), None, Local::now().fixed_offset())
            .await
            .unwrap();

        assert!(report.generated.is_empty());
        assert_eq!(report.missing_salary_setup, vec![staff.id]);
        assert_eq!(report.run.employee_count, 0);
    }

    #[actix_web::test]
    async fn test_generate_skips_existing_sheets() {
        let run = run_with(PayrollRunStatus::Reviewed);
        let staff = employee(1);
        let mut sheet = sheet_with(SalarySheetStatus::Calculated);
        sheet.employee_id = staff.id;
        sheet.payroll_run_id = Some(run.id);
        let mut generated = run.clone();
        generated.employee_count = 1;
        generated.total_net_pay = sheet.net_salary;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![run.clone()]])
            .append_query_results([vec![staff.clone()]])
            .append_query_results([vec![sheet.clone()]])
            .append_query_results([vec![sheet.clone()]])
            .append_query_results([vec![generated.clone()]])
            .append_exec_results([audit_ok()])
            .into_connection();

        let report = generate_payroll_run(&db, run.id, &IntegrityHasher::default(), None, Local::now().fixed_offset())
            .await
            .unwrap();

        assert_eq!(report.already_present, vec![staff.id]);
        assert_eq!(report.run.employee_count, 1);
    }

    #[actix_web::test]
    async fn test_generate_refuses_locked_run() {
        let run = run_with(PayrollRunStatus::Locked);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![run.clone()]])
            .into_connection();

        let err = generate_payroll_run(&db, run.id, &IntegrityHasher::default(), None, Local::now().fixed_offset())
            .await
            .unwrap_err();

        assert!(matches!(err, HrError::LockedRecord { .. }));
    }
}
