//! Persisted salary sheets and their Calculated → Approved → Paid lifecycle.

use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait,
    IntoActiveModel as _, QueryFilter, QueryOrder, SqlErr,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction, AuditEvent},
    entity::{payroll_run, prelude::*, salary_sheet, sea_orm_active_enums::SalarySheetStatus},
    error::HrError,
    guard,
    hash::{ContentDigest, HashProvider},
    utils::round2,
};

use super::{calculation::SalarySheetDraft, MODULE};

/// Canonical payload covered by a sheet's integrity hash.
///
/// Field order is fixed; identifiers and timestamps are left out on purpose
/// so the digest only moves when a financial fact moves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetFinancials {
    pub employee_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub total_working_days: i32,
    pub present_days: i32,
    pub absent_days: i32,
    pub half_days: i32,
    pub leave_days: i32,
    pub paid_leave_days: f64,
    pub unpaid_leave_days: f64,
    pub basic_earned: f64,
    pub da: f64,
    pub hra: f64,
    pub conveyance: f64,
    pub other_allowance: f64,
    pub total_earnings: f64,
    pub advance_deduction: f64,
    pub loan_deduction: f64,
    pub fine_deduction: f64,
    pub other_deduction: f64,
    pub total_deductions: f64,
    pub net_salary: f64,
    pub status: SalarySheetStatus,
}

impl From<&salary_sheet::Model> for SheetFinancials {
    fn from(s: &salary_sheet::Model) -> Self {
        Self {
            employee_id: s.employee_id,
            month: s.month,
            year: s.year,
            total_working_days: s.total_working_days,
            present_days: s.present_days,
            absent_days: s.absent_days,
            half_days: s.half_days,
            leave_days: s.leave_days,
            paid_leave_days: s.paid_leave_days,
            unpaid_leave_days: s.unpaid_leave_days,
            basic_earned: s.basic_earned,
            da: s.da,
            hra: s.hra,
            conveyance: s.conveyance,
            other_allowance: s.other_allowance,
            total_earnings: s.total_earnings,
            advance_deduction: s.advance_deduction,
            loan_deduction: s.loan_deduction,
            fine_deduction: s.fine_deduction,
            other_deduction: s.other_deduction,
            total_deductions: s.total_deductions,
            net_salary: s.net_salary,
            status: s.status,
        }
    }
}

impl From<&SalarySheetDraft> for SheetFinancials {
    fn from(d: &SalarySheetDraft) -> Self {
        Self {
            employee_id: d.employee_id,
            month: d.month,
            year: d.year,
            total_working_days: d.total_working_days,
            present_days: d.present_days,
            absent_days: d.absent_days,
            half_days: d.half_days,
            leave_days: d.leave_days,
            paid_leave_days: d.paid_leave_days,
            unpaid_leave_days: d.unpaid_leave_days,
            basic_earned: d.basic_earned,
            da: d.da,
            hra: d.hra,
            conveyance: d.conveyance,
            other_allowance: d.other_allowance,
            total_earnings: d.total_earnings,
            advance_deduction: d.advance_deduction,
            loan_deduction: d.loan_deduction,
            fine_deduction: d.fine_deduction,
            other_deduction: d.other_deduction,
            total_deductions: d.total_deductions,
            net_salary: d.net_salary,
            status: d.status,
        }
    }
}

impl SheetFinancials {
    pub fn digest(&self, hasher: &dyn HashProvider) -> ContentDigest {
        // serializing plain numbers and strings cannot fail
        let payload = serde_json::to_vec(self).unwrap_or_default();

        hasher.hash(&payload)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalarySheetPatch {
    pub advance_deduction: Option<f64>,
    pub loan_deduction: Option<f64>,
    pub fine_deduction: Option<f64>,
    pub other_deduction: Option<f64>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub mode: String,
    pub reference: Option<String>,
}

async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<salary_sheet::Model, HrError> {
    SalarySheet::find_by_id(id)
        .one(db).await?
        .ok_or_else(|| HrError::not_found("salary sheet", id))
}

pub async fn sheets_for_run<C: ConnectionTrait>(db: &C, run_id: Uuid) -> Result<Vec<salary_sheet::Model>, HrError> {
    let sheets = SalarySheet::find()
        .filter(salary_sheet::Column::PayrollRunId.eq(run_id))
        .order_by_asc(salary_sheet::Column::CreatedAt)
        .all(db).await?;

    Ok(sheets)
}

pub async fn save_salary_sheet<C: ConnectionTrait>(
    db: &C,
    run: &payroll_run::Model,
    draft: SalarySheetDraft,
    hasher: &dyn HashProvider,
    actor: Option<Uuid>,
    now: DateTime<FixedOffset>,
) -> Result<salary_sheet::Model, HrError> {
    guard::ensure_run_mutable(run)?;

    if (draft.branch_id, draft.year, draft.month) != (run.branch_id, run.year, run.month) {
        return Err(HrError::InvalidInput(format!(
            "salary sheet for {}-{:02} branch {} does not belong to payroll run {}",
            draft.year, draft.month, draft.branch_id, run.id
        )))
    }

    let digest = SheetFinancials::from(&draft).digest(hasher);

    let model = salary_sheet::ActiveModel {
        created_at: Set(now),
        updated_at: Set(now),
        employee_id: Set(draft.employee_id),
        payroll_run_id: Set(Some(run.id)),
        branch_id: Set(draft.branch_id),
        month: Set(draft.month),
        year: Set(draft.year),
        total_working_days: Set(draft.total_working_days),
        present_days: Set(draft.present_days),
        absent_days: Set(draft.absent_days),
        half_days: Set(draft.half_days),
        leave_days: Set(draft.leave_days),
        paid_leave_days: Set(draft.paid_leave_days),
        unpaid_leave_days: Set(draft.unpaid_leave_days),
        working_hours: Set(draft.working_hours),
        basic_earned: Set(draft.basic_earned),
        da: Set(draft.da),
        hra: Set(draft.hra),
        conveyance: Set(draft.conveyance),
        other_allowance: Set(draft.other_allowance),
        total_earnings: Set(draft.total_earnings),
        advance_deduction: Set(draft.advance_deduction),
        loan_deduction: Set(draft.loan_deduction),
        fine_deduction: Set(draft.fine_deduction),
        other_deduction: Set(draft.other_deduction),
        total_deductions: Set(draft.total_deductions),
        net_salary: Set(draft.net_salary),
        status: Set(draft.status),
        remarks: Set(None),
        approved_by: Set(None),
        approved_at: Set(None),
        paid_at: Set(None),
        payment_mode: Set(None),
        payment_reference: Set(None),
        integrity_hash: Set(Some(digest.hex)),
        hash_algorithm: Set(Some(digest.algorithm.tag().to_owned())),
        ..Default::default()
    };

    let sheet = match SalarySheet::insert(model).exec_with_returning(db).await {
        Ok(sheet) => sheet,
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(HrError::InvalidInput(format!(
                "employee {} already has a salary sheet for {}-{:02}",
                draft.employee_id, draft.year, draft.month
            )))
        },
        Err(err) => return Err(err.into()),
    };

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Create, "salary_sheet", Some(sheet.id))
        .after(&sheet)
        .actor(actor)
        .branch(Some(sheet.branch_id))
    ).await;

    Ok(sheet)
}

fn rehash(active: &mut salary_sheet::ActiveModel, sheet: &salary_sheet::Model, hasher: &dyn HashProvider) {
    let digest = SheetFinancials::from(sheet).digest(hasher);

    active.integrity_hash = Set(Some(digest.hex));
    active.hash_algorithm = Set(Some(digest.algorithm.tag().to_owned()));
}

/// Applies a manual deduction patch to a sheet that is still `Calculated`
pub fn apply_patch(sheet: &salary_sheet::Model, patch: &SalarySheetPatch) -> Result<salary_sheet::Model, HrError> {
    let amounts = [
        patch.advance_deduction,
        patch.loan_deduction,
        patch.fine_deduction,
        patch.other_deduction,
    ];
    if amounts.iter().flatten().any(|amount| !amount.is_finite() || *amount < 0.0) {
        return Err(HrError::InvalidInput("deductions must be non-negative".to_owned()))
    }

    let mut next = sheet.clone();
    next.advance_deduction = round2(patch.advance_deduction.unwrap_or(sheet.advance_deduction));
    next.loan_deduction = round2(patch.loan_deduction.unwrap_or(sheet.loan_deduction));
    next.fine_deduction = round2(patch.fine_deduction.unwrap_or(sheet.fine_deduction));
    next.other_deduction = round2(patch.other_deduction.unwrap_or(sheet.other_deduction));
    next.total_deductions = round2(
        next.advance_deduction + next.loan_deduction + next.fine_deduction + next.other_deduction,
    );
    next.net_salary = round2(next.total_earnings - next.total_deductions);
    if patch.remarks.is_some() {
        next.remarks = patch.remarks.clone();
    }

    Ok(next)
}

pub async fn update_salary_sheet<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    patch: SalarySheetPatch,
    hasher: &dyn HashProvider,
    actor: Option<Uuid>,
    now: DateTime<FixedOffset>,
) -> Result<salary_sheet::Model, HrError> {
    let before = find_by_id(db, id).await?;
    guard::ensure_sheet_mutable(&before)?;

    let next = apply_patch(&before, &patch)?;

    let mut active = before.clone().into_active_model();
    active.advance_deduction = Set(next.advance_deduction);
    active.loan_deduction = Set(next.loan_deduction);
    active.fine_deduction = Set(next.fine_deduction);
    active.other_deduction = Set(next.other_deduction);
    active.total_deductions = Set(next.total_deductions);
    active.net_salary = Set(next.net_salary);
    active.remarks = Set(next.remarks.clone());
    active.updated_at = Set(now);
    rehash(&mut active, &next, hasher);

    let sheet = active.update(db).await?;

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Update, "salary_sheet", Some(sheet.id))
        .before(&before)
        .after(&sheet)
        .actor(actor)
        .branch(Some(sheet.branch_id))
    ).await;

    Ok(sheet)
}

pub async fn approve_salary_sheet<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    approver: Uuid,
    hasher: &dyn HashProvider,
    now: DateTime<FixedOffset>,
) -> Result<salary_sheet::Model, HrError> {
    let before = find_by_id(db, id).await?;
    guard::ensure_sheet_transition(&before, SalarySheetStatus::Approved)?;

    let mut next = before.clone();
    next.status = SalarySheetStatus::Approved;

    let mut active = before.clone().into_active_model();
    active.status = Set(SalarySheetStatus::Approved);
    active.approved_by = Set(Some(approver));
    active.approved_at = Set(Some(now));
    active.updated_at = Set(now);
    rehash(&mut active, &next, hasher);

    let sheet = active.update(db).await?;
    info!(sheet_id = %sheet.id, employee_id = %sheet.employee_id, "salary sheet approved");

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Approve, "salary_sheet", Some(sheet.id))
        .before(&before)
        .after(&sheet)
        .actor(Some(approver))
        .branch(Some(sheet.branch_id))
    ).await;

    Ok(sheet)
}

pub async fn pay_salary_sheet<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    payment: Payment,
    hasher: &dyn HashProvider,
    actor: Option<Uuid>,
    now: DateTime<FixedOffset>,
) -> Result<salary_sheet::Model, HrError> {
    if payment.mode.trim().is_empty() {
        return Err(HrError::InvalidInput("payment mode is required".to_owned()))
    }

    let before = find_by_id(db, id).await?;
    guard::ensure_sheet_transition(&before, SalarySheetStatus::Paid)?;

    let mut next = before.clone();
    next.status = SalarySheetStatus::Paid;

    let mut active = before.clone().into_active_model();
    active.status = Set(SalarySheetStatus::Paid);
    active.paid_at = Set(Some(now));
    active.payment_mode = Set(Some(payment.mode));
    active.payment_reference = Set(payment.reference);
    active.updated_at = Set(now);
    rehash(&mut active, &next, hasher);

    let sheet = active.update(db).await?;
    info!(sheet_id = %sheet.id, employee_id = %sheet.employee_id, net_salary = sheet.net_salary, "salary sheet paid");

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Pay, "salary_sheet", Some(sheet.id))
        .before(&before)
        .after(&sheet)
        .actor(actor)
        .branch(Some(sheet.branch_id))
    ).await;

    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use chrono::Local;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use crate::{
        guard::tests::{run_with, sheet_with},
        hash::{HashAlgorithm, IntegrityHasher},
        payroll::calculation::{compute_salary_sheet, tests::monthly_inputs},
        entity::sea_orm_active_enums::PayrollRunStatus,
    };

    use super::*;

    fn audit_ok() -> MockExecResult {
        MockExecResult { last_insert_id: 0, rows_affected: 1 }
    }

    #[actix_web::test]
    async fn test_paid_sheet_rejects_update() {
        let paid = sheet_with(SalarySheetStatus::Paid);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![paid.clone()]])
            .into_connection();

        let patch = SalarySheetPatch { other_deduction: Some(100.0), ..Default::default() };
        let err = update_salary_sheet(&db, paid.id, patch, &IntegrityHasher::default(), None, Local::now().fixed_offset())
            .await
            .unwrap_err();

        assert!(matches!(err, HrError::LockedRecord { .. }));
        assert!(err.to_string().contains("Paid"));
    }

    #[actix_web::test]
    async fn test_pay_requires_approval() {
        let calculated = sheet_with(SalarySheetStatus::Calculated);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![calculated.clone()]])
            .into_connection();

        let payment = Payment { mode: "bank".to_owned(), reference: None };
        let err = pay_salary_sheet(&db, calculated.id, payment, &IntegrityHasher::default(), None, Local::now().fixed_offset())
            .await
            .unwrap_err();

        assert!(matches!(err, HrError::LockedRecord { .. }));
    }

    #[actix_web::test]
    async fn test_approve_sheet() {
        let calculated = sheet_with(SalarySheetStatus::Calculated);
        let mut approved = calculated.clone();
        approved.status = SalarySheetStatus::Approved;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![calculated.clone()],
                vec![approved.clone()],
            ])
            .append_exec_results([audit_ok()])
            .into_connection();

        let sheet = approve_salary_sheet(&db, calculated.id, Uuid::new_v4(), &IntegrityHasher::default(), Local::now().fixed_offset())
            .await
            .unwrap();

        assert_eq!(sheet.status, SalarySheetStatus::Approved);
    }

    #[actix_web::test]
    async fn test_save_sheet_into_locked_run() {
        let run = run_with(PayrollRunStatus::Locked);
        let draft = compute_salary_sheet(&monthly_inputs(30000.0, 22, 0.0));

        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = save_salary_sheet(&db, &run, draft, &IntegrityHasher::default(), None, Local::now().fixed_offset())
            .await
            .unwrap_err();

        assert!(matches!(err, HrError::LockedRecord { .. }));
    }

    #[actix_web::test]
    async fn test_save_sheet_checks_run_period() {
        // run is for 2024-03, draft for 2025-04
        let run = run_with(PayrollRunStatus::Draft);
        let draft = compute_salary_sheet(&monthly_inputs(30000.0, 22, 0.0));

        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = save_salary_sheet(&db, &run, draft, &IntegrityHasher::default(), None, Local::now().fixed_offset())
            .await
            .unwrap_err();

        assert!(matches!(err, HrError::InvalidInput(_)));
    }

    #[test]
    fn test_apply_patch() {
        let sheet = sheet_with(SalarySheetStatus::Calculated);

        let patch = SalarySheetPatch {
            fine_deduction: Some(250.0),
            other_deduction: Some(49.999),
            remarks: Some("uniform".to_owned()),
            ..Default::default()
        };
        let next = apply_patch(&sheet, &patch).unwrap();

        assert_eq!(next.total_deductions, 300.0);
        assert_eq!(next.net_salary, 29700.0);
        assert_eq!(next.total_earnings, sheet.total_earnings);
        assert_eq!(next.remarks.as_deref(), Some("uniform"));

        let negative = SalarySheetPatch { loan_deduction: Some(-1.0), ..Default::default() };
        assert!(apply_patch(&sheet, &negative).is_err());
    }

    #[test]
    fn test_integrity_digest_tracks_financial_fields() {
        let sheet = sheet_with(SalarySheetStatus::Approved);
        let hasher = IntegrityHasher::default();

        let digest = SheetFinancials::from(&sheet).digest(&hasher);
        assert_eq!(digest.algorithm, HashAlgorithm::Sha256);
        assert_eq!(digest.hex.len(), 64);

        // timestamps and ids outside the payload do not matter
        let mut relinked = sheet.clone();
        relinked.payroll_run_id = Some(Uuid::new_v4());
        relinked.updated_at = Local::now().into();
        assert_eq!(SheetFinancials::from(&relinked).digest(&hasher), digest);

        let mut changed = sheet.clone();
        changed.net_salary += 0.01;
        assert_ne!(SheetFinancials::from(&changed).digest(&hasher), digest);

        let fallback = SheetFinancials::from(&sheet).digest(&IntegrityHasher::new(HashAlgorithm::Fnv1a32));
        assert_eq!(fallback.hex.len(), 8);
    }

    #[test]
    fn test_run_link_restricts_run_deletes() {
        use sea_orm::{sea_query::ForeignKeyAction, RelationTrait as _};

        let relation = salary_sheet::Relation::PayrollRun.def();
        assert!(matches!(relation.on_delete, Some(ForeignKeyAction::Restrict)));
        assert!(matches!(relation.on_update, Some(ForeignKeyAction::Cascade)));
    }
}
