//! Backfills the payroll run link on salary sheets written before payroll
//! runs existed.
//!
//! Planning is pure and works on a snapshot of sheets and runs. Execution
//! applies each (branch, year, month) group inside its own transaction, so a
//! failed group leaves nothing half linked and the next run retries it whole.
//! Sheet monetary columns and existing timestamps are never written. A group
//! whose sheets would break the status of the run already holding its period
//! is reported as failed and left untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use sea_orm::{
    sea_query::Expr, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction, AuditEvent},
    entity::{
        payroll_run, prelude::*, salary_sheet,
        sea_orm_active_enums::{PayrollRunStatus, SalarySheetStatus},
    },
    error::HrError,
    guard,
    hash::HashProvider,
    payroll::{run::aggregate, sheet::{sheets_for_run, SheetFinancials}},
};

const MODULE: &str = "legacy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub branch_id: i32,
    pub year: i32,
    pub month: i32,
}

impl GroupKey {
    pub fn of(sheet: &salary_sheet::Model) -> Self {
        Self { branch_id: sheet.branch_id, year: sheet.year, month: sheet.month }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RunPlan {
    Existing(Uuid),
    /// The period's run exists but cannot hold these sheets
    Conflict {
        run_id: Uuid,
        reason: String,
    },
    Create {
        status: PayrollRunStatus,
        created_at: DateTime<FixedOffset>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupPlan {
    pub key: GroupKey,
    pub run: RunPlan,
    pub sheet_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkedGroup {
    pub key: GroupKey,
    pub run_id: Uuid,
    pub created_run: bool,
    pub sheet_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedGroup {
    pub key: GroupKey,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LegacyMigrationReport {
    pub linked: Vec<LinkedGroup>,
    pub failed: Vec<FailedGroup>,
}

/// Paid if any member is Paid, else Locked if any member is Approved, else Draft
pub fn infer_run_status<'a>(sheets: impl IntoIterator<Item = &'a salary_sheet::Model>) -> PayrollRunStatus {
    let mut status = PayrollRunStatus::Draft;

    for sheet in sheets {
        match sheet.status {
            SalarySheetStatus::Paid => return PayrollRunStatus::Paid,
            SalarySheetStatus::Approved => status = PayrollRunStatus::Locked,
            SalarySheetStatus::Calculated => {},
        }
    }

    status
}

pub fn plan_legacy_links(sheets: &[salary_sheet::Model], runs: &[payroll_run::Model]) -> Vec<GroupPlan> {
    let mut groups: BTreeMap<GroupKey, Vec<&salary_sheet::Model>> = BTreeMap::new();
    for sheet in sheets.iter().filter(|s| s.payroll_run_id.is_none()) {
        groups.entry(GroupKey::of(sheet)).or_default().push(sheet);
    }

    groups
        .into_iter()
        .filter_map(|(key, mut members)| {
            members.sort_by_key(|s| (s.created_at, s.id));
            let earliest = members.first()?.created_at;

            let existing = runs
                .iter()
                .find(|r| (r.branch_id, r.year, r.month) == (key.branch_id, key.year, key.month));

            let run = match existing {
                Some(run) => match members.iter().try_for_each(|s| guard::ensure_sheet_fits_run(run, s)) {
                    Ok(()) => RunPlan::Existing(run.id),
                    Err(err) => RunPlan::Conflict { run_id: run.id, reason: err.to_string() },
                },
                None => RunPlan::Create {
                    status: infer_run_status(members.iter().copied()),
                    created_at: earliest,
                },
            };

            Some(GroupPlan {
                key,
                run,
                sheet_ids: members.iter().map(|s| s.id).collect(),
            })
        })
        .collect()
}

async fn apply_group<C>(
    db: &C,
    plan: &GroupPlan,
    sheets: &BTreeMap<Uuid, &salary_sheet::Model>,
    hasher: Option<&dyn HashProvider>,
    actor: Option<Uuid>,
) -> Result<LinkedGroup, HrError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let members = plan
        .sheet_ids
        .iter()
        .filter_map(|id| sheets.get(id).copied())
        .cloned()
        .collect::<Vec<_>>();

    let txn = db.begin().await?;

    let (run_id, created_run) = match &plan.run {
        RunPlan::Conflict { reason, .. } => return Err(HrError::InvalidInput(reason.clone())),
        RunPlan::Existing(id) => (*id, false),
        RunPlan::Create { status, created_at } => {
            let (employee_count, total_net_pay) = aggregate(&members);
            let model = payroll_run::ActiveModel {
                created_at: Set(*created_at),
                updated_at: Set(*created_at),
                branch_id: Set(plan.key.branch_id),
                month: Set(plan.key.month),
                year: Set(plan.key.year),
                status: Set(*status),
                employee_count: Set(employee_count),
                total_net_pay: Set(total_net_pay),
                generated_at: Set(None),
                ..Default::default()
            };
            let run = PayrollRun::insert(model).exec_with_returning(&txn).await?;
            (run.id, true)
        },
    };

    let mut algorithm = None;
    for sheet in &members {
        let mut update = SalarySheet::update_many()
            .col_expr(salary_sheet::Column::PayrollRunId, Expr::value(run_id));

        if let Some(hasher) = hasher {
            let digest = SheetFinancials::from(sheet).digest(hasher);
            algorithm = Some(digest.algorithm.tag());
            update = update
                .col_expr(salary_sheet::Column::IntegrityHash, Expr::value(digest.hex))
                .col_expr(salary_sheet::Column::HashAlgorithm, Expr::value(digest.algorithm.tag()));
        }

        update
            .filter(salary_sheet::Column::Id.eq(sheet.id))
            .filter(salary_sheet::Column::PayrollRunId.is_null())
            .exec(&txn).await?;
    }

    // only the aggregates move, the run keeps its status and timestamps
    if !created_run {
        let (employee_count, total_net_pay) = aggregate(&sheets_for_run(&txn, run_id).await?);
        PayrollRun::update_many()
            .col_expr(payroll_run::Column::EmployeeCount, Expr::value(employee_count))
            .col_expr(payroll_run::Column::TotalNetPay, Expr::value(total_net_pay))
            .filter(payroll_run::Column::Id.eq(run_id))
            .exec(&txn).await?;
    }

    audit::log_event_in_savepoint(&txn, AuditEvent::new(MODULE, AuditAction::Migrate, "payroll_run", Some(run_id))
        .before(&json!({ "unlinked_sheet_ids": plan.sheet_ids }))
        .after(&json!({
            "payroll_run_id": run_id,
            "created_run": created_run,
            "linked_sheet_ids": plan.sheet_ids,
            "hash_algorithm": algorithm,
        }))
        .actor(actor)
        .branch(Some(plan.key.branch_id))
    ).await;

    txn.commit().await?;

    Ok(LinkedGroup {
        key: plan.key,
        run_id,
        created_run,
        sheet_ids: plan.sheet_ids.clone(),
    })
}

/// Links every unlinked salary sheet to the payroll run of its period.
/// Safe to run again: linked sheets are no longer picked up.
#[instrument(skip(db, hasher))]
pub async fn migrate_legacy_salary_sheets<C>(
    db: &C,
    hasher: Option<&dyn HashProvider>,
    actor: Option<Uuid>,
) -> Result<LegacyMigrationReport, HrError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let unlinked = SalarySheet::find()
        .filter(salary_sheet::Column::PayrollRunId.is_null())
        .order_by_asc(salary_sheet::Column::CreatedAt)
        .all(db).await?;

    let mut report = LegacyMigrationReport::default();
    if unlinked.is_empty() {
        info!("no legacy salary sheets to link");
        return Ok(report)
    }

    let runs = PayrollRun::find().all(db).await?;
    let plans = plan_legacy_links(&unlinked, &runs);
    let by_id = unlinked.iter().map(|s| (s.id, s)).collect::<BTreeMap<_, _>>();

    for plan in &plans {
        match apply_group(db, plan, &by_id, hasher, actor).await {
            Ok(linked) => {
                info!(
                    branch_id = plan.key.branch_id,
                    year = plan.key.year,
                    month = plan.key.month,
                    run_id = %linked.run_id,
                    sheets = linked.sheet_ids.len(),
                    "legacy group linked"
                );
                report.linked.push(linked);
            },
            Err(err) => {
                error!(
                    branch_id = plan.key.branch_id,
                    year = plan.key.year,
                    month = plan.key.month,
                    error = %err,
                    "legacy group failed"
                );
                report.failed.push(FailedGroup { key: plan.key, error: err.to_string() });
            },
        }
    }

    Ok(report)
}
