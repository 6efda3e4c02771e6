//! Monthly salary computation.
//!
//! `compute_salary_sheet` is pure: the same inputs always give the same
//! draft. `calculate_monthly_salary` only gathers those inputs from storage.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    attendance::{self, AttendanceSummary},
    directory,
    entity::{
        advance_deduction, employee, leave, prelude::*, salary_setup,
        sea_orm_active_enums::{
            ApprovalStatus, DeductionType, EntitlementKind, LeaveStatus, SalarySheetStatus, SalaryType,
        },
    },
    error::HrError,
    leave::approved_leaves_in_month,
    salary::active_salary_setup,
    utils::{self, round2},
};

#[derive(Debug, Clone)]
pub struct PayrollInputs {
    pub employee: employee::Model,
    pub month: u32,
    pub year: i32,
    pub setup: salary_setup::Model,
    pub attendance: AttendanceSummary,
    pub leaves: Vec<leave::Model>,
    pub deductions: Vec<advance_deduction::Model>,
}

/// Computed, not yet persisted, salary sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalarySheetDraft {
    pub employee_id: Uuid,
    pub branch_id: i32,
    pub month: i32,
    pub year: i32,
    pub salary_type: SalaryType,
    pub total_working_days: i32,
    pub present_days: i32,
    pub absent_days: i32,
    pub half_days: i32,
    pub leave_days: i32,
    pub paid_leave_days: f64,
    pub unpaid_leave_days: f64,
    pub working_hours: f64,
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

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct DeductionTotals {
    advance: f64,
    loan: f64,
    fine: f64,
    other: f64,
}

impl DeductionTotals {
    fn collect(rows: &[advance_deduction::Model]) -> Self {
        rows.iter()
            .filter(|row| row.status == ApprovalStatus::Approved)
            .fold(Self::default(), |mut totals, row| {
                match row.deduction_type {
                    DeductionType::Advance => totals.advance += row.amount,
                    DeductionType::Loan => totals.loan += row.amount,
                    DeductionType::Fine => totals.fine += row.amount,
                    DeductionType::Other => totals.other += row.amount,
                }
                totals
            })
    }

    fn total(&self) -> f64 {
        self.advance + self.loan + self.fine + self.other
    }
}

pub fn compute_salary_sheet(inputs: &PayrollInputs) -> SalarySheetDraft {
    let setup = &inputs.setup;
    let summary = &inputs.attendance;

    let approved = inputs.leaves.iter().filter(|l| l.status == LeaveStatus::Approved);
    let (paid_leave_days, unpaid_leave_days) = approved.fold((0.0, 0.0), |(paid, unpaid), leave| {
        match leave.entitlement {
            EntitlementKind::Paid => (paid + leave.number_of_days, unpaid),
            EntitlementKind::Unpaid => (paid, unpaid + leave.number_of_days),
        }
    });

    let (basic_earned, da, hra, conveyance, other_allowance) = match setup.salary_type {
        SalaryType::Monthly => {
            let mut basic = setup.base_salary;

            // prorated against policy working days, not calendar days
            if unpaid_leave_days > 0.0 && summary.total_working_days > 0 {
                let per_day = setup.base_salary / f64::from(summary.total_working_days);
                basic -= unpaid_leave_days * per_day;
            }

            (round2(basic.max(0.0)), setup.da, setup.hra, setup.conveyance, setup.other_allowance)
        },
        SalaryType::Daily => {
            let payable_days = f64::from(summary.present_days) + paid_leave_days;

            (round2(payable_days * setup.daily_rate), 0.0, 0.0, 0.0, 0.0)
        },
    };

    let total_earnings = round2(basic_earned + da + hra + conveyance + other_allowance);

    let deductions = DeductionTotals::collect(&inputs.deductions);
    let total_deductions = round2(deductions.total());

    SalarySheetDraft {
        employee_id: inputs.employee.id,
        branch_id: inputs.employee.branch_id,
        month: inputs.month as i32,
        year: inputs.year,
        salary_type: setup.salary_type,
        total_working_days: summary.total_working_days as i32,
        present_days: summary.present_days as i32,
        absent_days: summary.absent_days as i32,
        half_days: summary.half_days as i32,
        leave_days: summary.leave_days as i32,
        paid_leave_days,
        unpaid_leave_days,
        working_hours: summary.working_hours,
        basic_earned,
        da,
        hra,
        conveyance,
        other_allowance,
        total_earnings,
        advance_deduction: round2(deductions.advance),
        loan_deduction: round2(deductions.loan),
        fine_deduction: round2(deductions.fine),
        other_deduction: round2(deductions.other),
        total_deductions,
        net_salary: round2(total_earnings - total_deductions),
        status: SalarySheetStatus::Calculated,
    }
}

pub async fn approved_deductions_in_month<C: ConnectionTrait>(db: &C, employee_id: Uuid, month: u32, year: i32) -> Result<Vec<advance_deduction::Model>, HrError> {
    let (first, last) = utils::month_range(year, month)?;

    let rows = AdvanceDeduction::find()
        .filter(advance_deduction::Column::EmployeeId.eq(employee_id))
        .filter(advance_deduction::Column::Status.eq(ApprovalStatus::Approved))
        .filter(advance_deduction::Column::Date.between(first, last))
        .order_by_asc(advance_deduction::Column::Date)
        .all(db).await?;

    Ok(rows)
}

pub async fn load_payroll_inputs<C: ConnectionTrait>(db: &C, employee: employee::Model, month: u32, year: i32) -> Result<PayrollInputs, HrError> {
    let (_, last) = utils::month_range(year, month)?;

    let setup = active_salary_setup(db, employee.id, last).await?
        .ok_or(HrError::SalarySetupMissing { employee_id: employee.id })?;

    let attendance = attendance::summary_for_employee(db, &employee, month, year).await?;
    let leaves = approved_leaves_in_month(db, employee.id, month, year).await?;
    let deductions = approved_deductions_in_month(db, employee.id, month, year).await?;

    Ok(PayrollInputs { employee, month, year, setup, attendance, leaves, deductions })
}

pub async fn calculate_monthly_salary<C: ConnectionTrait>(db: &C, employee_id: Uuid, month: u32, year: i32) -> Result<SalarySheetDraft, HrError> {
    let employee = directory::find_employee(db, employee_id).await?;
    let inputs = load_payroll_inputs(db, employee, month, year).await?;
    let draft = compute_salary_sheet(&inputs);

    debug!(%employee_id, month, year, net_salary = draft.net_salary, "salary calculated");

    Ok(draft)
}
