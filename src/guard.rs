//! Transition tables for every guarded lifecycle and the checks consulted
//! before mutating attendance, leave, salary sheet and payroll run rows.

use serde::Serialize;

use crate::{
    entity::{
        attendance, leave, payroll_run, salary_sheet,
        sea_orm_active_enums::{LeaveStatus, PayrollRunStatus, SalarySheetStatus},
    },
    error::{HrError, LockKind},
};

/// Lock state of an attendance record, derived from its approval markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttendanceLock {
    Open,
    Approved,
}

impl AttendanceLock {
    pub fn of(record: &attendance::Model) -> Self {
        if record.approved_by.is_some() || record.approved_at.is_some() {
            AttendanceLock::Approved
        } else {
            AttendanceLock::Open
        }
    }

    pub fn can_transition(self, to: Self) -> bool {
        matches!((self, to), (AttendanceLock::Open, AttendanceLock::Approved))
    }
}

impl LeaveStatus {
    pub fn can_transition(self, to: Self) -> bool {
        use LeaveStatus::*;

        matches!(
            (self, to),
            (Applied, Approved) | (Applied, Rejected) | (Applied, Cancelled)
        )
    }
}

impl SalarySheetStatus {
    pub fn can_transition(self, to: Self) -> bool {
        use SalarySheetStatus::*;

        matches!((self, to), (Calculated, Approved) | (Approved, Paid))
    }

    /// Whether the sheet has reached at least `other` on its lifecycle
    pub fn at_least(self, other: Self) -> bool {
        self.rank() >= other.rank()
    }

    fn rank(self) -> u8 {
        match self {
            SalarySheetStatus::Calculated => 0,
            SalarySheetStatus::Approved => 1,
            SalarySheetStatus::Paid => 2,
        }
    }
}

impl PayrollRunStatus {
    pub fn can_transition(self, to: Self) -> bool {
        use PayrollRunStatus::*;

        matches!(
            (self, to),
            (Draft, Reviewed)
                | (Draft, Locked)
                | (Reviewed, Locked)
                | (Locked, Paid)
                | (Paid, Archived)
        )
    }

    /// Lowest status a salary sheet must have reached to belong to a run in this state
    pub fn sheet_floor(self) -> SalarySheetStatus {
        match self {
            PayrollRunStatus::Draft | PayrollRunStatus::Reviewed => SalarySheetStatus::Calculated,
            PayrollRunStatus::Locked => SalarySheetStatus::Approved,
            PayrollRunStatus::Paid | PayrollRunStatus::Archived => SalarySheetStatus::Paid,
        }
    }
}

pub fn ensure_attendance_mutable(record: &attendance::Model) -> Result<(), HrError> {
    match AttendanceLock::of(record) {
        AttendanceLock::Open => Ok(()),
        AttendanceLock::Approved => Err(HrError::locked(
            LockKind::Attendance,
            record.id,
            "record has been approved",
        )),
    }
}

pub fn ensure_leave_transition(leave: &leave::Model, to: LeaveStatus) -> Result<(), HrError> {
    if leave.status.can_transition(to) {
        Ok(())
    } else {
        Err(HrError::InvalidLeaveTransition { id: leave.id, status: leave.status })
    }
}

pub fn ensure_sheet_mutable(sheet: &salary_sheet::Model) -> Result<(), HrError> {
    if sheet.status == SalarySheetStatus::Calculated {
        return Ok(())
    }

    Err(HrError::locked(
        LockKind::SalarySheet,
        sheet.id,
        format!("current status is {}", sheet.status),
    ))
}

pub fn ensure_sheet_transition(sheet: &salary_sheet::Model, to: SalarySheetStatus) -> Result<(), HrError> {
    if sheet.status.can_transition(to) {
        return Ok(())
    }

    let reason = match to {
        SalarySheetStatus::Paid => format!("only approved sheets can be paid, current status is {}", sheet.status),
        _ => format!("cannot move from {} to {}", sheet.status, to),
    };

    Err(HrError::locked(LockKind::SalarySheet, sheet.id, reason))
}

pub fn ensure_run_mutable(run: &payroll_run::Model) -> Result<(), HrError> {
    match run.status {
        PayrollRunStatus::Draft | PayrollRunStatus::Reviewed => Ok(()),
        status => Err(HrError::locked(
            LockKind::PayrollRun,
            run.id,
            format!("current status is {status}"),
        )),
    }
}

pub fn ensure_run_lockable(run: &payroll_run::Model) -> Result<(), HrError> {
    match run.status {
        PayrollRunStatus::Paid | PayrollRunStatus::Archived => Err(HrError::locked(
            LockKind::PayrollRun,
            run.id,
            format!("cannot lock a run that is already {}", run.status),
        )),
        _ => Ok(()),
    }
}

/// A sheet may join `run` only if it already meets the floor of the run's status.
pub fn ensure_sheet_fits_run(run: &payroll_run::Model, sheet: &salary_sheet::Model) -> Result<(), HrError> {
    let floor = run.status.sheet_floor();
    if sheet.status.at_least(floor) {
        return Ok(())
    }

    Err(HrError::locked(
        LockKind::PayrollRun,
        run.id,
        format!("a {} run only holds sheets that are at least {floor}, salary sheet {} is {}", run.status, sheet.id, sheet.status),
    ))
}

pub fn ensure_run_transition(run: &payroll_run::Model, to: PayrollRunStatus) -> Result<(), HrError> {
    if run.status.can_transition(to) {
        return Ok(())
    }

    Err(HrError::locked(
        LockKind::PayrollRun,
        run.id,
        format!("cannot move from {} to {}", run.status, to),
    ))
}
