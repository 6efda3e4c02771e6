//! Attendance ledger: one row per employee per day.

use chrono::{DateTime, FixedOffset, NaiveDate};
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    IntoActiveModel as _, QueryFilter, QueryOrder, SqlErr,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction, AuditEvent},
    directory,
    entity::{attendance, employee, prelude::*, sea_orm_active_enums::AttendanceStatus},
    error::HrError,
    guard,
    policy::{PolicyResolver, PolicySource},
    utils,
};

const MODULE: &str = "attendance";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttendance {
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: Option<DateTime<FixedOffset>>,
    pub check_out: Option<DateTime<FixedOffset>>,
    pub site_id: Option<i32>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendancePatch {
    pub status: Option<AttendanceStatus>,
    pub check_in: Option<DateTime<FixedOffset>>,
    pub check_out: Option<DateTime<FixedOffset>>,
    pub site_id: Option<i32>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub employee_id: Uuid,
    pub month: u32,
    pub year: i32,
    pub total_working_days: u32,
    pub present_days: u32,
    pub absent_days: u32,
    pub half_days: u32,
    pub leave_days: u32,
    pub working_hours: f64,
    pub calendar_source: PolicySource,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn working_hours(check_in: Option<DateTime<FixedOffset>>, check_out: Option<DateTime<FixedOffset>>) -> f64 {
    match (check_in, check_out) {
        (Some(check_in), Some(check_out)) => utils::hours_between(&check_in, &check_out),
        _ => 0.0,
    }
}

async fn find_for_day<C: ConnectionTrait>(db: &C, employee_id: Uuid, date: NaiveDate) -> Result<Option<attendance::Model>, HrError> {
    let record = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .filter(attendance::Column::Date.eq(date))
        .one(db).await?;

    Ok(record)
}

async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<attendance::Model, HrError> {
    Attendance::find_by_id(id)
        .one(db).await?
        .ok_or_else(|| HrError::not_found("attendance record", id))
}

/// Inserts a row, turning a (employee, date) uniqueness conflict into `DuplicateCheckIn`.
///
/// The read beforehand only gives a friendlier early answer; the storage
/// constraint is what keeps two concurrent check-ins from both landing.
async fn insert_unique<C: ConnectionTrait>(db: &C, model: attendance::ActiveModel, employee_id: Uuid, date: NaiveDate) -> Result<attendance::Model, HrError> {
    if find_for_day(db, employee_id, date).await?.is_some() {
        return Err(HrError::DuplicateCheckIn { employee_id, date })
    }

    match Attendance::insert(model).exec_with_returning(db).await {
        Ok(record) => Ok(record),
        Err(err) if is_unique_violation(&err) => Err(HrError::DuplicateCheckIn { employee_id, date }),
        Err(err) => Err(err.into()),
    }
}

pub async fn check_in<C: ConnectionTrait>(
    db: &C,
    employee_id: Uuid,
    site_id: Option<i32>,
    actor: Option<Uuid>,
    now: DateTime<FixedOffset>,
) -> Result<attendance::Model, HrError> {
    let date = now.date_naive();

    let model = attendance::ActiveModel {
        created_at: Set(now),
        updated_at: Set(now),
        employee_id: Set(employee_id),
        date: Set(date),
        status: Set(AttendanceStatus::Present),
        check_in: Set(Some(now)),
        check_out: Set(None),
        working_hours: Set(0.0),
        site_id: Set(site_id),
        remarks: Set(None),
        approved_by: Set(None),
        approved_at: Set(None),
        ..Default::default()
    };

    let record = insert_unique(db, model, employee_id, date).await?;
    info!(%employee_id, %date, "checked in");

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Create, "attendance", Some(record.id))
        .after(&record)
        .actor(actor)
    ).await;

    Ok(record)
}

pub async fn check_out<C: ConnectionTrait>(
    db: &C,
    employee_id: Uuid,
    actor: Option<Uuid>,
    now: DateTime<FixedOffset>,
) -> Result<attendance::Model, HrError> {
    let date = now.date_naive();

    let Some(record) = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .filter(attendance::Column::Date.eq(date))
        .filter(attendance::Column::CheckIn.is_not_null())
        .filter(attendance::Column::CheckOut.is_null())
        .one(db).await?
    else {
        return Err(HrError::NoOpenCheckIn { employee_id, date })
    };

    guard::ensure_attendance_mutable(&record)?;

    let before = record.clone();
    let mut active = record.into_active_model();
    active.check_out = Set(Some(now));
    active.working_hours = Set(working_hours(before.check_in, Some(now)));
    active.updated_at = Set(now);

    let record = active.update(db).await?;
    info!(%employee_id, %date, hours = record.working_hours, "checked out");

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Update, "attendance", Some(record.id))
        .before(&before)
        .after(&record)
        .actor(actor)
    ).await;

    Ok(record)
}

pub async fn record_attendance<C: ConnectionTrait>(
    db: &C,
    data: NewAttendance,
    actor: Option<Uuid>,
    now: DateTime<FixedOffset>,
) -> Result<attendance::Model, HrError> {
    if let (Some(check_in), Some(check_out)) = (data.check_in, data.check_out) {
        if check_out < check_in {
            return Err(HrError::InvalidInput("check-out is earlier than check-in".to_owned()))
        }
    }

    let model = attendance::ActiveModel {
        created_at: Set(now),
        updated_at: Set(now),
        employee_id: Set(data.employee_id),
        date: Set(data.date),
        status: Set(data.status),
        check_in: Set(data.check_in),
        check_out: Set(data.check_out),
        working_hours: Set(working_hours(data.check_in, data.check_out)),
        site_id: Set(data.site_id),
        remarks: Set(data.remarks),
        approved_by: Set(None),
        approved_at: Set(None),
        ..Default::default()
    };

    let record = insert_unique(db, model, data.employee_id, data.date).await?;

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Create, "attendance", Some(record.id))
        .after(&record)
        .actor(actor)
    ).await;

    Ok(record)
}

pub async fn update_attendance<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    patch: AttendancePatch,
    actor: Option<Uuid>,
    now: DateTime<FixedOffset>,
) -> Result<attendance::Model, HrError> {
    let before = find_by_id(db, id).await?;
    guard::ensure_attendance_mutable(&before)?;

    let check_in = patch.check_in.or(before.check_in);
    let check_out = patch.check_out.or(before.check_out);
    if let (Some(check_in), Some(check_out)) = (check_in, check_out) {
        if check_out < check_in {
            return Err(HrError::InvalidInput("check-out is earlier than check-in".to_owned()))
        }
    }

    let mut active = before.clone().into_active_model();
    if let Some(status) = patch.status {
        active.status = Set(status);
    }
    if patch.site_id.is_some() {
        active.site_id = Set(patch.site_id);
    }
    if patch.remarks.is_some() {
        active.remarks = Set(patch.remarks);
    }
    active.check_in = Set(check_in);
    active.check_out = Set(check_out);
    active.working_hours = Set(working_hours(check_in, check_out));
    active.updated_at = Set(now);

    let record = active.update(db).await?;

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Update, "attendance", Some(record.id))
        .before(&before)
        .after(&record)
        .actor(actor)
    ).await;

    Ok(record)
}

/// Stamps the approval markers, after which the record is locked
pub async fn approve_attendance<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    approver: Uuid,
    now: DateTime<FixedOffset>,
) -> Result<attendance::Model, HrError> {
    let before = find_by_id(db, id).await?;
    guard::ensure_attendance_mutable(&before)?;

    let mut active = before.clone().into_active_model();
    active.approved_by = Set(Some(approver));
    active.approved_at = Set(Some(now));
    active.updated_at = Set(now);

    let record = active.update(db).await?;

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Approve, "attendance", Some(record.id))
        .before(&before)
        .after(&record)
        .actor(Some(approver))
    ).await;

    Ok(record)
}

pub async fn list_attendance<C: ConnectionTrait>(db: &C, employee_id: Uuid, month: u32, year: i32) -> Result<Vec<attendance::Model>, HrError> {
    let (first, last) = utils::month_range(year, month)?;

    let records = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .filter(attendance::Column::Date.between(first, last))
        .order_by_asc(attendance::Column::Date)
        .all(db).await?;

    Ok(records)
}

pub fn summarize(
    employee_id: Uuid,
    month: u32,
    year: i32,
    records: &[attendance::Model],
    total_working_days: u32,
    calendar_source: PolicySource,
) -> AttendanceSummary {
    let count = |status: AttendanceStatus| records.iter().filter(|r| r.status == status).count() as u32;

    AttendanceSummary {
        employee_id,
        month,
        year,
        total_working_days,
        present_days: count(AttendanceStatus::Present),
        absent_days: count(AttendanceStatus::Absent),
        half_days: count(AttendanceStatus::HalfDay),
        leave_days: count(AttendanceStatus::Leave),
        working_hours: utils::round2(records.iter().map(|r| r.working_hours).sum()),
        calendar_source,
    }
}

pub async fn get_attendance_summary<C: ConnectionTrait>(db: &C, employee_id: Uuid, month: u32, year: i32) -> Result<AttendanceSummary, HrError> {
    let employee = directory::find_employee(db, employee_id).await?;

    summary_for_employee(db, &employee, month, year).await
}

pub async fn summary_for_employee<C: ConnectionTrait>(db: &C, employee: &employee::Model, month: u32, year: i32) -> Result<AttendanceSummary, HrError> {
    let employee_id = employee.id;
    let records = list_attendance(db, employee_id, month, year).await?;

    let calendar = PolicyResolver::new(db)
        .calendar_for_month(employee.branch_id, employee.site_id, month, year).await?;
    let total_working_days = calendar.working_days_in_month(month, year)?;

    debug!(%employee_id, month, year, records = records.len(), total_working_days, "attendance summary");

    Ok(summarize(employee_id, month, year, &records, total_working_days, calendar.source))
}
