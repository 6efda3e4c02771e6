use actix_web::{get, patch, post, web, HttpResponse, Responder};
use chrono::Local;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{Actor, Approver},
    error::HrError,
    hash::{HashProvider, IntegrityHasher},
    legacy,
    payroll::{
        calculation,
        run::{self, NewPayrollRun},
        sheet::{self, Payment, SalarySheetPatch},
    },
    policy::{PolicyResolver, PolicySource},
    salary::{self, NewSalarySetup},
};

#[derive(Debug, Default, Deserialize)]
struct SiteFilter {
    site_id: Option<i32>,
}

#[derive(Debug, Serialize)]
struct WorkingDays {
    branch_id: i32,
    site_id: Option<i32>,
    year: i32,
    month: u32,
    working_days: u32,
    source: PolicySource,
}

#[derive(Debug, Deserialize)]
struct LegacyLink {
    #[serde(default = "default_true")]
    hash: bool,
}

fn default_true() -> bool {
    true
}

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(get_working_days)
        .service(calculate_salary)
        .service(create_run)
        .service(list_run_sheets)
        .service(generate_run)
        .service(review_run)
        .service(lock_run)
        .service(pay_run)
        .service(archive_run)
        .service(update_sheet)
        .service(approve_sheet)
        .service(pay_sheet)
        .service(create_salary_setup)
        .service(deactivate_salary_setup)
        .service(link_legacy_sheets);
}

#[get("/working-days/{branch_id}/{year}/{month}")]
async fn get_working_days(
    db: web::Data<DatabaseConnection>,
    _actor: Actor,
    path: web::Path<(i32, i32, u32)>,
    query: web::Query<SiteFilter>,
) -> Result<impl Responder, HrError> {
    let (branch_id, year, month) = path.into_inner();
    let site_id = query.site_id;

    let calendar = PolicyResolver::new(db.as_ref())
        .calendar_for_month(branch_id, site_id, month, year).await?;
    let working_days = calendar.working_days_in_month(month, year)?;

    Ok(web::Json(WorkingDays { branch_id, site_id, year, month, working_days, source: calendar.source }))
}

#[get("/calculate/{employee_id}/{year}/{month}")]
async fn calculate_salary(db: web::Data<DatabaseConnection>, _approver: Approver, path: web::Path<(Uuid, i32, u32)>) -> Result<impl Responder, HrError> {
    let (employee_id, year, month) = path.into_inner();

    let draft = calculation::calculate_monthly_salary(db.as_ref(), employee_id, month, year).await?;

    Ok(web::Json(draft))
}

#[post("/runs")]
async fn create_run(db: web::Data<DatabaseConnection>, approver: Approver, payload: web::Json<NewPayrollRun>) -> Result<impl Responder, HrError> {
    let run = run::create_payroll_run(db.as_ref(), payload.into_inner(), Some(approver.user_id), Local::now().fixed_offset()).await?;

    Ok(HttpResponse::Created().json(web::Json(run)))
}

#[get("/runs/{run_id}/sheets")]
async fn list_run_sheets(db: web::Data<DatabaseConnection>, _approver: Approver, path: web::Path<Uuid>) -> Result<impl Responder, HrError> {
    let sheets = sheet::sheets_for_run(db.as_ref(), path.into_inner()).await?;

    Ok(web::Json(sheets))
}

#[post("/runs/{run_id}/generate")]
async fn generate_run(
    db: web::Data<DatabaseConnection>,
    hasher: web::Data<IntegrityHasher>,
    approver: Approver,
    path: web::Path<Uuid>,
) -> Result<impl Responder, HrError> {
    let report = run::generate_payroll_run(
        db.as_ref(),
        path.into_inner(),
        hasher.get_ref(),
        Some(approver.user_id),
        Local::now().fixed_offset(),
    ).await?;

    Ok(web::Json(report))
}

#[post("/runs/{run_id}/review")]
async fn review_run(db: web::Data<DatabaseConnection>, approver: Approver, path: web::Path<Uuid>) -> Result<impl Responder, HrError> {
    let run = run::review_payroll_run(db.as_ref(), path.into_inner(), Some(approver.user_id), Local::now().fixed_offset()).await?;

    Ok(web::Json(run))
}

#[post("/runs/{run_id}/lock")]
async fn lock_run(db: web::Data<DatabaseConnection>, approver: Approver, path: web::Path<Uuid>) -> Result<impl Responder, HrError> {
    let run = run::lock_payroll_run(db.as_ref(), path.into_inner(), Some(approver.user_id), Local::now().fixed_offset()).await?;

    Ok(web::Json(run))
}

#[post("/runs/{run_id}/pay")]
async fn pay_run(db: web::Data<DatabaseConnection>, approver: Approver, path: web::Path<Uuid>) -> Result<impl Responder, HrError> {
    let run = run::mark_payroll_run_paid(db.as_ref(), path.into_inner(), Some(approver.user_id), Local::now().fixed_offset()).await?;

    Ok(web::Json(run))
}

#[post("/runs/{run_id}/archive")]
async fn archive_run(db: web::Data<DatabaseConnection>, approver: Approver, path: web::Path<Uuid>) -> Result<impl Responder, HrError> {
    let run = run::archive_payroll_run(db.as_ref(), path.into_inner(), Some(approver.user_id), Local::now().fixed_offset()).await?;

    Ok(web::Json(run))
}

#[patch("/sheets/{sheet_id}")]
async fn update_sheet(
    db: web::Data<DatabaseConnection>,
    hasher: web::Data<IntegrityHasher>,
    approver: Approver,
    path: web::Path<Uuid>,
    payload: web::Json<SalarySheetPatch>,
) -> Result<impl Responder, HrError> {
    let sheet = sheet::update_salary_sheet(
        db.as_ref(),
        path.into_inner(),
        payload.into_inner(),
        hasher.get_ref(),
        Some(approver.user_id),
        Local::now().fixed_offset(),
    ).await?;

    Ok(web::Json(sheet))
}

#[post("/sheets/{sheet_id}/approve")]
async fn approve_sheet(
    db: web::Data<DatabaseConnection>,
    hasher: web::Data<IntegrityHasher>,
    approver: Approver,
    path: web::Path<Uuid>,
) -> Result<impl Responder, HrError> {
    let sheet = sheet::approve_salary_sheet(
        db.as_ref(),
        path.into_inner(),
        approver.user_id,
        hasher.get_ref(),
        Local::now().fixed_offset(),
    ).await?;

    Ok(web::Json(sheet))
}

#[post("/sheets/{sheet_id}/pay")]
async fn pay_sheet(
    db: web::Data<DatabaseConnection>,
    hasher: web::Data<IntegrityHasher>,
    approver: Approver,
    path: web::Path<Uuid>,
    payload: web::Json<Payment>,
) -> Result<impl Responder, HrError> {
    let sheet = sheet::pay_salary_sheet(
        db.as_ref(),
        path.into_inner(),
        payload.into_inner(),
        hasher.get_ref(),
        Some(approver.user_id),
        Local::now().fixed_offset(),
    ).await?;

    Ok(web::Json(sheet))
}

#[post("/salary-setups")]
async fn create_salary_setup(db: web::Data<DatabaseConnection>, approver: Approver, payload: web::Json<NewSalarySetup>) -> Result<impl Responder, HrError> {
    let setup = salary::create_salary_setup(db.as_ref(), payload.into_inner(), Some(approver.user_id), Local::now().fixed_offset()).await?;

    Ok(HttpResponse::Created().json(web::Json(setup)))
}

#[post("/salary-setups/{setup_id}/deactivate")]
async fn deactivate_salary_setup(db: web::Data<DatabaseConnection>, approver: Approver, path: web::Path<Uuid>) -> Result<impl Responder, HrError> {
    let setup = salary::deactivate_salary_setup(db.as_ref(), path.into_inner(), Some(approver.user_id), Local::now().fixed_offset()).await?;

    Ok(web::Json(setup))
}

#[post("/legacy/link")]
async fn link_legacy_sheets(
    db: web::Data<DatabaseConnection>,
    hasher: web::Data<IntegrityHasher>,
    approver: Approver,
    payload: Option<web::Json<LegacyLink>>,
) -> Result<impl Responder, HrError> {
    let with_hash = payload.map(|p| p.hash).unwrap_or(true);
    let hasher = with_hash.then_some(hasher.get_ref() as &dyn HashProvider);

    let report = legacy::migrate_legacy_salary_sheets(db.as_ref(), hasher, Some(approver.user_id)).await?;

    Ok(web::Json(report))
}
