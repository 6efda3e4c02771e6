use actix_web::{get, patch, post, web, HttpResponse, Responder};
use chrono::Local;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    attendance::{self, AttendancePatch, NewAttendance},
    auth::{Actor, Approver},
    error::HrError,
};

use super::own_employee;

#[derive(Debug, Default, Deserialize)]
struct CheckIn {
    site_id: Option<i32>,
}

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(check_in)
        .service(check_out)
        .service(record_attendance)
        .service(get_summary)
        .service(list_attendance)
        .service(update_attendance)
        .service(approve_attendance);
}

#[post("/check-in")]
async fn check_in(db: web::Data<DatabaseConnection>, actor: Actor, payload: Option<web::Json<CheckIn>>) -> Result<impl Responder, HrError> {
    let employee_id = own_employee(&actor)?;
    let site_id = payload.and_then(|p| p.site_id);

    let record = attendance::check_in(db.as_ref(), employee_id, site_id, Some(actor.user_id), Local::now().fixed_offset()).await?;

    Ok(HttpResponse::Created().json(web::Json(record)))
}

#[post("/check-out")]
async fn check_out(db: web::Data<DatabaseConnection>, actor: Actor) -> Result<impl Responder, HrError> {
    let employee_id = own_employee(&actor)?;

    let record = attendance::check_out(db.as_ref(), employee_id, Some(actor.user_id), Local::now().fixed_offset()).await?;

    Ok(web::Json(record))
}

#[post("")]
async fn record_attendance(db: web::Data<DatabaseConnection>, approver: Approver, payload: web::Json<NewAttendance>) -> Result<impl Responder, HrError> {
    let record = attendance::record_attendance(
        db.as_ref(),
        payload.into_inner(),
        Some(approver.user_id),
        Local::now().fixed_offset(),
    ).await?;

    Ok(HttpResponse::Created().json(web::Json(record)))
}

#[patch("/{attendance_id}")]
async fn update_attendance(
    db: web::Data<DatabaseConnection>,
    approver: Approver,
    path: web::Path<Uuid>,
    payload: web::Json<AttendancePatch>,
) -> Result<impl Responder, HrError> {
    let record = attendance::update_attendance(
        db.as_ref(),
        path.into_inner(),
        payload.into_inner(),
        Some(approver.user_id),
        Local::now().fixed_offset(),
    ).await?;

    Ok(web::Json(record))
}

#[post("/{attendance_id}/approve")]
async fn approve_attendance(db: web::Data<DatabaseConnection>, approver: Approver, path: web::Path<Uuid>) -> Result<impl Responder, HrError> {
    let record = attendance::approve_attendance(
        db.as_ref(),
        path.into_inner(),
        approver.user_id,
        Local::now().fixed_offset(),
    ).await?;

    Ok(web::Json(record))
}

#[get("/summary/{employee_id}/{year}/{month}")]
async fn get_summary(db: web::Data<DatabaseConnection>, _actor: Actor, path: web::Path<(Uuid, i32, u32)>) -> Result<impl Responder, HrError> {
    let (employee_id, year, month) = path.into_inner();

    let summary = attendance::get_attendance_summary(db.as_ref(), employee_id, month, year).await?;

    Ok(web::Json(summary))
}

#[get("/records/{employee_id}/{year}/{month}")]
async fn list_attendance(db: web::Data<DatabaseConnection>, _actor: Actor, path: web::Path<(Uuid, i32, u32)>) -> Result<impl Responder, HrError> {
    let (employee_id, year, month) = path.into_inner();

    let records = attendance::list_attendance(db.as_ref(), employee_id, month, year).await?;

    Ok(web::Json(records))
}
