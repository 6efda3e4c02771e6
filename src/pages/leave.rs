use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::Local;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::{Actor, Approver},
    entity::sea_orm_active_enums::LeaveType,
    error::HrError,
    leave::{self, NewLeave},
};

#[derive(Debug, Default, Deserialize)]
struct Decision {
    note: Option<String>,
}

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(apply_leave)
        .service(get_balance)
        .service(list_leaves)
        .service(approve_leave)
        .service(reject_leave)
        .service(cancel_leave);
}

#[post("")]
async fn apply_leave(db: web::Data<DatabaseConnection>, actor: Actor, payload: web::Json<NewLeave>) -> Result<impl Responder, HrError> {
    let data = payload.into_inner();

    // employees may only apply for themselves
    if !actor.role.can_approve() && actor.employee_id != Some(data.employee_id) {
        return Err(HrError::InvalidInput("cannot apply leave for another employee".to_owned()))
    }

    let leave = leave::apply_leave(db.as_ref(), data, Some(actor.user_id), Local::now().fixed_offset()).await?;

    Ok(HttpResponse::Created().json(web::Json(leave)))
}

#[post("/{leave_id}/approve")]
async fn approve_leave(
    db: web::Data<DatabaseConnection>,
    approver: Approver,
    path: web::Path<Uuid>,
    payload: Option<web::Json<Decision>>,
) -> Result<impl Responder, HrError> {
    let remarks = payload.and_then(|p| p.into_inner().note);

    let leave = leave::approve_leave(db.as_ref(), path.into_inner(), approver.user_id, remarks, Local::now().fixed_offset()).await?;

    Ok(web::Json(leave))
}

#[post("/{leave_id}/reject")]
async fn reject_leave(
    db: web::Data<DatabaseConnection>,
    approver: Approver,
    path: web::Path<Uuid>,
    payload: Option<web::Json<Decision>>,
) -> Result<impl Responder, HrError> {
    let reason = payload.and_then(|p| p.into_inner().note);

    let leave = leave::reject_leave(db.as_ref(), path.into_inner(), approver.user_id, reason, Local::now().fixed_offset()).await?;

    Ok(web::Json(leave))
}

#[post("/{leave_id}/cancel")]
async fn cancel_leave(db: web::Data<DatabaseConnection>, actor: Actor, path: web::Path<Uuid>) -> Result<impl Responder, HrError> {
    let leave = leave::cancel_leave(db.as_ref(), path.into_inner(), actor.user_id, Local::now().fixed_offset()).await?;

    Ok(web::Json(leave))
}

#[get("/balance/{employee_id}/{leave_type}/{year}")]
async fn get_balance(db: web::Data<DatabaseConnection>, _actor: Actor, path: web::Path<(Uuid, LeaveType, i32)>) -> Result<impl Responder, HrError> {
    let (employee_id, leave_type, year) = path.into_inner();

    let balance = leave::get_leave_balance(db.as_ref(), employee_id, leave_type, year).await?;

    Ok(web::Json(balance))
}

#[get("/employee/{employee_id}/{year}")]
async fn list_leaves(db: web::Data<DatabaseConnection>, _actor: Actor, path: web::Path<(Uuid, i32)>) -> Result<impl Responder, HrError> {
    let (employee_id, year) = path.into_inner();

    let leaves = leave::list_leaves(db.as_ref(), employee_id, year).await?;

    Ok(web::Json(leaves))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::Value;

    use crate::{
        attendance::tests::employee,
        auth::Role,
        entity::{leave_policy, sea_orm_active_enums::LeaveStatus},
        guard::tests::leave_with,
        pages::tests::{bearer, body_text},
    };

    use super::*;

    #[actix_web::test]
    async fn test_approve_rejected_leave_conflicts() {
        let rejected = leave_with(LeaveStatus::Rejected);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![rejected.clone()]])
            .into_connection();
        let app = test_app!(db).await;

        let req = test::TestRequest::post()
            .uri(&format!("/leave/{}/approve", rejected.id))
            .insert_header(bearer(Role::Hr))
            .to_request();
        let response = test::call_service(&app, req).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(body_text(response).await.contains("Rejected"));
    }

    #[actix_web::test]
    async fn test_employee_cannot_apply_for_someone_else() {
        let app = test_app!(MockDatabase::new(DatabaseBackend::Postgres).into_connection()).await;

        let req = test::TestRequest::post()
            .uri("/leave")
            .insert_header(bearer(Role::Employee))
            .set_json(serde_json::json!({
                "employee_id": Uuid::new_v4(),
                "leave_type": "casual",
                "from_date": "2025-04-14",
                "to_date": "2025-04-15",
            }))
            .to_request();
        let response = test::call_service(&app, req).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_balance_with_default_entitlement() {
        let staff = employee(1);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![staff.clone()]])
            .append_query_results([Vec::<leave_policy::Model>::new()])
            .append_query_results([vec![leave_with(LeaveStatus::Approved)]])
            .into_connection();
        let app = test_app!(db).await;

        let req = test::TestRequest::get()
            .uri(&format!("/leave/balance/{}/casual/2025", staff.id))
            .insert_header(bearer(Role::Employee))
            .to_request();
        let balance: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(balance["total_days"], 12.0);
        assert_eq!(balance["used_days"], 2.0);
        assert_eq!(balance["available_days"], 10.0);
    }
}
