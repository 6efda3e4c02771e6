//! Read-only view over the employee directory.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    entity::{employee, prelude::*, sea_orm_active_enums::EmployeeStatus},
    error::HrError,
};

pub async fn find_employee<C: ConnectionTrait>(db: &C, employee_id: Uuid) -> Result<employee::Model, HrError> {
    Employee::find_by_id(employee_id)
        .one(db).await?
        .ok_or_else(|| HrError::not_found("employee", employee_id))
}

pub async fn active_employees_in_branch<C: ConnectionTrait>(db: &C, branch_id: i32) -> Result<Vec<employee::Model>, HrError> {
    let employees = Employee::find()
        .filter(employee::Column::BranchId.eq(branch_id))
        .filter(employee::Column::Status.eq(EmployeeStatus::Active))
        .order_by_asc(employee::Column::Name)
        .all(db).await?;

    Ok(employees)
}
