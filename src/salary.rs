//! Per-employee compensation configuration, versioned by effective date.

use chrono::{DateTime, FixedOffset, NaiveDate};
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait,
    IntoActiveModel as _, QueryFilter,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction, AuditEvent},
    entity::{prelude::*, salary_setup, sea_orm_active_enums::SalaryType},
    error::HrError,
};

const MODULE: &str = "payroll";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSalarySetup {
    pub employee_id: Uuid,
    pub salary_type: SalaryType,
    #[serde(default)]
    pub base_salary: f64,
    #[serde(default)]
    pub daily_rate: f64,
    #[serde(default)]
    pub da: f64,
    #[serde(default)]
    pub hra: f64,
    #[serde(default)]
    pub conveyance: f64,
    #[serde(default)]
    pub other_allowance: f64,
    pub effective_date: NaiveDate,
}

impl NewSalarySetup {
    fn validate(&self) -> Result<(), HrError> {
        let amounts = [
            self.base_salary,
            self.daily_rate,
            self.da,
            self.hra,
            self.conveyance,
            self.other_allowance,
        ];

        if amounts.iter().any(|amount| !amount.is_finite() || *amount < 0.0) {
            return Err(HrError::InvalidInput("salary amounts must be non-negative".to_owned()))
        }

        match self.salary_type {
            SalaryType::Monthly if self.base_salary <= 0.0 => {
                Err(HrError::InvalidInput("monthly salary setup needs a base salary".to_owned()))
            },
            SalaryType::Daily if self.daily_rate <= 0.0 => {
                Err(HrError::InvalidInput("daily salary setup needs a daily rate".to_owned()))
            },
            _ => Ok(()),
        }
    }
}

/// The governing setup on `as_of`: active, already effective, latest effective date first
pub fn select_salary_setup(setups: &[salary_setup::Model], as_of: NaiveDate) -> Option<&salary_setup::Model> {
    setups
        .iter()
        .filter(|s| s.active && s.effective_date <= as_of)
        .max_by_key(|s| (s.effective_date, s.created_at))
}

pub async fn active_salary_setup<C: ConnectionTrait>(db: &C, employee_id: Uuid, as_of: NaiveDate) -> Result<Option<salary_setup::Model>, HrError> {
    let setups = SalarySetup::find()
        .filter(salary_setup::Column::EmployeeId.eq(employee_id))
        .filter(salary_setup::Column::Active.eq(true))
        .filter(salary_setup::Column::EffectiveDate.lte(as_of))
        .all(db).await?;

    Ok(select_salary_setup(&setups, as_of).cloned())
}

pub async fn create_salary_setup<C: ConnectionTrait>(
    db: &C,
    data: NewSalarySetup,
    actor: Option<Uuid>,
    now: DateTime<FixedOffset>,
) -> Result<salary_setup::Model, HrError> {
    data.validate()?;

    let model = salary_setup::ActiveModel {
        created_at: Set(now),
        updated_at: Set(now),
        employee_id: Set(data.employee_id),
        salary_type: Set(data.salary_type),
        base_salary: Set(data.base_salary),
        daily_rate: Set(data.daily_rate),
        da: Set(data.da),
        hra: Set(data.hra),
        conveyance: Set(data.conveyance),
        other_allowance: Set(data.other_allowance),
        effective_date: Set(data.effective_date),
        active: Set(true),
        ..Default::default()
    };

    let setup = SalarySetup::insert(model).exec_with_returning(db).await?;

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Create, "salary_setup", Some(setup.id))
        .after(&setup)
        .actor(actor)
    ).await;

    Ok(setup)
}

pub async fn deactivate_salary_setup<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    actor: Option<Uuid>,
    now: DateTime<FixedOffset>,
) -> Result<salary_setup::Model, HrError> {
    let before = SalarySetup::find_by_id(id)
        .one(db).await?
        .ok_or_else(|| HrError::not_found("salary setup", id))?;

    let mut active = before.clone().into_active_model();
    active.active = Set(false);
    active.updated_at = Set(now);

    let setup = active.update(db).await?;

    audit::log_event(db, AuditEvent::new(MODULE, AuditAction::Update, "salary_setup", Some(setup.id))
        .before(&before)
        .after(&setup)
        .actor(actor)
    ).await;

    Ok(setup)
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Local;

    use super::*;

    pub(crate) fn monthly_setup(employee_id: Uuid, base_salary: f64, effective_date: NaiveDate) -> salary_setup::Model {
        salary_setup::Model {
            id: Uuid::new_v4(),
            created_at: Local::now().into(),
            updated_at: Local::now().into(),
            employee_id,
            salary_type: SalaryType::Monthly,
            base_salary,
            daily_rate: 0.0,
            da: 0.0,
            hra: 0.0,
            conveyance: 0.0,
            other_allowance: 0.0,
            effective_date,
            active: true,
        }
    }

    #[test]
    fn test_select_salary_setup() {
        let employee_id = Uuid::new_v4();
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

        let old = monthly_setup(employee_id, 20000.0, date(2024, 1, 1));
        let current = monthly_setup(employee_id, 25000.0, date(2025, 1, 1));
        let future = monthly_setup(employee_id, 30000.0, date(2025, 6, 1));
        let mut inactive = monthly_setup(employee_id, 99000.0, date(2025, 2, 1));
        inactive.active = false;

        let setups = vec![old.clone(), current.clone(), future, inactive];

        assert_eq!(select_salary_setup(&setups, date(2025, 4, 30)).map(|s| s.id), Some(current.id));
        assert_eq!(select_salary_setup(&setups, date(2024, 12, 31)).map(|s| s.id), Some(old.id));
        assert!(select_salary_setup(&setups, date(2023, 12, 31)).is_none());
    }

    #[test]
    fn test_validate_setup() {
        let mut data = NewSalarySetup {
            employee_id: Uuid::new_v4(),
            salary_type: SalaryType::Daily,
            base_salary: 0.0,
            daily_rate: 0.0,
            da: 0.0,
            hra: 0.0,
            conveyance: 0.0,
            other_allowance: 0.0,
            effective_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        };

        assert!(data.validate().is_err());

        data.daily_rate = 900.0;
        assert!(data.validate().is_ok());

        data.hra = -1.0;
        assert!(data.validate().is_err());
    }
}
