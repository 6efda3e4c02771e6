//! Work-calendar and leave-entitlement resolution.
//!
//! Selection is done by pure functions over already loaded rows so it can be
//! tested without storage. `PolicyResolver` loads the candidate rows and hands
//! back immutable snapshots.

use std::collections::BTreeSet;

use chrono::{Datelike as _, NaiveDate, Weekday};
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    entity::{
        leave_policy, prelude::*, sea_orm_active_enums::LeaveType, work_calendar,
        work_calendar_holiday,
    },
    error::HrError,
    utils,
};

/// Weekday numbers as stored, `0` being Sunday
pub const DEFAULT_WEEKEND: [u8; 2] = [0, 6];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PolicySource {
    Configured(Uuid),
    Default,
}

impl PolicySource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, PolicySource::Default)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCalendar {
    pub source: PolicySource,
    pub weekend: BTreeSet<u8>,
    pub holidays: BTreeSet<NaiveDate>,
    pub working_overrides: BTreeSet<NaiveDate>,
}

impl ResolvedCalendar {
    pub fn fallback() -> Self {
        Self {
            source: PolicySource::Default,
            weekend: DEFAULT_WEEKEND.into_iter().collect(),
            holidays: BTreeSet::new(),
            working_overrides: BTreeSet::new(),
        }
    }

    pub fn from_parts(calendar: &work_calendar::Model, entries: &[work_calendar_holiday::Model]) -> Self {
        let (overrides, holidays): (Vec<_>, Vec<_>) = entries
            .iter()
            .filter(|entry| entry.calendar_id == calendar.id)
            .partition(|entry| entry.is_working_day);

        Self {
            source: PolicySource::Configured(calendar.id),
            weekend: parse_weekend_days(&calendar.weekend_days),
            holidays: holidays.into_iter().map(|h| h.date).collect(),
            working_overrides: overrides.into_iter().map(|h| h.date).collect(),
        }
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        if self.working_overrides.contains(&date) {
            return true
        }

        !self.weekend.contains(&weekday_number(date.weekday())) && !self.holidays.contains(&date)
    }

    pub fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        utils::days_between(start, end)
            .filter(|date| self.is_working_day(*date))
            .count() as u32
    }

    pub fn working_days_in_month(&self, month: u32, year: i32) -> Result<u32, HrError> {
        let (first, last) = utils::month_range(year, month)?;

        Ok(self.working_days_between(first, last))
    }
}

pub fn weekday_number(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// Parses `"0,6"` style weekend definitions. Unknown entries are skipped.
pub fn parse_weekend_days(raw: &str) -> BTreeSet<u8> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match part.parse::<u8>() {
            Ok(day) if day <= 6 => Some(day),
            _ => {
                warn!(entry = part, "ignoring invalid weekend day");
                None
            }
        })
        .collect()
}

/// Picks the governing calendar: active, for the branch, covering `as_of`,
/// site-specific before branch-wide, then the most recently effective.
pub fn select_calendar(
    calendars: &[work_calendar::Model],
    branch_id: i32,
    site_id: Option<i32>,
    as_of: NaiveDate,
) -> Option<&work_calendar::Model> {
    calendars
        .iter()
        .filter(|c| c.active && c.branch_id == branch_id)
        .filter(|c| c.site_id.is_none() || (site_id.is_some() && c.site_id == site_id))
        .filter(|c| c.effective_from <= as_of && c.effective_to.is_none_or(|to| to >= as_of))
        .max_by_key(|c| (c.site_id.is_some(), c.effective_from))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedEntitlement {
    pub leave_type: LeaveType,
    pub total_days: f64,
    pub source: PolicySource,
}

pub fn default_entitlement(leave_type: LeaveType) -> f64 {
    match leave_type {
        LeaveType::Casual => 12.0,
        LeaveType::Sick => 6.0,
        LeaveType::Earned => 10.0,
        LeaveType::LossOfPay => 0.0,
    }
}

/// Most specific matching policy row. Branch and category together beat a
/// single matching scope, which beats an unscoped row.
pub fn select_entitlement<'a>(
    policies: &'a [leave_policy::Model],
    leave_type: LeaveType,
    year: i32,
    branch_id: i32,
    category: &str,
) -> Option<&'a leave_policy::Model> {
    policies
        .iter()
        .filter(|p| p.active && p.leave_type == leave_type && p.year == year)
        .filter(|p| p.branch_id.is_none_or(|b| b == branch_id))
        .filter(|p| p.category.as_deref().is_none_or(|c| c.eq_ignore_ascii_case(category)))
        .max_by_key(|p| {
            let specificity = u8::from(p.branch_id.is_some()) * 2 + u8::from(p.category.is_some());
            (specificity, p.created_at)
        })
}

pub struct PolicyResolver<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> PolicyResolver<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn calendar_for_month(
        &self,
        branch_id: i32,
        site_id: Option<i32>,
        month: u32,
        year: i32,
    ) -> Result<ResolvedCalendar, HrError> {
        let (first, last) = utils::month_range(year, month)?;

        let site_condition = match site_id {
            Some(site_id) => Condition::any()
                .add(work_calendar::Column::SiteId.is_null())
                .add(work_calendar::Column::SiteId.eq(site_id)),
            None => Condition::all().add(work_calendar::Column::SiteId.is_null()),
        };

        let calendars = WorkCalendar::find()
            .filter(work_calendar::Column::BranchId.eq(branch_id))
            .filter(work_calendar::Column::Active.eq(true))
            .filter(work_calendar::Column::EffectiveFrom.lte(first))
            .filter(site_condition)
            .all(self.db).await?;

        let Some(calendar) = select_calendar(&calendars, branch_id, site_id, first) else {
            info!(branch_id, ?site_id, year, month, "no work calendar configured, using default weekend");
            return Ok(ResolvedCalendar::fallback())
        };

        let entries = WorkCalendarHoliday::find()
            .filter(work_calendar_holiday::Column::CalendarId.eq(calendar.id))
            .filter(work_calendar_holiday::Column::Date.between(first, last))
            .all(self.db).await?;

        Ok(ResolvedCalendar::from_parts(calendar, &entries))
    }

    pub async fn working_days_in_month(
        &self,
        branch_id: i32,
        site_id: Option<i32>,
        month: u32,
        year: i32,
    ) -> Result<u32, HrError> {
        self.calendar_for_month(branch_id, site_id, month, year).await?
            .working_days_in_month(month, year)
    }

    pub async fn entitlement_for(
        &self,
        leave_type: LeaveType,
        year: i32,
        branch_id: i32,
        category: &str,
    ) -> Result<ResolvedEntitlement, HrError> {
        let policies = LeavePolicy::find()
            .filter(leave_policy::Column::LeaveType.eq(leave_type))
            .filter(leave_policy::Column::Year.eq(year))
            .filter(leave_policy::Column::Active.eq(true))
            .all(self.db).await?;

        let resolved = match select_entitlement(&policies, leave_type, year, branch_id, category) {
            Some(policy) => ResolvedEntitlement {
                leave_type,
                total_days: policy.total_days,
                source: PolicySource::Configured(policy.id),
            },
            None => {
                info!(%leave_type, year, branch_id, category, "no leave policy configured, using default entitlement");
                ResolvedEntitlement {
                    leave_type,
                    total_days: default_entitlement(leave_type),
                    source: PolicySource::Default,
                }
            },
        };

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Local};
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar(branch_id: i32, site_id: Option<i32>, from: NaiveDate, weekend: &str) -> work_calendar::Model {
        work_calendar::Model {
            id: Uuid::new_v4(),
            created_at: Local::now().into(),
            updated_at: Local::now().into(),
            name: "Calendar".to_owned(),
            branch_id,
            site_id,
            effective_from: from,
            effective_to: None,
            weekend_days: weekend.to_owned(),
            active: true,
        }
    }

    fn entry(calendar_id: Uuid, date: NaiveDate, is_working_day: bool) -> work_calendar_holiday::Model {
        work_calendar_holiday::Model {
            id: Uuid::new_v4(),
            created_at: Local::now().into(),
            updated_at: Local::now().into(),
            calendar_id,
            date,
            name: "Entry".to_owned(),
            is_working_day,
        }
    }

    fn policy(leave_type: LeaveType, branch_id: Option<i32>, category: Option<&str>, total_days: f64) -> leave_policy::Model {
        leave_policy::Model {
            id: Uuid::new_v4(),
            created_at: Local::now().into(),
            updated_at: Local::now().into(),
            leave_type,
            year: 2025,
            branch_id,
            category: category.map(str::to_owned),
            total_days,
            active: true,
        }
    }

    #[test]
    fn test_default_calendar_counts_weekdays() {
        let calendar = ResolvedCalendar::fallback();

        assert_eq!(calendar.working_days_in_month(4, 2025).unwrap(), 22);
        assert_eq!(calendar.working_days_in_month(6, 2024).unwrap(), 20);
        assert!(calendar.source.is_fallback());
    }

    #[test]
    fn test_holidays_and_overrides() {
        let cal = calendar(1, None, date(2025, 1, 1), "0");
        let entries = vec![
            entry(cal.id, date(2025, 4, 14), false),
            // a Sunday declared as working day
            entry(cal.id, date(2025, 4, 13), true),
            // belongs to another calendar
            entry(Uuid::new_v4(), date(2025, 4, 15), false),
        ];

        let resolved = ResolvedCalendar::from_parts(&cal, &entries);

        assert!(!resolved.is_working_day(date(2025, 4, 14)));
        assert!(resolved.is_working_day(date(2025, 4, 13)));
        assert!(resolved.is_working_day(date(2025, 4, 12)));
        assert!(resolved.is_working_day(date(2025, 4, 15)));
        // 30 days, 4 Sundays, one holiday, one Sunday override
        assert_eq!(resolved.working_days_in_month(4, 2025).unwrap(), 26);
    }

    #[test]
    fn test_parse_weekend_days() {
        assert_eq!(parse_weekend_days("0, 6"), BTreeSet::from([0, 6]));
        assert_eq!(parse_weekend_days("5,9,x,"), BTreeSet::from([5]));
        assert!(parse_weekend_days("").is_empty());
    }

    #[test]
    fn test_select_calendar() {
        let april = date(2025, 4, 1);

        let old_branch = calendar(1, None, date(2024, 1, 1), "0,6");
        let new_branch = calendar(1, None, date(2025, 1, 1), "0");
        let site = calendar(1, Some(7), date(2024, 6, 1), "0");
        let future = calendar(1, Some(7), date(2025, 5, 1), "0");
        let mut inactive = calendar(1, Some(7), date(2025, 2, 1), "0");
        inactive.active = false;
        let mut expired = calendar(1, None, date(2025, 2, 1), "0");
        expired.effective_to = Some(april - Duration::days(1));
        let other_branch = calendar(2, None, date(2025, 3, 1), "0");

        let all = vec![
            old_branch.clone(),
            new_branch.clone(),
            site.clone(),
            future,
            inactive,
            expired,
            other_branch,
        ];

        assert_eq!(select_calendar(&all, 1, Some(7), april).map(|c| c.id), Some(site.id));
        assert_eq!(select_calendar(&all, 1, None, april).map(|c| c.id), Some(new_branch.id));
        assert_eq!(select_calendar(&all, 1, Some(8), april).map(|c| c.id), Some(new_branch.id));
        assert!(select_calendar(&all, 3, None, april).is_none());
    }

    #[test]
    fn test_select_entitlement_specificity() {
        let unscoped = policy(LeaveType::Casual, None, None, 10.0);
        let branch = policy(LeaveType::Casual, Some(1), None, 11.0);
        let both = policy(LeaveType::Casual, Some(1), Some("field"), 14.0);
        let other_branch = policy(LeaveType::Casual, Some(2), Some("field"), 20.0);
        let sick = policy(LeaveType::Sick, Some(1), Some("field"), 9.0);

        let all = vec![unscoped.clone(), branch.clone(), both.clone(), other_branch, sick];

        let pick = |branch_id, category| {
            select_entitlement(&all, LeaveType::Casual, 2025, branch_id, category).map(|p| p.id)
        };

        assert_eq!(pick(1, "field"), Some(both.id));
        assert_eq!(pick(1, "office"), Some(branch.id));
        assert_eq!(pick(3, "field"), Some(unscoped.id));
        assert!(select_entitlement(&all, LeaveType::Casual, 2024, 1, "field").is_none());
    }

    #[test]
    fn test_default_entitlements() {
        assert_eq!(default_entitlement(LeaveType::Casual), 12.0);
        assert_eq!(default_entitlement(LeaveType::Sick), 6.0);
        assert_eq!(default_entitlement(LeaveType::Earned), 10.0);
        assert_eq!(default_entitlement(LeaveType::LossOfPay), 0.0);
    }

    #[actix_web::test]
    async fn test_resolver_falls_back_without_calendar() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<work_calendar::Model>::new()])
            .into_connection();

        let resolver = PolicyResolver::new(&db);
        let calendar = resolver.calendar_for_month(1, None, 4, 2025).await.unwrap();

        assert!(calendar.source.is_fallback());
        assert_eq!(calendar.working_days_in_month(4, 2025).unwrap(), 22);
    }

    #[actix_web::test]
    async fn test_resolver_uses_configured_calendar() {
        let cal = calendar(1, None, date(2025, 1, 1), "0,6");
        let holiday = entry(cal.id, date(2025, 4, 18), false);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![cal.clone()]])
            .append_query_results([vec![holiday]])
            .into_connection();

        let days = PolicyResolver::new(&db).working_days_in_month(1, None, 4, 2025).await.unwrap();

        assert_eq!(days, 21);
    }
}
