use sea_orm_migration::prelude::*;

use crate::util::{amount, day_count, default_table_statement, DefaultColumn};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Statuses are stored as text, see `sea_orm_active_enums`
        manager
            .create_table(default_table_statement()
                .table(Employee::Table)
                .col(ColumnDef::new(Employee::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Employee::BranchId)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Employee::SiteId)
                    .integer())
                .col(ColumnDef::new(Employee::Category)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Employee::Status)
                    .text()
                    .not_null()
                    .default("active"))
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(Attendance::Table)
                .col(ColumnDef::new(Attendance::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Attendance::Date)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Attendance::Status)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Attendance::CheckIn)
                    .timestamp_with_time_zone())
                .col(ColumnDef::new(Attendance::CheckOut)
                    .timestamp_with_time_zone())
                .col(amount(Attendance::WorkingHours))
                .col(ColumnDef::new(Attendance::SiteId)
                    .integer())
                .col(ColumnDef::new(Attendance::Remarks)
                    .text())
                .col(ColumnDef::new(Attendance::ApprovedBy)
                    .uuid())
                .col(ColumnDef::new(Attendance::ApprovedAt)
                    .timestamp_with_time_zone())
                .foreign_key(ForeignKey::create()
                    .from(Attendance::Table, Attendance::EmployeeId)
                    .to(Employee::Table, DefaultColumn::Id)
                    .on_delete(ForeignKeyAction::Cascade))
                .take()
            ).await?;

        // one attendance row per employee per day
        manager
            .create_index(Index::create()
                .if_not_exists()
                .name("attendance_employee_date_key")
                .table(Attendance::Table)
                .col(Attendance::EmployeeId)
                .col(Attendance::Date)
                .unique()
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(LeaveApplication::Table)
                .col(ColumnDef::new(LeaveApplication::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(LeaveApplication::LeaveType)
                    .text()
                    .not_null())
                .col(ColumnDef::new(LeaveApplication::FromDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(LeaveApplication::ToDate)
                    .date()
                    .not_null())
                .col(amount(LeaveApplication::NumberOfDays))
                .col(ColumnDef::new(LeaveApplication::Entitlement)
                    .text()
                    .not_null())
                .col(ColumnDef::new(LeaveApplication::Status)
                    .text()
                    .not_null())
                .col(ColumnDef::new(LeaveApplication::Reason)
                    .text())
                .col(ColumnDef::new(LeaveApplication::AppliedOn)
                    .timestamp_with_time_zone()
                    .not_null())
                .col(ColumnDef::new(LeaveApplication::ApprovedBy)
                    .uuid())
                .col(ColumnDef::new(LeaveApplication::ApprovedAt)
                    .timestamp_with_time_zone())
                .col(ColumnDef::new(LeaveApplication::Remarks)
                    .text())
                .col(ColumnDef::new(LeaveApplication::RejectionReason)
                    .text())
                .foreign_key(ForeignKey::create()
                    .from(LeaveApplication::Table, LeaveApplication::EmployeeId)
                    .to(Employee::Table, DefaultColumn::Id)
                    .on_delete(ForeignKeyAction::Cascade))
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(LeavePolicy::Table)
                .col(ColumnDef::new(LeavePolicy::LeaveType)
                    .text()
                    .not_null())
                .col(ColumnDef::new(LeavePolicy::Year)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(LeavePolicy::BranchId)
                    .integer())
                .col(ColumnDef::new(LeavePolicy::Category)
                    .text())
                .col(amount(LeavePolicy::TotalDays))
                .col(ColumnDef::new(LeavePolicy::Active)
                    .boolean()
                    .not_null()
                    .default(true))
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(WorkCalendar::Table)
                .col(ColumnDef::new(WorkCalendar::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(WorkCalendar::BranchId)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(WorkCalendar::SiteId)
                    .integer())
                .col(ColumnDef::new(WorkCalendar::EffectiveFrom)
                    .date()
                    .not_null())
                .col(ColumnDef::new(WorkCalendar::EffectiveTo)
                    .date())
                .col(ColumnDef::new(WorkCalendar::WeekendDays)
                    .text()
                    .not_null()
                    .default("0,6"))
                .col(ColumnDef::new(WorkCalendar::Active)
                    .boolean()
                    .not_null()
                    .default(true))
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(WorkCalendarHoliday::Table)
                .col(ColumnDef::new(WorkCalendarHoliday::CalendarId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(WorkCalendarHoliday::Date)
                    .date()
                    .not_null())
                .col(ColumnDef::new(WorkCalendarHoliday::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(WorkCalendarHoliday::IsWorkingDay)
                    .boolean()
                    .not_null()
                    .default(false))
                .foreign_key(ForeignKey::create()
                    .from(WorkCalendarHoliday::Table, WorkCalendarHoliday::CalendarId)
                    .to(WorkCalendar::Table, DefaultColumn::Id)
                    .on_delete(ForeignKeyAction::Cascade))
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(SalarySetup::Table)
                .col(ColumnDef::new(SalarySetup::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(SalarySetup::SalaryType)
                    .text()
                    .not_null())
                .col(amount(SalarySetup::BaseSalary))
                .col(amount(SalarySetup::DailyRate))
                .col(amount(SalarySetup::Da))
                .col(amount(SalarySetup::Hra))
                .col(amount(SalarySetup::Conveyance))
                .col(amount(SalarySetup::OtherAllowance))
                .col(ColumnDef::new(SalarySetup::EffectiveDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(SalarySetup::Active)
                    .boolean()
                    .not_null()
                    .default(true))
                .foreign_key(ForeignKey::create()
                    .from(SalarySetup::Table, SalarySetup::EmployeeId)
                    .to(Employee::Table, DefaultColumn::Id)
                    .on_delete(ForeignKeyAction::Cascade))
                .take()
            ).await?;

        // Sheets predate payroll runs; the link is added later
        manager
            .create_table(default_table_statement()
                .table(SalarySheet::Table)
                .col(ColumnDef::new(SalarySheet::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(SalarySheet::BranchId)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(SalarySheet::Month)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(SalarySheet::Year)
                    .integer()
                    .not_null())
                .col(day_count(SalarySheet::TotalWorkingDays))
                .col(day_count(SalarySheet::PresentDays))
                .col(day_count(SalarySheet::AbsentDays))
                .col(day_count(SalarySheet::HalfDays))
                .col(day_count(SalarySheet::LeaveDays))
                .col(amount(SalarySheet::PaidLeaveDays))
                .col(amount(SalarySheet::UnpaidLeaveDays))
                .col(amount(SalarySheet::WorkingHours))
                .col(amount(SalarySheet::BasicEarned))
                .col(amount(SalarySheet::Da))
                .col(amount(SalarySheet::Hra))
                .col(amount(SalarySheet::Conveyance))
                .col(amount(SalarySheet::OtherAllowance))
                .col(amount(SalarySheet::TotalEarnings))
                .col(amount(SalarySheet::AdvanceDeduction))
                .col(amount(SalarySheet::LoanDeduction))
                .col(amount(SalarySheet::FineDeduction))
                .col(amount(SalarySheet::OtherDeduction))
                .col(amount(SalarySheet::TotalDeductions))
                .col(amount(SalarySheet::NetSalary))
                .col(ColumnDef::new(SalarySheet::Status)
                    .text()
                    .not_null()
                    .default("calculated"))
                .col(ColumnDef::new(SalarySheet::Remarks)
                    .text())
                .col(ColumnDef::new(SalarySheet::ApprovedBy)
                    .uuid())
                .col(ColumnDef::new(SalarySheet::ApprovedAt)
                    .timestamp_with_time_zone())
                .col(ColumnDef::new(SalarySheet::PaidAt)
                    .timestamp_with_time_zone())
                .col(ColumnDef::new(SalarySheet::PaymentMode)
                    .text())
                .col(ColumnDef::new(SalarySheet::PaymentReference)
                    .text())
                .foreign_key(ForeignKey::create()
                    .from(SalarySheet::Table, SalarySheet::EmployeeId)
                    .to(Employee::Table, DefaultColumn::Id)
                    .on_delete(ForeignKeyAction::Restrict))
                .take()
            ).await?;

        manager
            .create_index(Index::create()
                .if_not_exists()
                .name("salary_sheet_employee_period_key")
                .table(SalarySheet::Table)
                .col(SalarySheet::EmployeeId)
                .col(SalarySheet::Year)
                .col(SalarySheet::Month)
                .unique()
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(AdvanceDeduction::Table)
                .col(ColumnDef::new(AdvanceDeduction::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(AdvanceDeduction::DeductionType)
                    .text()
                    .not_null())
                .col(amount(AdvanceDeduction::Amount))
                .col(ColumnDef::new(AdvanceDeduction::Date)
                    .date()
                    .not_null())
                .col(ColumnDef::new(AdvanceDeduction::Status)
                    .text()
                    .not_null()
                    .default("pending"))
                .col(ColumnDef::new(AdvanceDeduction::Remarks)
                    .text())
                .foreign_key(ForeignKey::create()
                    .from(AdvanceDeduction::Table, AdvanceDeduction::EmployeeId)
                    .to(Employee::Table, DefaultColumn::Id)
                    .on_delete(ForeignKeyAction::Cascade))
                .take()
            ).await?;

        manager
            .create_table(TableCreateStatement::new()
                .if_not_exists()
                .table(AuditLog::Table)
                .col(ColumnDef::new(DefaultColumn::Id)
                    .uuid()
                    .primary_key()
                    .default(Expr::cust("GEN_RANDOM_UUID()")))
                .col(ColumnDef::new(DefaultColumn::CreatedAt)
                    .timestamp_with_time_zone()
                    .not_null())
                .col(ColumnDef::new(AuditLog::Module)
                    .text()
                    .not_null())
                .col(ColumnDef::new(AuditLog::Action)
                    .text()
                    .not_null())
                .col(ColumnDef::new(AuditLog::EntityType)
                    .text()
                    .not_null())
                .col(ColumnDef::new(AuditLog::EntityId)
                    .uuid())
                .col(ColumnDef::new(AuditLog::OldValue)
                    .json_binary())
                .col(ColumnDef::new(AuditLog::NewValue)
                    .json_binary())
                .col(ColumnDef::new(AuditLog::Actor)
                    .uuid())
                .col(ColumnDef::new(AuditLog::BranchId)
                    .integer())
                .col(ColumnDef::new(AuditLog::Reason)
                    .text())
                .take()
            ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AuditLog::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(AdvanceDeduction::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(SalarySheet::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(SalarySetup::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(WorkCalendarHoliday::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(WorkCalendar::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(LeavePolicy::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(LeaveApplication::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Attendance::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Employee::Table).to_owned()).await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Employee {
    Table,
    Name,
    BranchId,
    SiteId,
    Category,
    Status,
}

#[derive(DeriveIden)]
enum Attendance {
    Table,
    EmployeeId,
    Date,
    Status,
    CheckIn,
    CheckOut,
    WorkingHours,
    SiteId,
    Remarks,
    ApprovedBy,
    ApprovedAt,
}

#[derive(DeriveIden)]
enum LeaveApplication {
    Table,
    EmployeeId,
    LeaveType,
    FromDate,
    ToDate,
    NumberOfDays,
    Entitlement,
    Status,
    Reason,
    AppliedOn,
    ApprovedBy,
    ApprovedAt,
    Remarks,
    RejectionReason,
}

#[derive(DeriveIden)]
enum LeavePolicy {
    Table,
    LeaveType,
    Year,
    BranchId,
    Category,
    TotalDays,
    Active,
}

#[derive(DeriveIden)]
enum WorkCalendar {
    Table,
    Name,
    BranchId,
    SiteId,
    EffectiveFrom,
    EffectiveTo,
    WeekendDays,
    Active,
}

#[derive(DeriveIden)]
enum WorkCalendarHoliday {
    Table,
    CalendarId,
    Date,
    Name,
    IsWorkingDay,
}

#[derive(DeriveIden)]
enum SalarySetup {
    Table,
    EmployeeId,
    SalaryType,
    BaseSalary,
    DailyRate,
    Da,
    Hra,
    Conveyance,
    OtherAllowance,
    EffectiveDate,
    Active,
}

#[derive(DeriveIden)]
pub(crate) enum SalarySheet {
    Table,
    EmployeeId,
    BranchId,
    Month,
    Year,
    TotalWorkingDays,
    PresentDays,
    AbsentDays,
    HalfDays,
    LeaveDays,
    PaidLeaveDays,
    UnpaidLeaveDays,
    WorkingHours,
    BasicEarned,
    Da,
    Hra,
    Conveyance,
    OtherAllowance,
    TotalEarnings,
    AdvanceDeduction,
    LoanDeduction,
    FineDeduction,
    OtherDeduction,
    TotalDeductions,
    NetSalary,
    Status,
    Remarks,
    ApprovedBy,
    ApprovedAt,
    PaidAt,
    PaymentMode,
    PaymentReference,
}

#[derive(DeriveIden)]
enum AdvanceDeduction {
    Table,
    EmployeeId,
    DeductionType,
    Amount,
    Date,
    Status,
    Remarks,
}

#[derive(DeriveIden)]
enum AuditLog {
    Table,
    Module,
    Action,
    EntityType,
    EntityId,
    OldValue,
    NewValue,
    Actor,
    BranchId,
    Reason,
}
