use sea_orm_migration::prelude::*;

use crate::{
    m20250701_090000_init::SalarySheet,
    util::{amount, default_table_statement, DefaultColumn},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(default_table_statement()
                .table(PayrollRun::Table)
                .col(ColumnDef::new(PayrollRun::BranchId)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(PayrollRun::Month)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(PayrollRun::Year)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(PayrollRun::Status)
                    .text()
                    .not_null()
                    .default("draft"))
                .col(ColumnDef::new(PayrollRun::EmployeeCount)
                    .integer()
                    .not_null()
                    .default(0))
                .col(amount(PayrollRun::TotalNetPay))
                .col(ColumnDef::new(PayrollRun::GeneratedAt)
                    .timestamp_with_time_zone())
                .take()
            ).await?;

        manager
            .create_index(Index::create()
                .if_not_exists()
                .name("payroll_run_branch_period_key")
                .table(PayrollRun::Table)
                .col(PayrollRun::BranchId)
                .col(PayrollRun::Year)
                .col(PayrollRun::Month)
                .unique()
                .take()
            ).await?;

        // Existing sheets stay unlinked until the legacy link procedure runs
        manager
            .alter_table(Table::alter()
                .table(SalarySheet::Table)
                .add_column_if_not_exists(ColumnDef::new(SheetLink::PayrollRunId)
                    .uuid())
                .add_column_if_not_exists(ColumnDef::new(SheetLink::IntegrityHash)
                    .text())
                .add_column_if_not_exists(ColumnDef::new(SheetLink::HashAlgorithm)
                    .text())
                .take()
            ).await?;

        manager
            .create_foreign_key(ForeignKey::create()
                .name("salary_sheet_payroll_run_fkey")
                .from(SalarySheet::Table, SheetLink::PayrollRunId)
                .to(PayrollRun::Table, DefaultColumn::Id)
                .on_delete(ForeignKeyAction::Restrict)
                .on_update(ForeignKeyAction::Cascade)
                .take()
            ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_foreign_key(ForeignKey::drop()
                .name("salary_sheet_payroll_run_fkey")
                .table(SalarySheet::Table)
                .to_owned()
            ).await?;

        manager
            .alter_table(Table::alter()
                .table(SalarySheet::Table)
                .drop_column(SheetLink::PayrollRunId)
                .drop_column(SheetLink::IntegrityHash)
                .drop_column(SheetLink::HashAlgorithm)
                .take()
            ).await?;

        manager.drop_table(Table::drop().table(PayrollRun::Table).to_owned()).await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum PayrollRun {
    Table,
    BranchId,
    Month,
    Year,
    Status,
    EmployeeCount,
    TotalNetPay,
    GeneratedAt,
}

/// Columns added to `salary_sheet`
#[derive(DeriveIden)]
enum SheetLink {
    PayrollRunId,
    IntegrityHash,
    HashAlgorithm,
}
