//! Salary computation, salary sheets and payroll runs.

pub mod calculation;
pub mod run;
pub mod sheet;

pub(crate) const MODULE: &str = "payroll";
