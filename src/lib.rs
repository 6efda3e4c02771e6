//! Attendance, leave and payroll engine for a multi-branch workforce.

pub mod attendance;
pub mod audit;
pub mod auth;
pub mod config;
pub mod directory;
pub mod entity;
pub mod error;
pub mod guard;
pub mod hash;
pub mod leave;
pub mod legacy;
pub mod pages;
pub mod payroll;
pub mod policy;
pub mod salary;
pub mod utils;
