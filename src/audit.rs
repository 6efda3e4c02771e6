//! Append-only audit trail. Writing an entry never fails the caller's operation.

use chrono::Local;
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait as _, TransactionTrait as _,
};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::entity::{audit_log, prelude::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Approve,
    Reject,
    Cancel,
    Review,
    Lock,
    Pay,
    Archive,
    Migrate,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Approve => "approve",
            AuditAction::Reject => "reject",
            AuditAction::Cancel => "cancel",
            AuditAction::Review => "review",
            AuditAction::Lock => "lock",
            AuditAction::Pay => "pay",
            AuditAction::Archive => "archive",
            AuditAction::Migrate => "migrate",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub module: &'static str,
    pub action: AuditAction,
    pub entity_type: &'static str,
    pub entity_id: Option<Uuid>,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub actor: Option<Uuid>,
    pub branch_id: Option<i32>,
    pub reason: Option<String>,
}

impl AuditEvent {
    pub fn new(module: &'static str, action: AuditAction, entity_type: &'static str, entity_id: Option<Uuid>) -> Self {
        Self {
            module,
            action,
            entity_type,
            entity_id,
            old_value: None,
            new_value: None,
            actor: None,
            branch_id: None,
            reason: None,
        }
    }

    pub fn before(mut self, value: &impl Serialize) -> Self {
        self.old_value = snapshot(value);
        self
    }

    pub fn after(mut self, value: &impl Serialize) -> Self {
        self.new_value = snapshot(value);
        self
    }

    pub fn actor(mut self, actor: Option<Uuid>) -> Self {
        self.actor = actor;
        self
    }

    pub fn branch(mut self, branch_id: Option<i32>) -> Self {
        self.branch_id = branch_id;
        self
    }

    pub fn reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }
}

fn snapshot(value: &impl Serialize) -> Option<serde_json::Value> {
    match serde_json::to_value(value) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, "unable to snapshot audit value");
            None
        }
    }
}

fn into_active_model(event: &AuditEvent) -> audit_log::ActiveModel {
    audit_log::ActiveModel {
        created_at: Set(Local::now().fixed_offset()),
        module: Set(event.module.to_owned()),
        action: Set(event.action.as_str().to_owned()),
        entity_type: Set(event.entity_type.to_owned()),
        entity_id: Set(event.entity_id),
        old_value: Set(event.old_value.clone()),
        new_value: Set(event.new_value.clone()),
        actor: Set(event.actor),
        branch_id: Set(event.branch_id),
        reason: Set(event.reason.clone()),
        ..Default::default()
    }
}

fn warn_unwritten(event: &AuditEvent, err: &DbErr) {
    warn!(
        error = %err,
        module = event.module,
        action = event.action.as_str(),
        entity_type = event.entity_type,
        entity_id = ?event.entity_id,
        "unable to write audit entry"
    );
}

/// Writes the event. Storage failures are logged and swallowed.
pub async fn log_event<C: ConnectionTrait>(db: &C, event: AuditEvent) {
    if let Err(err) = AuditLog::insert(into_active_model(&event)).exec_without_returning(db).await {
        warn_unwritten(&event, &err);
    }
}

/// Writes the event inside a savepoint of `txn`.
///
/// Postgres aborts the whole transaction on a failed statement, so a plain
/// insert that fails here would silently turn the caller's commit into a
/// rollback. Only the savepoint is rolled back instead.
pub async fn log_event_in_savepoint(txn: &DatabaseTransaction, event: AuditEvent) {
    let savepoint = match txn.begin().await {
        Ok(savepoint) => savepoint,
        Err(err) => {
            warn_unwritten(&event, &err);
            return
        },
    };

    let result = match AuditLog::insert(into_active_model(&event)).exec_without_returning(&savepoint).await {
        Ok(_) => savepoint.commit().await,
        Err(err) => {
            warn_unwritten(&event, &err);
            savepoint.rollback().await
        },
    };

    if let Err(err) = result {
        warn_unwritten(&event, &err);
    }
}
