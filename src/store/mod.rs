//! Persistence collaborator boundary.
//!
//! The engine owns entities only for the duration of a transition: every
//! transition reads current state, validates, and writes back through this
//! trait. Status-changing writes are conditional on the expected current
//! status, which closes the concurrent approve/reject lost-update window.

pub mod http;
pub mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::AuditQuestion;
use crate::error::Result;
use crate::event::TicketEvent;
use crate::operator::Operator;
use crate::session::{CallRecord, Contact, OperatorEventKind, SkipReason, Task, TaskStatus};
use crate::ticket::{CallType, Ticket, TicketStatus};

/// Partial update applied to a persisted ticket. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Reopening clears `closed_at`; a plain `Option` cannot express that.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clear_closed_at: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TicketPatch {
    pub fn status(status: TicketStatus, at: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            updated_at: Some(at),
            ..Default::default()
        }
    }

    pub fn touch(at: DateTime<Utc>) -> Self {
        Self {
            updated_at: Some(at),
            ..Default::default()
        }
    }
}

/// Partial update applied to a persisted call task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
}

impl TaskPatch {
    pub fn completed() -> Self {
        Self {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        }
    }

    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            status: Some(TaskStatus::Skipped),
            skip_reason: Some(reason),
        }
    }
}

/// Filter for ticket listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

/// The generic record store backing the console.
///
/// Consumed via generics (`impl Store`); implementations are cheap handles
/// that can be cloned into engines and sessions.
#[allow(async_fn_in_trait)]
pub trait Store {
    /// Persist a new ticket. The store assigns the human-facing sequential
    /// number and returns the stored entity.
    async fn create_ticket(&self, ticket: Ticket) -> Result<Ticket>;

    /// Look up a ticket by internal id or human-facing number.
    async fn get_ticket(&self, key: &str) -> Result<Ticket>;

    /// Apply a partial update. When `expected` is set and the persisted
    /// status no longer matches, the update fails with a `State` error and
    /// nothing is written.
    async fn update_ticket(
        &self,
        id: &str,
        expected: Option<TicketStatus>,
        patch: TicketPatch,
    ) -> Result<Ticket>;

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>>;

    async fn append_event(&self, event: TicketEvent) -> Result<()>;

    /// Ticket history ordered by creation time.
    async fn list_events(&self, ticket_id: &str) -> Result<Vec<TicketEvent>>;

    /// The single oldest pending task assigned to the operator, if any.
    async fn pending_task(&self, operator_id: &str) -> Result<Option<Task>>;

    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task>;

    async fn create_call_record(&self, record: CallRecord) -> Result<CallRecord>;

    async fn list_call_records(&self, operator_id: Option<&str>) -> Result<Vec<CallRecord>>;

    /// Audit-question catalog scoped to a call type; `None` returns only the
    /// questions that apply to every call type.
    async fn audit_questions(&self, call_type: Option<CallType>) -> Result<Vec<AuditQuestion>>;

    async fn get_operator(&self, id: &str) -> Result<Operator>;

    async fn get_contact(&self, id: &str) -> Result<Contact>;

    /// Fire-and-forget operator telemetry; not required for correctness.
    async fn log_operator_event(
        &self,
        operator_id: &str,
        kind: OperatorEventKind,
        task_id: &str,
        detail: Option<&str>,
    ) -> Result<()>;
}
