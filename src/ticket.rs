//! Ticket (protocol) model: a trackable service case with lifecycle status,
//! ownership and an SLA deadline fixed at creation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::sla::Priority;

/// Lifecycle status of a ticket.
///
/// Initial status is `Open`; `Closed` is terminal absent an explicit reopen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    AwaitingDepartment,
    AwaitingCustomer,
    ResolvedPending,
    Closed,
    Reopened,
}

impl TicketStatus {
    pub fn is_closed(self) -> bool {
        self == TicketStatus::Closed
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketStatus::Open => write!(f, "OPEN"),
            TicketStatus::InProgress => write!(f, "IN_PROGRESS"),
            TicketStatus::AwaitingDepartment => write!(f, "AWAITING_DEPARTMENT"),
            TicketStatus::AwaitingCustomer => write!(f, "AWAITING_CUSTOMER"),
            TicketStatus::ResolvedPending => write!(f, "RESOLVED_PENDING"),
            TicketStatus::Closed => write!(f, "CLOSED"),
            TicketStatus::Reopened => write!(f, "REOPENED"),
        }
    }
}

/// The party a ticket is about: exactly one of an existing customer or a
/// prospect. The enum makes the exactly-one rule structural.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectRef {
    Customer(String),
    Prospect(String),
}

/// Classification of the call that a ticket or task originates from.
/// Scopes the audit-question catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Sales,
    Collection,
    Support,
    Retention,
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallType::Sales => write!(f, "sales"),
            CallType::Collection => write!(f, "collection"),
            CallType::Support => write!(f, "support"),
            CallType::Retention => write!(f, "retention"),
        }
    }
}

/// Which party a ticket is parked on while waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitingOn {
    Department,
    Customer,
}

impl WaitingOn {
    pub fn status(self) -> TicketStatus {
        match self {
            WaitingOn::Department => TicketStatus::AwaitingDepartment,
            WaitingOn::Customer => TicketStatus::AwaitingCustomer,
        }
    }
}

/// Input to ticket creation, before identity and SLA are assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketDraft {
    pub subject: SubjectRef,
    pub department: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_call_type: Option<CallType>,
}

impl TicketDraft {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("ticket title must not be empty".into()));
        }
        if self.description.trim().is_empty() {
            return Err(Error::Validation(
                "ticket description must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// A trackable service/support case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    /// Human-facing sequential number, assigned by the store on create.
    pub number: u64,
    pub subject: SubjectRef,
    pub opened_by: String,
    /// Current owner. Always set; defaults to the opener at creation.
    pub owner_id: String,
    pub department: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Fixed at creation from the priority; never recomputed by later edits.
    pub sla_due_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_call_type: Option<CallType>,
}

impl Ticket {
    /// Build a freshly opened ticket from a validated draft. The store
    /// assigns `number` when the ticket is persisted.
    pub fn open(
        draft: TicketDraft,
        opener_id: &str,
        opened_at: DateTime<Utc>,
        sla_due_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            number: 0,
            subject: draft.subject,
            opened_by: opener_id.to_string(),
            owner_id: opener_id.to_string(),
            department: draft.department,
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            status: TicketStatus::Open,
            opened_at,
            updated_at: opened_at,
            sla_due_at,
            resolution_summary: None,
            closed_at: None,
            origin_call_type: draft.origin_call_type,
        }
    }

    /// SLA breach is a read-time computation, never a state change.
    pub fn sla_breached(&self, now: DateTime<Utc>) -> bool {
        now > self.sla_due_at
    }
}
