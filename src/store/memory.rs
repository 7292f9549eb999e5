//! In-memory store backing tests and the embedded demo.
//!
//! A cheap `Arc<Mutex>` handle; clones share the same data. Assigns
//! sequential human-facing ticket numbers and enforces the conditional
//! status update the engine relies on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::audit::AuditQuestion;
use crate::error::{Error, Result};
use crate::event::TicketEvent;
use crate::operator::Operator;
use crate::session::{CallRecord, Contact, OperatorEventKind, Task, TaskStatus};
use crate::store::{Store, TaskPatch, TicketFilter, TicketPatch};
use crate::ticket::{CallType, Ticket, TicketStatus};

/// One captured telemetry entry, kept so tests can assert on it.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedOperatorEvent {
    pub operator_id: String,
    pub kind: OperatorEventKind,
    pub task_id: String,
    pub detail: Option<String>,
}

#[derive(Default)]
struct Inner {
    tickets: HashMap<String, Ticket>,
    events: Vec<TicketEvent>,
    tasks: HashMap<String, Task>,
    records: Vec<CallRecord>,
    questions: Vec<AuditQuestion>,
    operators: HashMap<String, Operator>,
    contacts: HashMap<String, Contact>,
    operator_events: Vec<LoggedOperatorEvent>,
    next_number: u64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("store lock poisoned")
    }

    pub fn seed_operator(&self, operator: Operator) {
        self.lock().operators.insert(operator.id.clone(), operator);
    }

    pub fn seed_contact(&self, contact: Contact) {
        self.lock().contacts.insert(contact.id.clone(), contact);
    }

    pub fn seed_task(&self, task: Task) {
        self.lock().tasks.insert(task.id.clone(), task);
    }

    pub fn seed_questions(&self, questions: Vec<AuditQuestion>) {
        self.lock().questions.extend(questions);
    }

    /// Direct task read for assertions.
    pub fn task(&self, id: &str) -> Option<Task> {
        self.lock().tasks.get(id).cloned()
    }

    /// Captured telemetry, in logging order.
    pub fn operator_events(&self) -> Vec<LoggedOperatorEvent> {
        self.lock().operator_events.clone()
    }
}

impl Store for MemoryStore {
    async fn create_ticket(&self, mut ticket: Ticket) -> Result<Ticket> {
        let mut inner = self.lock();
        inner.next_number += 1;
        ticket.number = inner.next_number;
        inner.tickets.insert(ticket.id.clone(), ticket.clone());
        Ok(ticket)
    }

    async fn get_ticket(&self, key: &str) -> Result<Ticket> {
        let inner = self.lock();
        let found = match key.parse::<u64>() {
            Ok(number) => inner.tickets.values().find(|t| t.number == number),
            Err(_) => inner.tickets.get(key),
        };
        found
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("ticket {key}")))
    }

    async fn update_ticket(
        &self,
        id: &str,
        expected: Option<TicketStatus>,
        patch: TicketPatch,
    ) -> Result<Ticket> {
        let mut inner = self.lock();
        let ticket = inner
            .tickets
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("ticket {id}")))?;

        if let Some(expected) = expected
            && ticket.status != expected
        {
            return Err(Error::State {
                op: "update_ticket",
                detail: format!(
                    "expected status {expected} but ticket is {} (concurrent update)",
                    ticket.status
                ),
            });
        }

        if let Some(status) = patch.status {
            ticket.status = status;
        }
        if let Some(owner_id) = patch.owner_id {
            ticket.owner_id = owner_id;
        }
        if let Some(summary) = patch.resolution_summary {
            ticket.resolution_summary = Some(summary);
        }
        if let Some(closed_at) = patch.closed_at {
            ticket.closed_at = Some(closed_at);
        }
        if patch.clear_closed_at {
            ticket.closed_at = None;
        }
        if let Some(updated_at) = patch.updated_at {
            ticket.updated_at = updated_at;
        }
        Ok(ticket.clone())
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let inner = self.lock();
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .filter(|t| {
                filter
                    .owner_id
                    .as_deref()
                    .is_none_or(|owner| t.owner_id == owner)
            })
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.number);
        Ok(tickets)
    }

    async fn append_event(&self, event: TicketEvent) -> Result<()> {
        self.lock().events.push(event);
        Ok(())
    }

    async fn list_events(&self, ticket_id: &str) -> Result<Vec<TicketEvent>> {
        let inner = self.lock();
        let mut events: Vec<TicketEvent> = inner
            .events
            .iter()
            .filter(|e| e.ticket_id == ticket_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    async fn pending_task(&self, operator_id: &str) -> Result<Option<Task>> {
        let inner = self.lock();
        Ok(inner
            .tasks
            .values()
            .filter(|t| t.operator_id == operator_id && t.status == TaskStatus::Pending)
            .min_by_key(|t| t.deadline)
            .cloned())
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        let mut inner = self.lock();
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("task {id}")))?;
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(reason) = patch.skip_reason {
            task.skip_reason = Some(reason);
        }
        Ok(task.clone())
    }

    async fn create_call_record(&self, record: CallRecord) -> Result<CallRecord> {
        self.lock().records.push(record.clone());
        Ok(record)
    }

    async fn list_call_records(&self, operator_id: Option<&str>) -> Result<Vec<CallRecord>> {
        let inner = self.lock();
        Ok(inner
            .records
            .iter()
            .filter(|r| operator_id.is_none_or(|op| r.operator_id == op))
            .cloned()
            .collect())
    }

    async fn audit_questions(&self, call_type: Option<CallType>) -> Result<Vec<AuditQuestion>> {
        let inner = self.lock();
        let mut questions: Vec<AuditQuestion> = inner
            .questions
            .iter()
            .filter(|q| match call_type {
                Some(ct) => q.applies_to(ct),
                None => q.call_types.is_empty(),
            })
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order);
        Ok(questions)
    }

    async fn get_operator(&self, id: &str) -> Result<Operator> {
        self.lock()
            .operators
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("operator {id}")))
    }

    async fn get_contact(&self, id: &str) -> Result<Contact> {
        self.lock()
            .contacts
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("contact {id}")))
    }

    async fn log_operator_event(
        &self,
        operator_id: &str,
        kind: OperatorEventKind,
        task_id: &str,
        detail: Option<&str>,
    ) -> Result<()> {
        self.lock().operator_events.push(LoggedOperatorEvent {
            operator_id: operator_id.to_string(),
            kind,
            task_id: task_id.to_string(),
            detail: detail.map(str::to_string),
        });
        Ok(())
    }
}
