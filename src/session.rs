//! Operator call-session workflow.
//!
//! One pending contact at a time: acquire the next task, run a timed call,
//! write a timed report, then submit (producing an immutable [`CallRecord`]
//! and optionally escalating into a new ticket) or skip with a reason.
//! Timers are clock samples held in session state; closing a session
//! mid-call discards them, so a half-filled report never appears complete.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{Answer, AuditGate, AuditQuestion};
use crate::clock::Clock;
use crate::engine::TicketEngine;
use crate::error::{Error, Result};
use crate::store::{Store, TaskPatch};
use crate::ticket::{CallType, TicketDraft};

/// Workflow state for one operator's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No task loaded.
    Idle,
    /// Task and contact loaded, call not yet started.
    Ready,
    /// Call in progress; call timer ticking.
    InCall,
    /// Call ended; report timer ticking.
    Reporting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "IDLE"),
            SessionState::Ready => write!(f, "READY"),
            SessionState::InCall => write!(f, "IN_CALL"),
            SessionState::Reporting => write!(f, "REPORTING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
    Skipped,
}

/// Closed set of reasons an operator may skip a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoAnswer,
    WrongNumber,
    Voicemail,
    Refused,
    CallbackRequested,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoAnswer => write!(f, "no_answer"),
            SkipReason::WrongNumber => write!(f, "wrong_number"),
            SkipReason::Voicemail => write!(f, "voicemail"),
            SkipReason::Refused => write!(f, "refused"),
            SkipReason::CallbackRequested => write!(f, "callback_requested"),
        }
    }
}

/// A queued call assignment. Created externally, consumed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub contact_id: String,
    pub call_type: CallType,
    pub deadline: DateTime<Utc>,
    pub operator_id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
}

impl Task {
    pub fn new(
        contact_id: impl Into<String>,
        call_type: CallType,
        deadline: DateTime<Utc>,
        operator_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            contact_id: contact_id.into(),
            call_type,
            deadline,
            operator_id: operator_id.into(),
            status: TaskStatus::Pending,
            skip_reason: None,
        }
    }
}

/// The person behind a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// Immutable record of one completed call session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub operator_id: String,
    pub contact_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Wall-clock call duration in seconds.
    pub call_secs: i64,
    /// Wall-clock report-writing duration in seconds.
    pub report_secs: i64,
    pub answers: Vec<Answer>,
    pub summary: String,
    pub call_type: CallType,
    /// Ticket opened by escalating this call, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
}

/// Operator lifecycle telemetry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorEventKind {
    CallStarted,
    CallFinished,
    CallSkipped,
}

/// Per-operator, single-active-task call workflow.
///
/// Methods take `&mut self`; exclusive access is the reentrancy guard that
/// keeps a second submission from racing one already in flight.
pub struct CallSession<S, C> {
    engine: TicketEngine<S, C>,
    operator_id: String,
    state: SessionState,
    task: Option<Task>,
    contact: Option<Contact>,
    catalog: Vec<AuditQuestion>,
    answers: Vec<Answer>,
    call_started_at: Option<DateTime<Utc>>,
    call_ended_at: Option<DateTime<Utc>>,
    /// Ticket opened by a submit attempt that later failed to persist its
    /// record; a retry reuses it instead of opening a duplicate.
    escalated_ticket_id: Option<String>,
}

impl<S: Store, C: Clock> CallSession<S, C> {
    /// Escalated tickets are opened through the engine's creation path, so
    /// the session owns one.
    pub fn new(engine: TicketEngine<S, C>, operator_id: impl Into<String>) -> Self {
        Self {
            engine,
            operator_id: operator_id.into(),
            state: SessionState::Idle,
            task: None,
            contact: None,
            catalog: Vec::new(),
            answers: Vec::new(),
            call_started_at: None,
            call_ended_at: None,
            escalated_ticket_id: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    pub fn contact(&self) -> Option<&Contact> {
        self.contact.as_ref()
    }

    /// Audit questions applicable to the loaded task's call type.
    pub fn questions(&self) -> &[AuditQuestion] {
        &self.catalog
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    fn now(&self) -> DateTime<Utc> {
        self.engine.clock().now()
    }

    /// Load the single oldest pending task for this operator, with its
    /// contact and question catalog. Only valid while no task is unresolved.
    pub async fn load_next(&mut self) -> Result<SessionState> {
        if self.state != SessionState::Idle {
            return Err(Error::State {
                op: "load_next",
                detail: format!("a task is still unresolved (session is {})", self.state),
            });
        }

        match self.engine.store().pending_task(&self.operator_id).await? {
            None => {
                self.state = SessionState::Idle;
            }
            Some(task) => {
                let contact = self.engine.store().get_contact(&task.contact_id).await?;
                let catalog = self
                    .engine
                    .store()
                    .audit_questions(Some(task.call_type))
                    .await?;
                self.task = Some(task);
                self.contact = Some(contact);
                self.catalog = catalog;
                self.state = SessionState::Ready;
            }
        }
        Ok(self.state)
    }

    /// Begin the call; the call timer starts ticking.
    pub async fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Ready {
            return Err(self.session_state_err("start"));
        }
        self.call_started_at = Some(self.now());
        self.state = SessionState::InCall;
        self.telemetry(OperatorEventKind::CallStarted, None).await;
        Ok(())
    }

    /// End the call; freezes the call duration and starts the report timer.
    pub fn end_call(&mut self) -> Result<()> {
        if self.state != SessionState::InCall {
            return Err(self.session_state_err("end_call"));
        }
        self.call_ended_at = Some(self.now());
        self.state = SessionState::Reporting;
        Ok(())
    }

    /// Seconds spent on the call so far; frozen once the call has ended.
    pub fn call_secs(&self, now: DateTime<Utc>) -> i64 {
        match (self.call_started_at, self.call_ended_at) {
            (Some(start), Some(end)) => (end - start).num_seconds(),
            (Some(start), None) if self.state == SessionState::InCall => {
                (now - start).num_seconds()
            }
            _ => 0,
        }
    }

    /// Record an answer during the call or while reporting. Unknown question
    /// ids and out-of-range values are rejected here; the upsell
    /// justification guard runs at `submit`, so answers can be filled in
    /// incrementally.
    pub fn answer(&mut self, question_id: &str, value: &str) -> Result<()> {
        if !matches!(self.state, SessionState::InCall | SessionState::Reporting) {
            return Err(self.session_state_err("answer"));
        }
        let question = self
            .catalog
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| Error::Validation(format!("unknown audit question: {question_id}")))?;
        if !question.accepts(value) {
            return Err(Error::Validation(format!(
                "value {value:?} is not an option for question {question_id}"
            )));
        }

        match self.answers.iter_mut().find(|a| a.question_id == question_id) {
            Some(existing) => existing.value = value.to_string(),
            None => self.answers.push(Answer::new(question_id, value)),
        }
        Ok(())
    }

    /// Attach the paired justification note to an already-answered question.
    pub fn note(&mut self, question_id: &str, note: &str) -> Result<()> {
        if !matches!(self.state, SessionState::InCall | SessionState::Reporting) {
            return Err(self.session_state_err("note"));
        }
        let answer = self
            .answers
            .iter_mut()
            .find(|a| a.question_id == question_id)
            .ok_or_else(|| {
                Error::Validation(format!("no answer recorded for question {question_id}"))
            })?;
        answer.note = Some(note.to_string());
        Ok(())
    }

    /// Submit the call report. Atomic from the caller's view: the upsell
    /// guard and summary check run before anything is persisted, and the
    /// report survives a persistence failure so the same submission can be
    /// retried. On success the record is persisted, the task completed, and
    /// the session reset to idle; fetching the next task is a separate
    /// [`CallSession::load_next`] call.
    pub async fn submit(
        &mut self,
        summary: &str,
        escalation: Option<TicketDraft>,
    ) -> Result<CallRecord> {
        if self.state != SessionState::Reporting {
            return Err(self.session_state_err("submit"));
        }
        if summary.trim().is_empty() {
            return Err(Error::Validation("call summary must not be empty".into()));
        }
        let unjustified = AuditGate::unjustified_upsell(&self.catalog, &self.answers);
        if !unjustified.is_empty() {
            return Err(Error::Validation(format!(
                "upsell-sensitive answers need a justification note: {}",
                unjustified.join(", ")
            )));
        }

        let task = self.task.clone().ok_or_else(|| Error::State {
            op: "submit",
            detail: "no task loaded".into(),
        })?;
        let started_at = self.call_started_at.ok_or_else(|| Error::State {
            op: "submit",
            detail: "call never started".into(),
        })?;
        let ended_at = self.call_ended_at.ok_or_else(|| Error::State {
            op: "submit",
            detail: "call never ended".into(),
        })?;

        let ticket_id = match &self.escalated_ticket_id {
            Some(id) => Some(id.clone()),
            None => match escalation {
                Some(draft) => {
                    let operator = self.engine.store().get_operator(&self.operator_id).await?;
                    let id = self.engine.create(draft, &operator).await?.id;
                    self.escalated_ticket_id = Some(id.clone());
                    Some(id)
                }
                None => None,
            },
        };

        let now = self.now();
        let record = CallRecord {
            id: Uuid::new_v4().to_string(),
            task_id: Some(task.id.clone()),
            operator_id: self.operator_id.clone(),
            contact_id: task.contact_id.clone(),
            started_at,
            ended_at,
            call_secs: (ended_at - started_at).num_seconds(),
            report_secs: (now - ended_at).num_seconds(),
            // Cloned, not taken: the in-session answers are dropped only
            // once every write below has succeeded.
            answers: self.answers.clone(),
            summary: summary.trim().to_string(),
            call_type: task.call_type,
            ticket_id,
        };

        let record = self.engine.store().create_call_record(record).await?;
        self.engine
            .store()
            .update_task(&task.id, TaskPatch::completed())
            .await?;
        self.telemetry(OperatorEventKind::CallFinished, None).await;

        self.reset();
        Ok(record)
    }

    /// Skip the loaded task with a reason. Never produces a call record and
    /// involves no timers; the session returns to idle.
    pub async fn skip(&mut self, reason: SkipReason) -> Result<()> {
        if self.state != SessionState::Ready {
            return Err(self.session_state_err("skip"));
        }
        let task = self.task.clone().ok_or_else(|| Error::State {
            op: "skip",
            detail: "no task loaded".into(),
        })?;

        self.engine
            .store()
            .update_task(&task.id, TaskPatch::skipped(reason))
            .await?;
        self.telemetry(OperatorEventKind::CallSkipped, Some(&reason.to_string()))
            .await;

        self.reset();
        Ok(())
    }

    /// Telemetry is fire-and-forget; a logging failure never fails the
    /// operation that produced it.
    async fn telemetry(&self, kind: OperatorEventKind, detail: Option<&str>) {
        if let Some(task) = &self.task {
            let _ = self
                .engine
                .store()
                .log_operator_event(&self.operator_id, kind, &task.id, detail)
                .await;
        }
    }

    fn reset(&mut self) {
        self.task = None;
        self.contact = None;
        self.catalog.clear();
        self.answers.clear();
        self.call_started_at = None;
        self.call_ended_at = None;
        self.escalated_ticket_id = None;
        self.state = SessionState::Idle;
    }

    fn session_state_err(&self, op: &'static str) -> Error {
        Error::State {
            op,
            detail: format!("session is {}", self.state),
        }
    }
}
