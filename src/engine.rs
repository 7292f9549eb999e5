//! Ticket lifecycle engine.
//!
//! Owns every status transition. Each operation follows the same shape:
//! fresh read of the persisted ticket, guard checks (status set, ownership,
//! role), a conditional write keyed on the status that was read, and exactly
//! one appended history event. The engine never trusts a caller's cached
//! copy of a ticket.

use chrono::{DateTime, Utc};

use crate::audit::{Answer, AuditGate};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::event::TicketEvent;
use crate::operator::Operator;
use crate::sla::SlaClock;
use crate::store::{Store, TicketPatch};
use crate::ticket::{Ticket, TicketDraft, TicketStatus, WaitingOn};

pub struct TicketEngine<S, C> {
    store: S,
    clock: C,
}

impl<S: Store, C: Clock> TicketEngine<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Open a new ticket. The SLA due date is computed here, once, and is
    /// never recomputed by later edits.
    pub async fn create(&self, draft: TicketDraft, actor: &Operator) -> Result<Ticket> {
        draft.validate()?;
        let now = self.now();
        let due = SlaClock::due_at(draft.priority, now);
        let ticket = Ticket::open(draft, &actor.id, now, due);
        let stored = self.store.create_ticket(ticket).await?;
        self.store
            .append_event(TicketEvent::created(&stored.id, &actor.id, now))
            .await?;
        Ok(stored)
    }

    /// Begin work on an open (or reopened) ticket. Owner only.
    pub async fn start(&self, key: &str, actor: &Operator) -> Result<Ticket> {
        let ticket = self.store.get_ticket(key).await?;
        if !matches!(
            ticket.status,
            TicketStatus::Open | TicketStatus::Reopened
        ) {
            return Err(Error::state("start", ticket.status));
        }
        require_owner(&ticket, actor)?;

        self.transition(&ticket, TicketStatus::InProgress, String::new(), actor)
            .await
    }

    /// Park an in-progress ticket on a department or on the customer.
    pub async fn set_waiting(
        &self,
        key: &str,
        actor: &Operator,
        waiting: WaitingOn,
    ) -> Result<Ticket> {
        let ticket = self.store.get_ticket(key).await?;
        if ticket.status != TicketStatus::InProgress {
            return Err(Error::state("set_waiting", ticket.status));
        }
        require_owner(&ticket, actor)?;

        self.transition(&ticket, waiting.status(), String::new(), actor)
            .await
    }

    /// Resume a parked ticket back to in-progress. Owner only.
    pub async fn resume(&self, key: &str, actor: &Operator) -> Result<Ticket> {
        let ticket = self.store.get_ticket(key).await?;
        if !matches!(
            ticket.status,
            TicketStatus::AwaitingDepartment | TicketStatus::AwaitingCustomer
        ) {
            return Err(Error::state("resume", ticket.status));
        }
        require_owner(&ticket, actor)?;

        self.transition(&ticket, TicketStatus::InProgress, String::new(), actor)
            .await
    }

    /// Submit a resolution for admin confirmation. All-or-nothing: the
    /// closing audit must be complete and the summary non-empty, otherwise
    /// nothing is saved.
    pub async fn submit_resolution(
        &self,
        key: &str,
        actor: &Operator,
        answers: &[Answer],
        summary: &str,
    ) -> Result<Ticket> {
        let ticket = self.store.get_ticket(key).await?;
        if ticket.status != TicketStatus::InProgress {
            return Err(Error::state("submit_resolution", ticket.status));
        }
        require_owner(&ticket, actor)?;
        if summary.trim().is_empty() {
            return Err(Error::Validation(
                "resolution summary must not be empty".into(),
            ));
        }

        let catalog = self.store.audit_questions(ticket.origin_call_type).await?;
        AuditGate::validate(&catalog, answers)?;
        let resolution = AuditGate::resolution_text(&catalog, answers, summary);

        let now = self.now();
        let patch = TicketPatch {
            resolution_summary: Some(resolution),
            ..TicketPatch::status(TicketStatus::ResolvedPending, now)
        };
        let updated = self
            .store
            .update_ticket(&ticket.id, Some(ticket.status), patch)
            .await?;
        self.store
            .append_event(TicketEvent::status_changed(
                &ticket.id,
                ticket.status,
                TicketStatus::ResolvedPending,
                "resolution submitted",
                &actor.id,
                now,
            ))
            .await?;
        Ok(updated)
    }

    /// Confirm a submitted resolution and close the ticket. Admin only.
    pub async fn approve(&self, key: &str, actor: &Operator) -> Result<Ticket> {
        require_admin(actor, "approve")?;
        let ticket = self.store.get_ticket(key).await?;
        if ticket.status != TicketStatus::ResolvedPending {
            return Err(Error::state("approve", ticket.status));
        }

        let now = self.now();
        let patch = TicketPatch {
            closed_at: Some(now),
            ..TicketPatch::status(TicketStatus::Closed, now)
        };
        let updated = self
            .store
            .update_ticket(&ticket.id, Some(ticket.status), patch)
            .await?;
        self.store
            .append_event(TicketEvent::status_changed(
                &ticket.id,
                ticket.status,
                TicketStatus::Closed,
                "resolution approved",
                &actor.id,
                now,
            ))
            .await?;
        Ok(updated)
    }

    /// Reject a submitted resolution, returning the ticket to its owner as
    /// in-progress. Admin only. The SLA due date is left untouched.
    pub async fn reject(&self, key: &str, actor: &Operator, reason: &str) -> Result<Ticket> {
        require_admin(actor, "reject")?;
        if reason.trim().is_empty() {
            return Err(Error::Validation("rejection reason must not be empty".into()));
        }
        let ticket = self.store.get_ticket(key).await?;
        if ticket.status != TicketStatus::ResolvedPending {
            return Err(Error::state("reject", ticket.status));
        }

        self.transition(&ticket, TicketStatus::InProgress, reason.trim().to_string(), actor)
            .await
    }

    /// Attach a free-text note to any non-closed ticket. Appends a history
    /// event only; the status is untouched.
    pub async fn add_note(&self, key: &str, actor: &Operator, text: &str) -> Result<TicketEvent> {
        if text.trim().is_empty() {
            return Err(Error::Validation("note text must not be empty".into()));
        }
        let ticket = self.store.get_ticket(key).await?;
        if ticket.status.is_closed() {
            return Err(Error::state("add_note", ticket.status));
        }

        let now = self.now();
        self.store
            .update_ticket(&ticket.id, None, TicketPatch::touch(now))
            .await?;
        let event = TicketEvent::note(&ticket.id, text.trim(), &actor.id, now);
        self.store.append_event(event.clone()).await?;
        Ok(event)
    }

    /// Explicit reopen of a closed ticket. Admin only.
    pub async fn reopen(&self, key: &str, actor: &Operator) -> Result<Ticket> {
        require_admin(actor, "reopen")?;
        let ticket = self.store.get_ticket(key).await?;
        if ticket.status != TicketStatus::Closed {
            return Err(Error::state("reopen", ticket.status));
        }

        let now = self.now();
        let patch = TicketPatch {
            clear_closed_at: true,
            ..TicketPatch::status(TicketStatus::Reopened, now)
        };
        let updated = self
            .store
            .update_ticket(&ticket.id, Some(ticket.status), patch)
            .await?;
        self.store
            .append_event(TicketEvent::status_changed(
                &ticket.id,
                ticket.status,
                TicketStatus::Reopened,
                "reopened",
                &actor.id,
                now,
            ))
            .await?;
        Ok(updated)
    }

    /// Shared path for plain status moves: conditional write plus one
    /// status_changed event.
    async fn transition(
        &self,
        ticket: &Ticket,
        to: TicketStatus,
        note: String,
        actor: &Operator,
    ) -> Result<Ticket> {
        let now = self.now();
        let updated = self
            .store
            .update_ticket(&ticket.id, Some(ticket.status), TicketPatch::status(to, now))
            .await?;
        self.store
            .append_event(TicketEvent::status_changed(
                &ticket.id,
                ticket.status,
                to,
                note,
                &actor.id,
                now,
            ))
            .await?;
        Ok(updated)
    }
}

fn require_owner(ticket: &Ticket, actor: &Operator) -> Result<()> {
    if actor.id != ticket.owner_id {
        return Err(Error::Authorization(format!(
            "only the current owner ({}) may advance ticket #{}",
            ticket.owner_id, ticket.number
        )));
    }
    Ok(())
}

fn require_admin(actor: &Operator, op: &str) -> Result<()> {
    if !actor.is_admin() {
        return Err(Error::Authorization(format!(
            "{op} requires the administrative role"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};

    use crate::audit::AuditQuestion;
    use crate::clock::ManualClock;
    use crate::event::EventKind;
    use crate::operator::Role;
    use crate::sla::Priority;
    use crate::store::MemoryStore;
    use crate::ticket::{CallType, SubjectRef};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()
    }

    fn agent() -> Operator {
        Operator::new("op-1", "Ana", Role::Agent)
    }

    fn admin() -> Operator {
        Operator::new("adm-1", "Bruno", Role::Admin)
    }

    fn draft(priority: Priority) -> TicketDraft {
        TicketDraft {
            subject: SubjectRef::Customer("cust-1".into()),
            department: "support".into(),
            title: "Pump offline".into(),
            description: "Pressure fault on unit 3".into(),
            priority,
            origin_call_type: Some(CallType::Support),
        }
    }

    fn closing_questions() -> Vec<AuditQuestion> {
        vec![
            AuditQuestion {
                id: "q1".into(),
                prompt: "Issue confirmed resolved?".into(),
                options: vec!["yes".into(), "no".into()],
                call_types: vec![],
                order: 1,
                upsell_sensitive: false,
                closing: true,
            },
            AuditQuestion {
                id: "q2".into(),
                prompt: "Customer notified?".into(),
                options: vec!["yes".into(), "no".into()],
                call_types: vec![],
                order: 2,
                upsell_sensitive: false,
                closing: true,
            },
        ]
    }

    fn engine() -> (TicketEngine<MemoryStore, Arc<ManualClock>>, MemoryStore, Arc<ManualClock>) {
        let store = MemoryStore::new();
        store.seed_questions(closing_questions());
        let clock = Arc::new(ManualClock::new(t0()));
        let engine = TicketEngine::new(store.clone(), Arc::clone(&clock));
        (engine, store, clock)
    }

    fn answers() -> Vec<Answer> {
        vec![Answer::new("q1", "yes"), Answer::new("q2", "yes")]
    }

    #[tokio::test]
    async fn create_computes_sla_and_appends_event() {
        let (engine, store, _) = engine();
        let t = engine.create(draft(Priority::High), &agent()).await.unwrap();

        assert_eq!(t.status, TicketStatus::Open);
        assert_eq!(t.sla_due_at, t0() + Duration::hours(24));
        assert_eq!(t.owner_id, "op-1");
        assert_eq!(t.number, 1);

        let events = store.list_events(&t.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Created);
    }

    #[tokio::test]
    async fn create_rejects_empty_title() {
        let (engine, _, _) = engine();
        let mut d = draft(Priority::Low);
        d.title = " ".into();
        let err = engine.create(d, &agent()).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn start_requires_owner() {
        let (engine, _, _) = engine();
        let t = engine.create(draft(Priority::Medium), &agent()).await.unwrap();

        let intruder = Operator::new("op-9", "Zé", Role::Agent);
        let err = engine.start(&t.id, &intruder).await.unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));

        let t = engine.start(&t.id, &agent()).await.unwrap();
        assert_eq!(t.status, TicketStatus::InProgress);
    }

    #[tokio::test]
    async fn start_rejected_outside_open_or_reopened() {
        let (engine, _, _) = engine();
        let t = engine.create(draft(Priority::Medium), &agent()).await.unwrap();
        engine.start(&t.id, &agent()).await.unwrap();

        let err = engine.start(&t.id, &agent()).await.unwrap_err();
        assert!(matches!(err, Error::State { op: "start", .. }));
    }

    #[tokio::test]
    async fn lookup_by_human_facing_number() {
        let (engine, _, _) = engine();
        let t = engine.create(draft(Priority::Medium), &agent()).await.unwrap();
        let by_number = engine.start(&t.number.to_string(), &agent()).await.unwrap();
        assert_eq!(by_number.id, t.id);
    }

    #[tokio::test]
    async fn submit_resolution_rejects_incomplete_audit() {
        let (engine, store, _) = engine();
        let t = engine.create(draft(Priority::Medium), &agent()).await.unwrap();
        engine.start(&t.id, &agent()).await.unwrap();

        let partial = vec![Answer::new("q1", "yes")];
        let err = engine
            .submit_resolution(&t.id, &agent(), &partial, "done")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingAnswers(ids) if ids == vec!["q2".to_string()]));

        // All-or-nothing: nothing was saved.
        let fresh = store.get_ticket(&t.id).await.unwrap();
        assert_eq!(fresh.status, TicketStatus::InProgress);
        assert!(fresh.resolution_summary.is_none());
    }

    #[tokio::test]
    async fn submit_resolution_requires_summary() {
        let (engine, _, _) = engine();
        let t = engine.create(draft(Priority::Medium), &agent()).await.unwrap();
        engine.start(&t.id, &agent()).await.unwrap();

        let err = engine
            .submit_resolution(&t.id, &agent(), &answers(), "  ")
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn approve_and_reject_only_from_resolved_pending() {
        let (engine, _, _) = engine();
        let t = engine.create(draft(Priority::Medium), &agent()).await.unwrap();

        let err = engine.approve(&t.id, &admin()).await.unwrap_err();
        assert!(matches!(err, Error::State { op: "approve", .. }));
        let err = engine.reject(&t.id, &admin(), "not verified").await.unwrap_err();
        assert!(matches!(err, Error::State { op: "reject", .. }));
    }

    #[tokio::test]
    async fn approve_requires_admin_role() {
        let (engine, _, _) = engine();
        let t = engine.create(draft(Priority::Medium), &agent()).await.unwrap();
        engine.start(&t.id, &agent()).await.unwrap();
        engine
            .submit_resolution(&t.id, &agent(), &answers(), "replaced the seal")
            .await
            .unwrap();

        let err = engine.approve(&t.id, &agent()).await.unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[tokio::test]
    async fn reject_returns_ticket_to_owner_in_progress() {
        let (engine, store, _) = engine();
        let t = engine.create(draft(Priority::Medium), &agent()).await.unwrap();
        let original_due = t.sla_due_at;
        engine.start(&t.id, &agent()).await.unwrap();
        engine
            .submit_resolution(&t.id, &agent(), &answers(), "replaced the seal")
            .await
            .unwrap();

        let t = engine.reject(&t.id, &admin(), "photo evidence missing").await.unwrap();
        assert_eq!(t.status, TicketStatus::InProgress);
        // The SLA is fixed at creation; rejection does not reset it.
        assert_eq!(t.sla_due_at, original_due);

        let events = store.list_events(&t.id).await.unwrap();
        let last = events.last().unwrap();
        assert_eq!(last.note, "photo evidence missing");
        assert_eq!(last.new_value.as_deref(), Some("IN_PROGRESS"));
    }

    #[tokio::test]
    async fn full_lifecycle_high_priority() {
        let (engine, store, clock) = engine();

        let t = engine.create(draft(Priority::High), &agent()).await.unwrap();
        assert_eq!(t.sla_due_at, t0() + Duration::hours(24));

        clock.advance_secs(60);
        let t = engine.start(&t.id, &agent()).await.unwrap();
        assert_eq!(t.status, TicketStatus::InProgress);

        clock.advance_secs(600);
        let t = engine
            .submit_resolution(&t.id, &agent(), &answers(), "fixed pump seal")
            .await
            .unwrap();
        assert_eq!(t.status, TicketStatus::ResolvedPending);
        let summary = t.resolution_summary.as_deref().unwrap();
        assert!(summary.contains("fixed pump seal"));
        assert!(summary.contains("Issue confirmed resolved?: yes"));

        clock.advance_secs(60);
        let t = engine.approve(&t.id, &admin()).await.unwrap();
        assert_eq!(t.status, TicketStatus::Closed);
        assert_eq!(t.closed_at, Some(clock.now()));

        // created, →IN_PROGRESS, →RESOLVED_PENDING, →CLOSED
        let events = store.list_events(&t.id).await.unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].kind, EventKind::Created);
        assert!(events[1..]
            .iter()
            .all(|e| e.kind == EventKind::StatusChanged));
        assert_eq!(events[3].note, "resolution approved");
    }

    #[tokio::test]
    async fn stale_approve_loses_to_concurrent_reject() {
        let (engine, store, _) = engine();
        let t = engine.create(draft(Priority::Medium), &agent()).await.unwrap();
        engine.start(&t.id, &agent()).await.unwrap();
        engine
            .submit_resolution(&t.id, &agent(), &answers(), "done")
            .await
            .unwrap();

        // Another administrator rejects between this admin's read and write:
        // simulate by rejecting first, then replaying an approve against the
        // now-stale status through the conditional update.
        engine.reject(&t.id, &admin(), "incomplete").await.unwrap();
        let err = store
            .update_ticket(
                &t.id,
                Some(TicketStatus::ResolvedPending),
                TicketPatch::status(TicketStatus::Closed, t0()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::State { .. }));

        let fresh = store.get_ticket(&t.id).await.unwrap();
        assert_eq!(fresh.status, TicketStatus::InProgress);
    }

    #[tokio::test]
    async fn waiting_round_trip() {
        let (engine, _, _) = engine();
        let t = engine.create(draft(Priority::Low), &agent()).await.unwrap();
        engine.start(&t.id, &agent()).await.unwrap();

        let t = engine
            .set_waiting(&t.id, &agent(), WaitingOn::Department)
            .await
            .unwrap();
        assert_eq!(t.status, TicketStatus::AwaitingDepartment);

        let t = engine.resume(&t.id, &agent()).await.unwrap();
        assert_eq!(t.status, TicketStatus::InProgress);

        let t = engine
            .set_waiting(&t.id, &agent(), WaitingOn::Customer)
            .await
            .unwrap();
        assert_eq!(t.status, TicketStatus::AwaitingCustomer);
    }

    #[tokio::test]
    async fn set_waiting_only_from_in_progress() {
        let (engine, _, _) = engine();
        let t = engine.create(draft(Priority::Low), &agent()).await.unwrap();
        let err = engine
            .set_waiting(&t.id, &agent(), WaitingOn::Department)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::State { .. }));
    }

    #[tokio::test]
    async fn add_note_appends_event_without_status_change() {
        let (engine, store, _) = engine();
        let t = engine.create(draft(Priority::Low), &agent()).await.unwrap();

        engine
            .add_note(&t.id, &agent(), "customer prefers mornings")
            .await
            .unwrap();

        let fresh = store.get_ticket(&t.id).await.unwrap();
        assert_eq!(fresh.status, TicketStatus::Open);
        let events = store.list_events(&t.id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, EventKind::NoteAdded);
        assert_eq!(events[1].note, "customer prefers mornings");
    }

    #[tokio::test]
    async fn add_note_rejected_on_closed_and_empty_text() {
        let (engine, _, _) = engine();
        let t = engine.create(draft(Priority::Medium), &agent()).await.unwrap();
        engine.start(&t.id, &agent()).await.unwrap();
        engine
            .submit_resolution(&t.id, &agent(), &answers(), "done")
            .await
            .unwrap();
        engine.approve(&t.id, &admin()).await.unwrap();

        let err = engine.add_note(&t.id, &agent(), "late note").await.unwrap_err();
        assert!(matches!(err, Error::State { .. }));

        let err = engine.add_note(&t.id, &agent(), "  ").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn closed_stays_closed_until_explicit_reopen() {
        let (engine, store, _) = engine();
        let t = engine.create(draft(Priority::Medium), &agent()).await.unwrap();
        engine.start(&t.id, &agent()).await.unwrap();
        engine
            .submit_resolution(&t.id, &agent(), &answers(), "done")
            .await
            .unwrap();
        engine.approve(&t.id, &admin()).await.unwrap();

        // No transition moves a closed ticket except reopen.
        assert!(engine.start(&t.id, &agent()).await.is_err());
        assert!(engine.approve(&t.id, &admin()).await.is_err());
        assert!(engine.reject(&t.id, &admin(), "x").await.is_err());
        assert_eq!(
            store.get_ticket(&t.id).await.unwrap().status,
            TicketStatus::Closed
        );

        let err = engine.reopen(&t.id, &agent()).await.unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));

        let t = engine.reopen(&t.id, &admin()).await.unwrap();
        assert_eq!(t.status, TicketStatus::Reopened);
        assert!(t.closed_at.is_none());

        // A reopened ticket can be started again by its owner.
        let t = engine.start(&t.id, &agent()).await.unwrap();
        assert_eq!(t.status, TicketStatus::InProgress);
    }

    #[tokio::test]
    async fn every_transition_appends_exactly_one_event() {
        let (engine, store, _) = engine();
        let t = engine.create(draft(Priority::Medium), &agent()).await.unwrap();
        engine.start(&t.id, &agent()).await.unwrap();
        engine
            .set_waiting(&t.id, &agent(), WaitingOn::Customer)
            .await
            .unwrap();
        engine.resume(&t.id, &agent()).await.unwrap();
        engine
            .submit_resolution(&t.id, &agent(), &answers(), "done")
            .await
            .unwrap();
        engine.reject(&t.id, &admin(), "recheck").await.unwrap();

        // creation + 5 transitions
        let events = store.list_events(&t.id).await.unwrap();
        assert_eq!(events.len(), 6);
    }
}
