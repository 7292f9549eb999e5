//! Privileged reassignment of ticket ownership.
//!
//! Independent of lifecycle status: an administrator may hand a ticket to
//! another active operator at any non-closed status. Reassignment never
//! touches the status itself.

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::event::TicketEvent;
use crate::operator::Operator;
use crate::store::{Store, TicketPatch};
use crate::ticket::Ticket;

pub struct AssignmentRouter<S, C> {
    store: S,
    clock: C,
}

impl<S: Store, C: Clock> AssignmentRouter<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub async fn reassign(
        &self,
        key: &str,
        new_owner_id: &str,
        actor: &Operator,
    ) -> Result<Ticket> {
        if !actor.is_admin() {
            return Err(Error::Authorization(
                "reassign requires the administrative role".into(),
            ));
        }

        let new_owner = self.store.get_operator(new_owner_id).await?;
        if !new_owner.active {
            return Err(Error::Validation(format!(
                "operator {new_owner_id} is not active"
            )));
        }

        let ticket = self.store.get_ticket(key).await?;
        if ticket.status.is_closed() {
            return Err(Error::state("reassign", ticket.status));
        }

        let now = self.clock.now();
        let patch = TicketPatch {
            owner_id: Some(new_owner.id.clone()),
            updated_at: Some(now),
            ..Default::default()
        };
        let updated = self.store.update_ticket(&ticket.id, None, patch).await?;
        self.store
            .append_event(TicketEvent::reassigned(
                &ticket.id,
                &ticket.owner_id,
                &new_owner.id,
                &actor.id,
                now,
            ))
            .await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use crate::clock::ManualClock;
    use crate::engine::TicketEngine;
    use crate::event::EventKind;
    use crate::operator::Role;
    use crate::sla::Priority;
    use crate::store::MemoryStore;
    use crate::ticket::{SubjectRef, TicketDraft, TicketStatus};

    fn draft() -> TicketDraft {
        TicketDraft {
            subject: SubjectRef::Customer("cust-1".into()),
            department: "support".into(),
            title: "Billing dispute".into(),
            description: "Charged twice in March".into(),
            priority: Priority::Medium,
            origin_call_type: None,
        }
    }

    async fn setup() -> (
        AssignmentRouter<MemoryStore, Arc<ManualClock>>,
        MemoryStore,
        Ticket,
    ) {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap(),
        ));
        store.seed_operator(Operator::new("op-2", "Carla", Role::Agent));

        let engine = TicketEngine::new(store.clone(), Arc::clone(&clock));
        let opener = Operator::new("op-1", "Ana", Role::Agent);
        let ticket = engine.create(draft(), &opener).await.unwrap();

        let router = AssignmentRouter::new(store.clone(), clock);
        (router, store, ticket)
    }

    fn admin() -> Operator {
        Operator::new("adm-1", "Bruno", Role::Admin)
    }

    #[tokio::test]
    async fn reassign_changes_owner_and_logs_note() {
        let (router, store, ticket) = setup().await;

        let updated = router.reassign(&ticket.id, "op-2", &admin()).await.unwrap();
        assert_eq!(updated.owner_id, "op-2");
        // Status untouched.
        assert_eq!(updated.status, TicketStatus::Open);

        let events = store.list_events(&ticket.id).await.unwrap();
        let last = events.last().unwrap();
        assert_eq!(last.kind, EventKind::NoteAdded);
        assert_eq!(last.note, "reassigned from op-1 to op-2");
    }

    #[tokio::test]
    async fn reassign_requires_admin() {
        let (router, _, ticket) = setup().await;
        let agent = Operator::new("op-1", "Ana", Role::Agent);

        let err = router.reassign(&ticket.id, "op-2", &agent).await.unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[tokio::test]
    async fn reassign_rejects_unknown_or_inactive_target() {
        let (router, store, ticket) = setup().await;

        let err = router.reassign(&ticket.id, "ghost", &admin()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let mut inactive = Operator::new("op-3", "Davi", Role::Agent);
        inactive.active = false;
        store.seed_operator(inactive);
        let err = router.reassign(&ticket.id, "op-3", &admin()).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn reassign_rejected_on_closed_ticket() {
        let (router, store, ticket) = setup().await;
        store
            .update_ticket(
                &ticket.id,
                None,
                TicketPatch::status(TicketStatus::Closed, ticket.opened_at),
            )
            .await
            .unwrap();

        let err = router.reassign(&ticket.id, "op-2", &admin()).await.unwrap_err();
        assert!(matches!(err, Error::State { .. }));
    }
}
