//! Append-only, per-ticket record of lifecycle events.
//!
//! Events are created once per auditable mutation, never updated or deleted.
//! Ordering by `created_at` is the causal order of the ticket's history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ticket::TicketStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    StatusChanged,
    NoteAdded,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Created => write!(f, "created"),
            EventKind::StatusChanged => write!(f, "status_changed"),
            EventKind::NoteAdded => write!(f, "note_added"),
        }
    }
}

/// One entry in a ticket's history. The `ticket_id` is a back-reference,
/// never owning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketEvent {
    pub id: String,
    pub ticket_id: String,
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    pub note: String,
    pub actor_id: String,
    pub created_at: DateTime<Utc>,
}

impl TicketEvent {
    pub fn created(ticket_id: &str, actor_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ticket_id: ticket_id.to_string(),
            kind: EventKind::Created,
            old_value: None,
            new_value: Some(TicketStatus::Open.to_string()),
            note: "ticket opened".to_string(),
            actor_id: actor_id.to_string(),
            created_at: at,
        }
    }

    pub fn status_changed(
        ticket_id: &str,
        old: TicketStatus,
        new: TicketStatus,
        note: impl Into<String>,
        actor_id: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ticket_id: ticket_id.to_string(),
            kind: EventKind::StatusChanged,
            old_value: Some(old.to_string()),
            new_value: Some(new.to_string()),
            note: note.into(),
            actor_id: actor_id.to_string(),
            created_at: at,
        }
    }

    pub fn note(ticket_id: &str, text: impl Into<String>, actor_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ticket_id: ticket_id.to_string(),
            kind: EventKind::NoteAdded,
            old_value: None,
            new_value: None,
            note: text.into(),
            actor_id: actor_id.to_string(),
            created_at: at,
        }
    }

    /// Ownership reassignment entry: carries the old and new owner ids but
    /// is status-independent, so it is recorded as a note.
    pub fn reassigned(
        ticket_id: &str,
        from: &str,
        to: &str,
        actor_id: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ticket_id: ticket_id.to_string(),
            kind: EventKind::NoteAdded,
            old_value: Some(from.to_string()),
            new_value: Some(to.to_string()),
            note: format!("reassigned from {from} to {to}"),
            actor_id: actor_id.to_string(),
            created_at: at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap()
    }

    #[test]
    fn created_event_shape() {
        let e = TicketEvent::created("t-1", "op-1", at());
        assert_eq!(e.kind, EventKind::Created);
        assert_eq!(e.old_value, None);
        assert_eq!(e.new_value.as_deref(), Some("OPEN"));
        assert_eq!(e.actor_id, "op-1");
    }

    #[test]
    fn status_change_carries_old_new_pair() {
        let e = TicketEvent::status_changed(
            "t-1",
            TicketStatus::Open,
            TicketStatus::InProgress,
            "",
            "op-1",
            at(),
        );
        assert_eq!(e.old_value.as_deref(), Some("OPEN"));
        assert_eq!(e.new_value.as_deref(), Some("IN_PROGRESS"));
    }

    #[test]
    fn reassignment_is_a_note_with_owner_pair() {
        let e = TicketEvent::reassigned("t-1", "op-1", "op-2", "adm-1", at());
        assert_eq!(e.kind, EventKind::NoteAdded);
        assert_eq!(e.note, "reassigned from op-1 to op-2");
        assert_eq!(e.old_value.as_deref(), Some("op-1"));
        assert_eq!(e.new_value.as_deref(), Some("op-2"));
    }

    #[test]
    fn event_serialization_roundtrip() {
        let e = TicketEvent::note("t-1", "customer called back", "op-1", at());
        let json = serde_json::to_string(&e).unwrap();
        let back: TicketEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
