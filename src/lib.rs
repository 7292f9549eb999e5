//! Ticket (protocol) lifecycle engine and operator call-session workflow
//! for a telemarketing operations console.
//!
//! The crate owns the state-machine core: SLA deadlines computed at ticket
//! creation, guarded status transitions with an append-only event history,
//! a mandatory closing-audit gate, privileged reassignment, and the timed
//! one-task-at-a-time call workflow that feeds new tickets into the engine.
//! Persistence is a collaborator behind the [`store::Store`] trait.

pub mod assignment;
pub mod audit;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod operator;
pub mod session;
pub mod sla;
pub mod store;
pub mod ticket;

pub use assignment::AssignmentRouter;
pub use audit::{Answer, AuditGate, AuditQuestion};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CallflowConfig;
pub use engine::TicketEngine;
pub use error::{Error, Result};
pub use event::{EventKind, TicketEvent};
pub use operator::{Operator, Role};
pub use session::{
    CallRecord, CallSession, Contact, OperatorEventKind, SessionState, SkipReason, Task,
    TaskStatus,
};
pub use sla::{Priority, SlaClock};
pub use store::{HttpStore, MemoryStore, Store, TaskPatch, TicketFilter, TicketPatch};
pub use ticket::{CallType, SubjectRef, Ticket, TicketDraft, TicketStatus, WaitingOn};
