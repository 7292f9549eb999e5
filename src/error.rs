use thiserror::Error;

use crate::ticket::TicketStatus;

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy of the lifecycle engine.
///
/// Every failure is a value returned to the caller; nothing here aborts the
/// process. `Validation` and `MissingAnswers` are locally recoverable (fix
/// the input and retry), `State` means the caller's view of the ticket is
/// stale and must be re-fetched, `Authorization` is a denial and is not
/// retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("closing audit incomplete, missing answers for: {}", .0.join(", "))]
    MissingAnswers(Vec<String>),

    #[error("invalid state for {op}: {detail}")]
    State { op: &'static str, detail: String },

    #[error("authorization error: {0}")]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a `State` error for a transition attempted from a status that
    /// does not allow it.
    pub fn state(op: &'static str, status: TicketStatus) -> Self {
        Error::State {
            op,
            detail: format!("ticket is {status}"),
        }
    }

    /// Whether this error belongs to the validation class (including an
    /// incomplete closing audit).
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::MissingAnswers(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Persistence(format!("malformed store payload: {err}"))
    }
}
