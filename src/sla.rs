//! SLA policy: maps a ticket priority and open timestamp to a due timestamp.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Ticket priority. Determines the SLA window fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// SLA window in hours for this priority.
    pub fn sla_hours(self) -> i64 {
        match self {
            Priority::Low => 72,
            Priority::Medium => 48,
            Priority::High => 24,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    /// Unknown priorities fail fast instead of silently defaulting: a wrong
    /// default would quietly misreport every SLA computed from it.
    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(Error::Config(format!("unknown priority: {other:?}"))),
        }
    }
}

/// Computes SLA due dates. Pure and total over the `Priority` enum.
pub struct SlaClock;

impl SlaClock {
    /// Due timestamp for a ticket of the given priority opened at `opened_at`.
    pub fn due_at(priority: Priority, opened_at: DateTime<Utc>) -> DateTime<Utc> {
        opened_at + Duration::hours(priority.sla_hours())
    }
}
