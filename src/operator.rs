//! Operator identity: the actor on every lifecycle transition.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role held by an operator. Authorization checks live at the transition
/// boundary, not in the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Agent,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Agent => write!(f, "agent"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// A console operator (agent or administrator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub active: bool,
}

impl Operator {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            active: true,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
