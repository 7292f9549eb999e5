//! Closing-audit checklist validation.
//!
//! The question catalog is supplied externally (per call type); the gate
//! itself is stateless and reusable across tickets. A required question is
//! satisfied only by an answer whose value is one of its enumerated options.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ticket::CallType;

/// An externally supplied audit question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditQuestion {
    pub id: String,
    pub prompt: String,
    /// Enumerated set of allowed answer values.
    pub options: Vec<String>,
    /// Call types this question applies to. Empty = applies to all.
    #[serde(default)]
    pub call_types: Vec<CallType>,
    /// Display order within the checklist.
    pub order: u32,
    /// An affirmative answer to an upsell-sensitive question requires a
    /// paired justification note before a call report can be submitted.
    #[serde(default)]
    pub upsell_sensitive: bool,
    /// Whether this question is part of the closing-confirmation checklist.
    #[serde(default)]
    pub closing: bool,
}

impl AuditQuestion {
    pub fn applies_to(&self, call_type: CallType) -> bool {
        self.call_types.is_empty() || self.call_types.contains(&call_type)
    }

    pub fn accepts(&self, value: &str) -> bool {
        self.options.iter().any(|o| o == value)
    }
}

/// A validated answer to one audit question, with the optional paired
/// justification note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Answer {
    pub fn new(question_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            value: value.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    fn has_note(&self) -> bool {
        self.note.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

/// Validates a closing submission against the required-question checklist.
pub struct AuditGate;

impl AuditGate {
    /// The required set: closing-tagged questions in display order.
    pub fn required(catalog: &[AuditQuestion]) -> Vec<&AuditQuestion> {
        let mut qs: Vec<&AuditQuestion> = catalog.iter().filter(|q| q.closing).collect();
        qs.sort_by_key(|q| q.order);
        qs
    }

    /// All-or-nothing check: every required question must have an answer
    /// with an in-options value. Unknown question ids are rejected at the
    /// boundary rather than stored opaquely.
    pub fn validate(catalog: &[AuditQuestion], answers: &[Answer]) -> Result<()> {
        for a in answers {
            if !catalog.iter().any(|q| q.id == a.question_id) {
                return Err(Error::Validation(format!(
                    "unknown audit question: {}",
                    a.question_id
                )));
            }
        }

        let missing: Vec<String> = Self::required(catalog)
            .iter()
            .filter(|q| {
                !answers
                    .iter()
                    .any(|a| a.question_id == q.id && q.accepts(&a.value))
            })
            .map(|q| q.id.clone())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingAnswers(missing))
        }
    }

    /// Ids of upsell-sensitive questions that were answered but whose
    /// mandatory justification note is still empty.
    pub fn unjustified_upsell(catalog: &[AuditQuestion], answers: &[Answer]) -> Vec<String> {
        answers
            .iter()
            .filter(|a| !a.value.trim().is_empty() && !a.has_note())
            .filter(|a| {
                catalog
                    .iter()
                    .any(|q| q.id == a.question_id && q.upsell_sensitive)
            })
            .map(|a| a.question_id.clone())
            .collect()
    }

    /// Canonical resolution text embedding the audit answers and the
    /// free-text summary. This is what lands in `resolution_summary`.
    pub fn resolution_text(
        catalog: &[AuditQuestion],
        answers: &[Answer],
        summary: &str,
    ) -> String {
        let mut out = String::from("Closing audit:\n");
        for q in Self::required(catalog) {
            if let Some(a) = answers.iter().find(|a| a.question_id == q.id) {
                out.push_str(&format!("- {}: {}", q.prompt, a.value));
                if let Some(note) = a.note.as_deref().filter(|n| !n.trim().is_empty()) {
                    out.push_str(&format!(" ({note})"));
                }
                out.push('\n');
            }
        }
        out.push('\n');
        out.push_str(summary.trim());
        out
    }
}
