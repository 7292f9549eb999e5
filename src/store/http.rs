//! HTTP/JSON store client for the hosted backend.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use crate::audit::AuditQuestion;
use crate::error::{Error, Result};
use crate::event::TicketEvent;
use crate::operator::Operator;
use crate::session::{CallRecord, Contact, OperatorEventKind, Task};
use crate::store::{Store, TaskPatch, TicketFilter, TicketPatch};
use crate::ticket::{CallType, Ticket, TicketStatus};

#[derive(Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct UpdateTicketBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_status: Option<TicketStatus>,
    #[serde(flatten)]
    patch: TicketPatch,
}

#[derive(Serialize)]
struct OperatorEventBody<'a> {
    operator_id: &'a str,
    kind: OperatorEventKind,
    task_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("x-api-key", &self.api_key)
    }

    /// Map backend status codes onto the engine's error taxonomy:
    /// 404 → NotFound, 409 → State (stale conditional update), anything
    /// else non-success → Persistence. `op` names the failing operation.
    async fn check(response: Response, op: &'static str, what: &str) -> Result<Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(what.to_string()));
        }
        if status == StatusCode::CONFLICT {
            return Err(Error::State {
                op,
                detail: "status changed since it was read (concurrent update)".into(),
            });
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(Error::Persistence(format!(
                "backend returned {status} for {what}: {body}"
            )));
        }
        Ok(response)
    }
}

impl Store for HttpStore {
    async fn create_ticket(&self, ticket: Ticket) -> Result<Ticket> {
        let response = self
            .request(reqwest::Method::POST, "/tickets")
            .json(&ticket)
            .send()
            .await?;
        Ok(Self::check(response, "create_ticket", "create ticket").await?.json().await?)
    }

    async fn get_ticket(&self, key: &str) -> Result<Ticket> {
        let response = self
            .request(reqwest::Method::GET, &format!("/tickets/{key}"))
            .send()
            .await?;
        Ok(Self::check(response, "get_ticket", &format!("ticket {key}"))
            .await?
            .json()
            .await?)
    }

    async fn update_ticket(
        &self,
        id: &str,
        expected: Option<TicketStatus>,
        patch: TicketPatch,
    ) -> Result<Ticket> {
        let body = UpdateTicketBody {
            expected_status: expected,
            patch,
        };
        let response = self
            .request(reqwest::Method::PATCH, &format!("/tickets/{id}"))
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(response, "update_ticket", &format!("ticket {id}"))
            .await?
            .json()
            .await?)
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let response = self
            .request(reqwest::Method::GET, "/tickets")
            .query(filter)
            .send()
            .await?;
        Ok(Self::check(response, "list_tickets", "list tickets").await?.json().await?)
    }

    async fn append_event(&self, event: TicketEvent) -> Result<()> {
        let path = format!("/tickets/{}/events", event.ticket_id);
        let response = self
            .request(reqwest::Method::POST, &path)
            .json(&event)
            .send()
            .await?;
        Self::check(response, "append_event", "append event").await?;
        Ok(())
    }

    async fn list_events(&self, ticket_id: &str) -> Result<Vec<TicketEvent>> {
        let response = self
            .request(reqwest::Method::GET, &format!("/tickets/{ticket_id}/events"))
            .send()
            .await?;
        Ok(Self::check(response, "list_events", &format!("events of ticket {ticket_id}"))
            .await?
            .json()
            .await?)
    }

    async fn pending_task(&self, operator_id: &str) -> Result<Option<Task>> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/operators/{operator_id}/tasks/next"),
            )
            .send()
            .await?;
        // An empty queue is a normal outcome, not an error.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(
            Self::check(response, "pending_task", "pending task").await?.json().await?,
        ))
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        let response = self
            .request(reqwest::Method::PATCH, &format!("/tasks/{id}"))
            .json(&patch)
            .send()
            .await?;
        Ok(Self::check(response, "update_task", &format!("task {id}"))
            .await?
            .json()
            .await?)
    }

    async fn create_call_record(&self, record: CallRecord) -> Result<CallRecord> {
        let response = self
            .request(reqwest::Method::POST, "/call-records")
            .json(&record)
            .send()
            .await?;
        Ok(Self::check(response, "create_call_record", "create call record")
            .await?
            .json()
            .await?)
    }

    async fn list_call_records(&self, operator_id: Option<&str>) -> Result<Vec<CallRecord>> {
        let mut request = self.request(reqwest::Method::GET, "/call-records");
        if let Some(op) = operator_id {
            request = request.query(&[("operator_id", op)]);
        }
        let response = request.send().await?;
        Ok(Self::check(response, "list_call_records", "list call records")
            .await?
            .json()
            .await?)
    }

    async fn audit_questions(&self, call_type: Option<CallType>) -> Result<Vec<AuditQuestion>> {
        let mut request = self.request(reqwest::Method::GET, "/audit-questions");
        if let Some(ct) = call_type {
            request = request.query(&[("call_type", ct.to_string())]);
        }
        let response = request.send().await?;
        Ok(Self::check(response, "audit_questions", "audit questions")
            .await?
            .json()
            .await?)
    }

    async fn get_operator(&self, id: &str) -> Result<Operator> {
        let response = self
            .request(reqwest::Method::GET, &format!("/operators/{id}"))
            .send()
            .await?;
        Ok(Self::check(response, "get_operator", &format!("operator {id}"))
            .await?
            .json()
            .await?)
    }

    async fn get_contact(&self, id: &str) -> Result<Contact> {
        let response = self
            .request(reqwest::Method::GET, &format!("/contacts/{id}"))
            .send()
            .await?;
        Ok(Self::check(response, "get_contact", &format!("contact {id}"))
            .await?
            .json()
            .await?)
    }

    async fn log_operator_event(
        &self,
        operator_id: &str,
        kind: OperatorEventKind,
        task_id: &str,
        detail: Option<&str>,
    ) -> Result<()> {
        let body = OperatorEventBody {
            operator_id,
            kind,
            task_id,
            detail,
        };
        let response = self
            .request(reqwest::Method::POST, "/operator-events")
            .json(&body)
            .send()
            .await?;
        Self::check(response, "log_operator_event", "operator event").await?;
        Ok(())
    }
}
