use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::types::TicketRequest;

/// Operator alert channel for aborted runs. Delivery problems are the
/// implementation's to log; callers never see them.
#[async_trait]
pub trait Alerter: Send + Sync {
    async fn send_alert(&self, message: &str);
}

/// Alerter that drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlerter;

#[async_trait]
impl Alerter for NoopAlerter {
    async fn send_alert(&self, _message: &str) {}
}

/// Payload for the downstream service that drafts a first technician note.
/// Every field is a string; absent values are sent empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposedNote {
    pub ticket_id: String,
    pub intent: String,
    pub summary: String,
    pub initial_description: String,
    pub board: String,
    pub company_name: String,
    pub company_id: String,
    pub it_glue_org_id: String,
}

impl ProposedNote {
    pub fn new(
        ticket: &TicketRequest,
        intent: Option<&str>,
        summary: &str,
        board_name: Option<&str>,
    ) -> Self {
        Self {
            ticket_id: ticket.ticket_id.to_string(),
            intent: intent.unwrap_or_default().to_string(),
            summary: summary.to_string(),
            initial_description: ticket.initial_description.clone().unwrap_or_default(),
            board: board_name.unwrap_or_default().to_string(),
            company_name: ticket.company_name.clone().unwrap_or_default(),
            company_id: ticket.company_id.to_string(),
            it_glue_org_id: ticket.it_glue_org_id.to_string(),
        }
    }
}

#[async_trait]
pub trait ProposedNoteSink: Send + Sync {
    async fn send(&self, note: &ProposedNote) -> Result<()>;
}
